// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use snapcam::app::{CaptureScreen, Collaborators, LensFacing, ScreenOptions};
use snapcam::backends::camera::CameraSource;
use snapcam::config::{Config, cache_directory};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "snapcam")]
#[command(about = "Take, review, watermark and save photos from your camera")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Use an image file as the back camera
    #[arg(long, global = true)]
    back_image: Option<PathBuf>,

    /// Use an image file as the front camera
    #[arg(long, global = true)]
    front_image: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the capture screen in the terminal (default)
    Terminal,

    /// List available cameras
    List,

    /// Take a photo and save it to the library
    Photo {
        /// Lens to shoot with
        #[arg(short, long, default_value = "back")]
        facing: LensFacing,

        /// Save without stamping the watermark
        #[arg(long)]
        no_watermark: bool,

        /// Directory receiving the photo (default: ~/Pictures/<save_folder>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn env_filter() -> EnvFilter {
    // Set RUST_LOG to control log level, e.g. RUST_LOG=snapcam=debug
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Log to stderr for one-shot commands
fn init_console_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_level(true)
        .init();
}

/// Log to a file so the terminal screen stays intact
fn init_file_logging() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dir = cache_directory();
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("snapcam.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .init();
    Ok(path)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let source = CameraSource::from_images(cli.back_image, cli.front_image);

    match cli.command {
        None | Some(Commands::Terminal) => {
            init_file_logging()?;
            let config = Config::load();
            let collaborators = Collaborators::for_system(&config, source);
            let screen = CaptureScreen::new(collaborators, ScreenOptions::from(&config));
            snapcam::terminal::run(screen, config.mirror_preview)
        }
        Some(Commands::List) => {
            init_console_logging();
            cli::list_cameras(&Config::load(), source)
        }
        Some(Commands::Photo {
            facing,
            no_watermark,
            output,
        }) => {
            init_console_logging();
            cli::take_photo(
                Config::load(),
                source,
                cli::PhotoOptions {
                    facing,
                    watermark: !no_watermark,
                    output,
                },
            )
        }
    }
}
