// SPDX-License-Identifier: GPL-3.0-only

//! Terminal front end for the capture screen
//!
//! Renders the live preview, or the captured photo while reviewing it,
//! using Unicode half-block characters for improved vertical resolution.
//! Collaborator tasks run on a tokio runtime and their messages are fed
//! back into the screen between frames.

use crate::app::{CaptureScreen, LensFacing, Message, PendingAction, ScreenMode, Task};
use crate::backends::camera::file_source::load_image_as_frame;
use crate::backends::camera::types::{CameraFrame, FrameReceiver};
use crate::constants::timing;
use crate::storage::path_from_uri;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal, backend::CrosstermBackend, buffer::Buffer, layout::Rect, style::Color,
    widgets::Widget,
};
use std::io::{self, stdout};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Run the interactive capture screen until the user quits
pub fn run(screen: CaptureScreen, mirror_preview: bool) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::new()?;

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &runtime, screen, mirror_preview);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// What a key press asks for
#[derive(Debug, Clone, PartialEq)]
enum KeyAction {
    Quit,
    ToggleHelp,
    Send(Message),
}

fn key_action(key: &KeyEvent) -> Option<KeyAction> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(KeyAction::Quit);
    }
    let action = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
        KeyCode::Char('h') => KeyAction::ToggleHelp,
        KeyCode::Char('f') => KeyAction::Send(Message::Flip),
        KeyCode::Char(' ') | KeyCode::Char('p') => KeyAction::Send(Message::Capture),
        KeyCode::Char('s') => KeyAction::Send(Message::Save),
        KeyCode::Char('d') | KeyCode::Backspace => KeyAction::Send(Message::Discard),
        KeyCode::Char('r') => KeyAction::Send(Message::Retry),
        KeyCode::Char('x') => KeyAction::Send(Message::DismissError),
        _ => return None,
    };
    Some(action)
}

/// Executes screen tasks on the runtime and collects their messages
struct TaskRunner<'a> {
    runtime: &'a Runtime,
    sender: mpsc::UnboundedSender<Message>,
    receiver: mpsc::UnboundedReceiver<Message>,
}

impl<'a> TaskRunner<'a> {
    fn new(runtime: &'a Runtime) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            runtime,
            sender,
            receiver,
        }
    }

    fn spawn(&self, task: Task) {
        for future in task.into_futures() {
            let sender = self.sender.clone();
            self.runtime.spawn(async move {
                if let Some(message) = future.await {
                    // Receiver only goes away when the screen is closing
                    let _ = sender.send(message);
                }
            });
        }
    }

    fn try_next(&mut self) -> Option<Message> {
        self.receiver.try_recv().ok()
    }
}

/// Keeps the preview stream bound to the screen's active device
#[derive(Default)]
struct PreviewBinding {
    device_path: Option<String>,
    receiver: Option<FrameReceiver>,
}

impl PreviewBinding {
    /// Rebind when the device that should be streaming changes
    ///
    /// Returns a status message when the new preview could not be opened.
    fn sync(&mut self, screen: &CaptureScreen, widget: &mut FrameWidget) -> Option<String> {
        let wanted = match screen.mode() {
            ScreenMode::LiveCapture => screen.active_device(),
            _ => None,
        };
        let wanted_path = wanted.as_ref().map(|device| device.path.clone());
        if wanted_path == self.device_path {
            return None;
        }

        let camera = screen.camera();
        if self.device_path.take().is_some() {
            camera.close_preview();
        }
        self.receiver = None;
        widget.clear();

        let device = wanted?;
        self.device_path = Some(device.path.clone());
        match camera.open_preview(&device) {
            Ok(receiver) => {
                info!(device = %device.name, "Preview bound");
                self.receiver = Some(receiver);
                None
            }
            Err(e) => {
                error!(device = %device.name, error = %e, "Failed to open preview");
                Some(format!("Preview failed: {}", e))
            }
        }
    }

    /// Drain pending frames, keeping only the newest
    fn latest_frame(&mut self) -> Option<CameraFrame> {
        let receiver = self.receiver.as_mut()?;
        let mut latest = None;
        while let Ok(frame) = receiver.try_recv() {
            latest = Some(frame);
        }
        latest
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    runtime: &Runtime,
    mut screen: CaptureScreen,
    mirror_preview: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut runner = TaskRunner::new(runtime);
    let mut preview = PreviewBinding::default();
    let mut frame_widget = FrameWidget::new();
    let mut shown_photo: Option<String> = None;
    let mut show_help = false;
    let mut notice: Option<String> = None;

    runner.spawn(screen.update(Message::Mount));

    loop {
        // Apply finished collaborator work
        while let Some(message) = runner.try_next() {
            let task = screen.update(message);
            runner.spawn(task);
        }

        if let Some(message) = preview.sync(&screen, &mut frame_widget) {
            notice = Some(message);
        }
        if let Some(frame) = preview.latest_frame() {
            frame_widget.update_frame(frame);
        }
        show_captured_photo(&screen, &mut shown_photo, &mut frame_widget);

        frame_widget.mirrored = mirror_preview
            && screen.mode() == ScreenMode::LiveCapture
            && screen.facing() == LensFacing::Front;
        frame_widget.placeholder = placeholder_text(&screen);

        let status_message = if show_help {
            help_message()
        } else {
            status_message(&screen)
        };
        let error_message = screen
            .last_error()
            .map(|e| format!("{} | r retry | x dismiss", e))
            .or_else(|| notice.clone());

        terminal.draw(|f| {
            let area = f.area();
            let bar_rows = if error_message.is_some() { 2 } else { 1 };

            let camera_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(bar_rows),
            };
            f.render_widget(&frame_widget, camera_area);

            let mut row = area.height.saturating_sub(bar_rows);
            if let Some(message) = &error_message {
                f.render_widget(
                    StatusBar {
                        message,
                        background: Color::Red,
                    },
                    Rect {
                        x: area.x,
                        y: row,
                        width: area.width,
                        height: 1,
                    },
                );
                row += 1;
            }
            f.render_widget(
                StatusBar {
                    message: &status_message,
                    background: Color::DarkGray,
                },
                Rect {
                    x: area.x,
                    y: row,
                    width: area.width,
                    height: 1,
                },
            );
        })?;

        // Handle input with timeout for frame updates
        if event::poll(timing::TERMINAL_POLL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match key_action(&key) {
                Some(KeyAction::Quit) => break,
                Some(KeyAction::ToggleHelp) => show_help = !show_help,
                Some(KeyAction::Send(message)) => {
                    show_help = false;
                    notice = None;
                    let task = screen.update(message);
                    runner.spawn(task);
                }
                None => {}
            }
        }
    }

    screen.camera().close_preview();
    Ok(())
}

/// Load the photo under review into the widget once per capture
fn show_captured_photo(
    screen: &CaptureScreen,
    shown: &mut Option<String>,
    widget: &mut FrameWidget,
) {
    let uri = screen.session().map(|session| session.uri.clone());
    if uri == *shown {
        return;
    }
    *shown = uri;

    let Some(uri) = shown.as_deref() else {
        return;
    };
    let frame = path_from_uri(uri)
        .map_err(|e| e.to_string())
        .and_then(|path| load_image_as_frame(&path).map_err(|e| e.to_string()));
    match frame {
        Ok(frame) => widget.update_frame(frame),
        Err(e) => {
            warn!(uri, error = %e, "Cannot display captured photo");
            widget.clear();
        }
    }
}

fn placeholder_text(screen: &CaptureScreen) -> String {
    match (screen.mode(), screen.pending()) {
        (ScreenMode::Unauthorized, Some(PendingAction::Mounting)) => {
            "Requesting camera access...".to_string()
        }
        (ScreenMode::Unauthorized, _) => {
            "Camera access denied. Press 'r' to ask again.".to_string()
        }
        (ScreenMode::NoDevice, Some(PendingAction::Refreshing)) => {
            "Looking for cameras...".to_string()
        }
        (ScreenMode::NoDevice, _) => format!(
            "No {} camera found. Press 'r' to look again or 'f' to flip.",
            screen.facing()
        ),
        (ScreenMode::LiveCapture, _) => "Waiting for camera...".to_string(),
        (ScreenMode::Preview, _) => "Loading photo...".to_string(),
    }
}

fn status_message(screen: &CaptureScreen) -> String {
    let mode = screen.mode();
    let mut msg = format!("[{}]", mode);

    if matches!(mode, ScreenMode::LiveCapture | ScreenMode::NoDevice) {
        msg.push_str(&format!(" {}", screen.facing()));
        if let Some(device) = screen.active_device() {
            msg.push_str(&format!(": {}", device.name));
        }
    }
    if let Some(session) = screen.session()
        && let (Some(width), Some(height)) = (session.width, session.height)
    {
        msg.push_str(&format!(" {}x{}", width, height));
    }
    if let Some(pending) = screen.pending() {
        msg.push_str(&format!(" ({}...)", pending.label()));
    }
    if mode == ScreenMode::LiveCapture
        && let Some(name) = screen.last_saved().and_then(|path| path.file_name())
    {
        msg.push_str(&format!(" | saved {}", name.to_string_lossy()));
    }

    let hints = match mode {
        ScreenMode::Unauthorized => "'r' retry",
        ScreenMode::NoDevice => "'f' flip | 'r' retry",
        ScreenMode::LiveCapture => "space capture | 'f' flip",
        ScreenMode::Preview => "'s' save | 'd' discard",
    };
    msg.push_str(&format!(" | {} | 'h' help | 'q' quit", hints));
    msg
}

fn help_message() -> String {
    "space/p: Capture | f: Flip | s: Save | d: Discard | r: Retry | x: Dismiss | q/Ctrl+C: Quit"
        .to_string()
}

/// Widget that renders a camera frame using half-block characters
struct FrameWidget {
    frame: Option<CameraFrame>,
    mirrored: bool,
    placeholder: String,
}

impl FrameWidget {
    fn new() -> Self {
        Self {
            frame: None,
            mirrored: false,
            placeholder: String::new(),
        }
    }

    fn update_frame(&mut self, frame: CameraFrame) {
        self.frame = Some(frame);
    }

    fn clear(&mut self) {
        self.frame = None;
    }
}

impl Widget for &FrameWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = self.frame.as_ref().filter(|f| f.width > 0 && f.height > 0) else {
            let msg = self.placeholder.as_str();
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, ratatui::style::Style::default());
            }
            return;
        };

        // Each terminal cell displays 2 vertical pixels using half-block characters
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            // Terminal is wider - fit to height
            let w = term_height * frame_aspect;
            (w as u16, area.height)
        } else {
            // Terminal is taller - fit to width
            let h = term_width / frame_aspect;
            (area.width, (h / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height * 2) as f64;

        for ty in 0..display_height {
            for tx in 0..display_width {
                let column = if self.mirrored {
                    display_width - 1 - tx
                } else {
                    tx
                };
                let src_x = (column as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                if let Some(cell) = buf.cell_mut((x_offset + tx, y_offset + ty)) {
                    cell.set_char('▀');
                    cell.set_fg(sample_pixel(frame, src_x, src_y_top));
                    cell.set_bg(sample_pixel(frame, src_x, src_y_bottom));
                }
            }
        }
    }
}

fn sample_pixel(frame: &CameraFrame, x: u32, y: u32) -> Color {
    let (r, g, b) = sample_pixel_rgb(frame, x, y);
    Color::Rgb(r, g, b)
}

fn sample_pixel_rgb(frame: &CameraFrame, x: u32, y: u32) -> (u8, u8, u8) {
    let x = x.min(frame.width - 1);
    let y = y.min(frame.height - 1);
    let idx = (y * frame.stride + x * 4) as usize;
    match frame.data.get(idx..idx + 3) {
        Some(px) => (px[0], px[1], px[2]),
        None => (0, 0, 0),
    }
}

/// Single-row status bar
struct StatusBar<'a> {
    message: &'a str,
    background: Color,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = ratatui::style::Style::default()
            .fg(Color::White)
            .bg(self.background);

        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(self.background);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(area.x, area.y, text, style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(
            key_action(&press(KeyCode::Char(' '))),
            Some(KeyAction::Send(Message::Capture))
        );
        assert_eq!(
            key_action(&press(KeyCode::Backspace)),
            Some(KeyAction::Send(Message::Discard))
        );
        assert_eq!(key_action(&press(KeyCode::Char('q'))), Some(KeyAction::Quit));
        assert_eq!(
            key_action(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(KeyAction::Quit)
        );
        assert_eq!(key_action(&press(KeyCode::Char('z'))), None);
    }

    #[test]
    fn test_sample_rgba_pixel() {
        let frame = CameraFrame::from_rgba(2, 1, vec![1, 2, 3, 255, 10, 20, 30, 255]);
        assert_eq!(sample_pixel_rgb(&frame, 1, 0), (10, 20, 30));
        // Out of range coordinates clamp to the edge
        assert_eq!(sample_pixel_rgb(&frame, 9, 9), (10, 20, 30));
    }

    #[test]
    fn test_mirrored_render_flips_columns() {
        let frame = CameraFrame::from_rgba(2, 2, vec![
            255, 0, 0, 255, 0, 0, 255, 255, //
            255, 0, 0, 255, 0, 0, 255, 255,
        ]);
        let mut widget = FrameWidget::new();
        widget.update_frame(frame);
        widget.mirrored = true;

        let area = Rect::new(0, 0, 2, 1);
        let mut buf = Buffer::empty(area);
        (&widget).render(area, &mut buf);

        assert_eq!(buf[(0, 0)].fg, Color::Rgb(0, 0, 255));
        assert_eq!(buf[(1, 0)].fg, Color::Rgb(255, 0, 0));
    }

    #[test]
    fn test_status_bar_truncates() {
        let area = Rect::new(0, 0, 4, 1);
        let mut buf = Buffer::empty(area);
        StatusBar {
            message: "abcdefgh",
            background: Color::DarkGray,
        }
        .render(area, &mut buf);
        assert_eq!(buf[(3, 0)].symbol(), "d");
    }
}
