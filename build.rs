// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=SNAPCAM_VERSION");

    // Packagers building from a tarball set the version explicitly
    let version = std::env::var("SNAPCAM_VERSION").unwrap_or_else(|_| git_version());
    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// Version from `git describe`, e.g. "0.1.0" or "0.1.0+5.abcdef1"
fn git_version() -> String {
    let Some(described) = git(&["describe", "--tags", "--always", "--match", "v*"]) else {
        return env!("CARGO_PKG_VERSION").to_string();
    };
    let described = described.strip_prefix('v').unwrap_or(&described);

    // "<tag>-<commits>-g<hash>" when HEAD is past the tag
    let parts: Vec<&str> = described.rsplitn(3, '-').collect();
    match parts.as_slice() {
        [hash, commits, tag] => {
            let hash = hash.strip_prefix('g').unwrap_or(hash);
            format!("{}+{}.{}", tag, commits, hash)
        }
        _ if described.contains('.') => described.to_string(),
        // No tag yet: describe printed a bare hash
        _ => format!("{}+{}", env!("CARGO_PKG_VERSION"), described),
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}
