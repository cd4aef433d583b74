//! Utilities pertaining to filesystem and other os-level settings
//!

use std::fs::OpenOptions;

use camino::Utf8Path;
use simple_error::{SimpleResult, bail, try_with};

/// Create a directory path if it does not exist already
///
/// If the directory already exists no operations are performed
///
/// * `label` - used to describe the directory in an error message
///
pub fn create_dir_all(dir: &Utf8Path, label: &str) -> SimpleResult<()> {
    if !dir.is_dir() {
        try_with!(
            std::fs::create_dir_all(dir),
            "Can't create new {label} directory at '{dir}'"
        );
    }
    Ok(())
}

/// Check that files can be created in the directory
///
/// This writes and removes a small probe file, so that an unwritable results directory is
/// reported before any samples are processed.
///
pub fn check_writable_dir(dir: &Utf8Path, label: &str) -> SimpleResult<()> {
    if !dir.is_dir() {
        bail!("Can't find {label} directory: '{dir}'");
    }
    let probe_filename = dir.join(format!(".{}.write_check", env!("CARGO_PKG_NAME")));
    try_with!(
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&probe_filename),
        "Can't write to {label} directory: '{dir}'"
    );
    try_with!(
        std::fs::remove_file(&probe_filename),
        "Can't remove temporary file from {label} directory: '{probe_filename}'"
    );
    Ok(())
}

/// Attempt to increase open file limit to the system's hard limit on *nix-like systems
///
/// This is an optional increase so continue through all failure cases without error.
///
pub fn attempt_max_open_file_limit() {
    use rlimit::Resource;

    let (soft, hard) = match Resource::NOFILE.get() {
        Ok(x) => x,
        Err(_) => return,
    };

    if soft < hard {
        rlimit::setrlimit(Resource::NOFILE, hard, hard).unwrap_or_default();
    }
}
