use camino::Utf8Path;
use simple_error::{SimpleResult, bail};

/// Check a required input filename
///
/// Assumes no logger has been configured yet
///
pub fn check_required_filename(filename: &Utf8Path, label: &str) -> SimpleResult<()> {
    if filename.as_str().is_empty() {
        bail!("Must specify {label} file");
    }
    if !filename.exists() {
        bail!("Can't find specified {label} file: '{filename}'");
    }
    if !filename.is_file() {
        bail!("Specified {label} file path does not appear to be a file: '{filename}'");
    }
    Ok(())
}

/// Check a required input directory
///
/// Assumes no logger has been configured yet
///
pub fn check_required_dirname(dirname: &Utf8Path, label: &str) -> SimpleResult<()> {
    if !dirname.exists() {
        bail!("Can't find specified {label} directory: '{dirname}'");
    }
    if !dirname.is_dir() {
        bail!("Specified {label} directory path does not appear to be a directory: '{dirname}'");
    }
    Ok(())
}

/// Check that an output filename is a plain filename without any directory component
///
pub fn check_plain_filename(filename: &str, label: &str) -> SimpleResult<()> {
    let path = Utf8Path::new(filename);
    if filename.is_empty() || path.file_name() != Some(filename) {
        bail!("{label} must be a filename without a directory component: '{filename}'");
    }
    Ok(())
}
