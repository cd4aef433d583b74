use camino::Utf8PathBuf;
use clap::Args;
use simple_error::{SimpleResult, bail};

use super::utils::check_required_filename;

#[derive(Args)]
pub struct CompareSettings {
    /// First FGA summary file, as written by the compute command
    #[arg(long, value_name = "FILE")]
    pub summary_a: Utf8PathBuf,

    /// Second FGA summary file, as written by the compute command
    #[arg(long, value_name = "FILE")]
    pub summary_b: Utf8PathBuf,

    /// Label for the first summary, used in output column names
    #[arg(long, default_value = "OGM")]
    pub label_a: String,

    /// Label for the second summary, used in output column names
    #[arg(long, default_value = "WGS")]
    pub label_b: String,

    /// Results directory for the comparison table, statistics and log. May already exist.
    #[arg(long, value_name = "DIR", default_value = "results")]
    pub output_dir: Utf8PathBuf,
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_compare_settings(
    mut settings: CompareSettings,
) -> SimpleResult<CompareSettings> {
    check_required_filename(&settings.summary_a, "first FGA summary")?;
    check_required_filename(&settings.summary_b, "second FGA summary")?;

    settings.label_a = settings.label_a.trim().to_string();
    settings.label_b = settings.label_b.trim().to_string();
    if settings.label_a.is_empty() || settings.label_b.is_empty() {
        bail!("Summary labels must not be empty");
    }
    if settings.label_a == settings.label_b {
        bail!(
            "Summary labels must be different, both are '{}'",
            settings.label_a
        );
    }

    Ok(settings)
}
