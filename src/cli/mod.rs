mod compare;
mod compute;
mod shared;
mod utils;

use camino::Utf8Path;
use clap::{Parser, Subcommand};
use simple_error::{SimpleResult, bail};

use self::compare::validate_and_fix_compare_settings;
pub use self::compare::CompareSettings;
use self::compute::validate_and_fix_compute_settings;
pub use self::compute::{ComputeSettings, write_compute_settings};
use self::shared::validate_and_fix_shared_settings;
pub use self::shared::SharedSettings;
use crate::filenames::{
    COMPARISON_STATS_FILENAME, COMPARISON_TABLE_FILENAME, get_run_stats_filename,
    get_settings_filename,
};

#[derive(Subcommand)]
pub enum Commands {
    /// Compute purity-corrected FGA for every sample CNV file of one platform
    Compute(ComputeSettings),

    /// Compare the FGA summaries of two platforms
    Compare(CompareSettings),
}

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
)]
#[clap(propagate_version = true, rename_all = "kebab_case")]
pub struct Settings {
    #[command(flatten)]
    pub shared: SharedSettings,

    #[command(subcommand)]
    pub command: Commands,
}

impl Settings {
    pub fn get_output_dir(&self) -> &Utf8Path {
        match &self.command {
            Commands::Compute(x) => &x.output_dir,
            Commands::Compare(x) => &x.output_dir,
        }
    }

    /// All files the command will write to the output directory, excluding the log file
    pub fn get_output_filenames(&self) -> Vec<String> {
        match &self.command {
            Commands::Compute(x) => vec![
                x.summary_filename.clone().unwrap_or_default(),
                get_run_stats_filename(x.platform),
                get_settings_filename(x.platform),
            ],
            Commands::Compare(_) => vec![
                COMPARISON_STATS_FILENAME.to_string(),
                COMPARISON_TABLE_FILENAME.to_string(),
            ],
        }
    }
}

/// Checks if a file does not exist
///
pub fn check_novel_filename(filename: &Utf8Path, label: &str) -> SimpleResult<()> {
    if filename.exists() {
        bail!("{} already exists: \"{}\"", label, filename);
    }
    Ok(())
}

/// Validate settings and update parameters that can't be processed by clap
///
pub fn validate_and_fix_settings_impl(mut settings: Settings) -> SimpleResult<Settings> {
    settings.shared = validate_and_fix_shared_settings(settings.shared)?;

    settings.command = match settings.command {
        Commands::Compute(x) => {
            let x = validate_and_fix_compute_settings(x)?;
            Commands::Compute(x)
        }
        Commands::Compare(x) => {
            let x = validate_and_fix_compare_settings(x)?;
            Commands::Compare(x)
        }
    };

    Ok(settings)
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_settings(settings: Settings) -> Settings {
    match validate_and_fix_settings_impl(settings) {
        Ok(x) => x,
        Err(msg) => {
            eprintln!("Invalid command-line setting: {}", msg);
            std::process::exit(exitcode::USAGE);
        }
    }
}

pub fn parse_settings() -> Settings {
    Settings::parse()
}
