//! Names of all files written to the output directory
//!
//! Files written by the compute command include the platform name, so that the runs for each
//! platform can share one output directory.
//!

use const_format::concatcp;

use crate::globals::PROGRAM_NAME;
use crate::platform::Platform;

pub const COMPARISON_STATS_FILENAME: &str = concatcp!(PROGRAM_NAME, ".comparison.json");
pub const COMPARISON_TABLE_FILENAME: &str = concatcp!(PROGRAM_NAME, ".comparison.csv");
pub const LOG_FILENAME: &str = concatcp!(PROGRAM_NAME, ".log");

/// Default purity metadata filename, expected in the parent of the platform data directory
pub const PURITY_FILENAME: &str = "purity.csv";

pub fn get_run_stats_filename(platform: Platform) -> String {
    format!("{PROGRAM_NAME}.{}.run.stats.json", platform.file_label())
}

pub fn get_settings_filename(platform: Platform) -> String {
    format!("{PROGRAM_NAME}.{}.settings.json", platform.file_label())
}
