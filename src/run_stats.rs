//! Track stats for the whole fga run
//!

use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, try_with};

use crate::filenames::get_run_stats_filename;
use crate::platform::Platform;
use crate::summary::{CohortFgaResult, FailedSample};

#[derive(Deserialize, Serialize)]
pub struct ComputeRunStats {
    pub platform: Platform,

    /// Number of CNV call files found in the data directory
    pub cnv_file_count: usize,

    /// Number of samples written to the FGA summary
    pub summarized_sample_count: usize,

    /// Samples reported with FGA 0 because no segments passed the filters
    pub empty_result_samples: Vec<String>,

    pub failed_samples: Vec<FailedSample>,

    /// Sum of per-sample processing time over all worker threads
    pub total_sample_processing_time_secs: f64,
}

impl ComputeRunStats {
    pub fn new(platform: Platform, cnv_file_count: usize, cohort_result: &CohortFgaResult) -> Self {
        Self {
            platform,
            cnv_file_count,
            summarized_sample_count: cohort_result.records.len(),
            empty_result_samples: cohort_result.empty_result_samples.clone(),
            failed_samples: cohort_result.failed_samples.clone(),
            total_sample_processing_time_secs: cohort_result.total_processing_time_secs,
        }
    }
}

/// Write run_stats structure out in json format
pub fn write_compute_run_stats(output_dir: &Utf8Path, run_stats: &ComputeRunStats) -> SimpleResult<()> {
    let filename = output_dir.join(get_run_stats_filename(run_stats.platform));

    info!("Writing run statistics to file: '{filename}'");

    let f = try_with!(
        File::create(&filename),
        "Unable to create run statistics json file: '{filename}'"
    );

    try_with!(
        serde_json::to_writer_pretty(&f, &run_stats),
        "Unable to write run statistics json file: '{filename}'"
    );
    Ok(())
}
