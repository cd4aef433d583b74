//! Run the FGA pipeline over every sample in a cohort and assemble the summary
//!

use std::cmp::Ordering;
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail, try_with};
use thousands::Separable;
use unwrap::unwrap;

use crate::fga::{calculate_fga, get_altered_bases};
use crate::platform::CnvPlatform;
use crate::purity::PurityTable;
use crate::purity_correction::correct_segments;
use crate::sample_error::{SampleError, SampleResult};
use crate::segment_filter::{SegmentFilterOptions, filter_segments};

/// Constants shared by all samples for the duration of one run
#[derive(Clone, Debug)]
pub struct FgaRunConfig {
    /// FGA denominator, the reference genome size for the platform
    pub genome_size: u64,
    pub filter_options: SegmentFilterOptions,
}

/// One row of the FGA summary output
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FgaSummaryRecord {
    #[serde(rename = "SampleID")]
    pub sample_id: String,

    #[serde(rename = "FGA")]
    pub fga: f64,
}

/// FGA result with per-sample detail retained for logging and run statistics
pub struct SampleFgaResult {
    pub sample_id: String,
    pub fga: f64,
    pub altered_bases: u128,
    pub segment_count: usize,
    pub filtered_segment_count: usize,
}

/// A sample which was dropped from the summary due to an error
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FailedSample {
    pub cnv_filename: String,
    pub sample_id: Option<String>,
    pub error: String,
}

#[derive(Default)]
pub struct CohortFgaResult {
    /// FGA summary records in output order
    pub records: Vec<FgaSummaryRecord>,

    /// Samples where all segments were filtered out. These are also reported in `records`
    /// with an FGA of 0.
    pub empty_result_samples: Vec<String>,

    pub failed_samples: Vec<FailedSample>,

    pub total_processing_time_secs: f64,
}

/// Run the full FGA pipeline on one sample's CNV call file
///
/// The steps are normalize, purity correction, filtering, and FGA calculation.
///
pub fn compute_sample_fga<P: CnvPlatform>(
    platform: &P,
    purity_table: &PurityTable,
    config: &FgaRunConfig,
    sample_id: &str,
    cnv_filename: &Utf8Path,
) -> SampleResult<SampleFgaResult> {
    let purity = purity_table.get_purity(sample_id)?;
    let table = platform.read_cnv_table(cnv_filename)?;
    let mut segments = platform.normalize(&table)?;
    let segment_count = segments.len();

    correct_segments(&mut segments, purity);

    let segments = filter_segments(segments, &config.filter_options);
    let fga = calculate_fga(&segments, config.genome_size);
    let altered_bases = get_altered_bases(&segments);

    debug!(
        "Sample '{sample_id}' purity: {} segments: {segment_count} filtered segments: {} altered bases: {} FGA: {fga}",
        purity.get(),
        segments.len(),
        altered_bases.separate_with_commas()
    );

    Ok(SampleFgaResult {
        sample_id: sample_id.to_string(),
        fga,
        altered_bases,
        segment_count,
        filtered_segment_count: segments.len(),
    })
}

/// Find all CNV call files in the data directory with the given extension
///
/// Files are returned sorted by name so that downstream processing never depends on
/// file-system enumeration order.
///
pub fn find_cnv_files(data_dir: &Utf8Path, extension: &str) -> SimpleResult<Vec<Utf8PathBuf>> {
    let entries = try_with!(
        data_dir.read_dir_utf8(),
        "Unable to read data directory: '{data_dir}'"
    );

    let mut cnv_filenames = Vec::new();
    for entry in entries {
        let entry = try_with!(entry, "Unable to read entry in data directory: '{data_dir}'");
        let path = entry.path();
        if path.is_file() && path.extension() == Some(extension) {
            cnv_filenames.push(path.to_path_buf());
        }
    }
    cnv_filenames.sort();
    Ok(cnv_filenames)
}

/// Order sample IDs numerically where possible
///
/// Sample IDs which parse as unsigned integers come first in ascending numeric order, all
/// others follow in lexicographic order.
///
pub fn compare_sample_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Sort summary records by sample ID
///
/// Each record is paired with the CNV file it was computed from. Records sharing a sample ID
/// are ordered by this filename, so the output never depends on worker completion order.
///
pub fn sort_summary_records(records: &mut [(FgaSummaryRecord, Utf8PathBuf)]) {
    records.sort_by(|a, b| {
        compare_sample_ids(&a.0.sample_id, &b.0.sample_id).then_with(|| a.1.cmp(&b.1))
    });
}

type SampleWorkerReturnType = (
    Duration,
    Utf8PathBuf,
    Option<String>,
    SampleResult<SampleFgaResult>,
);

fn compute_sample_fga_wrapper<P: CnvPlatform>(
    platform: &P,
    purity_table: &PurityTable,
    config: &FgaRunConfig,
    cnv_filename: Utf8PathBuf,
) -> SampleWorkerReturnType {
    let sample_start_time = Instant::now();
    let (sample_id, result) = match platform.extract_sample_id(&cnv_filename) {
        Some(sample_id) => {
            let result =
                compute_sample_fga(platform, purity_table, config, &sample_id, &cnv_filename);
            (Some(sample_id), result)
        }
        None => (
            None,
            Err(SampleError::SampleIdExtraction(cnv_filename.to_string())),
        ),
    };
    (sample_start_time.elapsed(), cnv_filename, sample_id, result)
}

/// Compute FGA for every sample in the cohort
///
/// Samples are processed over `thread_count` threads. A failure in any one sample is recorded
/// and does not stop processing of the others. Output records are sorted by sample ID.
///
pub fn compute_fga_summary<P: CnvPlatform + Sync>(
    platform: &P,
    purity_table: &PurityTable,
    config: &FgaRunConfig,
    cnv_filenames: Vec<Utf8PathBuf>,
    thread_count: usize,
) -> CohortFgaResult {
    info!(
        "Computing FGA for {} {} samples",
        cnv_filenames.len(),
        platform.label()
    );

    let worker_pool = unwrap!(
        rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .build(),
        "Unable to create worker thread pool"
    );

    let (tx, rx) = channel();
    worker_pool.scope(move |scope| {
        for cnv_filename in cnv_filenames {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let result =
                    compute_sample_fga_wrapper(platform, purity_table, config, cnv_filename);
                tx.send(result).unwrap();
            });
        }
    });

    let mut cohort_result = CohortFgaResult::default();
    let mut sourced_records = Vec::new();
    for (sample_duration, cnv_filename, sample_id, result) in rx {
        cohort_result.total_processing_time_secs += sample_duration.as_secs_f64();
        match result {
            Ok(sample_result) => {
                if sample_result.filtered_segment_count == 0 {
                    warn!(
                        "No segments remain after filtering for sample '{}' ({} input segments), reporting FGA as 0",
                        sample_result.sample_id, sample_result.segment_count
                    );
                    cohort_result
                        .empty_result_samples
                        .push(sample_result.sample_id.clone());
                }
                sourced_records.push((
                    FgaSummaryRecord {
                        sample_id: sample_result.sample_id,
                        fga: sample_result.fga,
                    },
                    cnv_filename,
                ));
            }
            Err(err) => {
                warn!("Skipping CNV file '{cnv_filename}': {err}");
                cohort_result.failed_samples.push(FailedSample {
                    cnv_filename: cnv_filename.to_string(),
                    sample_id,
                    error: err.to_string(),
                });
            }
        }
    }

    // Restore a deterministic order after parallel processing
    sort_summary_records(&mut sourced_records);
    cohort_result
        .empty_result_samples
        .sort_by(|a, b| compare_sample_ids(a, b));
    cohort_result
        .failed_samples
        .sort_by(|a, b| a.cnv_filename.cmp(&b.cnv_filename));

    for window in sourced_records.windows(2) {
        if window[0].0.sample_id == window[1].0.sample_id {
            warn!(
                "Sample ID '{}' was extracted from more than one CNV file: '{}' and '{}'",
                window[0].0.sample_id,
                window[0].1,
                window[1].1
            );
        }
    }
    cohort_result.records = sourced_records.into_iter().map(|x| x.0).collect();

    info!(
        "Finished FGA computation. Summarized samples: {} Failed samples: {} Samples with no segments after filtering: {}",
        cohort_result.records.len(),
        cohort_result.failed_samples.len(),
        cohort_result.empty_result_samples.len()
    );

    cohort_result
}

/// Write FGA summary records to a comma-delimited file
///
pub fn write_fga_summary(filename: &Utf8Path, records: &[FgaSummaryRecord]) -> SimpleResult<()> {
    info!("Writing FGA summary to file: '{filename}'");

    let mut wtr = try_with!(
        WriterBuilder::new().delimiter(b',').from_path(filename),
        "Unable to create FGA summary file: '{filename}'"
    );
    if records.is_empty() {
        // Serialization only emits the header row together with the first record
        try_with!(
            wtr.write_record(["SampleID", "FGA"]),
            "Unable to write FGA summary file: '{filename}'"
        );
    }
    for record in records {
        try_with!(
            wtr.serialize(record),
            "Unable to write record to FGA summary file: '{filename}'"
        );
    }
    try_with!(wtr.flush(), "Unable to write FGA summary file: '{filename}'");
    Ok(())
}

/// Read FGA summary records from a comma-delimited file
///
pub fn read_fga_summary(filename: &Utf8Path) -> SimpleResult<Vec<FgaSummaryRecord>> {
    let mut rdr = try_with!(
        ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .delimiter(b',')
            .from_path(filename),
        "Unable to open FGA summary file: '{filename}'"
    );

    let mut records = Vec::new();
    for (record_index, result) in rdr.deserialize().enumerate() {
        let record: FgaSummaryRecord = try_with!(
            result,
            "Failed to parse record {} from FGA summary file: '{filename}'",
            record_index + 1
        );
        records.push(record);
    }

    if records.is_empty() {
        bail!("No records found in FGA summary file: '{filename}'");
    }

    Ok(records)
}
