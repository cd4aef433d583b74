//! Agreement statistics between the FGA summaries of two platforms
//!

use std::collections::HashMap;
use std::fs::File;

use camino::Utf8Path;
use csv::WriterBuilder;
use itertools::Itertools;
use log::{info, warn};
use serde::Serialize;
use simple_error::{SimpleResult, bail, try_with};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::cli::CompareSettings;
use crate::filenames::{COMPARISON_STATS_FILENAME, COMPARISON_TABLE_FILENAME};
use crate::summary::{FgaSummaryRecord, read_fga_summary};

/// Number of standard deviations spanned by the Bland-Altman limits of agreement
const LIMITS_OF_AGREEMENT_SD: f64 = 1.96;

/// FGA values of one sample found in both summaries
#[derive(Clone, Debug, PartialEq)]
pub struct MergedFgaRecord {
    pub sample_id: String,
    pub fga_a: f64,
    pub fga_b: f64,
}

impl MergedFgaRecord {
    pub fn mean(&self) -> f64 {
        (self.fga_a + self.fga_b) / 2.0
    }

    pub fn difference(&self) -> f64 {
        self.fga_a - self.fga_b
    }
}

#[derive(Debug, Serialize)]
pub struct CorrelationStats {
    pub pearson_r: f64,

    /// Two-sided p-value
    pub p_value: f64,
}

#[derive(Debug, Serialize)]
pub struct BlandAltmanStats {
    pub mean_difference: f64,
    pub sd_difference: f64,
    pub lower_limit_of_agreement: f64,
    pub upper_limit_of_agreement: f64,
}

#[derive(Serialize)]
struct ComparisonStats {
    label_a: String,
    label_b: String,
    sample_count: usize,
    samples_only_in_a: Vec<String>,
    samples_only_in_b: Vec<String>,
    correlation: Option<CorrelationStats>,
    bland_altman: Option<BlandAltmanStats>,
}

/// Join two FGA summaries on sample ID, retaining the sample order of the first summary
///
/// Returns a 3-tuple of the merged records, and the sample IDs found only in `a` or only in `b`
///
pub fn merge_fga_summaries(
    a: &[FgaSummaryRecord],
    b: &[FgaSummaryRecord],
) -> (Vec<MergedFgaRecord>, Vec<String>, Vec<String>) {
    let mut b_fga = HashMap::new();
    for record in b.iter() {
        if b_fga.contains_key(record.sample_id.as_str()) {
            warn!(
                "Duplicate sample ID '{}' in second summary, using the first entry",
                record.sample_id
            );
            continue;
        }
        b_fga.insert(record.sample_id.as_str(), record.fga);
    }

    let mut merged = Vec::new();
    let mut only_in_a = Vec::new();
    for record in a.iter() {
        match b_fga.get(record.sample_id.as_str()) {
            Some(&fga_b) => merged.push(MergedFgaRecord {
                sample_id: record.sample_id.clone(),
                fga_a: record.fga,
                fga_b,
            }),
            None => only_in_a.push(record.sample_id.clone()),
        }
    }

    let only_in_b = b
        .iter()
        .filter(|x| !a.iter().any(|y| y.sample_id == x.sample_id))
        .map(|x| x.sample_id.clone())
        .unique()
        .collect();

    (merged, only_in_a, only_in_b)
}

fn mean(x: &[f64]) -> f64 {
    x.iter().sum::<f64>() / x.len() as f64
}

/// Pearson correlation with a two-sided p-value from the t distribution with n-2 degrees of freedom
///
/// Returns None if there are fewer than 3 samples or either input has zero variance.
///
pub fn get_pearson_correlation(x: &[f64], y: &[f64]) -> Option<CorrelationStats> {
    assert_eq!(x.len(), y.len());
    let n = x.len();
    if n < 3 {
        return None;
    }

    let x_mean = mean(x);
    let y_mean = mean(y);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (xv, yv) in x.iter().zip(y.iter()) {
        let dx = xv - x_mean;
        let dy = yv - y_mean;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    let pearson_r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);

    let p_value = if pearson_r.abs() == 1.0 {
        0.0
    } else {
        let df = (n - 2) as f64;
        let t = pearson_r * (df / (1.0 - pearson_r * pearson_r)).sqrt();
        let dist = StudentsT::new(0.0, 1.0, df).ok()?;
        (2.0 * dist.sf(t.abs())).min(1.0)
    };

    Some(CorrelationStats { pearson_r, p_value })
}

/// Bland-Altman mean difference and limits of agreement
///
/// The difference standard deviation is the sample standard deviation (n-1 denominator).
/// Returns None if there are fewer than 2 samples.
///
pub fn get_bland_altman_stats(records: &[MergedFgaRecord]) -> Option<BlandAltmanStats> {
    let n = records.len();
    if n < 2 {
        return None;
    }

    let differences = records.iter().map(|x| x.difference()).collect::<Vec<_>>();
    let mean_difference = mean(&differences);
    let variance = differences
        .iter()
        .map(|x| (x - mean_difference).powi(2))
        .sum::<f64>()
        / (n - 1) as f64;
    let sd_difference = variance.sqrt();

    Some(BlandAltmanStats {
        mean_difference,
        sd_difference,
        lower_limit_of_agreement: mean_difference - LIMITS_OF_AGREEMENT_SD * sd_difference,
        upper_limit_of_agreement: mean_difference + LIMITS_OF_AGREEMENT_SD * sd_difference,
    })
}

fn write_comparison_table(
    filename: &Utf8Path,
    label_a: &str,
    label_b: &str,
    records: &[MergedFgaRecord],
) -> SimpleResult<()> {
    info!("Writing FGA comparison table to file: '{filename}'");

    let mut wtr = try_with!(
        WriterBuilder::new().delimiter(b',').from_path(filename),
        "Unable to create FGA comparison file: '{filename}'"
    );
    let header = [
        "SampleID".to_string(),
        format!("FGA_{label_a}"),
        format!("FGA_{label_b}"),
        "Mean".to_string(),
        "Difference".to_string(),
    ];
    try_with!(
        wtr.write_record(&header),
        "Unable to write FGA comparison file: '{filename}'"
    );
    for record in records {
        try_with!(
            wtr.write_record([
                record.sample_id.clone(),
                record.fga_a.to_string(),
                record.fga_b.to_string(),
                record.mean().to_string(),
                record.difference().to_string(),
            ]),
            "Unable to write FGA comparison file: '{filename}'"
        );
    }
    try_with!(wtr.flush(), "Unable to write FGA comparison file: '{filename}'");
    Ok(())
}

pub fn run_compare(settings: &CompareSettings) -> SimpleResult<()> {
    let summary_a = read_fga_summary(&settings.summary_a)?;
    let summary_b = read_fga_summary(&settings.summary_b)?;

    let (merged, samples_only_in_a, samples_only_in_b) =
        merge_fga_summaries(&summary_a, &summary_b);
    if merged.is_empty() {
        bail!(
            "No shared sample IDs between FGA summaries '{}' and '{}'",
            settings.summary_a,
            settings.summary_b
        );
    }
    if !samples_only_in_a.is_empty() {
        info!(
            "Samples only in {} summary: {}",
            settings.label_a,
            samples_only_in_a.iter().join(", ")
        );
    }
    if !samples_only_in_b.is_empty() {
        info!(
            "Samples only in {} summary: {}",
            settings.label_b,
            samples_only_in_b.iter().join(", ")
        );
    }

    let fga_a = merged.iter().map(|x| x.fga_a).collect::<Vec<_>>();
    let fga_b = merged.iter().map(|x| x.fga_b).collect::<Vec<_>>();
    let correlation = get_pearson_correlation(&fga_a, &fga_b);
    let bland_altman = get_bland_altman_stats(&merged);

    info!("Compared FGA for {} shared samples", merged.len());
    match &correlation {
        Some(x) => info!(
            "Pearson correlation: r = {:.3}, p-value = {:.3e}",
            x.pearson_r, x.p_value
        ),
        None => warn!("Pearson correlation is undefined for these samples"),
    }
    match &bland_altman {
        Some(x) => info!(
            "Bland-Altman mean difference ({} minus {}): {:.3}, limits of agreement: [{:.3}, {:.3}]",
            settings.label_a,
            settings.label_b,
            x.mean_difference,
            x.lower_limit_of_agreement,
            x.upper_limit_of_agreement
        ),
        None => warn!("Bland-Altman limits of agreement are undefined for fewer than 2 samples"),
    }

    write_comparison_table(
        &settings.output_dir.join(COMPARISON_TABLE_FILENAME),
        &settings.label_a,
        &settings.label_b,
        &merged,
    )?;

    let stats = ComparisonStats {
        label_a: settings.label_a.clone(),
        label_b: settings.label_b.clone(),
        sample_count: merged.len(),
        samples_only_in_a,
        samples_only_in_b,
        correlation,
        bland_altman,
    };

    let filename = settings.output_dir.join(COMPARISON_STATS_FILENAME);
    info!("Writing FGA comparison statistics to file: '{filename}'");
    let f = try_with!(
        File::create(&filename),
        "Unable to create FGA comparison json file: '{filename}'"
    );
    try_with!(
        serde_json::to_writer_pretty(&f, &stats),
        "Unable to write FGA comparison json file: '{filename}'"
    );

    Ok(())
}
