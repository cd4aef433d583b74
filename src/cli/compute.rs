use std::fs::File;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use regex::Regex;
use serde::Serialize;
use simple_error::{SimpleResult, bail, map_err_with, try_with};

use super::utils::{check_plain_filename, check_required_dirname, check_required_filename};
use crate::filenames::{PURITY_FILENAME, get_settings_filename};
use crate::platform::{Platform, PlatformConfig, SampleIdRule};
use crate::segment_filter::SegmentFilterOptions;
use crate::summary::FgaRunConfig;

#[derive(Args, Serialize)]
pub struct ComputeSettings {
    /// Platform which produced the CNV call files
    #[arg(long, value_enum)]
    pub platform: Platform,

    /// Directory containing one CNV call file per sample. Defaults to 'data/OGM' or 'data/WGS'
    /// depending on the platform.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<Utf8PathBuf>,

    /// Results directory for the FGA summary, run statistics and log. May already exist.
    #[arg(long, value_name = "DIR", default_value = "results")]
    pub output_dir: Utf8PathBuf,

    /// Purity metadata in csv format, with columns 'SampleID' and 'Tumor fraction'. Defaults to
    /// 'purity.csv' in the parent of the data directory.
    #[arg(long = "purity", value_name = "FILE")]
    pub purity_filename: Option<Utf8PathBuf>,

    /// FGA summary output filename, written to the output directory. Defaults to
    /// 'ogm_fga.csv' or 'wgs_fga.csv' depending on the platform.
    #[arg(long = "summary", value_name = "FILENAME")]
    pub summary_filename: Option<String>,

    /// Reference genome size used as the FGA denominator. Defaults to the autosomal hg38 size
    /// for OGM and the autosomal hg19 size for WGS.
    #[arg(long)]
    pub genome_size: Option<u64>,

    /// Include segments on all chromosomes, instead of only chromosomes 1-22
    #[arg(long)]
    pub keep_all_chromosomes: bool,

    /// Minimum segment size in bases. No size filter is applied if this is not specified.
    #[arg(long)]
    pub min_size: Option<u64>,

    /// Minimum absolute purity-corrected log2 ratio. No log2 filter is applied if this is not
    /// specified.
    #[arg(long)]
    pub log2_threshold: Option<f64>,

    /// Regex applied to each CNV filename, where the first capture group is the sample ID.
    /// This replaces the default sample ID extraction rule of the platform.
    #[arg(long, value_name = "REGEX")]
    pub sample_id_regex: Option<String>,

    /// Extension of CNV call files to select from the data directory. Defaults to 'txt' for OGM
    /// and 'cns' for WGS.
    #[arg(long, value_name = "EXT")]
    pub cnv_file_extension: Option<String>,
}

impl ComputeSettings {
    /// Platform input conventions with all command-line overrides applied
    ///
    /// Settings are assumed to have been validated already.
    ///
    pub fn get_platform_config(&self) -> PlatformConfig {
        let mut config = self.platform.config();
        if let Some(sample_id_regex) = &self.sample_id_regex {
            config.sample_id_rule = SampleIdRule::Regex(Regex::new(sample_id_regex).unwrap());
        }
        if let Some(cnv_file_extension) = &self.cnv_file_extension {
            config.cnv_file_extension = cnv_file_extension.clone();
        }
        config
    }

    pub fn get_run_config(&self) -> FgaRunConfig {
        FgaRunConfig {
            genome_size: self.genome_size.unwrap_or(self.platform.default_genome_size()),
            filter_options: SegmentFilterOptions {
                keep_autosomes_only: !self.keep_all_chromosomes,
                min_size: self.min_size,
                log2_threshold: self.log2_threshold,
            },
        }
    }

    pub fn get_data_dir(&self) -> &Utf8Path {
        self.data_dir.as_ref().unwrap()
    }

    pub fn get_purity_filename(&self) -> &Utf8Path {
        self.purity_filename.as_ref().unwrap()
    }

    pub fn get_summary_filename(&self) -> Utf8PathBuf {
        self.output_dir.join(self.summary_filename.as_ref().unwrap())
    }
}

fn get_default_data_dir(platform: Platform) -> Utf8PathBuf {
    Utf8PathBuf::from("data").join(platform.to_string())
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Platform defaults are filled in for all unspecified optional values.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_compute_settings(
    mut settings: ComputeSettings,
) -> SimpleResult<ComputeSettings> {
    let data_dir = settings
        .data_dir
        .take()
        .unwrap_or_else(|| get_default_data_dir(settings.platform));
    check_required_dirname(&data_dir, "data")?;
    let data_dir = try_with!(
        data_dir.canonicalize_utf8(),
        "Can't resolve data directory: '{data_dir}'"
    );

    let purity_filename = match settings.purity_filename.take() {
        Some(x) => x,
        None => match data_dir.parent() {
            Some(x) => x.join(PURITY_FILENAME),
            None => {
                bail!("Can't find default purity file location for data directory '{data_dir}', use --purity");
            }
        },
    };
    check_required_filename(&purity_filename, "purity")?;
    settings.purity_filename = Some(try_with!(
        purity_filename.canonicalize_utf8(),
        "Can't resolve purity file path: '{purity_filename}'"
    ));
    settings.data_dir = Some(data_dir);

    let summary_filename = settings
        .summary_filename
        .take()
        .unwrap_or_else(|| settings.platform.default_summary_filename());
    check_plain_filename(&summary_filename, "Summary filename")?;
    settings.summary_filename = Some(summary_filename);

    let genome_size = settings
        .genome_size
        .unwrap_or(settings.platform.default_genome_size());
    if genome_size == 0 {
        bail!("--genome-size must be greater than 0");
    }
    settings.genome_size = Some(genome_size);

    if let Some(log2_threshold) = settings.log2_threshold {
        if !(log2_threshold.is_finite() && log2_threshold >= 0.0) {
            bail!("--log2-threshold must be a non-negative number, found '{log2_threshold}'");
        }
    }

    if let Some(sample_id_regex) = &settings.sample_id_regex {
        let re = map_err_with!(
            Regex::new(sample_id_regex),
            "Invalid regex for --sample-id-regex"
        )?;
        if re.captures_len() < 2 {
            bail!("--sample-id-regex must contain a capture group for the sample ID");
        }
    }

    if let Some(cnv_file_extension) = &settings.cnv_file_extension {
        let cnv_file_extension = cnv_file_extension.trim_start_matches('.');
        if cnv_file_extension.is_empty() {
            bail!("--cnv-file-extension must not be empty");
        }
        settings.cnv_file_extension = Some(cnv_file_extension.to_string());
    }

    Ok(settings)
}

/// Write compute settings out in json format
pub fn write_compute_settings(output_dir: &Utf8Path, settings: &ComputeSettings) -> SimpleResult<()> {
    let filename = output_dir.join(get_settings_filename(settings.platform));
    let f = try_with!(
        File::create(&filename),
        "Unable to create compute settings json file: '{filename}'"
    );
    try_with!(
        serde_json::to_writer_pretty(&f, &settings),
        "Unable to write compute settings json file: '{filename}'"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_settings(platform: Platform, data_dir: &Utf8Path) -> ComputeSettings {
        ComputeSettings {
            platform,
            data_dir: Some(data_dir.to_path_buf()),
            output_dir: Utf8PathBuf::from("results"),
            purity_filename: None,
            summary_filename: None,
            genome_size: None,
            keep_all_chromosomes: false,
            min_size: Some(50_000),
            log2_threshold: Some(0.2),
            sample_id_regex: None,
            cnv_file_extension: None,
        }
    }

    fn get_test_data_dir() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let data_dir = base.join("WGS");
        std::fs::create_dir(&data_dir).unwrap();
        std::fs::write(base.join(PURITY_FILENAME), "SampleID,Tumor fraction\n1,0.5\n").unwrap();
        (dir, data_dir)
    }

    #[test]
    fn test_platform_defaults() {
        let (_dir, data_dir) = get_test_data_dir();
        let settings =
            validate_and_fix_compute_settings(get_settings(Platform::Wgs, &data_dir)).unwrap();

        assert_eq!(
            settings.get_purity_filename().file_name(),
            Some(PURITY_FILENAME)
        );
        assert_eq!(settings.summary_filename.as_deref(), Some("wgs_fga.csv"));
        assert_eq!(
            settings.genome_size,
            Some(crate::platform::HG19_AUTOSOMAL_GENOME_SIZE)
        );

        let run_config = settings.get_run_config();
        assert!(run_config.filter_options.keep_autosomes_only);
        assert_eq!(run_config.filter_options.min_size, Some(50_000));
        assert_eq!(run_config.filter_options.log2_threshold, Some(0.2));
    }

    #[test]
    fn test_overrides() {
        let (_dir, data_dir) = get_test_data_dir();
        let mut settings = get_settings(Platform::Wgs, &data_dir);
        settings.genome_size = Some(1000);
        settings.sample_id_regex = Some(r"^(\d+)_".to_string());
        settings.cnv_file_extension = Some(".seg".to_string());
        let settings = validate_and_fix_compute_settings(settings).unwrap();

        let config = settings.get_platform_config();
        assert_eq!(config.cnv_file_extension, "seg");
        assert!(matches!(config.sample_id_rule, SampleIdRule::Regex(_)));
        assert_eq!(settings.get_run_config().genome_size, 1000);
    }

    #[test]
    fn test_invalid_settings() {
        let (_dir, data_dir) = get_test_data_dir();

        let mut settings = get_settings(Platform::Wgs, &data_dir);
        settings.genome_size = Some(0);
        assert!(validate_and_fix_compute_settings(settings).is_err());

        let mut settings = get_settings(Platform::Wgs, &data_dir);
        settings.log2_threshold = Some(-0.1);
        assert!(validate_and_fix_compute_settings(settings).is_err());

        let mut settings = get_settings(Platform::Wgs, &data_dir);
        settings.sample_id_regex = Some(r"^\d+_".to_string());
        assert!(validate_and_fix_compute_settings(settings).is_err());

        let mut settings = get_settings(Platform::Wgs, &data_dir);
        settings.summary_filename = Some("sub/wgs.csv".to_string());
        assert!(validate_and_fix_compute_settings(settings).is_err());

        let settings = get_settings(Platform::Wgs, &data_dir.join("missing"));
        assert!(validate_and_fix_compute_settings(settings).is_err());

        let mut settings = get_settings(Platform::Wgs, &data_dir);
        settings.purity_filename = Some(data_dir.join("no_purity.csv"));
        assert!(validate_and_fix_compute_settings(settings).is_err());
    }
}
