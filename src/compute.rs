use log::info;
use simple_error::{SimpleResult, bail};

use crate::cli::{ComputeSettings, SharedSettings, write_compute_settings};
use crate::platform::CnvPlatform;
use crate::purity::PurityTable;
use crate::run_stats::{ComputeRunStats, write_compute_run_stats};
use crate::summary::{compute_fga_summary, find_cnv_files, write_fga_summary};

pub fn run_compute(shared_settings: &SharedSettings, settings: &ComputeSettings) -> SimpleResult<()> {
    write_compute_settings(&settings.output_dir, settings)?;

    let platform_config = settings.get_platform_config();
    let run_config = settings.get_run_config();

    let purity_table = PurityTable::from_csv(settings.get_purity_filename())?;

    let data_dir = settings.get_data_dir();
    let cnv_filenames = find_cnv_files(data_dir, platform_config.cnv_file_extension())?;
    if cnv_filenames.is_empty() {
        bail!(
            "No '.{}' CNV files found in data directory: '{data_dir}'",
            platform_config.cnv_file_extension()
        );
    }
    let cnv_file_count = cnv_filenames.len();
    info!(
        "Found {cnv_file_count} {} CNV files in data directory: '{data_dir}'",
        platform_config.label()
    );

    let cohort_result = compute_fga_summary(
        &platform_config,
        &purity_table,
        &run_config,
        cnv_filenames,
        shared_settings.thread_count,
    );

    write_fga_summary(&settings.get_summary_filename(), &cohort_result.records)?;

    let run_stats = ComputeRunStats::new(settings.platform, cnv_file_count, &cohort_result);
    write_compute_run_stats(&settings.output_dir, &run_stats)?;

    if cohort_result.records.is_empty() {
        bail!("FGA could not be computed for any sample, see log for per-sample errors");
    }

    Ok(())
}
