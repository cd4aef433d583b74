//! Methods specific to the fga logger
//!

use camino::Utf8Path;

use crate::cli;
use crate::filenames::LOG_FILENAME;
use crate::globals::PROGRAM_NAME;
use crate::os_utils::{check_writable_dir, create_dir_all};

/// If debug is true set the default logger to the more verbose debug level
///
fn setup_logger(output_dir: Option<&Utf8Path>, debug: bool) -> Result<(), fern::InitError> {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let logger = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                PROGRAM_NAME,
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    let logger = if let Some(output_dir) = output_dir {
        let log_filename = output_dir.join(LOG_FILENAME);
        logger.chain(fern::log_file(log_filename)?)
    } else {
        logger
    };

    logger.apply()?;
    Ok(())
}

fn exit_with_usage(msg: String) -> ! {
    eprintln!("Invalid command-line setting: {}", msg);
    std::process::exit(exitcode::USAGE);
}

/// Check and create output directory, then setup logger to write there
///
/// An existing output directory is reused, so that the summaries of several platforms can be
/// written to one results directory. Existing files are only overwritten if `clobber` is set.
///
/// #Arguments
/// * `debug` - If true use debug log level, and info level otherwise
///
pub fn setup_output_dir_and_logger(
    output_dir: &Utf8Path,
    output_filenames: &[String],
    clobber: bool,
    debug: bool,
) {
    // All error messaging in this method needs to account for no logger being setup yet.
    //
    // We try to match the pre-logging error pattern used in the command-line settings verification methods
    //
    if output_dir.exists() && !output_dir.is_dir() {
        exit_with_usage(format!(
            "Output directory path exists but is not a directory: '{output_dir}'"
        ));
    }

    if !clobber {
        for filename in output_filenames {
            if let Err(msg) = cli::check_novel_filename(&output_dir.join(filename), "Output file") {
                exit_with_usage(format!("{msg} (use --clobber to overwrite)"));
            }
        }
    }

    if let Err(msg) = create_dir_all(output_dir, "output") {
        eprintln!("{msg}");
        std::process::exit(exitcode::CANTCREAT);
    }
    if let Err(msg) = check_writable_dir(output_dir, "output") {
        eprintln!("{msg}");
        std::process::exit(exitcode::CANTCREAT);
    }

    if let Err(err) = setup_logger(Some(output_dir), debug) {
        eprintln!("Unable to setup logger: {err}");
        std::process::exit(exitcode::CANTCREAT);
    }
}
