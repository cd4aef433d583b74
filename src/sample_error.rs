//! Errors which abort the FGA computation for a single sample
//!
//! None of these errors stop the cohort run. They are caught where the cohort summary is
//! assembled, and the failed sample is reported in the run statistics instead of the summary.
//!

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("Sample ID '{0}' not found in purity metadata")]
    SampleNotFound(String),

    #[error("Invalid purity value '{value}' for sample '{sample_id}', expected a number in (0,1]")]
    InvalidPurity { sample_id: String, value: String },

    #[error("Malformed CNV record in '{filename}' line {line}: {msg}")]
    MalformedRecord {
        filename: String,
        line: u64,
        msg: String,
    },

    #[error("Can't read CNV file '{filename}': {msg}")]
    UnreadableInput { filename: String, msg: String },

    #[error("Can't extract sample ID from CNV filename '{0}'")]
    SampleIdExtraction(String),
}

pub type SampleResult<T> = Result<T, SampleError>;
