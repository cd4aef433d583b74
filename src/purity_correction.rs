//! Convert observed copy number signal into a purity-adjusted tumor log2 ratio
//!

use crate::purity::Purity;
use crate::segment::Segment;

/// Tumor copy number estimates are floored at this value before taking the log
pub const MIN_TUMOR_COPY_NUMBER: f64 = 0.01;

/// Round to the given number of decimal places, with ties rounded to even
pub fn round_to_decimals(x: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (x * scale).round_ties_even() / scale
}

/// Estimate the copy number of the tumor cells from the copy number observed in the mixed
/// tumor/normal sample
///
/// The normal cell fraction `(1 - purity)` is assumed to be diploid.
///
pub fn get_tumor_copy_number(observed_copy_number: f64, purity: Purity) -> f64 {
    let purity = purity.get();
    let tumor_copy_number = (observed_copy_number - 2.0 * (1.0 - purity)) / purity;
    tumor_copy_number.max(MIN_TUMOR_COPY_NUMBER)
}

/// Get the purity-adjusted log2 ratio for an observed copy number, rounded to 2 decimals
///
pub fn get_purity_corrected_log2(observed_copy_number: f64, purity: Purity) -> f64 {
    let tumor_copy_number = get_tumor_copy_number(observed_copy_number, purity);
    round_to_decimals((tumor_copy_number / 2.0).log2(), 2)
}

/// Set the purity-corrected log2 ratio on every segment, replacing any previous value
///
pub fn correct_segments(segments: &mut [Segment], purity: Purity) {
    for segment in segments.iter_mut() {
        let observed_copy_number = segment.observed_signal.copy_number();
        segment.log2_corrected = Some(get_purity_corrected_log2(observed_copy_number, purity));
    }
}
