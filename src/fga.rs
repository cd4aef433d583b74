use crate::purity_correction::round_to_decimals;
use crate::segment::Segment;

/// Total bases covered by the segments, segments without a size count as 0
///
/// Summed as u128 so that any number of valid segment sizes can be added without overflow.
///
pub fn get_altered_bases(segments: &[Segment]) -> u128 {
    segments
        .iter()
        .filter_map(|x| x.size)
        .map(u128::from)
        .sum()
}

/// Fraction of the genome covered by the given segments, rounded to 4 decimal places
///
/// The result is not clamped to 1, so overlapping input segments can push it higher.
///
/// # Arguments
/// * `genome_size` - Reference genome size used as the denominator, must be greater than 0
///
pub fn calculate_fga(segments: &[Segment], genome_size: u64) -> f64 {
    assert!(genome_size > 0);
    let altered_bases = get_altered_bases(segments);
    round_to_decimals(altered_bases as f64 / genome_size as f64, 4)
}
