use log::debug;
use serde::{Deserialize, Serialize};

use crate::segment::Segment;

/// Segment filters applied prior to the FGA calculation
///
/// Any filter set to None is skipped entirely.
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SegmentFilterOptions {
    /// Retain only segments on chromosomes 1-22
    pub keep_autosomes_only: bool,

    /// Retain only segments at least this many bases long
    pub min_size: Option<u64>,

    /// Retain only segments with an absolute purity-corrected log2 ratio at or above this value
    pub log2_threshold: Option<f64>,
}

impl Default for SegmentFilterOptions {
    fn default() -> Self {
        Self {
            keep_autosomes_only: true,
            min_size: None,
            log2_threshold: None,
        }
    }
}

/// Apply all enabled filters to a sample's segments
///
/// Filters are applied in the order autosome, size, log2 magnitude. Each filter further narrows
/// the segments retained by the previous one. An empty segment list is a valid result.
///
/// The log2 magnitude filter requires purity correction to have already been run on all
/// segments.
///
pub fn filter_segments(
    mut segments: Vec<Segment>,
    options: &SegmentFilterOptions,
) -> Vec<Segment> {
    if options.keep_autosomes_only {
        let before = segments.len();
        segments.retain(|x| x.autosome_number().is_some());
        debug!(
            "Autosome filter removed {} of {before} segments",
            before - segments.len()
        );
    }

    if let Some(min_size) = options.min_size {
        let before = segments.len();
        segments.retain(|x| x.size.is_some_and(|size| size >= min_size));
        debug!(
            "Size filter removed {} of {before} segments",
            before - segments.len()
        );
    }

    if let Some(log2_threshold) = options.log2_threshold {
        let before = segments.len();
        segments.retain(|x| {
            let log2_corrected = x
                .log2_corrected
                .unwrap_or_else(|| panic!("Log2 filter applied to uncorrected segment {x:?}"));
            log2_corrected.abs() >= log2_threshold
        });
        debug!(
            "Log2 magnitude filter removed {} of {before} segments",
            before - segments.len()
        );
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::segment::{ObservedSignal, test_segment};

    fn corrected_segment(chromosome: &str, size: u64, log2_corrected: f64) -> Segment {
        let mut segment = test_segment(
            chromosome,
            size,
            ObservedSignal::Log2Ratio(log2_corrected),
        );
        segment.log2_corrected = Some(log2_corrected);
        segment
    }

    fn get_test_segments() -> Vec<Segment> {
        vec![
            corrected_segment("1", 10_000, 0.5),
            corrected_segment("7", 100_000, 1.42),
            corrected_segment("X", 5_000_000, 2.0),
            corrected_segment("22", 60_000, -0.1),
            corrected_segment("MT", 16_000, -3.0),
            corrected_segment("12", 49_999, -0.25),
            corrected_segment("3", 50_000, 0.2),
        ]
    }

    #[test]
    fn test_default_options() {
        let options = SegmentFilterOptions::default();
        assert!(options.keep_autosomes_only);
        assert_eq!(options.min_size, None);
        assert_eq!(options.log2_threshold, None);

        let filtered = filter_segments(get_test_segments(), &options);
        assert_eq!(filtered.len(), 5);
        assert!(filtered.iter().all(|x| x.autosome_number().is_some()));
    }

    #[test]
    fn test_no_filters() {
        let options = SegmentFilterOptions {
            keep_autosomes_only: false,
            min_size: None,
            log2_threshold: None,
        };
        let filtered = filter_segments(get_test_segments(), &options);
        assert_eq!(filtered, get_test_segments());
    }

    #[test]
    fn test_all_filters() {
        let options = SegmentFilterOptions {
            keep_autosomes_only: true,
            min_size: Some(50_000),
            log2_threshold: Some(0.2),
        };
        let filtered = filter_segments(get_test_segments(), &options);
        let chroms = filtered
            .iter()
            .map(|x| x.chromosome.as_str())
            .collect::<Vec<_>>();
        assert_eq!(chroms, vec!["7", "3"]);
    }

    #[test]
    fn test_sex_chromosome_dropped() {
        let options = SegmentFilterOptions::default();
        let segments = vec![corrected_segment("X", 100_000_000, 5.0)];
        assert!(filter_segments(segments, &options).is_empty());
    }

    #[test]
    fn test_missing_size_fails_size_filter() {
        let mut segment = corrected_segment("5", 1000, 1.0);
        segment.size = None;
        let options = SegmentFilterOptions {
            keep_autosomes_only: true,
            min_size: Some(1),
            log2_threshold: None,
        };
        assert!(filter_segments(vec![segment], &options).is_empty());
    }

    #[test]
    fn test_filter_monotonicity() {
        let segments = get_test_segments();
        let total = segments.len();

        let mut counts = Vec::new();
        for keep_autosomes_only in [false, true] {
            for min_size in [None, Some(50_000)] {
                for log2_threshold in [None, Some(0.2)] {
                    let options = SegmentFilterOptions {
                        keep_autosomes_only,
                        min_size,
                        log2_threshold,
                    };
                    let count = filter_segments(segments.clone(), &options).len();
                    assert!(count <= total);
                    counts.push((options, count));
                }
            }
        }

        // Enabling an additional filter never increases the surviving count
        for (a_options, a_count) in counts.iter() {
            for (b_options, b_count) in counts.iter() {
                let b_superset = (b_options.keep_autosomes_only || !a_options.keep_autosomes_only)
                    && (b_options.min_size.is_some() || a_options.min_size.is_none())
                    && (b_options.log2_threshold.is_some() || a_options.log2_threshold.is_none());
                if b_superset {
                    assert!(b_count <= a_count);
                }
            }
        }
    }

    #[test]
    #[should_panic]
    fn test_log2_filter_requires_correction() {
        let segments = vec![test_segment("1", 1000, ObservedSignal::Log2Ratio(1.0))];
        let options = SegmentFilterOptions {
            keep_autosomes_only: true,
            min_size: None,
            log2_threshold: Some(0.2),
        };
        filter_segments(segments, &options);
    }
}
