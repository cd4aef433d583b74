use std::fmt;

/// Copy number signal as reported by the CNV caller for one segment
///
/// Each platform populates exactly one of these representations.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ObservedSignal {
    /// Tumor vs. normal depth ratio in log2 space, 0 is copy neutral
    Log2Ratio(f64),

    /// Fractional (non-integer) copy number, 2 is copy neutral
    CopyNumber(f64),
}

impl ObservedSignal {
    /// Observed copy number of the mixed tumor/normal sample
    ///
    /// Log2 ratios are converted assuming a diploid baseline, fractional copy numbers are
    /// returned as-is.
    ///
    pub fn copy_number(&self) -> f64 {
        match self {
            ObservedSignal::Log2Ratio(x) => 2.0 * x.exp2(),
            ObservedSignal::CopyNumber(x) => *x,
        }
    }
}

/// One called copy number region for one sample
#[derive(Clone, PartialEq)]
pub struct Segment {
    pub chromosome: String,

    /// 1-based inclusive start, when the platform reports it
    pub start: Option<i64>,

    /// 1-based inclusive end, when the platform reports it
    pub end: Option<i64>,

    /// Segment length in bases. Always at least 1 when present.
    pub size: Option<u64>,

    pub observed_signal: ObservedSignal,

    /// Purity-adjusted log2 ratio, rounded to 2 decimal places. This is None until purity
    /// correction has been run on the segment.
    pub log2_corrected: Option<f64>,
}

impl Segment {
    /// Return the autosome number if the chromosome label is an integer in [1,22]
    ///
    /// Sex chromosomes, mitochondria, unplaced contigs, and any other non-numeric label
    /// return None.
    ///
    pub fn autosome_number(&self) -> Option<u8> {
        match self.chromosome.parse::<u8>() {
            Ok(x) if (1..=22).contains(&x) => Some(x),
            _ => None,
        }
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Segment: {}:{:?}-{:?} size: {:?} signal: {:?} log2_corrected: {:?}",
            self.chromosome,
            self.start,
            self.end,
            self.size,
            self.observed_signal,
            self.log2_corrected
        )
    }
}

/// Get segment size from 1-based inclusive coordinates
///
/// Returns None if the end precedes the start, or the size does not fit in an i64
///
pub fn get_inclusive_size(start: i64, end: i64) -> Option<u64> {
    if end < start {
        return None;
    }
    let size = end.checked_sub(start)?.checked_add(1)?;
    Some(size as u64)
}

#[cfg(test)]
pub(crate) fn test_segment(chromosome: &str, size: u64, signal: ObservedSignal) -> Segment {
    Segment {
        chromosome: chromosome.to_string(),
        start: None,
        end: None,
        size: Some(size),
        observed_signal: signal,
        log2_corrected: None,
    }
}
