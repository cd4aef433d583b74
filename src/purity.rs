//! Tumor purity metadata lookup
//!

use std::collections::HashMap;

use camino::Utf8Path;
use csv::{ReaderBuilder, Trim};
use log::{info, warn};
use simple_error::{SimpleResult, bail, try_with};

use crate::sample_error::{SampleError, SampleResult};

pub const SAMPLE_ID_COLUMN: &str = "SampleID";
pub const TUMOR_FRACTION_COLUMN: &str = "Tumor fraction";

/// Tumor fraction of a sample, guaranteed to be in (0,1]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Purity(f64);

impl Purity {
    pub fn new(sample_id: &str, value: f64) -> SampleResult<Self> {
        if value.is_finite() && value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(SampleError::InvalidPurity {
                sample_id: sample_id.to_string(),
                value: value.to_string(),
            })
        }
    }

    pub fn get(&self) -> f64 {
        self.0
    }
}

/// Sample ID to tumor fraction map, loaded once per run and read-only afterward
///
/// Tumor fraction values are stored as text and validated on lookup, so that a bad value only
/// fails the sample it belongs to.
///
pub struct PurityTable {
    tumor_fractions: HashMap<String, String>,
}

impl PurityTable {
    /// Load the purity metadata table from a comma-delimited file
    ///
    /// Any failure here is fatal to the run, because no sample can be processed without it.
    ///
    pub fn from_csv(filename: &Utf8Path) -> SimpleResult<Self> {
        info!("Reading purity metadata from file: '{filename}'");

        let mut rdr = try_with!(
            ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .trim(Trim::All)
                .delimiter(b',')
                .from_path(filename),
            "Unable to open purity metadata file: '{filename}'"
        );

        let headers = try_with!(
            rdr.headers(),
            "Unable to parse header from purity metadata file: '{filename}'"
        )
        .clone();

        let find_column = |name: &str| headers.iter().position(|x| x == name);
        let (sample_id_index, fraction_index) =
            match (find_column(SAMPLE_ID_COLUMN), find_column(TUMOR_FRACTION_COLUMN)) {
                (Some(x), Some(y)) => (x, y),
                _ => {
                    bail!(
                        "Purity metadata file '{filename}' must contain columns '{SAMPLE_ID_COLUMN}' and '{TUMOR_FRACTION_COLUMN}'"
                    );
                }
            };

        let mut tumor_fractions = HashMap::new();
        for (record_index, result) in rdr.records().enumerate() {
            let record = try_with!(
                result,
                "Failed to parse record {} from purity metadata file: '{filename}'",
                record_index + 1
            );
            let sample_id = record.get(sample_id_index).unwrap_or_default();
            if sample_id.is_empty() {
                continue;
            }
            let tumor_fraction = record.get(fraction_index).unwrap_or_default();
            if tumor_fractions.contains_key(sample_id) {
                warn!(
                    "Duplicate sample ID '{sample_id}' in purity metadata file '{filename}', using the first entry"
                );
                continue;
            }
            tumor_fractions.insert(sample_id.to_string(), tumor_fraction.to_string());
        }

        info!(
            "Read purity metadata for {} samples",
            tumor_fractions.len()
        );

        Ok(Self { tumor_fractions })
    }

    #[cfg(test)]
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut tumor_fractions = HashMap::new();
        for (sample_id, tumor_fraction) in entries {
            tumor_fractions
                .entry(sample_id.to_string())
                .or_insert_with(|| tumor_fraction.to_string());
        }
        Self { tumor_fractions }
    }

    /// Look up a sample's purity by exact sample ID match
    ///
    pub fn get_purity(&self, sample_id: &str) -> SampleResult<Purity> {
        let value = match self.tumor_fractions.get(sample_id) {
            Some(x) => x,
            None => return Err(SampleError::SampleNotFound(sample_id.to_string())),
        };
        match value.parse::<f64>() {
            Ok(x) => Purity::new(sample_id, x),
            Err(_) => Err(SampleError::InvalidPurity {
                sample_id: sample_id.to_string(),
                value: value.clone(),
            }),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.tumor_fractions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use camino::Utf8PathBuf;

    #[test]
    fn test_purity_range() {
        assert!(Purity::new("a", 1.0).is_ok());
        assert!(Purity::new("a", 0.01).is_ok());
        for value in [0.0, -0.2, 1.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Purity::new("a", value),
                Err(SampleError::InvalidPurity { .. })
            ));
        }
    }

    #[test]
    fn test_get_purity() {
        let table = PurityTable::from_entries([("12", "0.6"), ("13", "n/a"), ("14", "0")]);

        approx::assert_ulps_eq!(table.get_purity("12").unwrap().get(), 0.6, max_ulps = 4);
        assert!(matches!(
            table.get_purity("13"),
            Err(SampleError::InvalidPurity { .. })
        ));
        assert!(matches!(
            table.get_purity("14"),
            Err(SampleError::InvalidPurity { .. })
        ));

        // Lookup is by exact string match
        assert!(matches!(
            table.get_purity("012"),
            Err(SampleError::SampleNotFound(_))
        ));
        assert!(matches!(
            table.get_purity("99"),
            Err(SampleError::SampleNotFound(_))
        ));
    }

    #[test]
    fn test_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("purity.csv")).unwrap();
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"SampleID,Diagnosis,Tumor fraction\n101,AML,0.8\n102,MDS,0.35\n101,AML,0.1\n")
            .unwrap();

        let table = PurityTable::from_csv(&path).unwrap();
        assert_eq!(table.len(), 2);
        approx::assert_ulps_eq!(table.get_purity("101").unwrap().get(), 0.8, max_ulps = 4);
        approx::assert_ulps_eq!(table.get_purity("102").unwrap().get(), 0.35, max_ulps = 4);
    }

    #[test]
    fn test_from_csv_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("purity.csv")).unwrap();
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"SampleID,Purity\n101,0.8\n").unwrap();

        assert!(PurityTable::from_csv(&path).is_err());
        assert!(PurityTable::from_csv(Utf8Path::new("/nonexistent/purity.csv")).is_err());
    }
}
