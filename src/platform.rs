//! Platform-specific CNV input conventions
//!
//! Both supported platforms share one analysis pipeline. Everything that differs between them
//! (file layout, column names, how the copy number signal is reported and how the sample ID is
//! embedded in the filename) is described by a [`PlatformConfig`] data record, which the
//! pipeline accesses only through the [`CnvPlatform`] trait.
//!

use camino::Utf8Path;
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cnv_table::{RawCnvRow, RawCnvTable, read_cnv_table};
use crate::sample_error::SampleResult;
use crate::segment::{ObservedSignal, Segment, get_inclusive_size};

/// Autosomal length of the hg38 reference
pub const HG38_AUTOSOMAL_GENOME_SIZE: u64 = 2_875_001_522;

/// Autosomal length of the hg19 reference
pub const HG19_AUTOSOMAL_GENOME_SIZE: u64 = 2_881_033_286;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, ValueEnum, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Optical genome mapping CNV calls
    Ogm,

    /// Whole genome sequencing CNV segments
    Wgs,
}

impl Platform {
    pub fn config(self) -> PlatformConfig {
        match self {
            Platform::Ogm => PlatformConfig {
                platform: self,
                delimiter: b'\t',
                header_row: 5,
                chrom_column: "Chromosome".to_string(),
                start_column: None,
                end_column: None,
                size_column: Some("Size".to_string()),
                signal_column: "fractionalCopyNumber".to_string(),
                signal_kind: SignalKind::FractionalCopyNumber,
                cnv_file_extension: "txt".to_string(),
                sample_id_rule: SampleIdRule::Token {
                    delimiter: '_',
                    index: 0,
                    trim_start: 0,
                    trim_end: 0,
                },
            },
            Platform::Wgs => PlatformConfig {
                platform: self,
                delimiter: b'\t',
                header_row: 0,
                chrom_column: "chromosome".to_string(),
                start_column: Some("start".to_string()),
                end_column: Some("end".to_string()),
                size_column: None,
                signal_column: "log2".to_string(),
                signal_kind: SignalKind::Log2Ratio,
                cnv_file_extension: "cns".to_string(),
                sample_id_rule: SampleIdRule::Token {
                    delimiter: '-',
                    index: 2,
                    trim_start: 1,
                    trim_end: 2,
                },
            },
        }
    }

    /// Default reference genome size used as the FGA denominator
    pub fn default_genome_size(self) -> u64 {
        match self {
            Platform::Ogm => HG38_AUTOSOMAL_GENOME_SIZE,
            Platform::Wgs => HG19_AUTOSOMAL_GENOME_SIZE,
        }
    }

    /// Lowercase platform name used to keep output filenames of each platform distinct
    pub fn file_label(self) -> String {
        self.to_string().to_lowercase()
    }

    /// Default filename for the platform's FGA summary
    pub fn default_summary_filename(self) -> String {
        format!("{}_fga.csv", self.file_label())
    }
}

/// Representation of the copy number signal column
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SignalKind {
    FractionalCopyNumber,
    Log2Ratio,
}

/// Rule for extracting the sample ID from a CNV call filename
#[derive(Clone, Debug)]
pub enum SampleIdRule {
    /// Split the file stem on `delimiter`, select the token at `index`, then drop `trim_start`
    /// leading and `trim_end` trailing characters from it
    Token {
        delimiter: char,
        index: usize,
        trim_start: usize,
        trim_end: usize,
    },

    /// The first capture group of the regex, matched against the file name
    Regex(Regex),
}

impl SampleIdRule {
    /// Returns None if the rule can't produce a non-empty sample ID for this filename
    ///
    pub fn extract(&self, cnv_filename: &Utf8Path) -> Option<String> {
        let sample_id = match self {
            SampleIdRule::Token {
                delimiter,
                index,
                trim_start,
                trim_end,
            } => {
                let stem = cnv_filename.file_stem()?;
                let token = stem.split(*delimiter).nth(*index)?;
                let char_count = token.chars().count();
                if char_count <= trim_start + trim_end {
                    return None;
                }
                token
                    .chars()
                    .skip(*trim_start)
                    .take(char_count - trim_start - trim_end)
                    .collect::<String>()
            }
            SampleIdRule::Regex(re) => {
                let name = cnv_filename.file_name()?;
                re.captures(name)?.get(1)?.as_str().to_string()
            }
        };

        if sample_id.is_empty() {
            None
        } else {
            Some(sample_id)
        }
    }
}

/// Input file conventions for one CNV calling platform
#[derive(Clone, Debug)]
pub struct PlatformConfig {
    pub platform: Platform,
    pub delimiter: u8,

    /// Number of lines preceding the header line
    pub header_row: usize,

    pub chrom_column: String,
    pub start_column: Option<String>,
    pub end_column: Option<String>,

    /// If None, size is derived from the start and end columns
    pub size_column: Option<String>,

    pub signal_column: String,
    pub signal_kind: SignalKind,

    /// CNV call files in the data directory are selected by this extension
    pub cnv_file_extension: String,

    pub sample_id_rule: SampleIdRule,
}

/// Capabilities the FGA pipeline requires from a CNV calling platform
pub trait CnvPlatform {
    fn label(&self) -> String;

    /// Extension of the CNV call files to select from the data directory
    fn cnv_file_extension(&self) -> &str;

    fn extract_sample_id(&self, cnv_filename: &Utf8Path) -> Option<String>;

    fn read_cnv_table(&self, cnv_filename: &Utf8Path) -> SampleResult<RawCnvTable>;

    /// Interpret a value from the signal column
    fn derive_observed_signal(&self, value: f64) -> ObservedSignal;

    /// Translate raw CNV rows into canonical segments
    ///
    /// No filtering or purity correction is done here.
    ///
    fn normalize(&self, table: &RawCnvTable) -> SampleResult<Vec<Segment>>;
}

/// Parse an integer field, also accepting integral float notation such as "1500.0"
///
/// Float values outside of the i64 range are rejected rather than saturated.
///
fn parse_integer_field(value: &str) -> Option<i64> {
    // 2^63, exactly representable as f64
    const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if let Ok(x) = value.parse::<i64>() {
        return Some(x);
    }
    match value.parse::<f64>() {
        Ok(x) if x.fract() == 0.0 && (-I64_LIMIT..I64_LIMIT).contains(&x) => Some(x as i64),
        _ => None,
    }
}

fn get_field<'a>(
    table: &RawCnvTable,
    row: &'a RawCnvRow,
    column_index: usize,
    column_name: &str,
) -> SampleResult<&'a str> {
    match row.record.get(column_index) {
        Some(x) => Ok(x),
        None => Err(table.malformed(row.line, format!("Missing value for column '{column_name}'"))),
    }
}

fn get_integer_field(
    table: &RawCnvTable,
    row: &RawCnvRow,
    column_index: usize,
    column_name: &str,
) -> SampleResult<i64> {
    let value = get_field(table, row, column_index, column_name)?;
    match parse_integer_field(value) {
        Some(x) => Ok(x),
        None => Err(table.malformed(
            row.line,
            format!("Can't parse integer from column '{column_name}' value '{value}'"),
        )),
    }
}

impl CnvPlatform for PlatformConfig {
    fn label(&self) -> String {
        self.platform.to_string()
    }

    fn cnv_file_extension(&self) -> &str {
        &self.cnv_file_extension
    }

    fn extract_sample_id(&self, cnv_filename: &Utf8Path) -> Option<String> {
        self.sample_id_rule.extract(cnv_filename)
    }

    fn read_cnv_table(&self, cnv_filename: &Utf8Path) -> SampleResult<RawCnvTable> {
        read_cnv_table(cnv_filename, self.header_row, self.delimiter)
    }

    fn derive_observed_signal(&self, value: f64) -> ObservedSignal {
        match self.signal_kind {
            SignalKind::FractionalCopyNumber => ObservedSignal::CopyNumber(value),
            SignalKind::Log2Ratio => ObservedSignal::Log2Ratio(value),
        }
    }

    fn normalize(&self, table: &RawCnvTable) -> SampleResult<Vec<Segment>> {
        let chrom_index = table.column_index(&self.chrom_column)?;
        let signal_index = table.column_index(&self.signal_column)?;
        let start_index = match &self.start_column {
            Some(x) => Some((table.column_index(x)?, x.as_str())),
            None => None,
        };
        let end_index = match &self.end_column {
            Some(x) => Some((table.column_index(x)?, x.as_str())),
            None => None,
        };
        let size_index = match &self.size_column {
            Some(x) => Some((table.column_index(x)?, x.as_str())),
            None => None,
        };

        let mut segments = Vec::with_capacity(table.rows.len());
        for row in table.rows.iter() {
            let chromosome = get_field(table, row, chrom_index, &self.chrom_column)?.to_string();

            let start = match start_index {
                Some((index, name)) => Some(get_integer_field(table, row, index, name)?),
                None => None,
            };
            let end = match end_index {
                Some((index, name)) => Some(get_integer_field(table, row, index, name)?),
                None => None,
            };

            let size = match size_index {
                Some((index, name)) => {
                    let value = get_field(table, row, index, name)?;
                    if value.is_empty() {
                        None
                    } else {
                        let size = get_integer_field(table, row, index, name)?;
                        if size < 1 {
                            return Err(table.malformed(
                                row.line,
                                format!("Segment size must be positive, found '{value}'"),
                            ));
                        }
                        Some(size as u64)
                    }
                }
                None => match (start, end) {
                    (Some(start), Some(end)) => match get_inclusive_size(start, end) {
                        Some(x) => Some(x),
                        None => {
                            return Err(table.malformed(
                                row.line,
                                format!("Invalid segment coordinates, start: {start} end: {end}"),
                            ));
                        }
                    },
                    _ => None,
                },
            };

            let signal_value = get_field(table, row, signal_index, &self.signal_column)?;
            let signal = match signal_value.parse::<f64>() {
                Ok(x) if x.is_finite() => x,
                _ => {
                    return Err(table.malformed(
                        row.line,
                        format!(
                            "Can't parse copy number signal from column '{}' value '{signal_value}'",
                            self.signal_column
                        ),
                    ));
                }
            };

            segments.push(Segment {
                chromosome,
                start,
                end,
                size,
                observed_signal: self.derive_observed_signal(signal),
                log2_corrected: None,
            });
        }

        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use csv::StringRecord;

    fn get_table(headers: &[&str], rows: &[&[&str]]) -> RawCnvTable {
        RawCnvTable {
            filename: "test".to_string(),
            header_line: 1,
            headers: StringRecord::from(headers.to_vec()),
            rows: rows
                .iter()
                .enumerate()
                .map(|(i, x)| RawCnvRow {
                    line: i as u64 + 2,
                    record: StringRecord::from(x.to_vec()),
                })
                .collect(),
        }
    }

    #[test]
    fn test_ogm_sample_id() {
        let config = Platform::Ogm.config();
        assert_eq!(
            config.extract_sample_id(Utf8Path::new("/data/OGM/1234_CNV_exp.txt")),
            Some("1234".to_string())
        );
        assert_eq!(
            config.extract_sample_id(Utf8Path::new("_CNV.txt")),
            None
        );
    }

    #[test]
    fn test_wgs_sample_id() {
        let config = Platform::Wgs.config();
        assert_eq!(
            config.extract_sample_id(Utf8Path::new("/data/WGS/RUN1-LIB-T1042AB-final.cns")),
            Some("1042".to_string())
        );

        // Too few tokens
        assert_eq!(
            config.extract_sample_id(Utf8Path::new("RUN1-LIB.cns")),
            None
        );

        // Token consumed entirely by trimming
        assert_eq!(
            config.extract_sample_id(Utf8Path::new("A-B-XYZ-C.cns")),
            None
        );
    }

    #[test]
    fn test_regex_sample_id() {
        let rule = SampleIdRule::Regex(Regex::new(r"^sample(\d+)\.").unwrap());
        assert_eq!(
            rule.extract(Utf8Path::new("dir/sample17.cns")),
            Some("17".to_string())
        );
        assert_eq!(rule.extract(Utf8Path::new("dir/other17.cns")), None);
    }

    #[test]
    fn test_parse_integer_field() {
        assert_eq!(parse_integer_field("1500"), Some(1500));
        assert_eq!(parse_integer_field("1500.0"), Some(1500));
        assert_eq!(parse_integer_field("1500.5"), None);
        assert_eq!(parse_integer_field("abc"), None);
        assert_eq!(parse_integer_field(""), None);

        assert_eq!(parse_integer_field("1e6"), Some(1_000_000));
        assert_eq!(parse_integer_field("1e19"), None);
        assert_eq!(parse_integer_field("-1e19"), None);
        assert_eq!(parse_integer_field("1e30"), None);
        assert_eq!(parse_integer_field("inf"), None);
        assert_eq!(parse_integer_field("NaN"), None);
        assert_eq!(parse_integer_field("9223372036854775807"), Some(i64::MAX));
    }

    #[test]
    fn test_normalize_ogm() {
        let config = Platform::Ogm.config();
        let table = get_table(
            &["Chromosome", "Size", "fractionalCopyNumber"],
            &[&["7", "100000", "3.2"], &["X", "", "1.0"]],
        );
        let segments = config.normalize(&table).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].chromosome, "7");
        assert_eq!(segments[0].size, Some(100_000));
        assert_eq!(segments[0].observed_signal, ObservedSignal::CopyNumber(3.2));
        assert_eq!(segments[0].log2_corrected, None);
        assert_eq!(segments[1].size, None);
    }

    #[test]
    fn test_normalize_wgs_derives_size() {
        let config = Platform::Wgs.config();
        let table = get_table(
            &["chromosome", "start", "end", "gene", "log2"],
            &[&["1", "1001", "2000", "-", "-0.5"]],
        );
        let segments = config.normalize(&table).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, Some(1001));
        assert_eq!(segments[0].end, Some(2000));
        assert_eq!(segments[0].size, Some(1000));
        assert_eq!(segments[0].observed_signal, ObservedSignal::Log2Ratio(-0.5));
    }

    #[test]
    fn test_normalize_malformed() {
        use crate::sample_error::SampleError;

        let config = Platform::Wgs.config();

        let table = get_table(
            &["chromosome", "start", "end", "log2"],
            &[&["1", "1001", "2000", "0.1"], &["1", "abc", "2000", "0.1"]],
        );
        let result = config.normalize(&table);
        assert!(matches!(
            result,
            Err(SampleError::MalformedRecord { line: 3, .. })
        ));

        let table = get_table(
            &["chromosome", "start", "end", "log2"],
            &[&["1", "3000", "2000", "0.1"]],
        );
        assert!(config.normalize(&table).is_err());

        let table = get_table(
            &["chromosome", "start", "end", "log2"],
            &[&["1", "1000", "2000", ""]],
        );
        assert!(config.normalize(&table).is_err());

        // Missing required column
        let table = get_table(&["chromosome", "start", "end"], &[&["1", "1000", "2000"]]);
        assert!(config.normalize(&table).is_err());
    }

    #[test]
    fn test_normalize_out_of_range_coordinates() {
        use crate::sample_error::SampleError;

        let config = Platform::Wgs.config();
        for (start, end) in [
            ("0", "1e19"),
            ("-9223372036854775808", "9223372036854775807"),
            ("0", "9223372036854775807"),
        ] {
            let table = get_table(
                &["chromosome", "start", "end", "log2"],
                &[&["1", start, end, "0.5"]],
            );
            assert!(
                matches!(
                    config.normalize(&table),
                    Err(SampleError::MalformedRecord { line: 2, .. })
                ),
                "start: {start} end: {end}"
            );
        }

        let config = Platform::Ogm.config();
        let table = get_table(
            &["Chromosome", "Size", "fractionalCopyNumber"],
            &[&["1", "1e30", "3.0"]],
        );
        assert!(matches!(
            config.normalize(&table),
            Err(SampleError::MalformedRecord { line: 2, .. })
        ));
    }

    #[test]
    fn test_default_summary_filename() {
        assert_eq!(Platform::Ogm.default_summary_filename(), "ogm_fga.csv");
        assert_eq!(Platform::Wgs.default_summary_filename(), "wgs_fga.csv");
    }

    #[test]
    fn test_default_genome_size() {
        assert_eq!(
            Platform::Ogm.default_genome_size(),
            HG38_AUTOSOMAL_GENOME_SIZE
        );
        assert_eq!(
            Platform::Wgs.default_genome_size(),
            HG19_AUTOSOMAL_GENOME_SIZE
        );
    }
}
