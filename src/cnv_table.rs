//! Read CNV call files into an untyped table of header and row strings
//!

use std::fs::File;
use std::io::{BufRead, BufReader};

use camino::Utf8Path;
use csv::{ReaderBuilder, StringRecord, Trim};

use crate::sample_error::{SampleError, SampleResult};

/// Row from a CNV call file, with its line number in the source file
pub struct RawCnvRow {
    /// 1-based line number in the source file
    pub line: u64,
    pub record: StringRecord,
}

/// All rows of one CNV call file prior to any interpretation of the columns
pub struct RawCnvTable {
    pub filename: String,

    /// 1-based line number of the header line in the source file
    pub header_line: u64,
    pub headers: StringRecord,
    pub rows: Vec<RawCnvRow>,
}

impl RawCnvTable {
    /// Find the index of a named column
    ///
    pub fn column_index(&self, column_name: &str) -> SampleResult<usize> {
        match self.headers.iter().position(|x| x == column_name) {
            Some(x) => Ok(x),
            None => Err(self.malformed(
                self.header_line,
                format!("Missing required column '{column_name}'"),
            )),
        }
    }

    pub fn malformed(&self, line: u64, msg: String) -> SampleError {
        SampleError::MalformedRecord {
            filename: self.filename.clone(),
            line,
            msg,
        }
    }
}

/// Read a delimited CNV call file
///
/// Blank lines are not counted in `header_row`, and blank lines directly preceding the header
/// line are skipped as well.
///
/// # Arguments
/// * `header_row` - Number of leading non-blank lines to skip before the header line
/// * `delimiter` - Field delimiter
///
pub fn read_cnv_table(
    filename: &Utf8Path,
    header_row: usize,
    delimiter: u8,
) -> SampleResult<RawCnvTable> {
    let unreadable = |msg: String| SampleError::UnreadableInput {
        filename: filename.to_string(),
        msg,
    };

    let file = File::open(filename).map_err(|e| unreadable(e.to_string()))?;
    let mut reader = BufReader::new(file);

    let mut line = String::new();
    let mut lines_consumed = 0u64;
    let mut skipped_rows = 0;
    while skipped_rows < header_row {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .map_err(|e| unreadable(e.to_string()))?;
        if bytes == 0 {
            return Err(SampleError::MalformedRecord {
                filename: filename.to_string(),
                line: lines_consumed + 1,
                msg: format!(
                    "File ends before expected header after {header_row} non-blank lines"
                ),
            });
        }
        lines_consumed += 1;
        if !line.trim().is_empty() {
            skipped_rows += 1;
        }
    }

    // Skip blank lines before the header
    loop {
        let buf = reader.fill_buf().map_err(|e| unreadable(e.to_string()))?;
        let blank_len = if buf.starts_with(b"\n") {
            1
        } else if buf.starts_with(b"\r\n") {
            2
        } else {
            break;
        };
        reader.consume(blank_len);
        lines_consumed += 1;
    }

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(delimiter)
        .from_reader(reader);

    let line_offset = lines_consumed;
    let header_line = line_offset + 1;
    let headers = rdr
        .headers()
        .map_err(|e| SampleError::MalformedRecord {
            filename: filename.to_string(),
            line: header_line,
            msg: format!("Can't parse header: {e}"),
        })?
        .clone();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| {
            let line = e
                .position()
                .map(|x| x.line() + line_offset)
                .unwrap_or(header_line);
            SampleError::MalformedRecord {
                filename: filename.to_string(),
                line,
                msg: e.to_string(),
            }
        })?;

        // Skip fully blank lines
        if record.iter().all(|x| x.is_empty()) {
            continue;
        }

        let line = record
            .position()
            .map(|x| x.line() + line_offset)
            .unwrap_or_default();
        rows.push(RawCnvRow { line, record });
    }

    Ok(RawCnvTable {
        filename: filename.to_string(),
        header_line,
        headers,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use camino::Utf8PathBuf;

    fn write_temp_file(dir: &tempfile::TempDir, name: &str, content: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_cnv_table_with_preamble() {
        let dir = tempfile::tempdir().unwrap();
        let content = "# line 1\n# line 2\nChromosome\tSize\tfractionalCopyNumber\n7\t1000\t3.1\nX\t500\t1.0\n";
        let path = write_temp_file(&dir, "s1_cnv.txt", content);

        let table = read_cnv_table(&path, 2, b'\t').unwrap();
        assert_eq!(table.header_line, 3);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.column_index("Size").unwrap(), 1);
        assert_eq!(&table.rows[0].record[0], "7");
        assert_eq!(table.rows[0].line, 4);
        assert_eq!(table.rows[1].line, 5);
    }

    #[test]
    fn test_read_cnv_table_blank_preamble_lines() {
        let dir = tempfile::tempdir().unwrap();
        let content = "# line 1\n\n# line 3\n\n\nChromosome\tSize\tfractionalCopyNumber\n7\t1000\t3.1\n";
        let path = write_temp_file(&dir, "s2_cnv.txt", content);

        let table = read_cnv_table(&path, 2, b'\t').unwrap();
        assert_eq!(table.header_line, 6);
        assert_eq!(table.column_index("fractionalCopyNumber").unwrap(), 2);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(&table.rows[0].record[1], "1000");
        assert_eq!(table.rows[0].line, 7);
    }

    #[test]
    fn test_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp_file(&dir, "a.cns", "chromosome\tstart\n1\t10\n");

        let table = read_cnv_table(&path, 0, b'\t').unwrap();
        let result = table.column_index("log2");
        assert!(matches!(
            result,
            Err(SampleError::MalformedRecord { line: 1, .. })
        ));
    }

    #[test]
    fn test_truncated_preamble() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp_file(&dir, "b_cnv.txt", "# only line\n");

        let result = read_cnv_table(&path, 5, b'\t');
        assert!(matches!(result, Err(SampleError::MalformedRecord { .. })));
    }

    #[test]
    fn test_missing_file() {
        let path = Utf8PathBuf::from("/nonexistent/dir/c.cns");
        let result = read_cnv_table(&path, 0, b'\t');
        assert!(matches!(result, Err(SampleError::UnreadableInput { .. })));
    }
}
