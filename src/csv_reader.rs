//! Tolerant CSV ingestion for files of unknown provenance
//!
//! Export trees mix UTF-8, BOM-prefixed UTF-8, and Latin-1 files using
//! commas, semicolons, tabs, or pipes, with and without header rows. This
//! module guesses all three properties from a small sample and produces a
//! header list plus a lazy row iterator. Individual bad bytes or malformed
//! records never abort a file; a file that cannot be read at all still
//! yields an empty table carrying the collected error strings so it can be
//! indexed as an error entry.

use std::path::Path;

use tracing::debug;

/// Delimiters considered by the sniffer, comma first (the default).
const DELIMITER_CANDIDATES: &[u8] = b",;\t|";

/// Bytes of sample text used for delimiter and header sniffing.
const SNIFF_SAMPLE: usize = 4096;

/// A decoded CSV file: headers, encoding label, collected read errors, and
/// the decoded text from which [`CsvTable::rows`] lazily parses records.
///
/// The header-presence verdict only controls whether the first physical
/// record is skipped as data; the first non-blank record always supplies the
/// field names, even when the sniffer concludes the file is header-less.
#[derive(Debug)]
pub struct CsvTable {
    /// Trimmed field names from the first non-blank record.
    pub headers: Vec<String>,
    /// Encoding label actually used (`utf-8-sig`, `utf-8`, `latin-1`), or
    /// `None` when every attempt failed.
    pub encoding: Option<&'static str>,
    /// Non-fatal issues encountered while reading.
    pub errors: Vec<String>,
    text: String,
    delimiter: u8,
    skip_first_record: bool,
}

impl CsvTable {
    fn empty(errors: Vec<String>) -> Self {
        Self {
            headers: Vec::new(),
            encoding: None,
            errors,
            text: String::new(),
            delimiter: b',',
            skip_first_record: false,
        }
    }

    /// Iterate data rows as trimmed string vectors aligned to `headers`
    /// (short records are padded with empty strings, long ones truncated).
    pub fn rows(&self) -> Rows<'_> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(self.text.as_bytes());
        Rows {
            inner: reader.into_records(),
            width: self.headers.len(),
            pending_skip: self.skip_first_record,
        }
    }
}

/// Lazy row iterator over a [`CsvTable`].
pub struct Rows<'a> {
    inner: csv::StringRecordsIntoIter<&'a [u8]>,
    width: usize,
    pending_skip: bool,
}

impl Iterator for Rows<'_> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.inner.next()? {
                Ok(record) => record,
                // Malformed record: skip it, keep going.
                Err(_) => continue,
            };
            if self.pending_skip {
                self.pending_skip = false;
                continue;
            }
            let mut row: Vec<String> =
                record.iter().take(self.width).map(|v| v.trim().to_string()).collect();
            row.resize(self.width, String::new());
            return Some(row);
        }
    }
}

/// Read and decode a CSV file, sniffing encoding, delimiter, and header
/// presence. Never fails: an unreadable file produces an empty table with
/// the collected errors.
pub fn read_csv_table(path: &Path) -> CsvTable {
    let mut errors = Vec::new();
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            // Every encoding attempt would hit the same failure.
            for enc in ["utf-8-sig", "utf-8", "latin-1"] {
                errors.push(format!("{enc}: {e}"));
            }
            return CsvTable::empty(errors);
        }
    };

    let (text, encoding) = decode(&bytes);
    let sample: &str = {
        let mut end = text.len().min(SNIFF_SAMPLE);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        &text[..end]
    };
    let delimiter = detect_delimiter(sample);
    let has_header = sniff_has_header(sample, delimiter);
    let delim_char = delimiter as char;
    debug!(
        path = %path.display(),
        encoding,
        delimiter = %delim_char,
        has_header,
        "decoded csv"
    );

    let headers = first_non_blank_record(&text, delimiter)
        .map(|record| record.iter().map(|v| v.trim().to_string()).collect())
        .unwrap_or_default();

    CsvTable {
        headers,
        encoding: Some(encoding),
        errors,
        text,
        delimiter,
        skip_first_record: has_header,
    }
}

/// Decode raw bytes in priority order {UTF-8 with BOM, UTF-8, Latin-1}.
///
/// The policy is lossy: a handful of bad bytes must not abort the file, so
/// invalid UTF-8 sequences fall through to the Latin-1 byte mapping, which
/// cannot fail.
fn decode(bytes: &[u8]) -> (String, &'static str) {
    if let Some(stripped) = bytes.strip_prefix(b"\xef\xbb\xbf") {
        return (String::from_utf8_lossy(stripped).into_owned(), "utf-8-sig");
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), "utf-8"),
        Err(_) => (bytes.iter().map(|&b| b as char).collect(), "latin-1"),
    }
}

/// Sniff the field delimiter from a text sample, defaulting to comma.
///
/// Picks the candidate that appears most consistently across the sampled
/// lines; ties resolve in candidate order, so comma wins when nothing
/// stands out.
pub fn detect_delimiter(sample: &str) -> u8 {
    let lines: Vec<&str> = sample.lines().filter(|l| !l.trim().is_empty()).take(10).collect();
    if lines.is_empty() {
        return b',';
    }
    let mut best = b',';
    let mut best_score = 0usize;
    for &cand in DELIMITER_CANDIDATES {
        let counts: Vec<usize> =
            lines.iter().map(|l| l.bytes().filter(|&b| b == cand).count()).collect();
        let min = counts.iter().copied().min().unwrap_or(0);
        // Require the delimiter on every sampled line; score by the
        // guaranteed per-line count.
        if min > best_score {
            best_score = min;
            best = cand;
        }
    }
    best
}

/// Guess whether the first record is a header row.
///
/// Column-type voting against up to 20 sampled records: a column whose data
/// cells are all numeric votes for a header when its first cell is not
/// numeric, and against one when it is. Sniff failure (too few rows, no
/// decisive columns) defaults to "has header", matching the documented
/// limitation that genuinely header-less numeric-free files are
/// misclassified.
pub fn sniff_has_header(sample: &str, delimiter: u8) -> bool {
    let reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(sample.as_bytes());
    let records: Vec<Vec<String>> = reader
        .into_records()
        .filter_map(|r| r.ok())
        .map(|r| r.iter().map(|v| v.trim().to_string()).collect())
        .take(20)
        .collect();
    if records.len() < 2 {
        return true;
    }
    let first = &records[0];
    let mut votes = 0i32;
    for (col, head_cell) in first.iter().enumerate() {
        let data: Vec<&String> = records[1..].iter().filter_map(|r| r.get(col)).collect();
        if data.is_empty() || !data.iter().all(|v| v.parse::<f64>().is_ok()) {
            continue;
        }
        if head_cell.parse::<f64>().is_ok() {
            votes -= 1;
        } else {
            votes += 1;
        }
    }
    votes >= 0
}

/// First record containing any non-blank cell; blank records are skipped as
/// header candidates but still pass through [`CsvTable::rows`] as data.
fn first_non_blank_record(text: &str, delimiter: u8) -> Option<csv::StringRecord> {
    let reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    reader
        .into_records()
        .filter_map(|r| r.ok())
        .find(|record| record.iter().any(|v| !v.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3\n"), b',');
        assert_eq!(detect_delimiter("a;b;c\n1;2;3\n"), b';');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3\n"), b'\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3\n"), b'|');
        // No delimiter signal: comma by default.
        assert_eq!(detect_delimiter("justonecolumn\nvalue\n"), b',');
    }

    #[test]
    fn test_sniff_has_header() {
        assert!(sniff_has_header("Date,Steps\n2023-01-01,5000\n2023-01-02,4000\n", b','));
        assert!(!sniff_has_header("1,2\n3,4\n5,6\n", b','));
        // Single row: defaults to header.
        assert!(sniff_has_header("Date,Steps\n", b','));
    }

    #[test]
    fn test_read_basic_table() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "steps.csv", b"Date,Steps\n2023-01-01,5000\n2023-01-02, 4000 \n");
        let table = read_csv_table(&path);
        assert_eq!(table.headers, vec!["Date", "Steps"]);
        assert_eq!(table.encoding, Some("utf-8"));
        assert!(table.errors.is_empty());
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows, vec![vec!["2023-01-01", "5000"], vec!["2023-01-02", "4000"]]);
    }

    #[test]
    fn test_read_bom_and_semicolons() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "bom.csv", b"\xef\xbb\xbfDate;Calories\n2023-01-01;200\n");
        let table = read_csv_table(&path);
        assert_eq!(table.encoding, Some("utf-8-sig"));
        assert_eq!(table.headers, vec!["Date", "Calories"]);
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows, vec![vec!["2023-01-01", "200"]]);
    }

    #[test]
    fn test_read_latin1() {
        let dir = TempDir::new().unwrap();
        // 0xE9 is 'é' in Latin-1 and invalid UTF-8.
        let path = write_file(&dir, "latin.csv", b"Date,Activit\xe9\n2023-01-01,V\xe9lo\n");
        let table = read_csv_table(&path);
        assert_eq!(table.encoding, Some("latin-1"));
        assert_eq!(table.headers, vec!["Date", "Activité"]);
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[0][1], "Vélo");
    }

    #[test]
    fn test_headerless_file_first_row_still_names_fields() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "plain.csv", b"1,2\n3,4\n");
        let table = read_csv_table(&path);
        // Field names come from the first row even without a header...
        assert_eq!(table.headers, vec!["1", "2"]);
        // ...and that row is kept as data because the sniffer saw no header.
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["1", "2"]);
    }

    #[test]
    fn test_ragged_rows_align_to_headers() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "ragged.csv", b"Date,Steps,Calories\n2023-01-01,5000\n2023-01-02,4000,150,extra\n");
        let table = read_csv_table(&path);
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[0], vec!["2023-01-01", "5000", ""]);
        assert_eq!(rows[1], vec!["2023-01-02", "4000", "150"]);
    }

    #[test]
    fn test_missing_file_is_indexed_not_fatal() {
        let table = read_csv_table(Path::new("/nonexistent/path.csv"));
        assert!(table.headers.is_empty());
        assert_eq!(table.encoding, None);
        assert_eq!(table.errors.len(), 3);
        assert_eq!(table.rows().count(), 0);
    }

    #[test]
    fn test_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "empty.csv", b"");
        let table = read_csv_table(&path);
        assert!(table.headers.is_empty());
        assert_eq!(table.encoding, Some("utf-8"));
        assert_eq!(table.rows().count(), 0);
    }
}
