//! Table reader with ordered encoding fallback.
//!
//! Source tables arrive in an unknown encoding out of a known candidate set.
//! Each candidate is tried in turn: the bytes are decoded strictly (no
//! replacement characters) and the text is parsed as CSV. The first attempt
//! that yields a table wins. Cells are kept as raw text, no type inference.

use csv::ReaderBuilder;
use encoding_rs::Encoding;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::config::ReaderOptions;
use crate::error::{ConfigError, ConfigResult, CsvError, CsvResult, JobError, JobResult};

const UTF8_BOM: &[u8; 3] = b"\xEF\xBB\xBF";

// =============================================================================
// Encodings
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Decoder {
    /// UTF-8 with an optional byte order mark stripped
    Utf8Sig,
    Whatwg(&'static Encoding),
}

/// One entry of the ordered encoding fallback list
#[derive(Debug, Clone)]
pub struct EncodingCandidate {
    label: String,
    decoder: Decoder,
}

impl EncodingCandidate {
    /// Resolve a label such as `utf-8-sig`, `cp949` or `euc-kr`.
    ///
    /// Fails with [`ConfigError::DependencyMissing`] when no decoder exists
    /// for the label.
    pub fn resolve(label: &str) -> ConfigResult<Self> {
        let normalized = label.trim().to_lowercase().replace('_', "-");
        if matches!(normalized.as_str(), "utf-8-sig" | "utf8-sig") {
            return Ok(Self { label: label.to_string(), decoder: Decoder::Utf8Sig });
        }

        // Common aliases the WHATWG label table does not carry
        let lookup = match normalized.as_str() {
            "cp949" | "uhc" | "ms949" => "windows-949",
            "cp1252" => "windows-1252",
            "latin1" | "latin-1" => "iso-8859-1",
            "utf8" => "utf-8",
            other => other,
        };

        Encoding::for_label(lookup.as_bytes())
            .map(|enc| Self { label: label.to_string(), decoder: Decoder::Whatwg(enc) })
            .ok_or_else(|| ConfigError::DependencyMissing(label.to_string()))
    }

    /// Label as configured
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Decode without replacement; any malformed sequence fails the attempt.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> CsvResult<Cow<'a, str>> {
        let decoded = match self.decoder {
            Decoder::Utf8Sig => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(body).ok().map(Cow::Borrowed)
            }
            Decoder::Whatwg(enc) => enc.decode_without_bom_handling_and_without_replacement(bytes),
        };
        decoded.ok_or_else(|| CsvError::EncodingError(self.label.clone()))
    }
}

/// Guess the encoding of raw bytes using chardet.
///
/// Only used as a diagnostic when every candidate failed.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "unknown".to_string();
    }
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "" => "unknown".to_string(),
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "euc-kr" | "cp949" | "uhc" => "euc-kr".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

// =============================================================================
// Table
// =============================================================================

/// A parsed table: header names plus rows of raw cells.
///
/// Every row has exactly one cell per header. `None` marks an absent value
/// (short row or null marker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
    encoding: String,
}

impl Table {
    /// Build a table directly; rows are padded or cut to the header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { headers, rows, encoding: "utf-8".to_string() }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Encoding that successfully decoded the source
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |cells| Row { headers: &self.headers, cells })
    }

    /// Rows as JSON objects keyed by header, absent cells as `null`
    pub fn to_json(&self) -> Vec<Value> {
        self.rows()
            .map(|row| {
                let obj: Map<String, Value> = self
                    .headers
                    .iter()
                    .zip(row.cells)
                    .map(|(h, c)| (h.clone(), c.clone().map(Value::String).unwrap_or(Value::Null)))
                    .collect();
                Value::Object(obj)
            })
            .collect()
    }
}

/// Borrowed view of one table row
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    headers: &'a [String],
    cells: &'a [Option<String>],
}

impl<'a> Row<'a> {
    /// Cell by column position
    pub fn cell(&self, index: usize) -> Option<&'a str> {
        self.cells.get(index).and_then(|c| c.as_deref())
    }

    /// Cell by column name
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.headers.iter().position(|h| h == name).and_then(|i| self.cell(i))
    }
}

// =============================================================================
// Reader
// =============================================================================

/// Reads tables using an ordered list of candidate encodings
#[derive(Debug, Clone)]
pub struct TableReader {
    candidates: Vec<EncodingCandidate>,
    delimiter: u8,
    null_markers: HashSet<String>,
}

impl TableReader {
    /// Resolve every candidate encoding up front.
    ///
    /// An unresolvable label is fatal for the run, so it surfaces here rather
    /// than in the middle of a job.
    pub fn new(options: &ReaderOptions) -> ConfigResult<Self> {
        if options.encodings.is_empty() {
            return Err(ConfigError::NoEncodings);
        }
        let candidates = options
            .encodings
            .iter()
            .map(|label| EncodingCandidate::resolve(label))
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Self {
            candidates,
            delimiter: options.delimiter,
            null_markers: options.null_markers.iter().cloned().collect(),
        })
    }

    /// Read a table from disk.
    ///
    /// A missing file is [`JobError::SourceMissing`]; a file no candidate can
    /// parse is [`JobError::SourceUnreadable`] carrying the last failure.
    pub fn read_path(&self, path: &Path) -> JobResult<Table> {
        let bytes = fs::read(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => JobError::SourceMissing(path.to_path_buf()),
            _ => JobError::SourceIo { path: path.to_path_buf(), source },
        })?;

        self.read_bytes(&bytes).map_err(|source| JobError::SourceUnreadable {
            path: path.to_path_buf(),
            detected: detect_encoding(&bytes),
            source,
        })
    }

    /// Try each candidate in order; the first successful parse wins,
    /// otherwise the last attempt's error is returned.
    pub fn read_bytes(&self, bytes: &[u8]) -> CsvResult<Table> {
        let attempts = self.candidates.iter().map(|candidate| self.parse_with(bytes, candidate));

        let mut last_err = CsvError::EmptyFile;
        for attempt in attempts {
            match attempt {
                Ok(table) => return Ok(table),
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }

    fn parse_with(&self, bytes: &[u8], candidate: &EncodingCandidate) -> CsvResult<Table> {
        let content = candidate.decode(bytes)?;
        let mut table = self.parse_text(&content)?;
        table.encoding = candidate.label().to_string();
        Ok(table)
    }

    /// Parse already-decoded text.
    pub fn parse_text(&self, content: &str) -> CsvResult<Table> {
        if content.trim().is_empty() {
            return Err(CsvError::EmptyFile);
        }
        // The csv reader silently closes a quote left open at end of input
        if let Some(line) = unclosed_quote_line(content, self.delimiter) {
            return Err(CsvError::UnterminatedQuote(line));
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let raw_headers = reader.headers()?.clone();
        if raw_headers.is_empty() {
            return Err(CsvError::NoHeaders);
        }
        let headers = dedupe_headers(raw_headers.iter());
        let width = headers.len();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            if record.len() > width {
                return Err(CsvError::RowTooWide {
                    line: record.position().map(|p| p.line()).unwrap_or(0),
                    expected: width,
                    found: record.len(),
                });
            }

            let row = (0..width)
                .map(|i| {
                    record
                        .get(i)
                        .filter(|raw| !self.null_markers.contains(*raw))
                        .map(str::to_string)
                })
                .collect();
            rows.push(row);
        }

        Ok(Table { headers, rows, encoding: String::new() })
    }
}

/// Line of a quoted field that is still open at end of input.
///
/// A quote only opens a field at field start; inside quotes `""` is a literal
/// quote.
fn unclosed_quote_line(content: &str, delimiter: u8) -> Option<u64> {
    let mut line = 1;
    let mut opened_at = None;
    let mut field_start = true;
    let mut bytes = content.bytes().peekable();

    while let Some(b) = bytes.next() {
        if b == b'\n' {
            line += 1;
        }
        if opened_at.is_some() {
            if b == b'"' {
                if bytes.peek() == Some(&b'"') {
                    bytes.next();
                } else {
                    opened_at = None;
                    field_start = false;
                }
            }
            continue;
        }
        field_start = match b {
            b'"' if field_start => {
                opened_at = Some(line);
                false
            }
            b'\n' | b'\r' => true,
            _ => b == delimiter,
        };
    }
    opened_at
}

/// Repeated header names become `name`, `name.1`, `name.2`, ...
fn dedupe_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut headers = Vec::new();

    for name in raw {
        let mut candidate = name.to_string();
        let mut n = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", name, n);
            n += 1;
        }
        seen.insert(candidate.clone());
        headers.push(candidate);
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader() -> TableReader {
        TableReader::new(&ReaderOptions::default()).unwrap()
    }

    #[test]
    fn test_simple_csv() {
        let table = reader().read_bytes(b"name,age\nAlice,30\nBob,25").unwrap();

        assert_eq!(table.headers(), &["name", "age"]);
        assert_eq!(table.len(), 2);
        let rows: Vec<Row> = table.rows().collect();
        assert_eq!(rows[0].get("name"), Some("Alice"));
        assert_eq!(rows[1].get("age"), Some("25"));
        assert_eq!(table.encoding(), "utf-8-sig");
    }

    #[test]
    fn test_values_kept_as_raw_text() {
        let table = reader().read_bytes(b"code,date\n007,2015-03-01\n").unwrap();
        let row = table.rows().next().unwrap();
        assert_eq!(row.get("code"), Some("007"));
        assert_eq!(row.get("date"), Some("2015-03-01"));
    }

    #[test]
    fn test_bom_is_stripped_from_first_header() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("Name,Length_m\n한강대교,1005\n".as_bytes());

        let table = reader().read_bytes(&bytes).unwrap();
        assert_eq!(table.headers()[0], "Name");
        assert_eq!(table.rows().next().unwrap().get("Name"), Some("한강대교"));
    }

    #[test]
    fn test_falls_back_to_korean_legacy_encoding() {
        let (bytes, _, had_errors) = encoding_rs::EUC_KR.encode("이름,길이\n한강대교,1005\n");
        assert!(!had_errors);

        let table = reader().read_bytes(&bytes).unwrap();
        assert_eq!(table.encoding(), "cp949");
        assert_eq!(table.headers(), &["이름", "길이"]);
        assert_eq!(table.rows().next().unwrap().get("이름"), Some("한강대교"));
    }

    #[test]
    fn test_all_candidates_fail_reports_last_error() {
        let options = ReaderOptions { encodings: vec!["utf-8".into()], ..Default::default() };
        let reader = TableReader::new(&options).unwrap();

        let err = reader.read_bytes(&[0x41, 0xFF, 0xFE, 0x0A]).unwrap_err();
        assert!(matches!(err, CsvError::EncodingError(ref label) if label == "utf-8"));
    }

    #[test]
    fn test_unknown_encoding_is_dependency_missing() {
        let options = ReaderOptions {
            encodings: vec!["utf-8".into(), "klingon-8".into()],
            ..Default::default()
        };
        let err = TableReader::new(&options).unwrap_err();
        assert!(matches!(err, ConfigError::DependencyMissing(ref l) if l == "klingon-8"));
    }

    #[test]
    fn test_empty_encoding_list_rejected() {
        let options = ReaderOptions { encodings: vec![], ..Default::default() };
        assert!(matches!(TableReader::new(&options), Err(ConfigError::NoEncodings)));
    }

    #[test]
    fn test_aliases_resolve() {
        for label in ["cp949", "CP949", "euc_kr", "utf8", "latin1", "utf-8-sig"] {
            assert!(EncodingCandidate::resolve(label).is_ok(), "{label}");
        }
    }

    #[test]
    fn test_null_markers_and_short_rows() {
        let table = reader().read_bytes(b"a,b,c\nNA,,x\n1\n").unwrap();
        let rows: Vec<Row> = table.rows().collect();

        assert_eq!(rows[0].get("a"), None);
        assert_eq!(rows[0].get("b"), None);
        assert_eq!(rows[0].get("c"), Some("x"));
        assert_eq!(rows[1].get("a"), Some("1"));
        assert_eq!(rows[1].get("c"), None);
    }

    #[test]
    fn test_null_marker_must_match_exactly() {
        let table = reader().read_bytes(b"a\n NA \n").unwrap();
        assert_eq!(table.rows().next().unwrap().get("a"), Some(" NA "));
    }

    #[test]
    fn test_row_wider_than_header_fails() {
        let err = reader().read_bytes(b"a,b\n1,2,3\n").unwrap_err();
        assert!(matches!(err, CsvError::RowTooWide { expected: 2, found: 3, .. }));
    }

    #[test]
    fn test_empty_file_fails() {
        assert!(matches!(reader().read_bytes(b""), Err(CsvError::EmptyFile)));
        assert!(matches!(reader().read_bytes(b"  \n"), Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_header_only_has_no_rows() {
        let table = reader().read_bytes(b"Name,Length_m\n").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.headers().len(), 2);
    }

    #[test]
    fn test_duplicate_headers_disambiguated() {
        let table = reader().read_bytes(b"x,x,y,x\n1,2,3,4\n").unwrap();
        assert_eq!(table.headers(), &["x", "x.1", "y", "x.2"]);
        assert_eq!(table.rows().next().unwrap().get("x.1"), Some("2"));
    }

    #[test]
    fn test_quoted_values_and_custom_delimiter() {
        let options = ReaderOptions { delimiter: b';', ..Default::default() };
        let reader = TableReader::new(&options).unwrap();
        let table = reader.read_bytes(b"name;note\n\"Han; Bridge\";\" spaced \"\n").unwrap();

        let row = table.rows().next().unwrap();
        assert_eq!(row.get("name"), Some("Han; Bridge"));
        assert_eq!(row.get("note"), Some(" spaced "));
    }

    #[test]
    fn test_unterminated_quote_fails() {
        let err = reader().read_bytes(b"Name\n\"unterminated\n").unwrap_err();
        assert!(matches!(err, CsvError::UnterminatedQuote(2)));

        let err = reader().read_bytes(b"a,b\n1,\"ok\"\n2,\"open \"\"\n").unwrap_err();
        assert!(matches!(err, CsvError::UnterminatedQuote(3)));
    }

    #[test]
    fn test_escaped_and_mid_field_quotes_parse() {
        let table = reader()
            .read_bytes(b"name,note\n\"Mapo \"\"Old\"\" Bridge\",5\" pipe\n\"multi\nline\",x\n")
            .unwrap();
        let rows: Vec<Row> = table.rows().collect();

        assert_eq!(rows[0].get("name"), Some("Mapo \"Old\" Bridge"));
        assert_eq!(rows[0].get("note"), Some("5\" pipe"));
        assert_eq!(rows[1].get("name"), Some("multi\nline"));
    }

    #[test]
    fn test_read_path_missing_and_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("Bridges.csv");
        assert!(matches!(reader().read_path(&missing), Err(JobError::SourceMissing(_))));

        let ragged = dir.path().join("Ragged.csv");
        fs::write(&ragged, b"a,b\n1,2,3\n").unwrap();
        match reader().read_path(&ragged) {
            Err(JobError::SourceUnreadable { path, source, .. }) => {
                assert_eq!(path, ragged);
                assert!(matches!(source, CsvError::RowTooWide { .. }));
            }
            other => panic!("expected SourceUnreadable, got {:?}", other),
        }
    }

    #[test]
    fn test_to_json_keeps_header_order() {
        let table = Table::new(
            vec!["b".into(), "a".into()],
            vec![vec![Some("1".into())]],
        );
        let json = serde_json::to_string(&table.to_json()).unwrap();
        assert_eq!(json, r#"[{"b":"1","a":null}]"#);
    }

    #[test]
    fn test_detect_encoding() {
        assert_eq!(detect_encoding(b""), "unknown");
        assert!(!detect_encoding(b"plain ascii text, nothing special").is_empty());
    }
}
