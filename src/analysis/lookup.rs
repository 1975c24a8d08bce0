use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::error::{AnalyzerError, Result};

pub const DSTPORT_COLUMN: &str = "dstport";
pub const PROTOCOL_COLUMN: &str = "protocol";
pub const TAG_COLUMN: &str = "tag";

/// Tag given to reference rows that have no tag column.
pub const UNKNOWN_TAG: &str = "unknown";

/// Tag counted for flows whose key has no reference entry.
pub const UNTAGGED: &str = "Untagged";

/// Join key between reference rows and flow records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LookupKey {
    pub port: String,
    pub protocol: String,
}

impl LookupKey {
    pub fn new(port: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            protocol: protocol.into(),
        }
    }

    /// Trims both parts and lowercases the protocol name.
    pub fn normalized(port: &str, protocol: &str) -> Self {
        Self::new(port.trim(), protocol.trim().to_lowercase())
    }
}

impl std::fmt::Display for LookupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.port, self.protocol)
    }
}

/// Positions of the named columns in the header row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    dstport: Option<usize>,
    protocol: Option<usize>,
    tag: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let position = |name: &str| headers.iter().position(|h| h == name);
        Self {
            dstport: position(DSTPORT_COLUMN),
            protocol: position(PROTOCOL_COLUMN),
            tag: position(TAG_COLUMN),
        }
    }

    fn field<'r>(record: &'r StringRecord, index: Option<usize>, name: &str) -> Result<&'r str> {
        index
            .and_then(|i| record.get(i))
            .ok_or_else(|| AnalyzerError::MissingColumn(name.to_string()))
    }

    fn parse_row(&self, record: &StringRecord) -> Result<(LookupKey, String)> {
        let dstport = Self::field(record, self.dstport, DSTPORT_COLUMN)?;
        let protocol = Self::field(record, self.protocol, PROTOCOL_COLUMN)?;
        let tag = Self::field(record, self.tag, TAG_COLUMN).unwrap_or(UNKNOWN_TAG);

        Ok((LookupKey::normalized(dstport, protocol), tag.trim().to_string()))
    }
}

/// Maps (dstport, protocol) pairs to tags. Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceTable {
    entries: HashMap<LookupKey, String>,
    skipped_rows: usize,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the table from a CSV file with a header row.
    ///
    /// A missing file is the only error returned. Rows without a required
    /// column are skipped with a warning; a read or format error part way
    /// through keeps the rows loaded before it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                let err = AnalyzerError::from_open(path, e);
                if err.is_not_found() {
                    error!("{}", err);
                    return Err(err);
                }
                // Matches the behaviour for mid-stream errors: log and carry on
                // with what we have, which here is nothing.
                error!("Unexpected error loading lookup table from {}: {}", path.display(), err);
                return Ok(Self::new());
            }
        };

        let table = Self::from_reader(file);
        info!(
            "Lookup table loaded successfully from {} with {} tags.",
            path.display(),
            table.len()
        );
        Ok(table)
    }

    /// Build the table from any CSV source with a header row.
    pub fn from_reader<R: Read>(reader: R) -> Self {
        let mut table = Self::new();
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns = match rdr.headers() {
            Ok(headers) => Columns::from_headers(headers),
            Err(e) => {
                error!("Error reading lookup table header: {}", e);
                return table;
            }
        };

        for result in rdr.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    error!("Error reading lookup table: {}", e);
                    break;
                }
            };

            // Whitespace-only line; rows of empty fields such as ",," still load.
            if record.len() == 1 && record[0].is_empty() {
                continue;
            }

            match columns.parse_row(&record) {
                Ok((key, tag)) => {
                    if let Some(previous) = table.entries.get(&key) {
                        debug!("Tag for {} replaced: {} -> {}", key, previous, tag);
                    }
                    table.entries.insert(key, tag);
                }
                Err(e) => {
                    let line = record.position().map(|p| p.line()).unwrap_or_default();
                    warn!("Missing expected column in CSV row {}: {}", line, e);
                    table.skipped_rows += 1;
                }
            }
        }

        table
    }

    /// Last write wins for a repeated key.
    pub fn insert(&mut self, key: LookupKey, tag: impl Into<String>) {
        self.entries.insert(key, tag.into());
    }

    pub fn get(&self, key: &LookupKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Tag for `key`, falling back to `UNTAGGED`.
    pub fn tag_for(&self, key: &LookupKey) -> &str {
        self.get(key).unwrap_or(UNTAGGED)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows dropped during loading for lacking a required column.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LookupKey, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }
}
