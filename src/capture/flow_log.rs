use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::analysis::lookup::LookupKey;
use crate::analysis::protocols::ProtocolType;
use crate::error::{AnalyzerError, Result};

/// Whitespace-separated field holding the destination port (0-based).
pub const DST_PORT_FIELD: usize = 6;
/// Whitespace-separated field holding the IANA protocol number (0-based).
pub const PROTOCOL_FIELD: usize = 7;
/// Records with fewer fields than this are rejected.
pub const MIN_FIELDS: usize = 8;

/// Destination port recorded for protocols without ports.
pub const PORTLESS_DST_PORT: &str = "0";

/// The parts of a flow log record the classifier cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRecord {
    pub dst_port: String,
    pub protocol: ProtocolType,
}

impl FlowRecord {
    /// Join key for this record. ICMP records always use port "0".
    pub fn lookup_key(&self) -> LookupKey {
        let port = if self.protocol.has_ports() {
            self.dst_port.as_str()
        } else {
            PORTLESS_DST_PORT
        };
        LookupKey::new(port, self.protocol.name().to_lowercase())
    }
}

/// One line read from a flow log, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub number: u64,
    pub text: std::result::Result<String, Vec<u8>>,
}

pub struct FlowLogParser;

impl FlowLogParser {
    /// Parse a single flow log line, e.g. a default-format VPC flow log v2 record:
    ///
    /// ```text
    /// 2 123456789012 eni-0a1b2c3d 10.0.1.201 198.51.100.2 443 49153 6 25 20000 1620140761 1620140821 ACCEPT OK
    /// ```
    pub fn parse_line(line: &str, line_number: u64) -> Result<FlowRecord> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < MIN_FIELDS {
            return Err(AnalyzerError::MalformedLine {
                line_number,
                reason: format!(
                    "expected at least {} fields, found {}",
                    MIN_FIELDS,
                    fields.len()
                ),
            });
        }

        let dst_port = Self::field(&fields, DST_PORT_FIELD, line_number)?;
        let protocol_num = Self::field(&fields, PROTOCOL_FIELD, line_number)?;

        Ok(FlowRecord {
            dst_port: dst_port.to_string(),
            protocol: ProtocolType::from_number(protocol_num),
        })
    }

    fn field<'a>(fields: &[&'a str], index: usize, line_number: u64) -> Result<&'a str> {
        fields
            .get(index)
            .copied()
            .ok_or_else(|| AnalyzerError::MalformedLine {
                line_number,
                reason: format!("no field at index {}", index),
            })
    }
}

/// Streams lines from a flow log without holding the whole file in memory.
pub struct FlowLogSource<R> {
    reader: R,
    name: String,
    line_number: u64,
    buf: Vec<u8>,
}

impl FlowLogSource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| AnalyzerError::from_open(path, e))?;
        Ok(Self::from_reader(
            BufReader::new(file),
            path.display().to_string(),
        ))
    }
}

impl<R: BufRead> FlowLogSource<R> {
    pub fn from_reader(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader,
            name: name.into(),
            line_number: 0,
            buf: Vec::new(),
        }
    }

    /// Name used in log messages, usually the file path.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lines_read(&self) -> u64 {
        self.line_number
    }
}

impl<R: BufRead> Iterator for FlowLogSource<R> {
    type Item = Result<RawLine>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.line_number += 1;
                while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
                    self.buf.pop();
                }
                let bytes = std::mem::take(&mut self.buf);
                let text = String::from_utf8(bytes).map_err(|e| e.into_bytes());
                Some(Ok(RawLine {
                    number: self.line_number,
                    text,
                }))
            }
            Err(e) => Some(Err(AnalyzerError::Io {
                path: PathBuf::from(&self.name),
                source: e,
            })),
        }
    }
}
