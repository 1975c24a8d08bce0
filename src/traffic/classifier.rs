use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use log::{debug, error, info, warn};

use crate::analysis::lookup::{LookupKey, ReferenceTable, UNTAGGED};
use crate::capture::flow_log::{FlowLogParser, FlowLogSource, FlowRecord};
use crate::error::{AnalyzerError, Result};
use crate::utils::formatting::truncate_string;

pub type PortProtocolCounts = HashMap<LookupKey, u64>;
pub type TagCounts = HashMap<String, u64>;

/// Longest slice of an offending line echoed into the log.
const MAX_LOGGED_LINE: usize = 200;

/// Counts produced by one classification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationReport {
    pub port_protocol_counts: PortProtocolCounts,
    pub tag_counts: TagCounts,
    pub lines_seen: u64,
    pub lines_processed: u64,
    pub sources: usize,
}

impl ClassificationReport {
    pub fn lines_skipped(&self) -> u64 {
        self.lines_seen - self.lines_processed
    }

    pub fn untagged(&self) -> u64 {
        self.tag_counts.get(UNTAGGED).copied().unwrap_or(0)
    }

    /// Total over the port/protocol table; equals `lines_processed`.
    pub fn total_port_protocol(&self) -> u64 {
        self.port_protocol_counts.values().sum()
    }

    pub fn total_tags(&self) -> u64 {
        self.tag_counts.values().sum()
    }
}

/// Resolves flow records to a port/protocol key and a tag, and counts both.
pub struct FlowClassifier<'a> {
    table: &'a ReferenceTable,
    report: ClassificationReport,
}

impl<'a> FlowClassifier<'a> {
    pub fn new(table: &'a ReferenceTable) -> Self {
        Self {
            table,
            report: ClassificationReport::default(),
        }
    }

    /// Classify every line of a flow log file.
    ///
    /// Fails only when the file does not exist. Any other open error is
    /// logged and the file contributes no lines.
    pub fn process_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let source = match FlowLogSource::open(path) {
            Ok(source) => source,
            Err(err) if err.is_not_found() => {
                error!("Flow log file not found: {}", path.display());
                return Err(err);
            }
            Err(err) => {
                error!("Unexpected error parsing flow logs from {}: {}", path.display(), err);
                self.report.sources += 1;
                return Ok(());
            }
        };
        self.process_source(source);
        Ok(())
    }

    /// Classify every line from an in-memory or already opened reader.
    pub fn process_reader<R: BufRead>(&mut self, reader: R, name: &str) {
        self.process_source(FlowLogSource::from_reader(reader, name));
    }

    fn process_source<R: BufRead>(&mut self, source: FlowLogSource<R>) {
        let name = source.name().to_string();
        let seen_before = self.report.lines_seen;
        let processed_before = self.report.lines_processed;

        for line in source {
            match line {
                Ok(raw) => match raw.text {
                    Ok(text) => {
                        if let Err(e) = self.process_line(&text, raw.number) {
                            debug!("Skipped line {} of {}: {}", raw.number, name, e.kind());
                        }
                    }
                    Err(bytes) => {
                        self.report.lines_seen += 1;
                        warn!(
                            "Invalid log line {}: not valid UTF-8: {}",
                            raw.number,
                            truncate_string(&String::from_utf8_lossy(&bytes), MAX_LOGGED_LINE)
                        );
                    }
                },
                Err(e) => {
                    error!("Unexpected error parsing flow logs from {}: {}", name, e);
                    break;
                }
            }
        }

        self.report.sources += 1;
        info!(
            "Loaded flow logs from {}. Found {} logs, successfully processed {} logs.",
            name,
            self.report.lines_seen - seen_before,
            self.report.lines_processed - processed_before
        );
    }

    /// Classify one line and count it. Malformed lines are logged, counted
    /// as seen, and returned as errors without touching the tables.
    pub fn process_line(&mut self, line: &str, line_number: u64) -> Result<LookupKey> {
        self.report.lines_seen += 1;
        match FlowLogParser::parse_line(line, line_number) {
            Ok(record) => Ok(self.record(&record)),
            Err(err) => {
                if let AnalyzerError::MalformedLine { reason, .. } = &err {
                    warn!(
                        "Invalid log line {} ({}): {}",
                        line_number,
                        reason,
                        truncate_string(line.trim_end(), MAX_LOGGED_LINE)
                    );
                } else {
                    error!(
                        "Error processing line '{}': {}",
                        truncate_string(line.trim_end(), MAX_LOGGED_LINE),
                        err
                    );
                }
                Err(err)
            }
        }
    }

    /// Count an already parsed record.
    pub fn record(&mut self, record: &FlowRecord) -> LookupKey {
        let key = record.lookup_key();
        let tag = self.table.tag_for(&key).to_string();

        *self.report.port_protocol_counts.entry(key.clone()).or_insert(0) += 1;
        *self.report.tag_counts.entry(tag).or_insert(0) += 1;
        self.report.lines_processed += 1;
        key
    }

    pub fn report(&self) -> &ClassificationReport {
        &self.report
    }

    pub fn finish(self) -> ClassificationReport {
        self.report
    }
}
