use std::path::Path;

use serde::Serialize;

use crate::analysis::lookup::ReferenceTable;
use crate::error::{AnalyzerError, Result};
use crate::traffic::classifier::ClassificationReport;
use crate::utils::formatting::{format_count, format_percentage};

/// What a run saw and did, for the console and the optional JSON report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub reference_entries: usize,
    pub reference_rows_skipped: usize,
    pub flow_log_files: usize,
    pub lines_seen: u64,
    pub lines_processed: u64,
    pub lines_skipped: u64,
    pub distinct_tags: usize,
    pub distinct_port_protocols: usize,
    pub untagged: u64,
    pub write_failures: usize,
}

impl RunSummary {
    pub fn new(table: &ReferenceTable, report: &ClassificationReport) -> Self {
        Self {
            reference_entries: table.len(),
            reference_rows_skipped: table.skipped_rows(),
            flow_log_files: report.sources,
            lines_seen: report.lines_seen,
            lines_processed: report.lines_processed,
            lines_skipped: report.lines_skipped(),
            distinct_tags: report.tag_counts.len(),
            distinct_port_protocols: report.port_protocol_counts.len(),
            untagged: report.untagged(),
            write_failures: 0,
        }
    }

    pub fn with_write_failures(mut self, failures: usize) -> Self {
        self.write_failures = failures;
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let write_failure = |reason: String| AnalyzerError::WriteFailure {
            path: path.to_path_buf(),
            reason,
        };
        let json = self.to_json().map_err(|e| write_failure(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| write_failure(e.to_string()))
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Reference table: {} entries ({} rows skipped)",
            format_count(self.reference_entries as u64),
            format_count(self.reference_rows_skipped as u64)
        )?;
        writeln!(
            f,
            "Flow logs: {} file(s), {} lines seen, {} processed ({}), {} skipped",
            self.flow_log_files,
            format_count(self.lines_seen),
            format_count(self.lines_processed),
            format_percentage(self.lines_processed, self.lines_seen),
            format_count(self.lines_skipped)
        )?;
        write!(
            f,
            "Distinct tags: {}, distinct port/protocol pairs: {}, untagged flows: {}",
            format_count(self.distinct_tags as u64),
            format_count(self.distinct_port_protocols as u64),
            format_count(self.untagged)
        )
    }
}
