use std::io::Write;
use std::path::{Path, PathBuf};

use log::{error, info};

use crate::analysis::lookup::LookupKey;
use crate::error::{AnalyzerError, Result};
use crate::traffic::classifier::{ClassificationReport, PortProtocolCounts, TagCounts};

pub const TAG_HEADER: [&str; 2] = ["Tag", "Count"];
pub const PORT_PROTOCOL_HEADER: [&str; 3] = ["Port", "Protocol", "Count"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    /// Whatever order the count map iterates in.
    Unordered,
    /// Tags by count (highest first) then name; ports numerically then by protocol.
    Sorted,
}

impl RowOrder {
    pub fn from_sorted(sorted: bool) -> Self {
        if sorted {
            RowOrder::Sorted
        } else {
            RowOrder::Unordered
        }
    }
}

pub fn tag_rows(counts: &TagCounts, order: RowOrder) -> Vec<(&str, u64)> {
    let mut rows: Vec<(&str, u64)> = counts.iter().map(|(t, c)| (t.as_str(), *c)).collect();
    if order == RowOrder::Sorted {
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    }
    rows
}

pub fn port_protocol_rows(counts: &PortProtocolCounts, order: RowOrder) -> Vec<(&LookupKey, u64)> {
    let mut rows: Vec<(&LookupKey, u64)> = counts.iter().map(|(k, c)| (k, *c)).collect();
    if order == RowOrder::Sorted {
        // Non-numeric ports sort ahead of numeric ones.
        rows.sort_by_key(|(key, _)| {
            (
                key.port.parse::<u64>().ok(),
                key.port.clone(),
                key.protocol.clone(),
            )
        });
    }
    rows
}

pub fn write_tag_counts_to<W: Write>(writer: W, counts: &TagCounts, order: RowOrder) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(TAG_HEADER)?;
    for (tag, count) in tag_rows(counts, order) {
        let count = count.to_string();
        wtr.write_record([tag, count.as_str()])?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_port_protocol_counts_to<W: Write>(
    writer: W,
    counts: &PortProtocolCounts,
    order: RowOrder,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(PORT_PROTOCOL_HEADER)?;
    for (key, count) in port_protocol_rows(counts, order) {
        let count = count.to_string();
        wtr.write_record([key.port.as_str(), key.protocol.as_str(), count.as_str()])?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn create(path: &Path) -> Result<std::fs::File> {
    std::fs::File::create(path).map_err(|e| AnalyzerError::WriteFailure {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn as_write_failure(path: &Path, err: AnalyzerError) -> AnalyzerError {
    match err {
        AnalyzerError::WriteFailure { .. } => err,
        other => AnalyzerError::WriteFailure {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

pub fn write_tag_counts(path: impl AsRef<Path>, counts: &TagCounts, order: RowOrder) -> Result<()> {
    let path = path.as_ref();
    create(path)
        .and_then(|file| write_tag_counts_to(file, counts, order))
        .map_err(|e| as_write_failure(path, e))
}

pub fn write_port_protocol_counts(
    path: impl AsRef<Path>,
    counts: &PortProtocolCounts,
    order: RowOrder,
) -> Result<()> {
    let path = path.as_ref();
    create(path)
        .and_then(|file| write_port_protocol_counts_to(file, counts, order))
        .map_err(|e| as_write_failure(path, e))
}

/// Writes both count tables to their own files.
#[derive(Debug, Clone)]
pub struct CountsWriter {
    pub tag_path: PathBuf,
    pub port_protocol_path: PathBuf,
    pub order: RowOrder,
}

impl CountsWriter {
    pub fn new(tag_path: impl Into<PathBuf>, port_protocol_path: impl Into<PathBuf>) -> Self {
        Self {
            tag_path: tag_path.into(),
            port_protocol_path: port_protocol_path.into(),
            order: RowOrder::Sorted,
        }
    }

    pub fn with_order(mut self, order: RowOrder) -> Self {
        self.order = order;
        self
    }

    /// Write both files. A failure on one does not stop the other; every
    /// failure is logged and returned.
    pub fn write(&self, report: &ClassificationReport) -> Vec<AnalyzerError> {
        let mut failures = Vec::new();

        if let Err(e) = write_tag_counts(&self.tag_path, &report.tag_counts, self.order) {
            error!("Failed to write counts to file: {}", e);
            failures.push(e);
        }
        if let Err(e) = write_port_protocol_counts(
            &self.port_protocol_path,
            &report.port_protocol_counts,
            self.order,
        ) {
            error!("Failed to write counts to file: {}", e);
            failures.push(e);
        }

        if failures.is_empty() {
            info!(
                "Successfully wrote Tag Counts to {} and Port/Protocol Counts to {}.",
                self.tag_path.display(),
                self.port_protocol_path.display()
            );
        }
        failures
    }
}
