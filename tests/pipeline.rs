//! End-to-end pass over on-disk inputs: load, classify, write, read back.

use std::fs;
use std::io::Write;
use std::path::Path;

use flow_log_analyzer::classifier::FlowClassifier;
use flow_log_analyzer::lookup::{LookupKey, ReferenceTable};
use flow_log_analyzer::summary::RunSummary;
use flow_log_analyzer::writer::CountsWriter;
use flow_log_analyzer::AnalyzerError;
use tempfile::TempDir;

const LOOKUP_TABLE: &str = "\
dstport,protocol,tag
25,tcp,sv_P1
68,udp,sv_P2
23,tcp,sv_P1
31,udp,SV_P3
443,tcp,sv_P2
22,tcp,sv_P4
3389,tcp,sv_P5
0,icmp,sv_P5
110,tcp,email
993,tcp,email
143,tcp,email
";

const FLOW_LOGS: &str = "\
2 123456789012 eni-0a1b2c3d 10.0.1.201 198.51.100.2 443 49153 6 25 20000 1620140761 1620140821 ACCEPT OK
2 123456789012 eni-4d3c2b1a 192.168.1.100 203.0.113.101 23 49154 6 15 12000 1620140761 1620140821 REJECT OK
2 123456789012 eni-5e6f7g8h 192.168.1.101 198.51.100.3 25 49155 6 10 8000 1620140761 1620140821 ACCEPT OK
2 123456789012 eni-9h8g7f6e 172.16.0.100 203.0.113.102 110 110 6 12 9000 1620140761 1620140821 ACCEPT OK
2 123456789012 eni-7i8j9k0l 172.16.0.101 192.0.2.203 993 993 6 8 5000 1620140761 1620140821 ACCEPT OK
2 123456789012 eni-6m7n8o9p 10.0.2.200 198.51.100.4 143 143 6 18 14000 1620140761 1620140821 ACCEPT OK
2 123456789012 eni-1a2b3c4d 192.168.0.1 203.0.113.12 1024 80 6 10 5000 1620140661 1620140721 ACCEPT OK
2 123456789012 eni-1a2b3c4d 203.0.113.12 192.168.0.1 80 1024 6 12 6000 1620140661 1620140721 ACCEPT OK
2 123456789012 eni-0a1b2c3d 10.0.1.201 198.51.100.2 0 445 1 1 84 1620140761 1620140821 ACCEPT OK
2 123456789012 eni-0a1b2c3d 10.0.1.201 198.51.100.2 1723 1723 47 3 180 1620140761 1620140821 ACCEPT OK
2 123456789012 eni-short 10.0.1.201 198.51.100.2
";

fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

fn read_csv(path: &Path) -> Vec<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .unwrap();
    rdr.records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect()
}

#[test]
fn test_full_pipeline() {
    let dir = TempDir::new().unwrap();
    let lookup = write_file(dir.path(), "lookup_table.csv", LOOKUP_TABLE);
    let flows = write_file(dir.path(), "flow_logs.txt", FLOW_LOGS);

    let table = ReferenceTable::load(&lookup).unwrap();
    assert_eq!(table.len(), 11);

    let mut classifier = FlowClassifier::new(&table);
    classifier.process_file(&flows).unwrap();
    let report = classifier.finish();

    assert_eq!(report.lines_seen, 11);
    assert_eq!(report.lines_processed, 10);
    assert_eq!(report.total_port_protocol(), 10);
    assert_eq!(report.total_tags(), 10);

    assert_eq!(report.tag_counts.get("email"), Some(&3));
    assert_eq!(report.tag_counts.get("sv_P5"), Some(&1));
    assert_eq!(report.tag_counts.get("Untagged"), Some(&6));
    assert_eq!(
        report.port_protocol_counts.get(&LookupKey::new("0", "icmp")),
        Some(&1)
    );
    assert_eq!(
        report.port_protocol_counts.get(&LookupKey::new("1723", "unknown")),
        Some(&1)
    );

    let tag_path = dir.path().join("tag_counts.csv");
    let port_path = dir.path().join("port_protocol_counts.csv");
    let failures = CountsWriter::new(&tag_path, &port_path).write(&report);
    assert!(failures.is_empty());

    let tag_rows = read_csv(&tag_path);
    assert_eq!(tag_rows[0], vec!["Tag", "Count"]);
    assert_eq!(tag_rows[1], vec!["Untagged", "6"]);
    assert_eq!(tag_rows.len(), 1 + report.tag_counts.len());

    let port_rows = read_csv(&port_path);
    assert_eq!(port_rows[0], vec!["Port", "Protocol", "Count"]);
    assert_eq!(port_rows.len(), 1 + report.port_protocol_counts.len());

    let summary = RunSummary::new(&table, &report);
    assert_eq!(summary.lines_skipped, 1);
    assert_eq!(summary.write_failures, 0);
}

#[test]
fn test_missing_inputs_are_fatal() {
    let dir = TempDir::new().unwrap();

    let err = ReferenceTable::load(dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, AnalyzerError::ResourceNotFound { .. }));

    let table = ReferenceTable::new();
    let mut classifier = FlowClassifier::new(&table);
    let err = classifier
        .process_file(dir.path().join("absent.txt"))
        .unwrap_err();
    assert!(matches!(err, AnalyzerError::ResourceNotFound { .. }));
}
