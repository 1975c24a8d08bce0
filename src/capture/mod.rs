pub mod flow_log;

pub use flow_log::{FlowLogParser, FlowLogSource, FlowRecord, RawLine};
