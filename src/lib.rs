// Library exports for flow-log-analyzer
pub mod analysis;
pub mod capture;
pub mod config;
pub mod error;
pub mod report;
pub mod traffic;
pub mod utils;

pub use analysis::{lookup, protocols};
pub use capture::flow_log;
pub use config::settings;
pub use report::{summary, writer};
pub use traffic::classifier;
pub use utils::formatting;

pub use error::{AnalyzerError, Result};
