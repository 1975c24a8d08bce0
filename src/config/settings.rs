use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AnalyzerError, Result};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    pub reference_table: PathBuf,
    pub flow_logs: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub tag_counts: PathBuf,
    pub port_protocol_counts: PathBuf,
    pub summary_json: Option<PathBuf>,
    pub sort_rows: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// env_logger filter used when RUST_LOG is unset.
    pub level: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            reference_table: PathBuf::from("lookup_table.csv"),
            flow_logs: vec![PathBuf::from("flow_logs.txt")],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            tag_counts: PathBuf::from("tag_counts.csv"),
            port_protocol_counts: PathBuf::from("port_protocol_counts.csv"),
            summary_json: None,
            sort_rows: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AnalyzerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| AnalyzerError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AnalyzerError::Config(e.to_string()))
    }

    /// Reject settings that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.input.flow_logs.is_empty() {
            return Err(AnalyzerError::Config(
                "at least one flow log file is required".to_string(),
            ));
        }
        if self.output.tag_counts == self.output.port_protocol_counts {
            return Err(AnalyzerError::Config(format!(
                "tag and port/protocol outputs both point at {}",
                self.output.tag_counts.display()
            )));
        }
        Ok(())
    }
}
