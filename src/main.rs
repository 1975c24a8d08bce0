use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use flow_log_analyzer::{
    classifier::FlowClassifier,
    lookup::ReferenceTable,
    settings::Config,
    summary::RunSummary,
    writer::{CountsWriter, RowOrder},
};
use log::{error, info};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flow-log-analyzer")]
#[command(about = "Tag flow log records by destination port and protocol, then count tags and port/protocol pairs")]
struct Cli {
    #[arg(short, long, help = "Configuration file path (TOML)")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Lookup table CSV with dstport,protocol,tag columns")]
    lookup: Option<PathBuf>,

    #[arg(short = 'f', long = "flow-log", help = "Flow log file to analyze (repeatable)")]
    flow_logs: Vec<PathBuf>,

    #[arg(long, help = "Output CSV for tag counts")]
    tag_output: Option<PathBuf>,

    #[arg(long, help = "Output CSV for port/protocol counts")]
    port_output: Option<PathBuf>,

    #[arg(long, help = "Also write a JSON run summary to this path")]
    summary_json: Option<PathBuf>,

    #[arg(long, help = "Write rows in map order instead of sorting them")]
    unsorted: bool,

    #[arg(short, long, help = "Enable debug logging")]
    debug: bool,

    #[arg(long, help = "Print the effective configuration as TOML and exit")]
    print_config: bool,
}

impl Cli {
    fn effective_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from_file(path)?,
            None => Config::default(),
        };

        if let Some(lookup) = &self.lookup {
            config.input.reference_table = lookup.clone();
        }
        if !self.flow_logs.is_empty() {
            config.input.flow_logs = self.flow_logs.clone();
        }
        if let Some(path) = &self.tag_output {
            config.output.tag_counts = path.clone();
        }
        if let Some(path) = &self.port_output {
            config.output.port_protocol_counts = path.clone();
        }
        if self.summary_json.is_some() {
            config.output.summary_json = self.summary_json.clone();
        }
        if self.unsorted {
            config.output.sort_rows = false;
        }
        if self.debug {
            config.logging.level = "debug".to_string();
        }

        config.validate()?;
        Ok(config)
    }
}

fn run(config: &Config) -> anyhow::Result<RunSummary> {
    let table = ReferenceTable::load(&config.input.reference_table).with_context(|| {
        format!(
            "Cannot load lookup table {}",
            config.input.reference_table.display()
        )
    })?;

    let mut classifier = FlowClassifier::new(&table);
    for path in &config.input.flow_logs {
        classifier
            .process_file(path)
            .with_context(|| format!("Cannot analyze flow log {}", path.display()))?;
    }
    let report = classifier.finish();

    let writer = CountsWriter::new(
        config.output.tag_counts.clone(),
        config.output.port_protocol_counts.clone(),
    )
    .with_order(RowOrder::from_sorted(config.output.sort_rows));
    let failures = writer.write(&report);

    let summary = RunSummary::new(&table, &report).with_write_failures(failures.len());
    if let Some(path) = &config.output.summary_json {
        match summary.write_json(path) {
            Ok(()) => info!("Wrote run summary to {}", path.display()),
            Err(e) => error!("{}", e),
        }
    }
    Ok(summary)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.effective_config()?;

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    env_logger::Builder::from_env(Env::default().default_filter_or(config.logging.level.as_str()))
        .init();

    let summary = run(&config)?;
    println!("{}", summary);
    if summary.write_failures > 0 {
        eprintln!(
            "Warning: {} output file(s) could not be written, see log for details",
            summary.write_failures
        );
    }
    Ok(())
}
