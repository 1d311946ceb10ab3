use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use clap::Parser;
use tapdrag_core::DetectorConfig;
use tracing_subscriber::EnvFilter;

use crate::demo::DemoPage;
use crate::error::{ReplayError, Result};
use crate::replay::replay;

#[derive(Debug, Parser)]
#[command(
    name = "tapdrag-replay",
    about = "Replay scripted pointer/touch input against a demo page with a draggable card",
    version
)]
pub struct Cli {
    /// JSONL script to replay; reads stdin when absent or `-`.
    pub script: Option<PathBuf>,

    /// Movement (px) a gesture must exceed to count as a drag.
    #[arg(long, default_value_t = tapdrag_core::gesture::DEFAULT_TRIGGER_DISTANCE)]
    pub trigger_distance: f64,

    /// Detection timeout in ms; `0` disables it.
    #[arg(long)]
    pub timeout_ms: Option<f64>,

    /// Selector for the element a drag moves (default `.card`).
    #[arg(long)]
    pub selector: Option<String>,
}

pub fn run_from_env() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(cli)
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> Result<()> {
    let config = DetectorConfig::new(cli.trigger_distance, cli.timeout_ms)?;
    let demo = DemoPage::new(config, cli.selector.as_deref())
        .map_err(|err| ReplayError::invalid(err.to_string()))?;
    let script: Box<dyn BufRead> = match cli.script.as_deref() {
        None => Box::new(io::stdin().lock()),
        Some(path) if path.as_os_str() == "-" => Box::new(io::stdin().lock()),
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let steps = replay(&demo, script, &mut out)?;
    tracing::info!(steps, "replay complete");
    Ok(())
}
