mod app;
mod config;
mod logging;
mod scenario;

use std::path::PathBuf;

use clap::Parser;
use relay_logging::relay_warn;

use crate::logging::LogDestination;
use crate::scenario::Scenario;

/// Opens several chat sites in a simulated browser and delivers one prompt to each.
#[derive(Parser)]
#[command(name = "relay_app")]
#[command(version)]
struct Cli {
    /// Scenario file (RON) describing sites and panel actions.
    #[arg(long)]
    scenario: PathBuf,

    /// Configuration file path.
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILENAME)]
    config: PathBuf,

    /// Overrides the log destination from the config file.
    #[arg(long, value_enum)]
    log: Option<LogDestination>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, problem) = config::load(&cli.config);
    logging::initialize(cli.log.unwrap_or(config.log));
    if let Some(problem) = problem {
        relay_warn!("{}; using defaults", problem);
    }

    let scenario = Scenario::load(&cli.scenario)?;
    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(app::run_scenario(&config, &scenario))?;
    println!("{}", report.render());
    Ok(())
}
