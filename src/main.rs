use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payflow::config::OrchestratorConfig;
use payflow::interfaces::csv::state_writer::StateWriter;
use payflow::interfaces::scenario::Scenario;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scenario JSON file with the payment and the scripted gateway replies
    scenario: PathBuf,

    /// Orchestrator settings file (TOML, YAML or JSON). PAYFLOW__* variables
    /// override it.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "payflow=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = OrchestratorConfig::load(cli.config.as_deref()).into_diagnostic()?;

    let file = File::open(&cli.scenario).into_diagnostic()?;
    let scenario = Scenario::from_reader(io::BufReader::new(file)).into_diagnostic()?;
    info!(scenario = %cli.scenario.display(), mode = ?scenario.mode, "Replaying scenario");

    let states = scenario.run(&config).await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = StateWriter::new(stdout.lock());
    writer.write_states(&states).into_diagnostic()?;

    Ok(())
}
