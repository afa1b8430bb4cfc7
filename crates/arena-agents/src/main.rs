//! `arena-agents`: run one two-solver coding competition end to end.
//!
//! ```bash
//! ARENA_API_KEY=sk-... arena-agents --rounds 2 --output run.json
//! arena-agents --config arena.toml --model qwen2.5-coder --skip-preflight
//! RUST_LOG=arena_agents=debug,competition=debug arena-agents
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use arena_agents::config::check_endpoint;
use arena_agents::{AgentFactory, ArenaConfig, RunReport};
use clap::Parser;
use competition::Competition;
use tracing::{error, info, warn};

/// Command-line arguments. Flags override the environment and config file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of rounds (overrides ARENA_MAX_ROUNDS)
    #[arg(long)]
    rounds: Option<u32>,

    /// Model name for every role (overrides ARENA_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f64>,

    /// Write the JSON run report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Skip the endpoint reachability check
    #[arg(long, default_value_t = false)]
    skip_preflight: bool,
}

impl Args {
    fn apply(&self, config: &mut ArenaConfig) {
        if let Some(rounds) = self.rounds {
            config.competition.max_rounds = rounds;
        }
        if let Some(model) = &self.model {
            config.competition.model.model_name = model.clone();
        }
        if let Some(temperature) = self.temperature {
            config.competition.model.temperature = temperature;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = ArenaConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(
        endpoint = %config.endpoint.url,
        model = %config.competition.model.model_name,
        max_rounds = config.competition.max_rounds,
        interpreter = %config.sandbox.interpreter,
        "Competition arena starting"
    );

    if !args.skip_preflight {
        let key = Some(config.endpoint.api_key.as_str());
        if !check_endpoint(&config.endpoint.url, key).await {
            warn!(url = %config.endpoint.url, "Endpoint preflight failed, continuing anyway");
        }
    }

    let factory = AgentFactory::new(&config)?;
    let mut competition = Competition::new(config.competition.clone(), factory.roster())
        .context("Failed to set up competition")?;

    let outcome = competition.run().await;
    let report = RunReport::new(
        outcome,
        competition.agent_metrics(),
        &config.competition.model.model_name,
    );

    for line in &report.scoreboard {
        info!("{line}");
    }

    match &args.output {
        Some(path) => {
            report.write_to(path)?;
            info!(path = %path.display(), "Run report written");
        }
        None => println!("{}", report.to_json()?),
    }

    if report.failed() {
        error!(
            run_id = %report.run_id,
            termination = %report.termination,
            "Competition ended in error"
        );
        std::process::exit(1);
    }
    Ok(())
}
