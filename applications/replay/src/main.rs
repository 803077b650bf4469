/// SetCast replay - drive the show controller from a timed script
use anyhow::Context;
use clap::Parser;
use setcast_replay::{config::ReplayConfig, script, simulated_controller};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "setcast-replay")]
#[command(about = "Replay show targets against the playback reconciler", long_about = None)]
struct Cli {
    /// Script of timed inputs (JSON)
    #[arg(short, long)]
    script: PathBuf,

    /// Configuration file path (defaults to ./setcast.toml if present)
    #[arg(short, long, env = "SETCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Time multiplier, overrides the configured speed
    #[arg(long)]
    speed: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ReplayConfig::load(cli.config.as_deref())?;
    if let Some(speed) = cli.speed {
        config.speed = speed;
    }
    config.validate()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let steps = script::load(&cli.script)?;
    let mut controller = simulated_controller(&config);

    let mut write_error = None;
    let replay = setcast_replay::run(&mut controller, steps, config.speed, |outcome| {
        if write_error.is_some() {
            return;
        }
        match serde_json::to_string(outcome) {
            Ok(line) => println!("{line}"),
            Err(e) => write_error = Some(e),
        }
    })
    .await;
    controller.dispose();
    replay?;

    if let Some(e) = write_error {
        return Err(e).context("Failed to serialize step outcome");
    }
    Ok(())
}
