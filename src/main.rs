use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use liveness_poller::config::{fetch_agent_setting, Settings};
use liveness_poller::core::{DeviceConnector, DeviceWorker, EngineState, Supervisor};
use liveness_poller::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(version, about = "Poll devices and URLs for liveness, one JSON line per round")]
struct Cli {
    /// Settings file; relative paths resolve against the working directory
    #[arg(short, long, default_value = "etc/poller.yml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the rounds, so diagnostics go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "liveness_poller=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let path = resolve(cli.config)?;
    let settings = Settings::load(&path)?;
    let agent = fetch_agent_setting(settings.agent_setting_url()?).await?;

    // Every probe of both kinds is built before either kind starts, so a
    // bad target leaves nothing running.
    let devices = match device_connector() {
        Some(connector) => {
            let worker = DeviceWorker::new(settings.snmp()?.credentials(), connector)?;
            Some(Supervisor::new(worker, agent.device_targets(), std::io::stdout())?.prepare()?)
        }
        None => {
            tracing::warn!("built without the `snmp` feature, device targets are not polled");
            None
        }
    };
    let urls = Supervisor::new(
        settings.url()?.worker(),
        agent.url_targets(),
        std::io::stdout(),
    )?
    .prepare()?;

    let mut states = vec![urls.state()];
    if let Some(devices) = &devices {
        states.push(devices.state());
    }
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown requested, finishing current cycle");
                stop_all(&states);
            }
            Err(e) => tracing::error!("failed to listen for shutdown signal: {e}"),
        }
    });

    tokio::join!(
        async {
            if let Some(devices) = devices {
                devices.run().await;
            }
        },
        urls.run(),
    );
    Ok(())
}

fn stop_all(states: &[EngineState]) {
    for state in states {
        state.stop();
    }
}

fn resolve(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    match std::env::current_dir() {
        Ok(dir) => Ok(dir.join(path)),
        Err(source) => Err(Error::ReadSettings { path, source }),
    }
}

#[cfg(feature = "snmp")]
fn device_connector() -> Option<Arc<dyn DeviceConnector>> {
    Some(Arc::new(liveness_poller::core::snmp::Snmp3Connector))
}

#[cfg(not(feature = "snmp"))]
fn device_connector() -> Option<Arc<dyn DeviceConnector>> {
    None
}
