use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chatbridge::widget::ChatWidget;
use chatbridge::{BridgeConfig, OrchestratorBuilder, SurfaceView};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "chatbridge", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Request a session credential and report what the widget would show.
    Probe {
        /// TOML configuration file; defaults plus environment overrides when omitted.
        #[arg(env = "CHATBRIDGE_CONFIG")]
        config: Option<PathBuf>,
    },
}

/// Stand-in widget for running without a host page
struct HeadlessWidget;

#[async_trait]
impl ChatWidget for HeadlessWidget {
    fn is_registered(&self) -> bool {
        true
    }

    async fn send_message(&self, text: &str) -> chatbridge::Result<()> {
        info!("Widget would send: {}", text);
        Ok(())
    }
}

fn load_config(path: Option<&Path>) -> Result<BridgeConfig> {
    let config = match path {
        Some(path) => BridgeConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => BridgeConfig::default(),
    };
    Ok(config.apply_env())
}

async fn probe(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    info!("Probing session endpoint {}", config.session_endpoint);

    let (orchestrator, _events) = OrchestratorBuilder::new()
        .with_config(config)
        .with_widget(Arc::new(HeadlessWidget))
        .build()
        .context("Failed to build orchestrator")?;

    orchestrator.mount();
    let acquired = orchestrator.acquire_secret(None).await;

    match orchestrator.view() {
        SurfaceView::Interactive => info!("Surface: interactive"),
        SurfaceView::Loading => warn!("Surface: still loading"),
        SurfaceView::Blocked { slot, message, .. } => {
            warn!("Surface: blocked by {} error: {}", slot, message)
        }
    }
    orchestrator.unmount();

    match acquired {
        Ok(_) => {
            info!("Session credential acquired");
            Ok(())
        }
        Err(e) => bail!("Session probe failed: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatbridge=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Cli::parse().command {
        Command::Probe { config } => probe(config.as_deref()).await,
    }
}
