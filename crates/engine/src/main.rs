//! Krazy Planet engine - Turso gateway entry point.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use krazyplanet_engine::infrastructure::{
    bus::NatsBus, clock::SystemClock, config::AppConfig, ports::MessageBus,
};
use krazyplanet_engine::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    let config = AppConfig::from_env()?;

    // RUST_LOG wins over the configured level.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.filter_directive().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(service = %config.service_name, "Starting Krazy Planet engine");
    config.validate().context("Invalid configuration")?;
    tracing::info!("Configuration loaded");
    tracing::info!("  NATS: {}", config.nats_url);
    tracing::info!("  Turso: {}", config.database.url);
    tracing::info!("  Log level: {:?}", config.log_level);

    let cancel_token = CancellationToken::new();
    setup_shutdown_signal(cancel_token.clone());

    let bus: Arc<dyn MessageBus> = Arc::new(
        NatsBus::connect(&config.nats_url)
            .await
            .context("Failed to connect to NATS")?,
    );

    let app = App::build(&config, bus, Arc::new(SystemClock))
        .context("Failed to build database client")?;
    app.prepare().await.context("Startup checks failed")?;

    app.run(cancel_token).await?;
    tracing::info!("Engine stopped");
    Ok(())
}

/// Cancel `cancel_token` on Ctrl+C or SIGTERM.
fn setup_shutdown_signal(cancel_token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown...");
            }
        }

        cancel_token.cancel();
    });
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
    // Also pick up a .env next to the working directory when run elsewhere.
    let _ = dotenvy::dotenv();
}
