//! Roundtable - recurring meetup coordination service
//!
//! Runs the command layer's backing services plus the two background
//! schedulers. Alternatively runs a single scheduler cycle and exits, for
//! deployments that prefer an external cron:
//!
//! ```text
//! roundtable                   # serve with in-process timers (default)
//! roundtable --reconcile-once  # rebuild the availability window and exit
//! roundtable --dispatch-once   # run one reminder cycle and exit
//! ```

use std::sync::Arc;

use anyhow::Context;
use roundtable_app::AppContext;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging first so .env loading is visible.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match dotenvy::dotenv() {
        Ok(path) => tracing::info!(path = %path.display(), "loaded .env"),
        Err(e) => tracing::debug!(error = %e, "no .env file loaded"),
    }

    let config = roundtable_infra::config::load().context("failed to load configuration")?;
    let ctx = Arc::new(
        AppContext::new(config).await.context("failed to initialise application context")?,
    );

    match std::env::args().nth(1).as_deref() {
        Some("--reconcile-once") => {
            ctx.reconcile_once().await.context("reconciliation run failed")?;
        }
        Some("--dispatch-once") => {
            ctx.dispatch_once().await.context("dispatch run failed")?;
        }
        Some(other) => {
            anyhow::bail!("unknown argument '{other}' (expected --reconcile-once or --dispatch-once)");
        }
        None => {
            ctx.start_schedulers().await.context("failed to start schedulers")?;
            tracing::info!("roundtable running; press Ctrl+C to stop");

            tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
            ctx.shutdown().await.context("shutdown failed")?;
        }
    }

    Ok(())
}
