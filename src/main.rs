//! Reactgram client entry point

use reactgram::{ClientState, auth::Destination, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging from the logging section
/// 3. Initialize metrics
/// 4. Initialize ClientState
/// 5. Resolve the first screen from the stored session
/// 6. Warm the home feed when signed in
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.default_filter().into());

    if config.logging.is_json() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting Reactgram...");
    tracing::info!(
        endpoint = %config.backend.base_url(),
        project = %config.backend.project_id,
        "Configuration loaded"
    );
    config.warn_insecure();

    // 3. Initialize metrics
    reactgram::metrics::init_metrics();

    // 4. Initialize client state
    let state = ClientState::new(config).await?;

    // 5. Resolve first screen
    let destination = state.bootstrap().await?;
    tracing::info!(?destination, "Startup destination resolved");

    // 6. Warm the home feed
    if destination == Destination::Feed {
        let recent = state.queries.recent_posts().await;
        match (recent.data, recent.error) {
            (Some(posts), _) => tracing::info!(count = posts.len(), "Home feed loaded"),
            (None, Some(error)) => tracing::error!(%error, "Home feed failed to load"),
            (None, None) => tracing::debug!("Home feed still loading"),
        }
    }

    tracing::debug!(metrics = %reactgram::metrics::render(), "Metrics snapshot");

    Ok(())
}
