use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use url_trust_engine::{
    config::Config,
    routes::{router, AppState},
    LinearModel, PublicSuffixTable, TrustEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "url_trust_engine=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    info!("Loaded configuration: {:?}", config);

    // Refuse to start on a missing or mismatched model
    let suffixes = PublicSuffixTable::load(
        config.public_suffix_path.as_deref(),
        config.include_private_suffixes,
    )?;
    let classifier = LinearModel::load(&config.model_path, &config.feature_spec_path)?;

    let engine = TrustEngine::new(Arc::new(classifier), Arc::new(suffixes), config.blend);

    // Initialize metrics exporter
    let metrics = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    let app = router(AppState::new(Arc::new(engine), Some(metrics)));

    let addr: SocketAddr = config.bind_addr.parse()?;
    info!("Starting {} on {}", config.app_name, addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Shutdown signal received, starting graceful shutdown");
}
