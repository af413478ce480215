use catalog::SledCatalog;
use axum::{extract::Request, ServiceExt};
use server_http::{build_app, AppState};
use shared::config::Config;
use std::path::Path;
use std::time::Duration;
use storage_engine::UnifiedStorageFactory;
use tagcache::{CacheConfig, CacheManager};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting BileMo HTTP Server...");

    // Load environment variables from .env file (if exists)
    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env();

    std::fs::create_dir_all(&config.data_dir)?;
    let catalog = SledCatalog::open(Path::new(&config.data_dir).join("catalog.sled"))?;
    info!("Catalog opened in {}", config.data_dir);

    let cache_config = CacheConfig::from_settings("bilemo", &config.cache);
    let cache = CacheManager::from_config(&cache_config, &UnifiedStorageFactory);
    info!(
        "Cache '{}' ready (backend {:?}, ttl {:?}, single-flight {})",
        cache.name(),
        cache_config.backend,
        cache_config.ttl,
        cache_config.single_flight
    );

    let state = AppState::new(&catalog, cache, config.default_page_limit);

    if let Some(ttl) = config.cache.ttl {
        spawn_purge_task(state.clone(), ttl.as_duration());
    }

    let app = build_app(state, &config);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP Server listening on http://{}", addr);

    // Graceful shutdown handler
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    catalog.flush().await?;
    info!("Server shutdown complete");
    Ok(())
}

/// Removes expired entries (and their tag links) once per TTL period.
fn spawn_purge_task(state: AppState, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match state.cache.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => info!("Purged {} expired cache entries", removed),
                Err(e) => warn!("Cache purge failed: {}", e),
            }
        }
    });
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
