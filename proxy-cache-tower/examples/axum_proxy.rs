//! A caching reverse proxy served by Axum
//!
//! Every request is forwarded to `PROXY_ORIGIN` through the cache:
//!
//! ```bash
//! # Start the proxy in front of a local service
//! PROXY_ORIGIN=http://127.0.0.1:8080 cargo run --example axum_proxy
//!
//! curl -v http://localhost:3000/users/42                 # MISS
//! curl -v http://localhost:3000/users/42                 # HIT
//! curl -v -X PUT http://localhost:3000/users/42          # purges /users/42 and /users*
//! curl http://localhost:3000/__cache__/stats
//! curl http://localhost:3000/__cache__/keys
//! curl -X POST 'http://localhost:3000/__cache__/invalidate?pattern=GET:*'
//! curl -X POST http://localhost:3000/__cache__/clear
//! ```
//!
//! Configuration is read from the environment:
//!
//! | Variable            | Default                   |
//! |---------------------|---------------------------|
//! | `PROXY_ORIGIN`      | `http://127.0.0.1:8080`   |
//! | `PROXY_LISTEN`      | `127.0.0.1:3000`          |
//! | `CACHE_BACKEND`     | `memory`                  |
//! | `CACHE_REDIS_URL`   | `redis://127.0.0.1:6379`  |
//! | `CACHE_DIR`         | `./proxy-cache`           |
//! | `CACHE_DEFAULT_TTL` | `300` (seconds)           |
//!
//! Run with: RUST_LOG=debug cargo run --example axum_proxy --features manager-redis

use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    response::{IntoResponse, Response},
    BoxError, Router,
};
use http::StatusCode;
use proxy_cache::{select_backend, BackendConfig};
use proxy_cache_tower::{OriginClient, ProxyError, ProxyLayer, ProxyOptions};
use tower::ServiceBuilder;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn backend_config() -> Result<BackendConfig, BoxError> {
    let mut config = BackendConfig::default();
    if let Ok(backend) = std::env::var("CACHE_BACKEND") {
        config.backend = backend;
    }
    if let Ok(url) = std::env::var("CACHE_REDIS_URL") {
        config.redis_url = url;
    }
    if let Ok(dir) = std::env::var("CACHE_DIR") {
        config.disk_path = dir.into();
    }
    if let Ok(ttl) = std::env::var("CACHE_DEFAULT_TTL") {
        config.default_ttl = Duration::from_secs(ttl.parse()?);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::init();

    let origin = env_or("PROXY_ORIGIN", "http://127.0.0.1:8080");
    let listen = env_or("PROXY_LISTEN", "127.0.0.1:3000");

    let selection = select_backend(&backend_config()?).await?;
    let store = selection.store.clone();
    let cache = ProxyLayer::from_selection(selection, ProxyOptions::new(&origin)?);

    // Expired entries are only dropped lazily on read otherwise
    let purge_store = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match purge_store.purge_expired().await {
                Ok(0) => {}
                Ok(n) => log::info!("Purged {n} expired cache entries"),
                Err(e) => log::warn!("Purging expired entries failed: {e}"),
            }
        }
    });

    let app = Router::new().fallback_service(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_proxy_error))
            .layer(cache)
            .service(OriginClient::new()?),
    );

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    log::info!("Proxying http://{listen} to {origin}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    store.close().await?;
    Ok(())
}

async fn handle_proxy_error(err: ProxyError) -> Response {
    log::warn!("Proxy error: {err}");
    let status = match err {
        ProxyError::Origin(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, format!("Proxy error: {err}")).into_response()
}
