pub mod api;

use crate::services::SharedRegistry;
use axum::http::{HeaderValue, Method};
use axum::{extract::FromRef, routing::get, Router};
use std::net::SocketAddr;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: SharedRegistry,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(registry: SharedRegistry) -> Self {
        Self {
            registry,
            started_at: Instant::now(),
        }
    }
}

// FromRef implementation to extract the registry directly
impl FromRef<AppState> for SharedRegistry {
    fn from_ref(app_state: &AppState) -> SharedRegistry {
        app_state.registry.clone()
    }
}

/// CORS for browser clients; unparseable origins are skipped
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(allowed)
}

/// Build the application router
pub fn router(app_state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(api::root_handler))
        .route("/health", get(api::health_handler))
        .route(
            "/stocks",
            get(api::list_stocks_handler).post(api::add_stock_handler),
        )
        .route(
            "/stocks/",
            get(api::list_stocks_handler).post(api::add_stock_handler),
        )
        .route(
            "/stocks/{ticker}",
            get(api::get_stock_handler)
                .put(api::update_stock_handler)
                .delete(api::delete_stock_handler),
        )
        .route("/stocks/{ticker}/days/{date}", get(api::get_stock_day_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(app_state)
}

/// Start the axum server
pub async fn serve(
    app_state: AppState,
    cors_origins: &[String],
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Registering routes:");
    tracing::info!("  GET    /");
    tracing::info!("  GET    /health");
    tracing::info!("  GET    /stocks");
    tracing::info!("  POST   /stocks");
    tracing::info!("  GET    /stocks/{{ticker}}");
    tracing::info!("  PUT    /stocks/{{ticker}}");
    tracing::info!("  DELETE /stocks/{{ticker}}");
    tracing::info!("  GET    /stocks/{{ticker}}/days/{{date}}");
    tracing::info!(origins = ?cors_origins, "CORS enabled");

    let app = router(app_state, cors_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
