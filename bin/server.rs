// Paper Listings - Web Server
// Listing and yearly-count API with Axum

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use paper_listings::{Config, ListingEngine, ListingError};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

/// Shared application state
#[derive(Clone)]
struct AppState {
    engine: Arc<Mutex<ListingEngine<Connection>>>,
    default_show: usize,
}

/// API Response wrapper
///
/// `available: false` marks a degraded response: the store could not be
/// reached, but the surrounding page should still render.
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            available: true,
            data: Some(data),
            error: None,
        }
    }

    fn unavailable(message: String) -> Self {
        Self {
            success: false,
            available: false,
            data: None,
            error: Some(message),
        }
    }

    fn bad_request(message: String) -> Self {
        Self {
            success: false,
            available: true,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Deserialize)]
struct ListQuery {
    month: Option<u32>,
    skip: Option<usize>,
    show: Option<usize>,
}

/// Map an engine result to a response; store failures degrade to 200
fn respond<T: Serialize>(result: Result<T, ListingError>, what: &str) -> axum::response::Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::ok(data))).into_response(),
        Err(e) if e.is_client_error() => {
            warn!("Rejected {} request: {}", what, e);
            (StatusCode::BAD_REQUEST, Json(ApiResponse::<T>::bad_request(e.to_string()))).into_response()
        }
        Err(e) => {
            error!("Error getting {}: {}", what, e);
            (
                StatusCode::OK,
                Json(ApiResponse::<T>::unavailable(format!("{} unavailable", what))),
            )
                .into_response()
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/list/:archive/:year - Listing for a month (?month=) or a year
async fn get_listing(
    State(state): State<AppState>,
    Path((archive, year)): Path<(String, i32)>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let show = query.show.unwrap_or(state.default_show);
    let skip = query.skip.unwrap_or(0);

    let result = match state.engine.lock() {
        Ok(engine) => engine.get_articles_for_period(&archive, year, query.month, skip, show),
        Err(_) => Err(ListingError::Data("engine lock poisoned".to_string())),
    };

    respond(result, "listing")
}

/// GET /api/year/:archive/:year - Monthly new/cross counts
async fn get_year_counts(
    State(state): State<AppState>,
    Path((archive, year)): Path<(String, i32)>,
) -> impl IntoResponse {
    let result = match state.engine.lock() {
        Ok(engine) => engine.get_yearly_counts(&archive, year),
        Err(_) => Err(ListingError::Data("engine lock poisoned".to_string())),
    };

    respond(result, "yearly counts")
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Paper Listings server v{}", paper_listings::VERSION);

    let config = Config::load(None).context("Failed to load configuration")?;

    if !config.database_path.exists() {
        warn!(
            "Database not found at {:?}; listings will report unavailable until it exists",
            config.database_path
        );
    }

    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;
    info!("✓ Database opened: {:?}", config.database_path);

    let taxonomy = config.taxonomy().context("Failed to load taxonomy")?;
    let engine = ListingEngine::new(taxonomy, conn, config.expiry_policy()?);

    // Create shared state
    let state = AppState {
        engine: Arc::new(Mutex::new(engine)),
        default_show: config.default_show,
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/list/:archive/:year", get(get_listing))
        .route("/year/:archive/:year", get(get_year_counts))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("🚀 Server running on http://{}", config.bind_addr);
    info!("   API: http://{}/api/list/cs/2009?month=3", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
