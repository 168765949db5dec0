// Sales Ledger - Web Server
// Upload the three exports as JSON, get the flat ledger CSV back

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use sales_ledger::{
    logging, run, LedgerError, PipelineConfig, PipelineInputs, PipelineOutput, EXPORT_FILE_NAME,
    VERSION,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Shared application state (read-only; runs share nothing else)
#[derive(Clone)]
struct AppState {
    config: Arc<PipelineConfig>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

/// Upload body: raw CSV text of each export
#[derive(Deserialize)]
struct LedgerRequest {
    cantaloupe: Option<String>,
    kiosoft_card: Option<String>,
    kiosoft_coin: Option<String>,
}

fn run_request(state: &AppState, request: &LedgerRequest) -> Result<PipelineOutput, Response> {
    let inputs = PipelineInputs {
        cantaloupe: request.cantaloupe.as_deref().map(str::as_bytes),
        kiosoft_card: request.kiosoft_card.as_deref().map(str::as_bytes),
        kiosoft_coin: request.kiosoft_coin.as_deref().map(str::as_bytes),
    };

    run(&inputs, &state.config).map_err(|e| {
        let status = match e {
            LedgerError::MissingRequiredInput(_) | LedgerError::UnreadableInput { .. } => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!("Ledger run failed: {}", e);
        (status, Json(ApiResponse::err(e.to_string()))).into_response()
    })
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(format!("OK ({})", state.config.variant)))
}

/// POST /api/ledger - Flat ledger as a CSV download
async fn build_ledger(
    State(state): State<AppState>,
    Json(request): Json<LedgerRequest>,
) -> Response {
    match run_request(&state, &request) {
        Ok(output) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
                ),
            ],
            output.csv,
        )
            .into_response(),
        Err(response) => response,
    }
}

/// POST /api/report - Run report (kept and dropped rows) as JSON
async fn build_report(
    State(state): State<AppState>,
    Json(request): Json<LedgerRequest>,
) -> Response {
    match run_request(&state, &request) {
        Ok(output) => (StatusCode::OK, Json(ApiResponse::ok(output.report))).into_response(),
        Err(response) => response,
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    // schema variant is fixed for the life of the process
    let config = match std::env::var("LEDGER_CONFIG") {
        Ok(path) => PipelineConfig::from_path(std::path::Path::new(&path))?,
        Err(_) => PipelineConfig::default(),
    }
    .apply_env()?;

    info!(version = VERSION, variant = config.variant.name(), "Sales Ledger web server");

    let state = AppState {
        config: Arc::new(config),
    };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ledger", post(build_ledger))
        .route("/report", post(build_report))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let addr = std::env::var("LEDGER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("   API: POST http://{}/api/ledger", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
