//! Statification lifecycle API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use statif_core::{
    ErrorKind, HistoryOrder, LifecycleError, Statification, StatificationFilter,
    StatificationInfo, StatusView,
};
use tracing::error;

use super::middleware::Actor;
use crate::state::AppState;

/// Default page size of the history
const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for starting a crawl
#[derive(Debug, Deserialize)]
pub struct StartCrawlBody {
    pub designation: String,
    #[serde(default)]
    pub description: String,
}

/// Query parameters for the history
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Maximum number of statifications to return
    pub limit: Option<i64>,
    /// Number of statifications to skip
    pub skip: Option<i64>,
    /// Column to order by (descending)
    pub order: Option<String>,
}

/// Acknowledgement of an admitted operation
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
}

impl AckResponse {
    fn accepted() -> (StatusCode, Json<AckResponse>) {
        (StatusCode::ACCEPTED, Json(AckResponse { success: true }))
    }
}

/// Response for the history
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub statifications: Vec<Statification>,
    pub total: i64,
    pub limit: i64,
    pub skip: i64,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

/// Synchronous failure body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorKind,
}

/// A lifecycle failure rendered as `{"success": false, "error": <kind>}`.
#[derive(Debug)]
pub struct ApiError(pub LifecycleError);

impl From<LifecycleError> for ApiError {
    fn from(error: LifecycleError) -> Self {
        Self(error)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::AlreadyRunning | ErrorKind::LockUnavailable => StatusCode::CONFLICT,
        ErrorKind::StoreInconsistency => StatusCode::NOT_FOUND,
        ErrorKind::SubprocessFailure | ErrorKind::MissingArtifact | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            error!(kind = %kind, error = %self.0, "Request failed");
        }
        (
            status,
            Json(ErrorResponse {
                success: false,
                error: kind,
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Current state for the polling front-end
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusView>, ApiError> {
    Ok(Json(state.lifecycle().status()?))
}

/// A page of the history
pub async fn list_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let order = match params.order.as_deref() {
        Some(order) => order
            .parse::<HistoryOrder>()
            .map_err(LifecycleError::InvalidInput)?,
        None => HistoryOrder::default(),
    };
    let filter = StatificationFilter::new()
        .with_order(order)
        .with_limit(params.limit.unwrap_or(DEFAULT_LIMIT))
        .with_offset(params.skip.unwrap_or(0));

    let lifecycle = state.lifecycle();
    let statifications = lifecycle.history(&filter)?;
    let total = lifecycle.count()?;

    Ok(Json(HistoryResponse {
        statifications,
        total,
        limit: filter.limit,
        skip: filter.offset,
    }))
}

pub async fn get_count(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CountResponse>, ApiError> {
    Ok(Json(CountResponse {
        count: state.lifecycle().count()?,
    }))
}

/// The in-progress statification and its events
pub async fn get_current(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatificationInfo>, ApiError> {
    Ok(Json(state.lifecycle().info("")?))
}

/// An archived statification and its events
pub async fn get_info(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> Result<Json<StatificationInfo>, ApiError> {
    Ok(Json(state.lifecycle().info(&hash)?))
}

// ============================================================================
// Lifecycle operations
// ============================================================================

/// Launch a new crawl
pub async fn start_crawl(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Json(body): Json<StartCrawlBody>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .lifecycle()
        .start_crawl(&actor, &body.designation, &body.description)
        .await?;
    Ok(AckResponse::accepted())
}

pub async fn stop_crawl(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
) -> Result<impl IntoResponse, ApiError> {
    state.lifecycle().stop_crawl(&actor)?;
    Ok(AckResponse::accepted())
}

/// Archive the in-progress statification
pub async fn save(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
) -> Result<impl IntoResponse, ApiError> {
    state.lifecycle().save(&actor)?;
    Ok(AckResponse::accepted())
}

pub async fn deploy(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(hash): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.lifecycle().deploy(&actor, &hash)?;
    Ok(AckResponse::accepted())
}

pub async fn visualize(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(hash): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.lifecycle().visualize(&actor, &hash)?;
    Ok(AckResponse::accepted())
}
