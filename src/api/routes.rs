//! REST API handlers for the booking server
//!
//! Handlers translate HTTP into [`BookingService`] calls, which run on the
//! blocking pool because they hold the SQLite connection. The acting user
//! comes from the `x-user-id` header set by the authenticating gateway.
//!
//! [`BookingService`]: crate::booking::BookingService

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, MatchedPath, Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::booking::{BookingOutcome, CreateDayReservation, CreateReservation, UpdateStatus};
use crate::error::{Error, ErrorCategory, TerminErrorTrait};
use crate::metrics;
use crate::models::{Profile, StaffMember};
use crate::scheduler::{Actor, SchedulerError, Slot};

use super::server::AppState;

/// Header carrying the authenticated user ID
pub const USER_HEADER: &str = "x-user-id";

// ============================================================================
// API Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,

    /// Error category: validation, not_found, conflict, permission, ...
    pub kind: &'static str,

    /// Conflict reason, for conflicts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, kind: ErrorCategory) -> Self {
        Self {
            success: false,
            error: message.into(),
            kind: kind.as_str(),
            reason: None,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Availability of one service on one date
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub profile_id: String,
    pub service_id: String,
    pub date: NaiveDate,

    /// How often clients should refresh this view
    pub poll_interval_secs: u64,

    pub slots: Vec<Slot>,
}

/// Availability query string
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityParams {
    pub service_id: Option<String>,
    pub date: Option<String>,
    pub staff_id: Option<String>,
}

// ============================================================================
// Errors
// ============================================================================

/// Error returned by handlers
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        Self(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        SchedulerError::validation("body", rejection.body_text()).into()
    }
}

/// HTTP status of an error category
pub fn status_for(category: ErrorCategory) -> StatusCode {
    match category {
        ErrorCategory::Validation => StatusCode::BAD_REQUEST,
        ErrorCategory::NotFound => StatusCode::NOT_FOUND,
        ErrorCategory::Conflict => StatusCode::CONFLICT,
        ErrorCategory::Permission => StatusCode::FORBIDDEN,
        ErrorCategory::Storage | ErrorCategory::Config | ErrorCategory::Other => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let category = self.0.category();
        let status = status_for(category);

        // Server-side failures are logged and kept opaque
        let mut body = if category.is_server_side() {
            tracing::error!(error = %self.0, "Request failed");
            ErrorResponse::new("internal server error", category)
        } else {
            ErrorResponse::new(self.0.to_string(), category)
        };
        body.reason = self.0.conflict_reason().map(|r| r.as_str());

        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Run a booking call on the blocking pool
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::with_source("blocking task failed", e))?
        .map_err(ApiError::from)
}

fn user_id(headers: &HeaderMap) -> ApiResult<String> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| SchedulerError::permission(format!("missing {USER_HEADER} header")).into())
}

fn parse_date(value: Option<&str>) -> ApiResult<NaiveDate> {
    let raw = value.ok_or_else(|| SchedulerError::validation("date", "is required"))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        SchedulerError::validation("date", format!("{raw} is not a YYYY-MM-DD date")).into()
    })
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Health endpoints
        .route("/api/health", get(health_check))
        // Profile endpoints
        .route("/api/profiles/{id}", get(get_profile).put(put_profile))
        .route("/api/profiles/{id}/availability", get(availability))
        .route("/api/profiles/{id}/unavailable-days", get(unavailable_days))
        .route("/api/profiles/{id}/staff", get(list_staff))
        .route(
            "/api/profiles/{id}/staff/{staff_id}",
            put(put_staff).delete(delete_staff),
        )
        // Reservation endpoints
        .route("/api/reservations", post(create_reservation))
        .route("/api/reservations/{id}", get(get_reservation))
        .route("/api/reservations/{id}/status", patch(update_status))
        .route("/api/day-reservations", post(create_day_reservation));

    if state.config.server.enable_metrics {
        router = router.route("/metrics", get(metrics_handler));
    }

    router
        .route_layer(middleware::from_fn(track_requests))
        .with_state(state)
}

async fn track_requests(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let start = Instant::now();

    let response = next.run(request).await;
    metrics::record_api_request(
        &endpoint,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

// ============================================================================
// Health Handlers
// ============================================================================

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();

    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: uptime,
    }))
}

/// Prometheus text exposition
async fn metrics_handler() -> Response {
    match metrics::encode_metrics() {
        Ok(text) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// ============================================================================
// Profile Handlers
// ============================================================================

async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Profile>>> {
    let profile = blocking(move || state.service.profile(&id)).await?;
    Ok(Json(ApiResponse::success(profile)))
}

async fn put_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<Profile>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Profile>>> {
    let actor = Actor::User(user_id(&headers)?);
    let Json(profile) = payload?;
    if profile.id != id {
        return Err(SchedulerError::validation("id", "does not match the path").into());
    }
    let saved = blocking(move || {
        state.service.save_profile(&actor, &profile)?;
        Ok(profile)
    })
    .await?;
    Ok(Json(ApiResponse::success(saved)))
}

async fn availability(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<AvailabilityParams>,
) -> ApiResult<Json<ApiResponse<AvailabilityResponse>>> {
    let service_id = params
        .service_id
        .ok_or_else(|| SchedulerError::validation("serviceId", "is required"))?;
    let date = parse_date(params.date.as_deref())?;
    let poll_interval_secs = state.config.server.poll_interval_secs;

    let response = blocking(move || {
        let slots = state
            .service
            .availability(&id, &service_id, date, params.staff_id.as_deref())?;
        Ok(AvailabilityResponse {
            profile_id: id,
            service_id,
            date,
            poll_interval_secs,
            slots,
        })
    })
    .await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn unavailable_days(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<NaiveDate>>>> {
    let days = blocking(move || state.service.unavailable_days(&id)).await?;
    Ok(Json(ApiResponse::success(days)))
}

// ============================================================================
// Staff Handlers
// ============================================================================

async fn list_staff(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<StaffMember>>>> {
    let staff = blocking(move || state.service.staff(&id)).await?;
    Ok(Json(ApiResponse::success(staff)))
}

async fn put_staff(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, staff_id)): Path<(String, String)>,
    payload: Result<Json<StaffMember>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<StaffMember>>> {
    let actor = Actor::User(user_id(&headers)?);
    let Json(staff) = payload?;
    if staff.id != staff_id || staff.profile_id != id {
        return Err(SchedulerError::validation("id", "does not match the path").into());
    }
    let saved = blocking(move || {
        state.service.save_staff(&actor, &staff)?;
        Ok(staff)
    })
    .await?;
    Ok(Json(ApiResponse::success(saved)))
}

async fn delete_staff(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, staff_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let actor = Actor::User(user_id(&headers)?);
    blocking(move || state.service.remove_staff(&actor, &id, &staff_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Reservation Handlers
// ============================================================================

async fn create_reservation(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateReservation>, JsonRejection>,
) -> ApiResult<Response> {
    let client_id = user_id(&headers)?;
    let Json(request) = payload?;

    let outcome =
        blocking(move || state.service.create_reservation(&client_id, request)).await?;
    let status = match outcome {
        BookingOutcome::Reserved { .. } => StatusCode::CREATED,
        BookingOutcome::InquiryForwarded { .. } => StatusCode::ACCEPTED,
    };
    Ok((status, Json(ApiResponse::success(outcome))).into_response())
}

async fn create_day_reservation(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateDayReservation>, JsonRejection>,
) -> ApiResult<Response> {
    let client_id = user_id(&headers)?;
    let Json(request) = payload?;

    let reservation =
        blocking(move || state.service.create_day_reservation(&client_id, request)).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(reservation))).into_response())
}

async fn get_reservation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let actor = Actor::User(user_id(&headers)?);
    let reservation = blocking(move || state.service.reservation(&actor, &id)).await?;
    Ok(Json(ApiResponse::success(reservation)).into_response())
}

async fn update_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatus>, JsonRejection>,
) -> ApiResult<Response> {
    let actor = Actor::User(user_id(&headers)?);
    let Json(request) = payload?;
    let target = request.target()?;

    let reservation =
        blocking(move || state.service.update_status(&actor, &id, target)).await?;
    Ok(Json(ApiResponse::success(reservation)).into_response())
}

// ============================================================================
// Tests
// ============================================================================
