//! API service routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::{
    error::{ApiError, ApiResult},
    middleware::{admin_middleware, api_key_middleware},
    models::{
        AuthUser,
        parking::{
            CreateParkingRequest, HistoryQuery, Pagination, StartTimerBody, UpdateParkingRequest,
        },
    },
    state::AppState,
    timer::{Notification, ServerEvent},
    ws::ws_handler,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let parking_routes = Router::new()
        .route("/api/v1/parking", post(create_parking))
        .route("/api/v1/parking/current", get(current_parking))
        .route("/api/v1/parking/history", get(parking_history))
        .route(
            "/api/v1/parking/:id",
            get(get_parking)
                .patch(update_parking)
                .delete(delete_parking),
        )
        .route("/api/v1/parking/:id/start-timer", post(start_timer))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ));

    let admin_routes = Router::new()
        .route("/api/v1/admin/timers", get(timer_stats))
        .route("/api/v1/admin/users/:id/notify", post(notify_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(ws_handler))
        .merge(parking_routes)
        .merge(admin_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api-service"
    }))
}

/// Record a parking location
pub async fn create_parking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateParkingRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate().map_err(ApiError::BadRequest)?;

    let parking = state.parking_repository.create(user.id, &payload).await?;
    info!("Parking {} recorded for user {}", parking.id, user.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Parking recorded",
            "parking": parking,
        })),
    ))
}

/// Latest parking of the caller
pub async fn current_parking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let parking = state
        .parking_repository
        .latest(user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Parking".to_string()))?;

    Ok(Json(json!({ "parking": parking })))
}

/// Paginated parking history of the caller
pub async fn parking_history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<impl IntoResponse> {
    let (limit, offset) = (query.limit(), query.offset());
    let (parkings, total) = state
        .parking_repository
        .history(user.id, limit, offset)
        .await?;

    Ok(Json(json!({
        "parkings": parkings,
        "pagination": Pagination::new(total, limit, offset),
    })))
}

/// A single parking of the caller
pub async fn get_parking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let parking = state
        .parking_repository
        .find_owned(user.id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Parking".to_string()))?;

    Ok(Json(json!({ "parking": parking })))
}

/// Change the address or note of a parking
pub async fn update_parking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateParkingRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate().map_err(ApiError::BadRequest)?;

    let parking = state
        .parking_repository
        .update(user.id, id, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound("Parking".to_string()))?;

    Ok(Json(json!({
        "message": "Parking updated",
        "parking": parking,
    })))
}

pub async fn delete_parking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    if !state.parking_repository.delete(user.id, id).await? {
        return Err(ApiError::NotFound("Parking".to_string()));
    }

    info!("Parking {} deleted by user {}", id, user.id);
    Ok(Json(json!({ "message": "Parking deleted" })))
}

/// Arm the caller's timer without a WebSocket connection
pub async fn start_timer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    body: Option<Json<StartTimerBody>>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = body.unwrap_or_default();
    debug!(
        "REST timer start for user {} via key {:?}",
        user.id, user.api_key_id
    );

    let started = state.timers.start(user.id, id, body.duration, None).await?;

    // Open sockets of the owner learn about timers armed over REST
    state
        .hub
        .emit_to_owner(user.id, ServerEvent::TimerStarted(started.clone()))
        .await;

    Ok(Json(json!({
        "message": "Timer started",
        "timer": started,
        "websocket": {
            "message": "Connect to the WebSocket endpoint to receive the expiry notification",
            "endpoint": "/ws",
        },
    })))
}

/// Armed timers across all users
pub async fn timer_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.timers.stats().await)
}

/// Push a free-form notification to every open socket of a user
pub async fn notify_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    Json(payload): Json<Map<String, Value>>,
) -> impl IntoResponse {
    let delivered = state
        .hub
        .emit_to_owner(user_id, ServerEvent::Notification(Notification::new(payload)))
        .await;
    info!(
        "Notification for user {} delivered to {} connection(s)",
        user_id, delivered
    );

    Json(json!({
        "message": "Notification sent",
        "delivered": delivered,
    }))
}
