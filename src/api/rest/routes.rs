use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::config::RoutingAlgorithm;
use crate::engine::optimizer::{self, RouteOrder};
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::route::{DisruptionKind, Route, RoutePerformance, StopStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/route/create", post(create_route))
        .route("/route/:id", get(get_route))
        .route("/route/:id/assign-driver", put(assign_driver))
        .route("/route/:id/delivery-status", put(update_stop_status))
        .route("/route/:id/update", post(report_disruption))
        .route("/route/:id/complete", post(complete_route))
}

#[derive(Deserialize)]
pub struct CreateRouteRequest {
    pub warehouse: GeoPoint,
    pub delivery_date: NaiveDate,
    pub orders: Vec<RouteOrder>,
    pub algorithm: Option<RoutingAlgorithm>,
}

async fn create_route(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRouteRequest>,
) -> Result<Json<Route>, AppError> {
    let algorithm = payload.algorithm.unwrap_or(state.settings.algorithm);
    let route = optimizer::build_route(
        payload.warehouse,
        payload.delivery_date,
        payload.orders,
        algorithm,
        Utc::now(),
    )?;

    state.metrics.route_stops.observe(route.stops.len() as f64);
    state.routes.insert(route.id, route.clone());

    info!(
        route_id = %route.id,
        stops = route.stops.len(),
        distance_km = route.total_distance_km,
        "route built"
    );
    Ok(Json(route))
}

async fn get_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Route>, AppError> {
    let route = state
        .routes
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("route {id} not found")))?;

    Ok(Json(route.value().clone()))
}

#[derive(Deserialize)]
pub struct AssignDriverRequest {
    pub driver_id: Uuid,
    pub vehicle: Option<String>,
}

async fn assign_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignDriverRequest>,
) -> Result<Json<Route>, AppError> {
    if !state.partners.contains_key(&payload.driver_id) {
        return Err(AppError::NotFound(format!(
            "partner {} not found",
            payload.driver_id
        )));
    }

    let mut route = state
        .routes
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("route {id} not found")))?;

    optimizer::assign_driver(&mut route, payload.driver_id, payload.vehicle)?;

    info!(route_id = %id, driver_id = %payload.driver_id, "driver assigned to route");
    Ok(Json(route.clone()))
}

#[derive(Deserialize)]
pub struct StopStatusRequest {
    pub driver_id: Uuid,
    pub order_id: Uuid,
    pub status: StopStatus,
}

async fn update_stop_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StopStatusRequest>,
) -> Result<Json<Route>, AppError> {
    let mut route = state
        .routes
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("route {id} not found")))?;

    optimizer::record_stop_status(
        &mut route,
        payload.driver_id,
        payload.order_id,
        payload.status,
        Utc::now(),
    )?;

    Ok(Json(route.clone()))
}

#[derive(Deserialize)]
pub struct DisruptionRequest {
    #[serde(rename = "type")]
    pub kind: DisruptionKind,
    pub new_eta: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

async fn report_disruption(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DisruptionRequest>,
) -> Result<Json<Route>, AppError> {
    let mut route = state
        .routes
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("route {id} not found")))?;

    optimizer::handle_disruption(
        &mut route,
        payload.kind,
        payload.new_eta,
        payload.note,
        Utc::now(),
    )?;

    info!(route_id = %id, kind = ?payload.kind, "disruption recorded");
    Ok(Json(route.clone()))
}

#[derive(Deserialize)]
pub struct CompleteRouteRequest {
    pub driver_id: Uuid,
}

async fn complete_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteRouteRequest>,
) -> Result<Json<RoutePerformance>, AppError> {
    let mut route = state
        .routes
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("route {id} not found")))?;

    let performance = optimizer::complete_route(&mut route, payload.driver_id)?;

    info!(
        route_id = %id,
        delivered = performance.delivered,
        on_time_rate = performance.on_time_rate,
        "route completed"
    );
    Ok(Json(performance))
}
