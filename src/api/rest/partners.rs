use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::registry;
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::partner::{DeliveryPartner, PartnerStatus, VehicleType};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/partners", post(create_partner).get(list_partners))
        .route("/partners/:id/status", patch(update_partner_status))
        .route("/partners/:id/rate", post(rate_partner))
}

fn default_max_active() -> usize {
    3
}

#[derive(Deserialize)]
pub struct CreatePartnerRequest {
    pub name: String,
    pub vehicle: VehicleType,
    pub location: GeoPoint,
    #[serde(default = "default_max_active")]
    pub max_active_deliveries: usize,
}

async fn create_partner(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreatePartnerRequest>,
) -> Result<Json<DeliveryPartner>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    if payload.max_active_deliveries == 0 {
        return Err(AppError::BadRequest(
            "max_active_deliveries must be > 0".to_string(),
        ));
    }

    let partner = DeliveryPartner {
        id: Uuid::new_v4(),
        name: payload.name,
        vehicle: payload.vehicle,
        status: PartnerStatus::Online,
        location: payload.location,
        location_updated_at: Utc::now(),
        rating: 0.0,
        rating_count: 0,
        active_deliveries: Vec::new(),
        max_active_deliveries: payload.max_active_deliveries,
    };

    state.partners.insert(partner.id, partner.clone());
    Ok(Json(partner))
}

async fn list_partners(State(state): State<Arc<AppState>>) -> Json<Vec<DeliveryPartner>> {
    let partners = state
        .partners
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(partners)
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: PartnerStatus,
}

async fn update_partner_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<DeliveryPartner>, AppError> {
    if payload.status == PartnerStatus::Busy {
        return Err(AppError::BadRequest(
            "busy is derived from active deliveries and cannot be set directly".to_string(),
        ));
    }

    let mut partner = state
        .partners
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("partner {id} not found")))?;

    partner.status = payload.status;
    partner.refresh_status();

    Ok(Json(partner.clone()))
}

#[derive(Deserialize)]
pub struct RateRequest {
    pub delivery_id: Uuid,
    pub score: f64,
}

async fn rate_partner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RateRequest>,
) -> Result<Json<DeliveryPartner>, AppError> {
    let partner = registry::rate_completion(&state, id, payload.delivery_id, payload.score)?;
    Ok(Json(partner))
}
