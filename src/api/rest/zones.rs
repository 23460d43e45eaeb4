use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::zones::{self, Availability, CoverageQuery, SlotAvailability};
use crate::error::AppError;
use crate::models::zone::{DaySchedule, DeliveryZone, FeeSchedule, ZoneGeometry};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/delivery/zones", post(create_zone).get(list_zones))
        .route("/delivery/zones/:id/slots", get(get_slots))
        .route("/delivery/check-availability", get(check_availability))
}

#[derive(Deserialize)]
pub struct CreateZoneRequest {
    pub name: String,
    pub geometry: ZoneGeometry,
    pub fees: FeeSchedule,
    #[serde(default)]
    pub schedule: Vec<DaySchedule>,
    #[serde(default)]
    pub express_delivery: bool,
    #[serde(default)]
    pub same_day_delivery: bool,
    #[serde(default)]
    pub scheduled_delivery: bool,
}

async fn create_zone(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateZoneRequest>,
) -> Result<Json<DeliveryZone>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    match &payload.geometry {
        ZoneGeometry::Radius { radius_km, .. } if *radius_km <= 0.0 => {
            return Err(AppError::BadRequest("radius_km must be > 0".to_string()));
        }
        ZoneGeometry::Polygon { ring } if ring.len() < 3 => {
            return Err(AppError::BadRequest(
                "polygon ring needs at least 3 points".to_string(),
            ));
        }
        ZoneGeometry::Pincodes { codes } if codes.is_empty() => {
            return Err(AppError::BadRequest(
                "pincode zone needs at least one code".to_string(),
            ));
        }
        _ => {}
    }

    for day in &payload.schedule {
        for slot in &day.slots {
            if slot.max_orders == 0 {
                return Err(AppError::BadRequest(
                    "slot max_orders must be > 0".to_string(),
                ));
            }
            if slot.current_orders > slot.max_orders {
                return Err(AppError::BadRequest(
                    "slot current_orders cannot exceed max_orders".to_string(),
                ));
            }
        }
    }

    let zone = DeliveryZone {
        id: Uuid::new_v4(),
        name: payload.name,
        active: true,
        geometry: payload.geometry,
        fees: payload.fees,
        schedule: payload.schedule,
        express_delivery: payload.express_delivery,
        same_day_delivery: payload.same_day_delivery,
        scheduled_delivery: payload.scheduled_delivery,
    };

    state.zones.insert(zone.id, zone.clone());
    Ok(Json(zone))
}

async fn list_zones(State(state): State<Arc<AppState>>) -> Json<Vec<DeliveryZone>> {
    let zones = state.zones.iter().map(|entry| entry.value().clone()).collect();
    Json(zones)
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub pincode: Option<String>,
}

async fn check_availability(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AvailabilityQuery>,
) -> Result<Json<Availability>, AppError> {
    let query = match (params.pincode, params.lat, params.lng) {
        (Some(pincode), _, _) => CoverageQuery::Pincode(pincode),
        (None, Some(lat), Some(lng)) => {
            CoverageQuery::Point(crate::geo::GeoPoint { lat, lng })
        }
        _ => {
            return Err(AppError::BadRequest(
                "provide either pincode or both lat and lng".to_string(),
            ));
        }
    };

    Ok(Json(zones::check_availability(&state, &query)))
}

#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

async fn get_slots(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<SlotsQuery>,
) -> Result<Json<Vec<SlotAvailability>>, AppError> {
    let slots = zones::slot_availability(&state, id, params.date)?;
    Ok(Json(slots))
}
