use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::zone::DeliveryZone;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub enum CoverageQuery {
    Point(GeoPoint),
    Pincode(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ZoneSummary {
    pub id: Uuid,
    pub name: String,
    pub base_fee: f64,
    pub free_delivery_threshold: Option<f64>,
    pub express_delivery: bool,
    pub same_day_delivery: bool,
    pub scheduled_delivery: bool,
}

impl ZoneSummary {
    fn from_zone(zone: &DeliveryZone) -> Self {
        Self {
            id: zone.id,
            name: zone.name.clone(),
            base_fee: zone.fees.base_fee,
            free_delivery_threshold: zone.fees.free_delivery_threshold,
            express_delivery: zone.express_delivery,
            same_day_delivery: zone.same_day_delivery,
            scheduled_delivery: zone.scheduled_delivery,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Availability {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<ZoneSummary>,
}

impl Availability {
    fn none() -> Self {
        Self {
            available: false,
            zone: None,
        }
    }
}

/// Answer "can we deliver here". No coverage is a normal negative result,
/// never an error. The first matching active zone wins.
pub fn check_availability(state: &AppState, query: &CoverageQuery) -> Availability {
    let max_search_km = state.settings.max_search_distance_km;

    for entry in state.zones.iter() {
        let zone = entry.value();
        if !zone.active {
            continue;
        }

        let hit = match query {
            CoverageQuery::Point(point) => zone.covers_point(point, max_search_km),
            CoverageQuery::Pincode(code) => zone.covers_pincode(code),
        };

        if hit {
            return Availability {
                available: true,
                zone: Some(ZoneSummary::from_zone(zone)),
            };
        }
    }

    Availability::none()
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotAvailability {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub remaining: u32,
}

/// Bookable slots for a zone on a given date. Days without a configured
/// schedule yield an empty list; slot counters are read-only here, booking
/// belongs to the order collaborator.
pub fn slot_availability(
    state: &AppState,
    zone_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<SlotAvailability>, AppError> {
    let zone = state
        .zones
        .get(&zone_id)
        .ok_or_else(|| AppError::NotFound(format!("zone {zone_id} not found")))?;

    let slots = zone
        .slots_for(date.weekday())
        .iter()
        .filter(|slot| slot.current_orders < slot.max_orders)
        .map(|slot| SlotAvailability {
            start: slot.start,
            end: slot.end,
            remaining: slot.remaining(),
        })
        .collect();

    Ok(slots)
}
