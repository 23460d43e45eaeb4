use std::collections::HashSet;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

/// Service-area geometry. Exactly one variant per zone; dispatch happens
/// through [`DeliveryZone::covers_point`] / [`DeliveryZone::covers_pincode`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ZoneGeometry {
    Radius { center: GeoPoint, radius_km: f64 },
    Polygon { ring: Vec<GeoPoint> },
    Pincodes { codes: HashSet<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub base_fee: f64,
    pub free_delivery_threshold: Option<f64>,
}

/// A bookable delivery window. `current_orders` is mutated only by the
/// order-booking collaborator; this service reads it to report capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub max_orders: u32,
    pub current_orders: u32,
}

impl TimeSlot {
    pub fn remaining(&self) -> u32 {
        self.max_orders.saturating_sub(self.current_orders)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySchedule {
    pub weekday: Weekday,
    pub slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryZone {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
    pub geometry: ZoneGeometry,
    pub fees: FeeSchedule,
    pub schedule: Vec<DaySchedule>,
    pub express_delivery: bool,
    pub same_day_delivery: bool,
    pub scheduled_delivery: bool,
}

impl DeliveryZone {
    /// Radius and polygon zones answer point queries; pincode zones never do.
    /// Radius matches are additionally bounded by `max_search_km` so a huge
    /// configured radius cannot blow up the candidate set.
    pub fn covers_point(&self, point: &GeoPoint, max_search_km: f64) -> bool {
        match &self.geometry {
            ZoneGeometry::Radius { center, radius_km } => {
                let distance = crate::geo::haversine_km(center, point);
                distance <= max_search_km && distance <= *radius_km
            }
            ZoneGeometry::Polygon { ring } => crate::geo::point_in_ring(point, ring),
            ZoneGeometry::Pincodes { .. } => false,
        }
    }

    pub fn covers_pincode(&self, pincode: &str) -> bool {
        match &self.geometry {
            ZoneGeometry::Pincodes { codes } => codes.contains(pincode),
            _ => false,
        }
    }

    pub fn slots_for(&self, weekday: Weekday) -> &[TimeSlot] {
        self.schedule
            .iter()
            .find(|day| day.weekday == weekday)
            .map(|day| day.slots.as_slice())
            .unwrap_or(&[])
    }
}
