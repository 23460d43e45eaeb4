use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum VehicleType {
    Bicycle,
    Motorbike,
    Car,
    Van,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum PartnerStatus {
    Online,
    Offline,
    Busy,
    Suspended,
}

/// A delivery partner. `active_deliveries` is a back-reference set of
/// tracking ids, never longer than `max_active_deliveries`; `Busy` is
/// derived from that set reaching capacity, not set directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryPartner {
    pub id: Uuid,
    pub name: String,
    pub vehicle: VehicleType,
    pub status: PartnerStatus,
    pub location: GeoPoint,
    pub location_updated_at: DateTime<Utc>,
    pub rating: f64,
    pub rating_count: u32,
    pub active_deliveries: Vec<Uuid>,
    pub max_active_deliveries: usize,
}

impl DeliveryPartner {
    pub fn at_capacity(&self) -> bool {
        self.active_deliveries.len() >= self.max_active_deliveries
    }

    /// Re-derive `Busy`/`Online` from the active set. Leaves `Offline` and
    /// `Suspended` alone since those are operator-controlled.
    pub fn refresh_status(&mut self) {
        match self.status {
            PartnerStatus::Online | PartnerStatus::Busy => {
                self.status = if self.at_capacity() {
                    PartnerStatus::Busy
                } else {
                    PartnerStatus::Online
                };
            }
            PartnerStatus::Offline | PartnerStatus::Suspended => {}
        }
    }
}
