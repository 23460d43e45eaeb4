use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Assigned,
    PickingUp,
    PickedUp,
    OnTheWay,
    Nearby,
    Arrived,
    Delivered,
    Failed,
    Returned,
}

impl DeliveryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Delivered | DeliveryStatus::Failed | DeliveryStatus::Returned
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Assigned => "assigned",
            DeliveryStatus::PickingUp => "picking_up",
            DeliveryStatus::PickedUp => "picked_up",
            DeliveryStatus::OnTheWay => "on_the_way",
            DeliveryStatus::Nearby => "nearby",
            DeliveryStatus::Arrived => "arrived",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Returned => "returned",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ChatSender {
    Customer,
    Partner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: ChatSender,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofOfDelivery {
    pub receiver_name: Option<String>,
    pub signature: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationPing {
    pub location: GeoPoint,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledSlot {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// One order-delivery attempt. Owns its location history and chat
/// transcript; references the assigned partner by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryTracking {
    pub id: Uuid,
    pub order_id: Uuid,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub scheduled_slot: Option<ScheduledSlot>,
    pub partner: Option<Uuid>,
    pub status: DeliveryStatus,
    pub location_history: Vec<LocationPing>,
    pub eta: Option<DateTime<Utc>>,
    pub otp: String,
    pub otp_verified: bool,
    pub proof_of_delivery: Option<ProofOfDelivery>,
    pub delivery_attempts: u32,
    pub max_attempts: u32,
    pub chat: Vec<ChatMessage>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Events fanned out to WebSocket subscribers (notification collaborator,
/// customer-facing tracking views).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackingEvent {
    StatusChanged {
        delivery_id: Uuid,
        status: DeliveryStatus,
        at: DateTime<Utc>,
    },
    LocationPing {
        delivery_id: Uuid,
        partner_id: Uuid,
        location: GeoPoint,
        eta: DateTime<Utc>,
        at: DateTime<Utc>,
    },
}
