use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::error::AppError;
use crate::geo::{haversine_km, GeoPoint};
use crate::models::tracking::{
    ChatMessage, ChatSender, DeliveryStatus, DeliveryTracking, ProofOfDelivery,
};

/// The fixed delivery lifecycle graph. Anything not listed here is
/// rejected before any state is touched.
pub fn can_transition(from: DeliveryStatus, to: DeliveryStatus) -> bool {
    use DeliveryStatus::*;

    matches!(
        (from, to),
        (Pending, Assigned)
            | (Assigned, PickingUp)
            | (PickingUp, PickedUp)
            | (PickedUp, OnTheWay)
            | (OnTheWay, Nearby)
            | (OnTheWay, Failed)
            | (Nearby, Arrived)
            | (Nearby, Failed)
            | (Arrived, Delivered)
            | (Arrived, Failed)
            | (Failed, Returned)
    )
}

/// A requested status change with the attachments some targets require.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: DeliveryStatus,
    pub proof_of_delivery: Option<ProofOfDelivery>,
    pub failure_reason: Option<String>,
}

impl StatusUpdate {
    pub fn to(status: DeliveryStatus) -> Self {
        Self {
            status,
            proof_of_delivery: None,
            failure_reason: None,
        }
    }
}

/// Validate and apply a status change. All preconditions are checked
/// before the first field is written, so a rejected update leaves the
/// record exactly as it was.
pub fn apply_status_update(
    tracking: &mut DeliveryTracking,
    update: StatusUpdate,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if !can_transition(tracking.status, update.status) {
        return Err(AppError::InvalidTransition(format!(
            "cannot move delivery from {} to {}",
            tracking.status.as_str(),
            update.status.as_str()
        )));
    }

    match update.status {
        DeliveryStatus::Delivered if update.proof_of_delivery.is_none() => {
            return Err(AppError::BadRequest(
                "proof_of_delivery is required to mark a delivery delivered".to_string(),
            ));
        }
        DeliveryStatus::Failed if update.failure_reason.is_none() => {
            return Err(AppError::BadRequest(
                "failure_reason is required to mark a delivery failed".to_string(),
            ));
        }
        DeliveryStatus::Returned if tracking.delivery_attempts < tracking.max_attempts => {
            return Err(AppError::InvalidTransition(format!(
                "delivery has {} of {} attempts; return requires exhausted attempts",
                tracking.delivery_attempts, tracking.max_attempts
            )));
        }
        _ => {}
    }

    match update.status {
        DeliveryStatus::PickedUp => {
            tracking.picked_up_at = Some(now);
        }
        DeliveryStatus::Delivered => {
            tracking.delivered_at = Some(now);
            tracking.proof_of_delivery = update.proof_of_delivery;
        }
        DeliveryStatus::Failed => {
            tracking.delivery_attempts += 1;
            tracking.failure_reason = update.failure_reason;
        }
        _ => {}
    }

    tracking.status = update.status;
    Ok(())
}

/// Four-digit numeric handoff code. Not time-limited.
pub fn generate_otp() -> String {
    let code: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("{code:04}")
}

/// Exact-match OTP check. Success is idempotent; failure mutates nothing.
pub fn verify_otp(tracking: &mut DeliveryTracking, code: &str) -> bool {
    if tracking.otp == code {
        tracking.otp_verified = true;
        true
    } else {
        false
    }
}

/// Straight-line ETA: great-circle distance over an assumed average speed.
pub fn compute_eta(
    from: &GeoPoint,
    dropoff: &GeoPoint,
    now: DateTime<Utc>,
    speed_km_per_min: f64,
) -> DateTime<Utc> {
    let distance_km = haversine_km(from, dropoff);
    let minutes = distance_km / speed_km_per_min;
    now + Duration::seconds((minutes * 60.0).round() as i64)
}

pub fn append_chat_message(
    tracking: &mut DeliveryTracking,
    sender: ChatSender,
    text: String,
    now: DateTime<Utc>,
) -> ChatMessage {
    let message = ChatMessage {
        sender,
        text,
        sent_at: now,
    };
    tracking.chat.push(message.clone());
    message
}
