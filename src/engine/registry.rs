use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::engine::tracker;
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::partner::{DeliveryPartner, PartnerStatus};
use crate::models::tracking::{DeliveryStatus, DeliveryTracking, LocationPing, TrackingEvent};
use crate::state::AppState;

/// Assign a pending delivery to a partner. The capacity check and the
/// active-set insert run under the partner's map entry guard, so two
/// concurrent assignments cannot both pass the check. Lock order is
/// always partner, then delivery.
pub fn assign_partner(
    state: &AppState,
    delivery_id: Uuid,
    partner_id: Uuid,
    now: DateTime<Utc>,
) -> Result<DeliveryTracking, AppError> {
    let mut partner = state
        .partners
        .get_mut(&partner_id)
        .ok_or_else(|| AppError::NotFound(format!("partner {partner_id} not found")))?;

    match partner.status {
        PartnerStatus::Suspended => {
            return Err(AppError::BadRequest(format!(
                "partner {partner_id} is suspended"
            )));
        }
        PartnerStatus::Offline => {
            return Err(AppError::BadRequest(format!(
                "partner {partner_id} is offline"
            )));
        }
        PartnerStatus::Online | PartnerStatus::Busy => {}
    }

    if partner.at_capacity() {
        return Err(AppError::CapacityExceeded(format!(
            "partner {partner_id} already has {} of {} active deliveries",
            partner.active_deliveries.len(),
            partner.max_active_deliveries
        )));
    }

    let mut delivery = state
        .deliveries
        .get_mut(&delivery_id)
        .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

    tracker::apply_status_update(
        &mut delivery,
        tracker::StatusUpdate::to(DeliveryStatus::Assigned),
        now,
    )?;
    delivery.partner = Some(partner_id);

    partner.active_deliveries.push(delivery_id);
    partner.refresh_status();
    publish_utilization(state, &partner);

    Ok(delivery.clone())
}

/// Drop a delivery from a partner's active set once it reaches a terminal
/// state, re-deriving `Busy`/`Online`.
pub fn release_delivery(state: &AppState, partner_id: Uuid, delivery_id: Uuid) {
    if let Some(mut partner) = state.partners.get_mut(&partner_id) {
        partner.active_deliveries.retain(|id| *id != delivery_id);
        partner.refresh_status();
        publish_utilization(state, &partner);
    }
}

pub struct PingOutcome {
    pub partner: DeliveryPartner,
    pub events: Vec<TrackingEvent>,
}

/// Overwrite a partner's live location, then cascade to every active
/// delivery that is en route: append the ping to its history and recompute
/// its ETA as one unit under the delivery's entry guard.
pub fn update_location(
    state: &AppState,
    partner_id: Uuid,
    location: GeoPoint,
    now: DateTime<Utc>,
) -> Result<PingOutcome, AppError> {
    let (snapshot, active) = {
        let mut partner = state
            .partners
            .get_mut(&partner_id)
            .ok_or_else(|| AppError::NotFound(format!("partner {partner_id} not found")))?;

        partner.location = location;
        partner.location_updated_at = now;
        (partner.clone(), partner.active_deliveries.clone())
    };

    let mut events = Vec::new();
    for delivery_id in active {
        let Some(mut delivery) = state.deliveries.get_mut(&delivery_id) else {
            continue;
        };

        if !matches!(
            delivery.status,
            DeliveryStatus::OnTheWay | DeliveryStatus::Nearby
        ) {
            continue;
        }

        let eta = tracker::compute_eta(
            &location,
            &delivery.dropoff,
            now,
            state.settings.avg_speed_km_per_min,
        );
        delivery.location_history.push(LocationPing {
            location,
            recorded_at: now,
        });
        delivery.eta = Some(eta);

        events.push(TrackingEvent::LocationPing {
            delivery_id,
            partner_id,
            location,
            eta,
            at: now,
        });
    }

    Ok(PingOutcome {
        partner: snapshot,
        events,
    })
}

/// Fold a completion score into the partner's running average. Only valid
/// once the rated delivery is actually delivered.
pub fn rate_completion(
    state: &AppState,
    partner_id: Uuid,
    delivery_id: Uuid,
    score: f64,
) -> Result<DeliveryPartner, AppError> {
    if !(1.0..=5.0).contains(&score) {
        return Err(AppError::BadRequest(format!(
            "score must be between 1 and 5, got {score}"
        )));
    }

    let delivered = state
        .deliveries
        .get(&delivery_id)
        .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?
        .status
        == DeliveryStatus::Delivered;

    if !delivered {
        return Err(AppError::InvalidTransition(format!(
            "delivery {delivery_id} is not delivered; only completed deliveries can be rated"
        )));
    }

    let mut partner = state
        .partners
        .get_mut(&partner_id)
        .ok_or_else(|| AppError::NotFound(format!("partner {partner_id} not found")))?;

    let count = partner.rating_count as f64;
    partner.rating = (partner.rating * count + score) / (count + 1.0);
    partner.rating_count += 1;

    Ok(partner.clone())
}

fn publish_utilization(state: &AppState, partner: &DeliveryPartner) {
    if partner.max_active_deliveries == 0 {
        return;
    }
    let utilization =
        partner.active_deliveries.len() as f64 / partner.max_active_deliveries as f64;
    state
        .metrics
        .partner_utilization
        .with_label_values(&[&partner.id.to_string()])
        .set(utilization);
}
