use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::engine::registry;
use crate::engine::tracker::{self, StatusUpdate};
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::tracking::{
    ChatMessage, ChatSender, DeliveryStatus, DeliveryTracking, ProofOfDelivery, ScheduledSlot,
    TrackingEvent,
};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/delivery/create", post(create_delivery))
        .route("/delivery/:id", get(get_delivery))
        .route("/delivery/:id/assign", post(assign_partner))
        .route("/delivery/:id/chat", post(append_chat))
        .route("/delivery/partner/location", put(update_partner_location))
        .route("/delivery/status/:id", put(update_status))
        .route("/delivery/verify-otp/:id", post(verify_otp))
}

#[derive(Deserialize)]
pub struct CreateDeliveryRequest {
    pub order_id: Uuid,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub scheduled_slot: Option<ScheduledSlot>,
}

async fn create_delivery(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDeliveryRequest>,
) -> Result<Json<DeliveryTracking>, AppError> {
    let tracking = DeliveryTracking {
        id: Uuid::new_v4(),
        order_id: payload.order_id,
        pickup: payload.pickup,
        dropoff: payload.dropoff,
        scheduled_slot: payload.scheduled_slot,
        partner: None,
        status: DeliveryStatus::Pending,
        location_history: Vec::new(),
        eta: None,
        otp: tracker::generate_otp(),
        otp_verified: false,
        proof_of_delivery: None,
        delivery_attempts: 0,
        max_attempts: state.settings.max_delivery_attempts,
        chat: Vec::new(),
        picked_up_at: None,
        delivered_at: None,
        failure_reason: None,
        created_at: Utc::now(),
    };

    state.deliveries.insert(tracking.id, tracking.clone());
    state.metrics.active_deliveries.inc();

    info!(delivery_id = %tracking.id, order_id = %tracking.order_id, "delivery created");
    Ok(Json(tracking))
}

async fn get_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveryTracking>, AppError> {
    let delivery = state
        .deliveries
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("delivery {id} not found")))?;

    Ok(Json(delivery.value().clone()))
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub partner_id: Uuid,
}

async fn assign_partner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<DeliveryTracking>, AppError> {
    let now = Utc::now();
    let delivery = registry::assign_partner(&state, id, payload.partner_id, now)?;

    state
        .metrics
        .status_transitions_total
        .with_label_values(&[delivery.status.as_str()])
        .inc();
    let _ = state.tracking_events_tx.send(TrackingEvent::StatusChanged {
        delivery_id: delivery.id,
        status: delivery.status,
        at: now,
    });

    info!(delivery_id = %id, partner_id = %payload.partner_id, "partner assigned");
    Ok(Json(delivery))
}

#[derive(Deserialize)]
pub struct LocationPingRequest {
    pub partner_id: Uuid,
    pub location: GeoPoint,
}

async fn update_partner_location(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LocationPingRequest>,
) -> Result<Json<crate::models::partner::DeliveryPartner>, AppError> {
    let outcome = registry::update_location(&state, payload.partner_id, payload.location, Utc::now())?;

    for event in outcome.events {
        let _ = state.tracking_events_tx.send(event);
    }

    Ok(Json(outcome.partner))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub partner_id: Uuid,
    pub status: DeliveryStatus,
    pub proof_of_delivery: Option<ProofOfDelivery>,
    pub failure_reason: Option<String>,
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<DeliveryTracking>, AppError> {
    let now = Utc::now();

    let (snapshot, was_terminal) = {
        let mut delivery = state
            .deliveries
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("delivery {id} not found")))?;

        if delivery.partner != Some(payload.partner_id) {
            return Err(AppError::Unauthorized(format!(
                "partner {} is not assigned to delivery {id}",
                payload.partner_id
            )));
        }

        let was_terminal = delivery.status.is_terminal();
        tracker::apply_status_update(
            &mut delivery,
            StatusUpdate {
                status: payload.status,
                proof_of_delivery: payload.proof_of_delivery,
                failure_reason: payload.failure_reason,
            },
            now,
        )?;

        (delivery.clone(), was_terminal)
    };

    // failed -> returned stays terminal; release and count down only once
    if snapshot.status.is_terminal() && !was_terminal {
        registry::release_delivery(&state, payload.partner_id, id);
        state.metrics.active_deliveries.dec();
    }

    state
        .metrics
        .status_transitions_total
        .with_label_values(&[snapshot.status.as_str()])
        .inc();
    let _ = state.tracking_events_tx.send(TrackingEvent::StatusChanged {
        delivery_id: id,
        status: snapshot.status,
        at: now,
    });

    info!(delivery_id = %id, status = snapshot.status.as_str(), "delivery status updated");
    Ok(Json(snapshot))
}

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub code: String,
}

#[derive(Serialize)]
pub struct VerifyOtpResponse {
    pub verified: bool,
}

async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>, AppError> {
    let mut delivery = state
        .deliveries
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("delivery {id} not found")))?;

    let verified = tracker::verify_otp(&mut delivery, &payload.code);

    let outcome = if verified { "success" } else { "failure" };
    state
        .metrics
        .otp_verifications_total
        .with_label_values(&[outcome])
        .inc();

    Ok(Json(VerifyOtpResponse { verified }))
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub sender: ChatSender,
    pub text: String,
}

async fn append_chat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatMessage>, AppError> {
    if payload.text.trim().is_empty() {
        return Err(AppError::BadRequest("message cannot be empty".to_string()));
    }

    let mut delivery = state
        .deliveries
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("delivery {id} not found")))?;

    let message =
        tracker::append_chat_message(&mut delivery, payload.sender, payload.text, Utc::now());

    Ok(Json(message))
}
