use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::Settings;
use crate::models::partner::DeliveryPartner;
use crate::models::route::Route;
use crate::models::tracking::{DeliveryTracking, TrackingEvent};
use crate::models::zone::DeliveryZone;
use crate::observability::metrics::Metrics;

/// In-memory arenas for all delivery-logistics records. DashMap entry
/// guards double as the per-owner serialization points: partner capacity
/// check-and-mutate and per-delivery ping-append + ETA-recompute each run
/// under a single `get_mut` guard.
pub struct AppState {
    pub zones: DashMap<Uuid, DeliveryZone>,
    pub partners: DashMap<Uuid, DeliveryPartner>,
    pub deliveries: DashMap<Uuid, DeliveryTracking>,
    pub routes: DashMap<Uuid, Route>,
    pub tracking_events_tx: broadcast::Sender<TrackingEvent>,
    pub settings: Settings,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(settings: Settings, event_buffer_size: usize) -> Self {
        let (tracking_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            zones: DashMap::new(),
            partners: DashMap::new(),
            deliveries: DashMap::new(),
            routes: DashMap::new(),
            tracking_events_tx,
            settings,
            metrics: Metrics::new(),
        }
    }
}
