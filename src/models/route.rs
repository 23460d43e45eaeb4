use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Planned,
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StopStatus {
    Pending,
    Delivered,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStop {
    pub order_id: Uuid,
    pub destination: GeoPoint,
    pub priority: Priority,
    pub time_window: Option<TimeWindow>,
    pub sequence: u32,
    pub status: StopStatus,
    pub estimated_delivery_time: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    pub location: GeoPoint,
    pub order_id: Uuid,
    pub sequence: u32,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DisruptionKind {
    Traffic,
    Delay,
    Accident,
    Reroute,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisruptionEvent {
    pub kind: DisruptionKind,
    pub new_eta: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePerformance {
    pub total_stops: usize,
    pub delivered: usize,
    pub on_time: usize,
    pub on_time_rate: f64,
    pub total_distance_km: f64,
    pub fuel_cost: f64,
    pub labor_cost: f64,
    pub cost_per_delivery: f64,
}

/// A multi-stop route for one (warehouse, delivery date) batch. Stops and
/// waypoints are kept 1:1; waypoint sequence numbers are a permutation of
/// `1..=n` at all times, including after partial re-optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub warehouse: GeoPoint,
    pub delivery_date: NaiveDate,
    pub stops: Vec<RouteStop>,
    pub waypoints: Vec<Waypoint>,
    pub total_distance_km: f64,
    pub total_duration_min: f64,
    pub driver: Option<Uuid>,
    pub vehicle: Option<String>,
    pub status: RouteStatus,
    pub events: Vec<DisruptionEvent>,
    pub created_at: DateTime<Utc>,
}
