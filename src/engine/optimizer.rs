use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::RoutingAlgorithm;
use crate::error::AppError;
use crate::geo::{haversine_km, GeoPoint};
use crate::models::route::{
    DisruptionEvent, DisruptionKind, Priority, Route, RoutePerformance, RouteStatus, RouteStop,
    StopStatus, TimeWindow, Waypoint,
};

const MINUTES_PER_KM: f64 = 2.0;
const STOP_INTERVAL_MIN: i64 = 30;
const FUEL_COST_PER_KM: f64 = 0.5;
const LABOR_COST_PER_MIN: f64 = 0.25;

/// One order to be folded into a route, as handed over by the order
/// collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteOrder {
    pub order_id: Uuid,
    pub destination: GeoPoint,
    pub priority: Priority,
    pub time_window: Option<TimeWindow>,
}

/// Greedy nearest-neighbor visit order over a set of points. The first
/// point anchors the route; ties go to the earliest candidate in input
/// order. Returns indices into `points`.
pub fn nearest_neighbor_order(points: &[GeoPoint]) -> Vec<usize> {
    if points.is_empty() {
        return Vec::new();
    }

    let mut order = Vec::with_capacity(points.len());
    let mut visited = vec![false; points.len()];
    order.push(0);
    visited[0] = true;

    for _ in 1..points.len() {
        let last = points[order[order.len() - 1]];
        let mut best: Option<(usize, f64)> = None;

        for (i, candidate) in points.iter().enumerate() {
            if visited[i] {
                continue;
            }
            let distance = haversine_km(&last, candidate);
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((i, distance)),
            }
        }

        let Some((next, _)) = best else { break };
        visited[next] = true;
        order.push(next);
    }

    order
}

fn legs_total_km(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_km(&pair[0], &pair[1]))
        .sum()
}

/// Build a route for one (warehouse, delivery date) batch. Only the
/// nearest-neighbor heuristic is implemented; the other algorithm variants
/// are configuration placeholders for future work and are rejected here.
pub fn build_route(
    warehouse: GeoPoint,
    delivery_date: NaiveDate,
    orders: Vec<RouteOrder>,
    algorithm: RoutingAlgorithm,
    now: DateTime<Utc>,
) -> Result<Route, AppError> {
    if orders.is_empty() {
        return Err(AppError::BadRequest(
            "route requires at least one order".to_string(),
        ));
    }

    if algorithm != RoutingAlgorithm::NearestNeighbor {
        return Err(AppError::BadRequest(format!(
            "routing algorithm {algorithm:?} is not implemented; only nearest_neighbor is supported"
        )));
    }

    let destinations: Vec<GeoPoint> = orders.iter().map(|o| o.destination).collect();
    let visit_order = nearest_neighbor_order(&destinations);

    let mut stops = Vec::with_capacity(orders.len());
    let mut waypoints = Vec::with_capacity(orders.len());

    for (position, &index) in visit_order.iter().enumerate() {
        let order = &orders[index];
        let sequence = (position + 1) as u32;
        let estimated =
            now + Duration::minutes((position as i64 + 1) * STOP_INTERVAL_MIN);

        stops.push(RouteStop {
            order_id: order.order_id,
            destination: order.destination,
            priority: order.priority,
            time_window: order.time_window,
            sequence,
            status: StopStatus::Pending,
            estimated_delivery_time: estimated,
            delivered_at: None,
        });
        waypoints.push(Waypoint {
            location: order.destination,
            order_id: order.order_id,
            sequence,
            completed: false,
        });
    }

    let ordered_points: Vec<GeoPoint> = waypoints.iter().map(|w| w.location).collect();
    let total_distance_km = legs_total_km(&ordered_points);

    Ok(Route {
        id: Uuid::new_v4(),
        warehouse,
        delivery_date,
        stops,
        waypoints,
        total_distance_km,
        total_duration_min: total_distance_km * MINUTES_PER_KM,
        driver: None,
        vehicle: None,
        status: RouteStatus::Planned,
        events: Vec::new(),
        created_at: now,
    })
}

pub fn assign_driver(
    route: &mut Route,
    driver_id: Uuid,
    vehicle: Option<String>,
) -> Result<(), AppError> {
    if route.status != RouteStatus::Planned {
        return Err(AppError::InvalidTransition(format!(
            "route is {:?}, only planned routes can take a driver",
            route.status
        )));
    }

    route.driver = Some(driver_id);
    route.vehicle = vehicle;
    route.status = RouteStatus::Active;
    Ok(())
}

fn require_driver(route: &Route, driver_id: Uuid) -> Result<(), AppError> {
    if route.driver != Some(driver_id) {
        return Err(AppError::Unauthorized(format!(
            "driver {driver_id} is not assigned to route {}",
            route.id
        )));
    }
    Ok(())
}

/// Per-stop delivered/failed report from the assigned driver.
pub fn record_stop_status(
    route: &mut Route,
    driver_id: Uuid,
    order_id: Uuid,
    status: StopStatus,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    require_driver(route, driver_id)?;

    if route.status != RouteStatus::Active {
        return Err(AppError::InvalidTransition(format!(
            "route is {:?}, stops can only be reported on active routes",
            route.status
        )));
    }

    if status == StopStatus::Pending {
        return Err(AppError::BadRequest(
            "stop status can only be set to delivered or failed".to_string(),
        ));
    }

    let stop = route
        .stops
        .iter_mut()
        .find(|s| s.order_id == order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} is not on this route")))?;

    if stop.status != StopStatus::Pending {
        return Err(AppError::InvalidTransition(format!(
            "stop for order {order_id} is already {:?}",
            stop.status
        )));
    }

    stop.status = status;
    if status == StopStatus::Delivered {
        stop.delivered_at = Some(now);
    }

    if let Some(waypoint) = route.waypoints.iter_mut().find(|w| w.order_id == order_id) {
        waypoint.completed = true;
    }

    Ok(())
}

/// Log a real-time disruption. Reroute events re-run the heuristic over
/// the still-pending tail only; the new tail is computed in full before
/// anything on the route is replaced, so a failure leaves the route as it
/// was.
pub fn handle_disruption(
    route: &mut Route,
    kind: DisruptionKind,
    new_eta: Option<DateTime<Utc>>,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if matches!(route.status, RouteStatus::Completed | RouteStatus::Cancelled) {
        return Err(AppError::InvalidTransition(format!(
            "route is {:?} and no longer accepts events",
            route.status
        )));
    }

    if kind == DisruptionKind::Reroute {
        reoptimize_pending(route, now);
    }

    route.events.push(DisruptionEvent {
        kind,
        new_eta,
        note,
        recorded_at: now,
    });

    Ok(())
}

/// Re-run nearest-neighbor over uncompleted waypoints, anchored at the
/// most recently completed stop (or the current first pending waypoint
/// when nothing is completed yet). Completed waypoints keep their
/// sequence numbers; pending waypoints are reassigned the remaining
/// sequence numbers in the new visit order.
fn reoptimize_pending(route: &mut Route, now: DateTime<Utc>) {
    let completed: Vec<Waypoint> = route
        .waypoints
        .iter()
        .filter(|w| w.completed)
        .cloned()
        .collect();
    let pending: Vec<Waypoint> = route
        .waypoints
        .iter()
        .filter(|w| !w.completed)
        .cloned()
        .collect();

    if pending.len() <= 1 {
        return;
    }

    let anchor = completed
        .iter()
        .max_by_key(|w| w.sequence)
        .map(|w| w.location);

    let visit_order = match anchor {
        Some(anchor) => {
            // seed the scan with the anchor so the greedy walk continues
            // from where the driver last delivered
            let mut points = Vec::with_capacity(pending.len() + 1);
            points.push(anchor);
            points.extend(pending.iter().map(|w| w.location));
            let order = nearest_neighbor_order(&points);
            order.into_iter().skip(1).map(|i| i - 1).collect::<Vec<_>>()
        }
        None => nearest_neighbor_order(
            &pending.iter().map(|w| w.location).collect::<Vec<_>>(),
        ),
    };

    let mut free_sequences: Vec<u32> = pending.iter().map(|w| w.sequence).collect();
    free_sequences.sort_unstable();

    let mut new_tail = Vec::with_capacity(pending.len());
    for (position, &index) in visit_order.iter().enumerate() {
        let mut waypoint = pending[index].clone();
        waypoint.sequence = free_sequences[position];
        new_tail.push(waypoint);
    }

    let mut waypoints = completed;
    waypoints.extend(new_tail);
    waypoints.sort_unstable_by_key(|w| w.sequence);

    let mut stops = route.stops.clone();
    for stop in &mut stops {
        if let Some(waypoint) = waypoints.iter().find(|w| w.order_id == stop.order_id) {
            stop.sequence = waypoint.sequence;
        }
    }
    let pending_start = stops.iter().filter(|s| s.status != StopStatus::Pending).count();
    stops.sort_unstable_by_key(|s| s.sequence);
    for (offset, stop) in stops
        .iter_mut()
        .filter(|s| s.status == StopStatus::Pending)
        .enumerate()
    {
        stop.estimated_delivery_time = now
            + Duration::minutes(((pending_start + offset) as i64 + 1) * STOP_INTERVAL_MIN);
    }

    let ordered_points: Vec<GeoPoint> = waypoints.iter().map(|w| w.location).collect();
    let total_distance_km = legs_total_km(&ordered_points);

    // swap everything in only once the full tail is computed
    route.waypoints = waypoints;
    route.stops = stops;
    route.total_distance_km = total_distance_km;
    route.total_duration_min = total_distance_km * MINUTES_PER_KM;
}

/// Close an active route and report its performance. Driver-only.
pub fn complete_route(route: &mut Route, driver_id: Uuid) -> Result<RoutePerformance, AppError> {
    require_driver(route, driver_id)?;

    if route.status != RouteStatus::Active {
        return Err(AppError::InvalidTransition(format!(
            "route is {:?}, only active routes can be completed",
            route.status
        )));
    }

    let delivered: Vec<&RouteStop> = route
        .stops
        .iter()
        .filter(|s| s.status == StopStatus::Delivered)
        .collect();

    // a stop without a window cannot be late
    let on_time = delivered
        .iter()
        .filter(|s| match (&s.time_window, s.delivered_at) {
            (Some(window), Some(at)) => at <= window.end,
            _ => true,
        })
        .count();

    let fuel_cost = route.total_distance_km * FUEL_COST_PER_KM;
    let labor_cost = route.total_duration_min * LABOR_COST_PER_MIN;
    let delivered_count = delivered.len();

    let performance = RoutePerformance {
        total_stops: route.stops.len(),
        delivered: delivered_count,
        on_time,
        on_time_rate: if delivered_count == 0 {
            0.0
        } else {
            on_time as f64 / delivered_count as f64
        },
        total_distance_km: route.total_distance_km,
        fuel_cost,
        labor_cost,
        cost_per_delivery: (fuel_cost + labor_cost) / delivered_count.max(1) as f64,
    };

    route.status = RouteStatus::Completed;
    Ok(performance)
}
