use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Route-construction algorithm. Only `NearestNeighbor` is implemented;
/// the other variants are accepted in configuration as extension points
/// and rejected at route-build time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingAlgorithm {
    NearestNeighbor,
    Genetic,
    AntColony,
}

impl FromStr for RoutingAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nearest_neighbor" => Ok(RoutingAlgorithm::NearestNeighbor),
            "genetic" => Ok(RoutingAlgorithm::Genetic),
            "ant_colony" => Ok(RoutingAlgorithm::AntColony),
            other => Err(format!(
                "unknown routing algorithm: {other}, expected nearest_neighbor/genetic/ant_colony"
            )),
        }
    }
}

/// Tunables shared with request handlers through `AppState`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub max_delivery_attempts: u32,
    pub avg_speed_km_per_min: f64,
    pub max_search_distance_km: f64,
    pub algorithm: RoutingAlgorithm,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_delivery_attempts: 3,
            avg_speed_km_per_min: 0.5,
            max_search_distance_km: 50.0,
            algorithm: RoutingAlgorithm::NearestNeighbor,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub settings: Settings,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            settings: Settings {
                max_delivery_attempts: parse_or_default("MAX_DELIVERY_ATTEMPTS", 3)?,
                avg_speed_km_per_min: parse_or_default("AVG_SPEED_KM_PER_MIN", 0.5)?,
                max_search_distance_km: parse_or_default("MAX_SEARCH_DISTANCE_KM", 50.0)?,
                algorithm: parse_or_default("ROUTING_ALGORITHM", RoutingAlgorithm::NearestNeighbor)?,
            },
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
