use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_DAYS: i64 = 1;
pub const DEFAULT_MAX_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub daily_rate: f64,
    pub min_days: Option<i64>,
    pub max_days: Option<i64>,
    pub active: bool,
}

/// Rental length policy for one vehicle, in end-exclusive days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AvailabilityConstraints {
    pub min_days: i64,
    pub max_days: i64,
}

impl Default for AvailabilityConstraints {
    fn default() -> Self {
        Self {
            min_days: DEFAULT_MIN_DAYS,
            max_days: DEFAULT_MAX_DAYS,
        }
    }
}

impl AvailabilityConstraints {
    /// Unset bounds fall back to `defaults`.
    pub fn for_vehicle(vehicle: &Vehicle, defaults: AvailabilityConstraints) -> Self {
        Self {
            min_days: vehicle.min_days.unwrap_or(defaults.min_days),
            max_days: vehicle.max_days.unwrap_or(defaults.max_days),
        }
    }
}
