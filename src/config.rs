use std::env;

use crate::models::vehicle::{DEFAULT_MAX_DAYS, DEFAULT_MIN_DAYS};
use crate::models::AvailabilityConstraints;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub notify_webhook_url: Option<String>,
    pub default_min_days: i64,
    pub default_max_days: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "car_rental.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL")
                .ok()
                .filter(|v| !v.is_empty()),
            default_min_days: env::var("DEFAULT_MIN_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MIN_DAYS),
            default_max_days: env::var("DEFAULT_MAX_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_DAYS),
        }
    }

    pub fn default_constraints(&self) -> AvailabilityConstraints {
        AvailabilityConstraints {
            min_days: self.default_min_days,
            max_days: self.default_max_days,
        }
    }
}
