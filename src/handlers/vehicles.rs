use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Vehicle;
use crate::services::availability::compute_blocked_ranges;
use crate::services::booking::load_snapshot;
use crate::state::AppState;

pub async fn health() -> &'static str {
    "ok"
}

// GET /api/vehicles
pub async fn list_vehicles(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Vehicle>>, AppError> {
    let vehicles = {
        let db = state.db.lock().unwrap();
        queries::list_vehicles(&db, true)?
    };
    Ok(Json(vehicles))
}

// GET /api/vehicles/:id
pub async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vehicle>, AppError> {
    let vehicle = {
        let db = state.db.lock().unwrap();
        queries::get_vehicle(&db, &id)?
    };
    vehicle
        .filter(|v| v.active)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("vehicle {id}")))
}

// GET /api/vehicles/:id/availability
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub from: Option<NaiveDate>,
}

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let from = query.from.unwrap_or_else(|| Utc::now().date_naive());

    let snapshot = {
        let db = state.db.lock().unwrap();
        load_snapshot(&db, &id, from, state.config.default_constraints())?
    };

    let blocked: Vec<_> = compute_blocked_ranges(&snapshot.bookings, &snapshot.blocks).collect();

    Ok(Json(serde_json::json!({
        "vehicle_id": snapshot.vehicle.id,
        "min_days": snapshot.constraints.min_days,
        "max_days": snapshot.constraints.max_days,
        "blocked": blocked,
    })))
}
