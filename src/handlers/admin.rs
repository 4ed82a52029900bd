use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    AvailabilityConstraints, BlockKind, BookingEvent, BookingStatus, Role, UnavailabilityBlock, User, Vehicle,
};
use crate::services::booking::{self, BlockRequest, Canceller};
use crate::services::events::record_booking_event;
use crate::services::notifications::{dispatch, Notification, Recipient};
use crate::state::AppState;

use super::auth::Caller;
use super::bookings::BookingResponse;

fn parse_status(s: &str) -> Result<BookingStatus, AppError> {
    BookingStatus::parse(s).ok_or_else(|| AppError::BadRequest(format!("unknown booking status: {s}")))
}

fn notify_customer(state: &Arc<AppState>, user_id: &str, booking_id: &str, subject: String, body: String) {
    dispatch(
        &state.notifier,
        Notification {
            recipient: Recipient::User(user_id.to_string()),
            subject,
            body,
            booking_id: Some(booking_id.to_string()),
        },
    );
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub vehicle_id: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    caller.require_staff()?;

    let status = query.status.as_deref().map(parse_status).transpose()?;
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    let bookings = {
        let db = state.db.lock().unwrap();
        queries::get_all_bookings(&db, status, query.vehicle_id.as_deref(), limit)?
    };

    Ok(Json(bookings.into_iter().map(BookingResponse::from).collect()))
}

// GET /api/admin/bookings/:id/events
pub async fn booking_history(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Vec<BookingEvent>>, AppError> {
    caller.require_staff()?;

    let events = {
        let db = state.db.lock().unwrap();
        queries::get_events_for_booking(&db, &id)?
    };
    Ok(Json(events))
}

// POST /api/admin/bookings/:id/status
#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
    pub note: Option<String>,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    caller.require_staff()?;
    let next = parse_status(&body.status)?;
    let note = body.note.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let booking = {
        let db = state.db.lock().unwrap();
        booking::set_status(&db, &id, next, note)?
    };

    record_booking_event(&state, &booking.id, next.as_str(), &caller.user_id, note);
    notify_customer(
        &state,
        &booking.user_id,
        &booking.id,
        format!("Your booking is {next}"),
        format!("Booking for {} is now {next}", booking.range),
    );

    Ok(Json(booking.into()))
}

// POST /api/admin/bookings/:id/cancel
#[derive(Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub note: String,
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(body): Json<CancelRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    caller.require_staff()?;

    let booking = {
        let db = state.db.lock().unwrap();
        booking::cancel_booking(&db, &id, Canceller::Staff { note: &body.note })?
    };

    record_booking_event(&state, &booking.id, "cancelled", &caller.user_id, Some(body.note.trim()));
    notify_customer(
        &state,
        &booking.user_id,
        &booking.id,
        "Your booking was cancelled".to_string(),
        format!("Booking for {} was cancelled: {}", booking.range, body.note.trim()),
    );

    Ok(Json(booking.into()))
}

// POST /api/admin/vehicles
#[derive(Deserialize)]
pub struct CreateVehicleRequest {
    pub name: String,
    pub category: Option<String>,
    pub daily_rate: f64,
    pub min_days: Option<i64>,
    pub max_days: Option<i64>,
}

/// Checks the bounds the vehicle will actually be booked under, defaults included.
fn validate_vehicle(vehicle: &Vehicle, defaults: AvailabilityConstraints) -> Result<(), AppError> {
    if vehicle.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    if !vehicle.daily_rate.is_finite() || vehicle.daily_rate < 0.0 {
        return Err(AppError::BadRequest("daily_rate must be a non-negative number".to_string()));
    }
    if vehicle.min_days.is_some_and(|m| m < 1) {
        return Err(AppError::BadRequest("min_days must be at least 1".to_string()));
    }
    if vehicle.max_days.is_some_and(|m| m < 1) {
        return Err(AppError::BadRequest("max_days must be at least 1".to_string()));
    }
    let effective = AvailabilityConstraints::for_vehicle(vehicle, defaults);
    if effective.max_days < effective.min_days {
        return Err(AppError::BadRequest(format!(
            "max_days ({}) must not be less than min_days ({})",
            effective.max_days, effective.min_days
        )));
    }
    Ok(())
}

pub async fn create_vehicle(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<Vehicle>), AppError> {
    caller.require_staff()?;

    let vehicle = Vehicle {
        id: uuid::Uuid::new_v4().to_string(),
        name: body.name.trim().to_string(),
        category: body.category,
        daily_rate: body.daily_rate,
        min_days: body.min_days,
        max_days: body.max_days,
        active: true,
    };
    validate_vehicle(&vehicle, state.config.default_constraints())?;

    {
        let db = state.db.lock().unwrap();
        queries::create_vehicle(&db, &vehicle)?;
    }

    tracing::info!(vehicle_id = %vehicle.id, name = %vehicle.name, "vehicle created");
    Ok((StatusCode::CREATED, Json(vehicle)))
}

// PATCH /api/admin/vehicles/:id
/// Absent leaves a field alone. `null` clears a day bound back to the default.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
pub struct UpdateVehicleRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub daily_rate: Option<f64>,
    #[serde(default, deserialize_with = "present")]
    pub min_days: Option<Option<i64>>,
    #[serde(default, deserialize_with = "present")]
    pub max_days: Option<Option<i64>>,
    pub active: Option<bool>,
}

pub async fn update_vehicle(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(body): Json<UpdateVehicleRequest>,
) -> Result<Json<Vehicle>, AppError> {
    caller.require_staff()?;

    let db = state.db.lock().unwrap();
    let mut vehicle = queries::get_vehicle(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("vehicle {id}")))?;

    if let Some(name) = body.name {
        vehicle.name = name.trim().to_string();
    }
    if let Some(category) = body.category {
        vehicle.category = Some(category);
    }
    if let Some(rate) = body.daily_rate {
        vehicle.daily_rate = rate;
    }
    if let Some(min) = body.min_days {
        vehicle.min_days = min;
    }
    if let Some(max) = body.max_days {
        vehicle.max_days = max;
    }
    if let Some(active) = body.active {
        vehicle.active = active;
    }
    validate_vehicle(&vehicle, state.config.default_constraints())?;

    queries::update_vehicle(&db, &vehicle)?;
    Ok(Json(vehicle))
}

// GET /api/admin/unavailability
#[derive(Deserialize)]
pub struct UnavailabilityQuery {
    pub vehicle_id: Option<String>,
}

pub async fn list_unavailability(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<UnavailabilityQuery>,
) -> Result<Json<Vec<UnavailabilityBlock>>, AppError> {
    caller.require_staff()?;

    let blocks = {
        let db = state.db.lock().unwrap();
        queries::list_blocks(&db, query.vehicle_id.as_deref())?
    };
    Ok(Json(blocks))
}

// POST /api/admin/unavailability
#[derive(Deserialize)]
pub struct CreateUnavailabilityRequest {
    pub vehicle_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<BlockKind>,
}

pub async fn create_unavailability(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<CreateUnavailabilityRequest>,
) -> Result<(StatusCode, Json<UnavailabilityBlock>), AppError> {
    caller.require_staff()?;

    let request = BlockRequest {
        vehicle_id: body.vehicle_id,
        start_date: body.start_date,
        end_date: body.end_date,
        reason: body.reason,
        kind: body.kind.unwrap_or(BlockKind::Maintenance),
    };

    let block = {
        let db = state.db.lock().unwrap();
        booking::create_block(&db, &request, &caller.user_id)?
    };
    Ok((StatusCode::CREATED, Json(block)))
}

// DELETE /api/admin/unavailability/:id
pub async fn delete_unavailability(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    caller.require_staff()?;

    let removed = {
        let db = state.db.lock().unwrap();
        queries::delete_block(&db, &id)?
    };

    if removed {
        tracing::info!(block_id = %id, "unavailability removed");
        Ok(Json(serde_json::json!({"ok": true})))
    } else {
        Err(AppError::NotFound(format!("unavailability {id}")))
    }
}

// GET /api/admin/stats
#[derive(Serialize)]
pub struct MonthlyResponse {
    month: String,
    created: i64,
    cancelled: i64,
}

#[derive(Serialize)]
pub struct StatsResponse {
    bookings_by_status: serde_json::Map<String, serde_json::Value>,
    revenue: f64,
    upcoming_confirmed: i64,
    active_blocks: i64,
    vehicles: i64,
    monthly: Vec<MonthlyResponse>,
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<StatsResponse>, AppError> {
    caller.require_staff()?;

    let (stats, monthly) = {
        let db = state.db.lock().unwrap();
        (
            queries::get_dashboard_stats(&db, Utc::now().date_naive())?,
            queries::get_recent_monthly_bookings(&db, 6)?,
        )
    };

    Ok(Json(StatsResponse {
        bookings_by_status: stats
            .bookings_by_status
            .into_iter()
            .map(|(status, count)| (status, count.into()))
            .collect(),
        revenue: stats.revenue,
        upcoming_confirmed: stats.upcoming_confirmed,
        active_blocks: stats.active_blocks,
        vehicles: stats.vehicles,
        monthly: monthly
            .into_iter()
            .map(|m| MonthlyResponse {
                month: m.month,
                created: m.created,
                cancelled: m.cancelled,
            })
            .collect(),
    }))
}

// GET /api/admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<User>>, AppError> {
    caller.require_admin()?;

    let users = {
        let db = state.db.lock().unwrap();
        queries::list_users(&db)?
    };
    Ok(Json(users))
}

// POST /api/admin/users
#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub full_name: Option<String>,
    pub role: Option<Role>,
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    caller.require_admin()?;

    let email = body.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AppError::BadRequest("a valid email is required".to_string()));
    }

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email,
        full_name: body.full_name,
        role: body.role.unwrap_or(Role::Customer),
        api_token: uuid::Uuid::new_v4().simple().to_string(),
    };

    {
        let db = state.db.lock().unwrap();
        queries::create_user(&db, &user)?;
    }

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "user created");

    // The token is only ever shown here
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": user.id,
            "email": user.email,
            "full_name": user.full_name,
            "role": user.role,
            "api_token": user.api_token,
        })),
    ))
}

// POST /api/admin/users/:id/role
#[derive(Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

pub async fn set_user_role(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(body): Json<RoleRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    caller.require_admin()?;

    let updated = {
        let db = state.db.lock().unwrap();
        queries::update_user_role(&db, &id, body.role)?
    };

    if updated {
        tracing::info!(user_id = %id, role = body.role.as_str(), "user role changed");
        Ok(Json(serde_json::json!({"ok": true})))
    } else {
        Err(AppError::NotFound(format!("user {id}")))
    }
}
