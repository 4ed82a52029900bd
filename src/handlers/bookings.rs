use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, Role};
use crate::services::booking::{self, BookingRequest, Canceller};
use crate::services::calendar::generate_ics;
use crate::services::events::record_booking_event;
use crate::services::notifications::{dispatch, Notification, Recipient};
use crate::state::AppState;

use super::auth::Caller;

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub vehicle_id: String,
    pub user_id: String,
    pub start_date: String,
    pub end_date: String,
    pub days: i64,
    pub total_price: f64,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            start_date: b.range.start().to_string(),
            end_date: b.range.end().to_string(),
            days: b.range.days(),
            status: b.status.as_str().to_string(),
            created_at: b.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            updated_at: b.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            id: b.id,
            vehicle_id: b.vehicle_id,
            user_id: b.user_id,
            total_price: b.total_price,
            notes: b.notes,
        }
    }
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub vehicle_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: f64,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let request = BookingRequest {
        vehicle_id: body.vehicle_id,
        user_id: caller.user_id.clone(),
        start_date: body.start_date,
        end_date: body.end_date,
        total_price: body.total_price,
    };

    let booking = booking::book_vehicle(&state.db, state.config.default_constraints(), &request)
        .inspect_err(|e| tracing::info!(vehicle_id = %request.vehicle_id, error = %e, "booking rejected"))?;

    record_booking_event(&state, &booking.id, "created", &caller.user_id, None);
    dispatch(
        &state.notifier,
        Notification {
            recipient: Recipient::Role(Role::Staff),
            subject: "New booking request".to_string(),
            body: format!("Vehicle {} requested for {}", booking.vehicle_id, booking.range),
            booking_id: Some(booking.id.clone()),
        },
    );

    Ok((StatusCode::CREATED, Json(booking.into())))
}

// GET /api/bookings
pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = {
        let db = state.db.lock().unwrap();
        queries::get_bookings_for_user(&db, &caller.user_id)?
    };
    Ok(Json(bookings.into_iter().map(BookingResponse::from).collect()))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_own_booking(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let today = Utc::now().date_naive();
    let booking = {
        let db = state.db.lock().unwrap();
        booking::cancel_booking(
            &db,
            &id,
            Canceller::Customer {
                user_id: &caller.user_id,
                today,
            },
        )?
    };

    record_booking_event(&state, &booking.id, "cancelled", &caller.user_id, None);
    dispatch(
        &state.notifier,
        Notification {
            recipient: Recipient::Role(Role::Staff),
            subject: "Booking cancelled by customer".to_string(),
            body: format!("Vehicle {} is free again for {}", booking.vehicle_id, booking.range),
            booking_id: Some(booking.id.clone()),
        },
    );

    Ok(Json(booking.into()))
}

// GET /api/bookings/:id/calendar.ics
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let (booking, vehicle) = {
        let db = state.db.lock().unwrap();
        let booking = queries::get_booking_by_id(&db, &id)?
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
        let vehicle = queries::get_vehicle(&db, &booking.vehicle_id)?
            .ok_or_else(|| AppError::NotFound(format!("vehicle {}", booking.vehicle_id)))?;
        (booking, vehicle)
    };

    if booking.user_id != caller.user_id && !caller.role.is_staff() {
        return Err(AppError::Forbidden);
    }

    let ics = generate_ics(&booking, &vehicle);
    let filename = format!("booking-{}.ics", booking.id);

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
