use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;

use crate::db::{self, queries};
use crate::errors::{AppError, RejectionReason};
use crate::models::{
    AvailabilityConstraints, BlockKind, Booking, BookingStatus, UnavailabilityBlock, Vehicle,
};
use crate::services::{availability, lifecycle};

/// What the engine needs to know about one vehicle, read in one go.
#[derive(Debug, Clone)]
pub struct VehicleSnapshot {
    pub vehicle: Vehicle,
    pub constraints: AvailabilityConstraints,
    pub bookings: Vec<Booking>,
    pub blocks: Vec<UnavailabilityBlock>,
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub vehicle_id: String,
    pub user_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: f64,
}

#[derive(Debug, Clone)]
pub struct BlockRequest {
    pub vehicle_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
    pub kind: BlockKind,
}

pub enum Canceller<'a> {
    Customer { user_id: &'a str, today: NaiveDate },
    Staff { note: &'a str },
}

/// Load the vehicle and everything that still matters on or after `from`.
pub fn load_snapshot(
    conn: &Connection,
    vehicle_id: &str,
    from: NaiveDate,
    defaults: AvailabilityConstraints,
) -> Result<VehicleSnapshot, AppError> {
    let vehicle = queries::get_vehicle(conn, vehicle_id)?
        .ok_or_else(|| AppError::NotFound(format!("vehicle {vehicle_id}")))?;
    let constraints = AvailabilityConstraints::for_vehicle(&vehicle, defaults);
    let bookings = queries::get_bookings_for_vehicle(conn, vehicle_id, from)?;
    let blocks = queries::get_blocks_for_vehicle(conn, vehicle_id, from)?;

    Ok(VehicleSnapshot {
        vehicle,
        constraints,
        bookings,
        blocks,
    })
}

/// Run the availability checks against a snapshot and build the pending booking.
pub fn plan_booking(snapshot: &VehicleSnapshot, request: &BookingRequest) -> Result<Booking, AppError> {
    if !snapshot.vehicle.active {
        return Err(AppError::BadRequest(format!(
            "vehicle {} is not available for rental",
            snapshot.vehicle.id
        )));
    }
    if !request.total_price.is_finite() || request.total_price < 0.0 {
        return Err(AppError::BadRequest("total_price must be a non-negative number".to_string()));
    }

    let range = availability::can_create_booking(
        request.start_date,
        request.end_date,
        snapshot.constraints,
        &snapshot.bookings,
        &snapshot.blocks,
    )?;

    let now = Utc::now().naive_utc();
    Ok(Booking {
        id: uuid::Uuid::new_v4().to_string(),
        vehicle_id: request.vehicle_id.clone(),
        user_id: request.user_id.clone(),
        range,
        total_price: request.total_price,
        status: BookingStatus::Pending,
        notes: None,
        created_at: now,
        updated_at: now,
    })
}

/// Insert a planned booking. Losing a race to a concurrent insert surfaces
/// as `StorageConflict`, never as a second booking.
pub fn commit_booking(conn: &Connection, booking: &Booking) -> Result<(), AppError> {
    match queries::insert_booking(conn, booking) {
        Ok(()) => Ok(()),
        Err(e) if db::is_overlap_violation(&e) => {
            tracing::warn!(
                vehicle_id = %booking.vehicle_id,
                range = %booking.range,
                "booking lost race at storage layer"
            );
            Err(RejectionReason::StorageConflict.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Read, check, insert. The database lock is released while the checks run.
pub fn book_vehicle(
    db: &Mutex<Connection>,
    defaults: AvailabilityConstraints,
    request: &BookingRequest,
) -> Result<Booking, AppError> {
    let snapshot = {
        let conn = db.lock().unwrap();
        load_snapshot(&conn, &request.vehicle_id, request.start_date, defaults)?
    };

    let booking = plan_booking(&snapshot, request)?;

    {
        let conn = db.lock().unwrap();
        commit_booking(&conn, &booking)?;
    }

    tracing::info!(
        booking_id = %booking.id,
        vehicle_id = %booking.vehicle_id,
        range = %booking.range,
        "booking created"
    );
    Ok(booking)
}

fn load_booking(conn: &Connection, id: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_id(conn, id)?.ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

/// Apply a decided transition, guarding against a concurrent status change.
fn apply_status(
    conn: &Connection,
    mut booking: Booking,
    next: BookingStatus,
    note: Option<&str>,
) -> Result<Booking, AppError> {
    if !queries::update_booking_status(conn, &booking.id, booking.status, next, note)? {
        let current = load_booking(conn, &booking.id)?;
        lifecycle::transition(current.status, next)?;
        return Err(RejectionReason::InvalidTransition { from: current.status, to: next }.into());
    }

    tracing::info!(booking_id = %booking.id, from = %booking.status, to = %next, "booking status changed");
    booking.status = next;
    if let Some(note) = note {
        booking.notes = Some(note.to_string());
    }
    Ok(booking)
}

/// Staff decision: confirm, reject or complete.
pub fn set_status(
    conn: &Connection,
    id: &str,
    next: BookingStatus,
    note: Option<&str>,
) -> Result<Booking, AppError> {
    let booking = load_booking(conn, id)?;
    if next == BookingStatus::Cancelled {
        // Cancellation carries its own note rule
        lifecycle::staff_cancel(&booking, note.unwrap_or(""))?;
    } else {
        lifecycle::transition(booking.status, next)?;
    }

    // A block laid over a pending booking keeps it from being confirmed
    if next == BookingStatus::Confirmed {
        let blocks = queries::get_blocks_for_vehicle(conn, &booking.vehicle_id, booking.range.start())?;
        if !availability::is_range_free(&booking.range, blocks.iter().map(|u| &u.range)) {
            return Err(RejectionReason::DateConflict.into());
        }
    }

    apply_status(conn, booking, next, note)
}

pub fn cancel_booking(conn: &Connection, id: &str, by: Canceller<'_>) -> Result<Booking, AppError> {
    let booking = load_booking(conn, id)?;

    let (next, note) = match by {
        Canceller::Customer { user_id, today } => {
            if booking.user_id != user_id {
                return Err(AppError::Forbidden);
            }
            (lifecycle::customer_cancel(&booking, today)?, None)
        }
        Canceller::Staff { note } => (lifecycle::staff_cancel(&booking, note)?, Some(note.trim())),
    };

    apply_status(conn, booking, next, note)
}

/// Lay an unavailability block, refusing to cover a confirmed booking.
pub fn create_block(
    conn: &Connection,
    request: &BlockRequest,
    created_by: &str,
) -> Result<UnavailabilityBlock, AppError> {
    if queries::get_vehicle(conn, &request.vehicle_id)?.is_none() {
        return Err(AppError::NotFound(format!("vehicle {}", request.vehicle_id)));
    }

    let bookings = queries::get_bookings_for_vehicle(conn, &request.vehicle_id, request.start_date)?;
    let range = availability::can_create_block(request.start_date, request.end_date, &bookings)?;

    let block = UnavailabilityBlock {
        id: uuid::Uuid::new_v4().to_string(),
        vehicle_id: request.vehicle_id.clone(),
        range,
        reason: request.reason.clone(),
        kind: request.kind,
        created_by: created_by.to_string(),
    };
    queries::insert_block(conn, &block)?;

    tracing::info!(block_id = %block.id, vehicle_id = %block.vehicle_id, range = %block.range, "unavailability created");
    Ok(block)
}
