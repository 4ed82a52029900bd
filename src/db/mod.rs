pub mod migrations;
pub mod queries;

use anyhow::Context;
use rusqlite::Connection;

/// Message raised by the `bookings_no_overlap` trigger.
pub const OVERLAP_VIOLATION: &str = "booking_overlap";

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;")
        .context("failed to set database pragmas")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}

/// True when an insert was aborted by the storage-level overlap guard.
pub fn is_overlap_violation(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<rusqlite::Error>() {
        Some(rusqlite::Error::SqliteFailure(e, Some(msg))) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains(OVERLAP_VIOLATION)
        }
        _ => false,
    }
}
