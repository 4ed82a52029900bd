use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    BlockKind, Booking, BookingEvent, BookingStatus, DateRange, Role, UnavailabilityBlock, User,
    Vehicle,
};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

fn now_ts() -> String {
    Utc::now().naive_utc().format(TS_FORMAT).to_string()
}

fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(s, DATE_FORMAT)?)
}

fn parse_range(start: &str, end: &str) -> anyhow::Result<DateRange> {
    Ok(DateRange::new(parse_date(start)?, parse_date(end)?)?)
}

// ── Users ──

const USER_COLUMNS: &str = "id, email, full_name, role, api_token";

fn parse_user_row(row: &rusqlite::Row) -> anyhow::Result<User> {
    let role_str: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        role: Role::parse(&role_str)
            .ok_or_else(|| anyhow::anyhow!("unknown role in database: {role_str}"))?,
        api_token: row.get(4)?,
    })
}

pub fn create_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, full_name, role, api_token) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user.id, user.email, user.full_name, user.role.as_str(), user.api_token],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    conn.query_row(&sql, params![id], |row| Ok(parse_user_row(row)))
        .optional()?
        .transpose()
}

pub fn get_user_by_token(conn: &Connection, token: &str) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE api_token = ?1");
    conn.query_row(&sql, params![token], |row| Ok(parse_user_row(row)))
        .optional()?
        .transpose()
}

pub fn list_users(conn: &Connection) -> anyhow::Result<Vec<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok(parse_user_row(row)))?;

    let mut users = vec![];
    for row in rows {
        users.push(row??);
    }
    Ok(users)
}

pub fn update_user_role(conn: &Connection, id: &str, role: Role) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE users SET role = ?1 WHERE id = ?2",
        params![role.as_str(), id],
    )?;
    Ok(count > 0)
}

// ── Vehicles ──

const VEHICLE_COLUMNS: &str = "id, name, category, daily_rate, min_days, max_days, active";

fn parse_vehicle_row(row: &rusqlite::Row) -> rusqlite::Result<Vehicle> {
    Ok(Vehicle {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        daily_rate: row.get(3)?,
        min_days: row.get(4)?,
        max_days: row.get(5)?,
        active: row.get::<_, i32>(6)? != 0,
    })
}

pub fn create_vehicle(conn: &Connection, vehicle: &Vehicle) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO vehicles (id, name, category, daily_rate, min_days, max_days, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            vehicle.id,
            vehicle.name,
            vehicle.category,
            vehicle.daily_rate,
            vehicle.min_days,
            vehicle.max_days,
            vehicle.active as i32,
        ],
    )?;
    Ok(())
}

pub fn update_vehicle(conn: &Connection, vehicle: &Vehicle) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE vehicles SET name = ?1, category = ?2, daily_rate = ?3, min_days = ?4, max_days = ?5, active = ?6
         WHERE id = ?7",
        params![
            vehicle.name,
            vehicle.category,
            vehicle.daily_rate,
            vehicle.min_days,
            vehicle.max_days,
            vehicle.active as i32,
            vehicle.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_vehicle(conn: &Connection, id: &str) -> anyhow::Result<Option<Vehicle>> {
    let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], parse_vehicle_row).optional()?)
}

pub fn list_vehicles(conn: &Connection, active_only: bool) -> anyhow::Result<Vec<Vehicle>> {
    let sql = if active_only {
        format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE active = 1 ORDER BY name ASC")
    } else {
        format!("SELECT {VEHICLE_COLUMNS} FROM vehicles ORDER BY name ASC")
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], parse_vehicle_row)?;

    let mut vehicles = vec![];
    for row in rows {
        vehicles.push(row?);
    }
    Ok(vehicles)
}

// ── Bookings ──

const BOOKING_COLUMNS: &str =
    "id, vehicle_id, user_id, start_date, end_date, total_price, status, notes, created_at, updated_at";

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let start: String = row.get(3)?;
    let end: String = row.get(4)?;
    let status_str: String = row.get(6)?;
    let created_at_str: String = row.get(8)?;
    let updated_at_str: String = row.get(9)?;

    Ok(Booking {
        id: row.get(0)?,
        vehicle_id: row.get(1)?,
        user_id: row.get(2)?,
        range: parse_range(&start, &end)?,
        total_price: row.get(5)?,
        status: BookingStatus::parse(&status_str)
            .ok_or_else(|| anyhow::anyhow!("unknown booking status in database: {status_str}"))?,
        notes: row.get(7)?,
        created_at: NaiveDateTime::parse_from_str(&created_at_str, TS_FORMAT)?,
        updated_at: NaiveDateTime::parse_from_str(&updated_at_str, TS_FORMAT)?,
    })
}

fn collect_bookings(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Fails with the `booking_overlap` trigger error when the dates are taken.
pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, vehicle_id, user_id, start_date, end_date, total_price, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            booking.id,
            booking.vehicle_id,
            booking.user_id,
            booking.range.start().format(DATE_FORMAT).to_string(),
            booking.range.end().format(DATE_FORMAT).to_string(),
            booking.total_price,
            booking.status.as_str(),
            booking.notes,
            booking.created_at.format(TS_FORMAT).to_string(),
            booking.updated_at.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    conn.query_row(&sql, params![id], |row| Ok(parse_booking_row(row)))
        .optional()?
        .transpose()
}

/// Every booking for the vehicle that ends after `from`, whatever its status.
pub fn get_bookings_for_vehicle(
    conn: &Connection,
    vehicle_id: &str,
    from: NaiveDate,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE vehicle_id = ?1 AND end_date > ?2 ORDER BY start_date ASC"
    );
    let from = from.format(DATE_FORMAT).to_string();
    collect_bookings(conn, &sql, params![vehicle_id, from])
}

pub fn get_bookings_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = ?1 ORDER BY start_date DESC");
    collect_bookings(conn, &sql, params![user_id])
}

pub fn get_all_bookings(
    conn: &Connection,
    status_filter: Option<BookingStatus>,
    vehicle_filter: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR vehicle_id = ?2)
         ORDER BY start_date DESC LIMIT ?3"
    );
    let status = status_filter.map(|s| s.as_str());
    collect_bookings(conn, &sql, params![status, vehicle_filter, limit])
}

/// Compare-and-set on status. Returns false if the booking moved on meanwhile.
pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    expected: BookingStatus,
    next: BookingStatus,
    note: Option<&str>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, notes = COALESCE(?2, notes), updated_at = ?3
         WHERE id = ?4 AND status = ?5",
        params![next.as_str(), note, now_ts(), id, expected.as_str()],
    )?;
    Ok(count > 0)
}

// ── Unavailability ──

const BLOCK_COLUMNS: &str = "id, vehicle_id, start_date, end_date, reason, kind, created_by";

fn parse_block_row(row: &rusqlite::Row) -> anyhow::Result<UnavailabilityBlock> {
    let start: String = row.get(2)?;
    let end: String = row.get(3)?;
    let kind: String = row.get(5)?;
    Ok(UnavailabilityBlock {
        id: row.get(0)?,
        vehicle_id: row.get(1)?,
        range: parse_range(&start, &end)?,
        reason: row.get(4)?,
        kind: BlockKind::parse(&kind),
        created_by: row.get(6)?,
    })
}

fn collect_blocks(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> anyhow::Result<Vec<UnavailabilityBlock>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| Ok(parse_block_row(row)))?;

    let mut blocks = vec![];
    for row in rows {
        blocks.push(row??);
    }
    Ok(blocks)
}

pub fn insert_block(conn: &Connection, block: &UnavailabilityBlock) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO unavailability (id, vehicle_id, start_date, end_date, reason, kind, created_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            block.id,
            block.vehicle_id,
            block.range.start().format(DATE_FORMAT).to_string(),
            block.range.end().format(DATE_FORMAT).to_string(),
            block.reason,
            block.kind.as_str(),
            block.created_by,
        ],
    )?;
    Ok(())
}

pub fn get_blocks_for_vehicle(
    conn: &Connection,
    vehicle_id: &str,
    from: NaiveDate,
) -> anyhow::Result<Vec<UnavailabilityBlock>> {
    let sql = format!(
        "SELECT {BLOCK_COLUMNS} FROM unavailability WHERE vehicle_id = ?1 AND end_date > ?2 ORDER BY start_date ASC"
    );
    let from = from.format(DATE_FORMAT).to_string();
    collect_blocks(conn, &sql, params![vehicle_id, from])
}

pub fn list_blocks(conn: &Connection, vehicle_filter: Option<&str>) -> anyhow::Result<Vec<UnavailabilityBlock>> {
    let sql = format!(
        "SELECT {BLOCK_COLUMNS} FROM unavailability WHERE (?1 IS NULL OR vehicle_id = ?1) ORDER BY start_date ASC"
    );
    collect_blocks(conn, &sql, params![vehicle_filter])
}

pub fn delete_block(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM unavailability WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Booking Events ──

fn parse_event_row(row: &rusqlite::Row) -> rusqlite::Result<BookingEvent> {
    Ok(BookingEvent {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        kind: row.get(2)?,
        actor: row.get(3)?,
        note: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn insert_booking_event(
    conn: &Connection,
    booking_id: &str,
    kind: &str,
    actor: &str,
    note: Option<&str>,
) -> anyhow::Result<BookingEvent> {
    let created_at = now_ts();
    conn.execute(
        "INSERT INTO booking_events (booking_id, kind, actor, note, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![booking_id, kind, actor, note, created_at],
    )?;
    Ok(BookingEvent {
        id: conn.last_insert_rowid(),
        booking_id: booking_id.to_string(),
        kind: kind.to_string(),
        actor: actor.to_string(),
        note: note.map(String::from),
        created_at,
    })
}

pub fn get_booking_events_since(conn: &Connection, since_id: i64) -> anyhow::Result<Vec<BookingEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, booking_id, kind, actor, note, created_at
         FROM booking_events WHERE id > ?1
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![since_id], parse_event_row)?;

    let mut events = vec![];
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

pub fn get_events_for_booking(conn: &Connection, booking_id: &str) -> anyhow::Result<Vec<BookingEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, booking_id, kind, actor, note, created_at
         FROM booking_events WHERE booking_id = ?1
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![booking_id], parse_event_row)?;

    let mut events = vec![];
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

// ── Analytics ──

pub struct DashboardStats {
    pub bookings_by_status: Vec<(String, i64)>,
    pub revenue: f64,
    pub upcoming_confirmed: i64,
    pub active_blocks: i64,
    pub vehicles: i64,
}

pub fn get_dashboard_stats(conn: &Connection, today: NaiveDate) -> anyhow::Result<DashboardStats> {
    let today = today.format(DATE_FORMAT).to_string();

    let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM bookings GROUP BY status ORDER BY status ASC")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
    let mut bookings_by_status = vec![];
    for row in rows {
        bookings_by_status.push(row?);
    }

    let revenue: f64 = conn.query_row(
        "SELECT COALESCE(SUM(total_price), 0.0) FROM bookings WHERE status IN ('confirmed', 'completed')",
        [],
        |row| row.get(0),
    )?;

    let upcoming_confirmed: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE status = 'confirmed' AND start_date > ?1",
        params![today],
        |row| row.get(0),
    )?;

    let active_blocks: i64 = conn.query_row(
        "SELECT COUNT(*) FROM unavailability WHERE end_date > ?1",
        params![today],
        |row| row.get(0),
    )?;

    let vehicles: i64 = conn.query_row("SELECT COUNT(*) FROM vehicles", [], |row| row.get(0))?;

    Ok(DashboardStats {
        bookings_by_status,
        revenue,
        upcoming_confirmed,
        active_blocks,
        vehicles,
    })
}

pub struct MonthlyBookings {
    pub month: String,
    pub created: i64,
    pub cancelled: i64,
}

pub fn get_recent_monthly_bookings(conn: &Connection, months: usize) -> anyhow::Result<Vec<MonthlyBookings>> {
    let now = Utc::now();
    let mut result = Vec::with_capacity(months);

    for i in 0..months {
        let date = now - chrono::Months::new(i as u32);
        let month = date.format("%Y-%m").to_string();

        let (created, cancelled) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN status = 'cancelled' THEN 1 ELSE 0 END), 0)
             FROM bookings WHERE strftime('%Y-%m', created_at) = ?1",
            params![month],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;

        result.push(MonthlyBookings {
            month,
            created,
            cancelled,
        });
    }

    // Oldest first
    result.reverse();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        create_vehicle(
            &conn,
            &Vehicle {
                id: "car-1".to_string(),
                name: "Compact".to_string(),
                category: Some("economy".to_string()),
                daily_rate: 40.0,
                min_days: None,
                max_days: None,
                active: true,
            },
        )
        .unwrap();
        conn
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn booking(id: &str, start: &str, end: &str, status: BookingStatus) -> Booking {
        let now = Utc::now().naive_utc();
        Booking {
            id: id.to_string(),
            vehicle_id: "car-1".to_string(),
            user_id: "user-1".to_string(),
            range: DateRange::new(d(start), d(end)).unwrap(),
            total_price: 120.0,
            status,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_booking_round_trip() {
        let conn = setup();
        insert_booking(&conn, &booking("bk-1", "2025-06-10", "2025-06-15", BookingStatus::Pending)).unwrap();

        let loaded = get_booking_by_id(&conn, "bk-1").unwrap().unwrap();
        assert_eq!(loaded.range.start(), d("2025-06-10"));
        assert_eq!(loaded.range.end(), d("2025-06-15"));
        assert_eq!(loaded.status, BookingStatus::Pending);
        assert!(get_booking_by_id(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn test_trigger_rejects_overlapping_insert() {
        let conn = setup();
        insert_booking(&conn, &booking("bk-1", "2025-06-10", "2025-06-15", BookingStatus::Confirmed)).unwrap();

        let err = insert_booking(&conn, &booking("bk-2", "2025-06-12", "2025-06-20", BookingStatus::Pending))
            .unwrap_err();
        assert!(db::is_overlap_violation(&err), "unexpected error: {err}");

        insert_booking(&conn, &booking("bk-3", "2025-06-15", "2025-06-20", BookingStatus::Pending)).unwrap();
    }

    #[test]
    fn test_trigger_ignores_finalized_bookings() {
        let conn = setup();
        insert_booking(&conn, &booking("bk-1", "2025-06-10", "2025-06-15", BookingStatus::Pending)).unwrap();
        assert!(update_booking_status(&conn, "bk-1", BookingStatus::Pending, BookingStatus::Cancelled, None).unwrap());

        insert_booking(&conn, &booking("bk-2", "2025-06-10", "2025-06-15", BookingStatus::Pending)).unwrap();
    }

    #[test]
    fn test_trigger_respects_unavailability() {
        let conn = setup();
        insert_block(
            &conn,
            &UnavailabilityBlock {
                id: "ua-1".to_string(),
                vehicle_id: "car-1".to_string(),
                range: DateRange::new(d("2025-07-01"), d("2025-07-03")).unwrap(),
                reason: Some("service".to_string()),
                kind: BlockKind::Maintenance,
                created_by: "staff-1".to_string(),
            },
        )
        .unwrap();

        let err = insert_booking(&conn, &booking("bk-1", "2025-07-02", "2025-07-05", BookingStatus::Pending))
            .unwrap_err();
        assert!(db::is_overlap_violation(&err));
    }

    #[test]
    fn test_status_update_is_compare_and_set() {
        let conn = setup();
        insert_booking(&conn, &booking("bk-1", "2025-06-10", "2025-06-15", BookingStatus::Pending)).unwrap();

        assert!(update_booking_status(&conn, "bk-1", BookingStatus::Pending, BookingStatus::Confirmed, None).unwrap());
        assert!(!update_booking_status(&conn, "bk-1", BookingStatus::Pending, BookingStatus::Rejected, None).unwrap());
        let loaded = get_booking_by_id(&conn, "bk-1").unwrap().unwrap();
        assert_eq!(loaded.status, BookingStatus::Confirmed);
    }

    #[test]
    fn test_vehicle_window_excludes_past_bookings() {
        let conn = setup();
        insert_booking(&conn, &booking("old", "2025-01-01", "2025-01-05", BookingStatus::Completed)).unwrap();
        insert_booking(&conn, &booking("new", "2025-06-01", "2025-06-05", BookingStatus::Pending)).unwrap();

        let found = get_bookings_for_vehicle(&conn, "car-1", d("2025-01-05")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "new");
    }

    #[test]
    fn test_filters_on_all_bookings() {
        let conn = setup();
        insert_booking(&conn, &booking("a", "2025-06-01", "2025-06-05", BookingStatus::Pending)).unwrap();
        insert_booking(&conn, &booking("b", "2025-06-05", "2025-06-07", BookingStatus::Confirmed)).unwrap();

        let confirmed = get_all_bookings(&conn, Some(BookingStatus::Confirmed), None, 50).unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].id, "b");

        let all = get_all_bookings(&conn, None, Some("car-1"), 50).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_dashboard_stats() {
        let conn = setup();
        insert_booking(&conn, &booking("a", "2030-06-01", "2030-06-05", BookingStatus::Confirmed)).unwrap();
        insert_booking(&conn, &booking("b", "2030-07-01", "2030-07-05", BookingStatus::Pending)).unwrap();

        let stats = get_dashboard_stats(&conn, d("2030-01-01")).unwrap();
        assert_eq!(stats.revenue, 120.0);
        assert_eq!(stats.upcoming_confirmed, 1);
        assert_eq!(stats.vehicles, 1);
        assert_eq!(
            stats.bookings_by_status,
            vec![("confirmed".to_string(), 1), ("pending".to_string(), 1)]
        );
    }
}
