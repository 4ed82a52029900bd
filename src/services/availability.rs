//! Booking availability: overlap checks, rental length policy and the blocked
//! ranges shown on vehicle calendars.
//!
//! Everything here is a pure function over data the caller already fetched.
//! Passing these checks does not reserve anything; the storage layer enforces
//! the same overlap rule on insert (see `services::booking`).

use chrono::NaiveDate;
use serde::Serialize;

use crate::errors::RejectionReason;
use crate::models::{AvailabilityConstraints, Booking, BookingStatus, DateRange, UnavailabilityBlock};

/// Where a blocked range comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockSource {
    Booking,
    Maintenance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedRange<'a> {
    #[serde(flatten)]
    pub range: DateRange,
    #[serde(rename = "type")]
    pub source: BlockSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'a str>,
}

/// Half-open overlap: `[s1, e1)` and `[s2, e2)` share a day iff `s1 < e2 && s2 < e1`.
pub fn ranges_overlap(a: &DateRange, b: &DateRange) -> bool {
    a.overlaps(b)
}

pub fn is_range_free<'a, I>(candidate: &DateRange, blockers: I) -> bool
where
    I: IntoIterator<Item = &'a DateRange>,
{
    !blockers.into_iter().any(|b| ranges_overlap(candidate, b))
}

pub fn validate_duration(candidate: &DateRange, min_days: i64, max_days: i64) -> bool {
    let days = candidate.days();
    min_days <= days && days <= max_days
}

/// Ranges that can stop a new booking: active bookings, then every block.
pub fn active_blockers<'a>(
    bookings: &'a [Booking],
    blocks: &'a [UnavailabilityBlock],
) -> impl Iterator<Item = &'a DateRange> + Clone + 'a {
    bookings
        .iter()
        .filter(|b| b.status.blocks_availability())
        .map(|b| &b.range)
        .chain(blocks.iter().map(|u| &u.range))
}

/// Blocked ranges for calendar rendering, one per source, in input order.
///
/// Overlapping ranges are not merged. The iterator is lazy and `Clone`, so a
/// caller can walk it again and get the same sequence.
pub fn compute_blocked_ranges<'a>(
    bookings: &'a [Booking],
    blocks: &'a [UnavailabilityBlock],
) -> impl Iterator<Item = BlockedRange<'a>> + Clone + 'a {
    let from_bookings = bookings
        .iter()
        .filter(|b| b.status.blocks_availability())
        .map(|b| BlockedRange {
            range: b.range,
            source: BlockSource::Booking,
            reason: None,
        });

    let from_blocks = blocks.iter().map(|u| BlockedRange {
        range: u.range,
        source: BlockSource::Maintenance,
        reason: u.reason.as_deref(),
    });

    from_bookings.chain(from_blocks)
}

/// Decide whether `[start, end)` can be booked. Returns the validated range.
pub fn can_create_booking(
    start: NaiveDate,
    end: NaiveDate,
    constraints: AvailabilityConstraints,
    existing_bookings: &[Booking],
    unavailability: &[UnavailabilityBlock],
) -> Result<DateRange, RejectionReason> {
    let candidate = DateRange::new(start, end)?;

    if !validate_duration(&candidate, constraints.min_days, constraints.max_days) {
        return Err(RejectionReason::DurationOutOfBounds {
            days: candidate.days(),
            min: constraints.min_days,
            max: constraints.max_days,
        });
    }

    if !is_range_free(&candidate, active_blockers(existing_bookings, unavailability)) {
        return Err(RejectionReason::DateConflict);
    }

    Ok(candidate)
}

/// A block may not be laid over a confirmed booking. Pending bookings do not
/// prevent it; staff are expected to reject those.
pub fn can_create_block(
    start: NaiveDate,
    end: NaiveDate,
    existing_bookings: &[Booking],
) -> Result<DateRange, RejectionReason> {
    let candidate = DateRange::new(start, end)?;

    let confirmed = existing_bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Confirmed)
        .map(|b| &b.range);

    if !is_range_free(&candidate, confirmed) {
        return Err(RejectionReason::DateConflict);
    }

    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BlockKind;
    use chrono::NaiveDateTime;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::new(d(start), d(end)).unwrap()
    }

    fn booking(start: &str, end: &str, status: BookingStatus) -> Booking {
        let now = NaiveDateTime::parse_from_str("2025-01-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        Booking {
            id: format!("bk-{start}-{}", status.as_str()),
            vehicle_id: "car-1".to_string(),
            user_id: "user-1".to_string(),
            range: range(start, end),
            total_price: 100.0,
            status,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn block(start: &str, end: &str, reason: Option<&str>) -> UnavailabilityBlock {
        UnavailabilityBlock {
            id: format!("ua-{start}"),
            vehicle_id: "car-1".to_string(),
            range: range(start, end),
            reason: reason.map(String::from),
            kind: BlockKind::Maintenance,
            created_by: "staff-1".to_string(),
        }
    }

    #[test]
    fn test_checkout_day_is_next_pickup_day() {
        let first = range("2025-01-01", "2025-01-05");
        let second = range("2025-01-05", "2025-01-10");
        assert!(is_range_free(&second, [&first]));
        assert!(is_range_free(&first, [&second]));
    }

    #[test]
    fn test_overlap_matches_half_open_rule() {
        let days: Vec<NaiveDate> = (1..=8).map(|n| d(&format!("2025-02-0{n}"))).collect();
        for (i, &s1) in days.iter().enumerate() {
            for &e1 in &days[i + 1..] {
                for (j, &s2) in days.iter().enumerate() {
                    for &e2 in &days[j + 1..] {
                        let a = DateRange::new(s1, e1).unwrap();
                        let b = DateRange::new(s2, e2).unwrap();
                        assert_eq!(!is_range_free(&a, [&b]), s1 < e2 && s2 < e1, "{a} vs {b}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_validate_duration() {
        assert!(validate_duration(&range("2025-03-01", "2025-03-04"), 1, 30));
        assert!(!validate_duration(&range("2025-03-01", "2025-03-02"), 2, 30));
        assert!(validate_duration(&range("2025-03-01", "2025-03-31"), 1, 30));
        assert!(!validate_duration(&range("2025-03-01", "2025-04-01"), 1, 30));
    }

    #[test]
    fn test_duration_rejection_reports_day_count() {
        let constraints = AvailabilityConstraints { min_days: 2, max_days: 30 };
        let err = can_create_booking(d("2025-03-01"), d("2025-03-02"), constraints, &[], &[]).unwrap_err();
        assert_eq!(err, RejectionReason::DurationOutOfBounds { days: 1, min: 2, max: 30 });
    }

    #[test]
    fn test_inverted_range_rejected_before_anything_else() {
        let err = can_create_booking(
            d("2025-03-05"),
            d("2025-03-01"),
            AvailabilityConstraints::default(),
            &[],
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, RejectionReason::InvalidRange { .. }));
    }

    #[test]
    fn test_confirmed_booking_conflicts_adjacent_is_accepted() {
        let existing = vec![booking("2025-06-10", "2025-06-15", BookingStatus::Confirmed)];
        let c = AvailabilityConstraints::default();

        let err = can_create_booking(d("2025-06-12"), d("2025-06-20"), c, &existing, &[]).unwrap_err();
        assert_eq!(err, RejectionReason::DateConflict);

        let ok = can_create_booking(d("2025-06-15"), d("2025-06-20"), c, &existing, &[]).unwrap();
        assert_eq!(ok, range("2025-06-15", "2025-06-20"));
    }

    #[test]
    fn test_pending_booking_blocks() {
        let existing = vec![booking("2025-06-10", "2025-06-15", BookingStatus::Pending)];
        let err = can_create_booking(
            d("2025-06-14"),
            d("2025-06-16"),
            AvailabilityConstraints::default(),
            &existing,
            &[],
        )
        .unwrap_err();
        assert_eq!(err, RejectionReason::DateConflict);
    }

    #[test]
    fn test_finalized_bookings_never_block() {
        for status in [BookingStatus::Cancelled, BookingStatus::Rejected, BookingStatus::Completed] {
            let existing = vec![booking("2025-06-10", "2025-06-15", status)];
            let result = can_create_booking(
                d("2025-06-10"),
                d("2025-06-15"),
                AvailabilityConstraints::default(),
                &existing,
                &[],
            );
            assert!(result.is_ok(), "{status} booking blocked the same dates");
        }
    }

    #[test]
    fn test_unavailability_block_conflicts() {
        let blocks = vec![block("2025-07-01", "2025-07-03", Some("brake service"))];
        let err = can_create_booking(
            d("2025-06-28"),
            d("2025-07-02"),
            AvailabilityConstraints::default(),
            &[],
            &blocks,
        )
        .unwrap_err();
        assert_eq!(err, RejectionReason::DateConflict);
    }

    #[test]
    fn test_blocked_ranges_are_tagged_and_unmerged() {
        let bookings = vec![
            booking("2025-06-10", "2025-06-15", BookingStatus::Confirmed),
            booking("2025-06-12", "2025-06-14", BookingStatus::Cancelled),
            booking("2025-06-20", "2025-06-22", BookingStatus::Pending),
        ];
        let blocks = vec![block("2025-06-14", "2025-06-18", Some("tyres"))];

        let ranges: Vec<_> = compute_blocked_ranges(&bookings, &blocks).collect();
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[0].source, BlockSource::Booking);
        assert_eq!(ranges[0].range, range("2025-06-10", "2025-06-15"));
        assert_eq!(ranges[1].range, range("2025-06-20", "2025-06-22"));
        assert_eq!(ranges[2].source, BlockSource::Maintenance);
        assert_eq!(ranges[2].reason, Some("tyres"));
    }

    #[test]
    fn test_blocked_ranges_are_restartable() {
        let bookings = vec![
            booking("2025-06-20", "2025-06-22", BookingStatus::Pending),
            booking("2025-06-10", "2025-06-15", BookingStatus::Confirmed),
        ];
        let blocks = vec![block("2025-06-01", "2025-06-02", None)];

        let iter = compute_blocked_ranges(&bookings, &blocks);
        let first: Vec<_> = iter.clone().collect();
        let second: Vec<_> = iter.collect();
        let third: Vec<_> = compute_blocked_ranges(&bookings, &blocks).collect();
        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_blocked_range_serializes_flat() {
        let blocks = vec![block("2025-06-01", "2025-06-02", Some("recall"))];
        let json = serde_json::to_value(compute_blocked_ranges(&[], &blocks).collect::<Vec<_>>()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"start": "2025-06-01", "end": "2025-06-02", "type": "maintenance", "reason": "recall"}])
        );
    }

    #[test]
    fn test_block_rejected_over_confirmed_booking_only() {
        let confirmed = vec![booking("2025-08-01", "2025-08-05", BookingStatus::Confirmed)];
        assert_eq!(
            can_create_block(d("2025-08-04"), d("2025-08-06"), &confirmed).unwrap_err(),
            RejectionReason::DateConflict
        );
        assert!(can_create_block(d("2025-08-05"), d("2025-08-06"), &confirmed).is_ok());

        let pending = vec![booking("2025-08-01", "2025-08-05", BookingStatus::Pending)];
        assert!(can_create_block(d("2025-08-02"), d("2025-08-03"), &pending).is_ok());
    }
}
