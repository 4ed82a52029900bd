use chrono::NaiveDate;

use crate::errors::RejectionReason;
use crate::models::{Booking, BookingStatus};

/// Move a booking to `next` on behalf of staff.
pub fn transition(current: BookingStatus, next: BookingStatus) -> Result<BookingStatus, RejectionReason> {
    if current.is_terminal() {
        return Err(RejectionReason::AlreadyFinalized(current));
    }
    if !current.can_transition_to(next) {
        return Err(RejectionReason::InvalidTransition { from: current, to: next });
    }
    Ok(next)
}

/// Customers may cancel a pending or confirmed booking until its start day.
pub fn customer_cancel(booking: &Booking, today: NaiveDate) -> Result<BookingStatus, RejectionReason> {
    if booking.status.is_terminal() {
        return Err(RejectionReason::AlreadyFinalized(booking.status));
    }
    if today >= booking.range.start() {
        return Err(RejectionReason::PastStart);
    }
    transition(booking.status, BookingStatus::Cancelled)
}

/// Staff may cancel any open booking at any time, but must say why.
pub fn staff_cancel(booking: &Booking, note: &str) -> Result<BookingStatus, RejectionReason> {
    if booking.status.is_terminal() {
        return Err(RejectionReason::AlreadyFinalized(booking.status));
    }
    if note.trim().is_empty() {
        return Err(RejectionReason::NoteRequired);
    }
    transition(booking.status, BookingStatus::Cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DateRange;
    use chrono::{Duration, Utc};

    fn booking_starting(start: NaiveDate, status: BookingStatus) -> Booking {
        let now = Utc::now().naive_utc();
        Booking {
            id: "bk-1".to_string(),
            vehicle_id: "car-1".to_string(),
            user_id: "user-1".to_string(),
            range: DateRange::new(start, start + Duration::days(3)).unwrap(),
            total_price: 150.0,
            status,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_customer_cancel_before_start() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 9).unwrap();
        let tomorrow = today + Duration::days(1);
        let booking = booking_starting(tomorrow, BookingStatus::Confirmed);
        assert_eq!(customer_cancel(&booking, today), Ok(BookingStatus::Cancelled));
    }

    #[test]
    fn test_customer_cancel_after_start() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 9).unwrap();
        let yesterday = today - Duration::days(1);
        let booking = booking_starting(yesterday, BookingStatus::Confirmed);
        assert_eq!(customer_cancel(&booking, today), Err(RejectionReason::PastStart));
    }

    #[test]
    fn test_customer_cancel_on_start_day() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 9).unwrap();
        let booking = booking_starting(today, BookingStatus::Pending);
        assert_eq!(customer_cancel(&booking, today), Err(RejectionReason::PastStart));
    }

    #[test]
    fn test_customer_cancel_finalized() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 9).unwrap();
        for status in [BookingStatus::Cancelled, BookingStatus::Completed, BookingStatus::Rejected] {
            let booking = booking_starting(today + Duration::days(10), status);
            assert_eq!(
                customer_cancel(&booking, today),
                Err(RejectionReason::AlreadyFinalized(status))
            );
        }
    }

    #[test]
    fn test_staff_cancel_ignores_start_date() {
        let long_ago = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let booking = booking_starting(long_ago, BookingStatus::Confirmed);
        assert_eq!(staff_cancel(&booking, "vehicle damaged"), Ok(BookingStatus::Cancelled));
    }

    #[test]
    fn test_staff_cancel_requires_note() {
        let booking = booking_starting(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(), BookingStatus::Pending);
        assert_eq!(staff_cancel(&booking, "   "), Err(RejectionReason::NoteRequired));
    }

    #[test]
    fn test_transition_rules() {
        assert_eq!(
            transition(BookingStatus::Pending, BookingStatus::Confirmed),
            Ok(BookingStatus::Confirmed)
        );
        assert_eq!(
            transition(BookingStatus::Pending, BookingStatus::Completed),
            Err(RejectionReason::InvalidTransition {
                from: BookingStatus::Pending,
                to: BookingStatus::Completed
            })
        );
        assert_eq!(
            transition(BookingStatus::Rejected, BookingStatus::Confirmed),
            Err(RejectionReason::AlreadyFinalized(BookingStatus::Rejected))
        );
    }
}
