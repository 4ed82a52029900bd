use crate::models::{Booking, Vehicle};

/// All-day iCalendar event. DTEND is exclusive in iCalendar too, so the
/// return day is emitted as-is.
pub fn generate_ics(booking: &Booking, vehicle: &Vehicle) -> String {
    let dtstart = booking.range.start().format("%Y%m%d").to_string();
    let dtend = booking.range.end().format("%Y%m%d").to_string();
    let dtstamp = booking.created_at.format("%Y%m%dT%H%M%SZ").to_string();
    let uid = format!("{}@car-rental", booking.id);

    let summary = format!("Rental: {}", vehicle.name);
    let description = format!(
        "Booking {} ({}), {} days, total {:.2}",
        booking.id,
        booking.status,
        booking.range.days(),
        booking.total_price
    );

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Car Rental//Bookings//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART;VALUE=DATE:{dtstart}\r\n\
         DTEND;VALUE=DATE:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}
