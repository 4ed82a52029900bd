pub mod booking;
pub mod date_range;
pub mod event;
pub mod unavailability;
pub mod user;
pub mod vehicle;

pub use booking::{Booking, BookingStatus};
pub use date_range::DateRange;
pub use event::BookingEvent;
pub use unavailability::{BlockKind, UnavailabilityBlock};
pub use user::{Role, User};
pub use vehicle::{AvailabilityConstraints, Vehicle};
