pub mod availability;
pub mod booking;
pub mod calendar;
pub mod events;
pub mod lifecycle;
pub mod notifications;
