use serde::{Deserialize, Serialize};

/// One row of the booking lifecycle audit trail.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookingEvent {
    pub id: i64,
    pub booking_id: String,
    pub kind: String,
    pub actor: String,
    pub note: Option<String>,
    pub created_at: String,
}
