use std::sync::Arc;

use crate::db::queries;
use crate::state::AppState;

/// Append to the audit trail and push to live subscribers.
pub fn record_booking_event(
    state: &Arc<AppState>,
    booking_id: &str,
    kind: &str,
    actor: &str,
    note: Option<&str>,
) {
    let event = {
        let db = state.db.lock().unwrap();
        queries::insert_booking_event(&db, booking_id, kind, actor, note)
    };

    match event {
        Ok(event) => {
            // No subscribers is fine
            let _ = state.events_tx.send(event);
        }
        Err(e) => {
            tracing::error!(error = %e, booking_id, kind, "failed to record booking event");
        }
    }
}
