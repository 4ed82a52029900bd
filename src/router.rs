use std::sync::Arc;

use axum::routing::{delete, get, patch, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::vehicles::health))
        .route("/api/vehicles", get(handlers::vehicles::list_vehicles))
        .route("/api/vehicles/:id", get(handlers::vehicles::get_vehicle))
        .route(
            "/api/vehicles/:id/availability",
            get(handlers::vehicles::get_availability),
        )
        .route(
            "/api/bookings",
            get(handlers::bookings::my_bookings).post(handlers::bookings::create_booking),
        )
        .route(
            "/api/bookings/:id/cancel",
            post(handlers::bookings::cancel_own_booking),
        )
        .route(
            "/api/bookings/:id/calendar.ics",
            get(handlers::bookings::download_ics),
        )
        .route("/api/admin/bookings", get(handlers::admin::list_bookings))
        .route(
            "/api/admin/bookings/:id/events",
            get(handlers::admin::booking_history),
        )
        .route(
            "/api/admin/bookings/:id/status",
            post(handlers::admin::update_status),
        )
        .route(
            "/api/admin/bookings/:id/cancel",
            post(handlers::admin::cancel_booking),
        )
        .route("/api/admin/vehicles", post(handlers::admin::create_vehicle))
        .route(
            "/api/admin/vehicles/:id",
            patch(handlers::admin::update_vehicle),
        )
        .route(
            "/api/admin/unavailability",
            get(handlers::admin::list_unavailability).post(handlers::admin::create_unavailability),
        )
        .route(
            "/api/admin/unavailability/:id",
            delete(handlers::admin::delete_unavailability),
        )
        .route("/api/admin/stats", get(handlers::admin::get_stats))
        .route("/api/admin/events", get(handlers::events::events_stream))
        .route(
            "/api/admin/users",
            get(handlers::admin::list_users).post(handlers::admin::create_user),
        )
        .route(
            "/api/admin/users/:id/role",
            post(handlers::admin::set_user_role),
        )
        .with_state(state)
}
