use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/clients/:client_id/prediction", get(handlers::get_prediction))
        .route("/api/clients/:client_id/sessions", post(handlers::record_session))
        .route(
            "/api/appointments",
            get(handlers::get_appointments).post(handlers::book_appointment),
        )
        .route("/api/appointments/projected", get(handlers::get_projected_appointments))
        .route("/api/schedule", get(handlers::get_schedule))
        .route("/api/settings", get(handlers::get_settings).put(handlers::put_settings))
        .with_state(state)
}
