use crate::appointments::{current_appointments, day_schedule, projected_appointments};
use crate::errors::AppError;
use crate::models::{
    Appointment, AppointmentForecast, Client, DateQuery, DaySchedule, NewAppointmentRequest,
    PredictionResult, PredictionSource, ScheduleOptions, TrimSession,
};
use crate::predictor::predict_for_client;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::collections::HashSet;
use tracing::info;

pub async fn get_prediction(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    Query(query): Query<DateQuery>,
) -> Result<Json<PredictionResult>, AppError> {
    let data = state.data.lock().await;
    let prediction = predict_for_client(&*data, &client_id, query.date)
        .ok_or_else(|| AppError::not_found(format!("unknown client '{client_id}'")))?;

    if prediction.source == PredictionSource::NoHorses {
        return Err(AppError::unprocessable(format!(
            "client '{client_id}' has no horses on record"
        )));
    }

    Ok(Json(prediction))
}

pub async fn record_session(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    Json(session): Json<TrimSession>,
) -> Result<(StatusCode, Json<TrimSession>), AppError> {
    let mut data = state.data.lock().await;
    let client = data
        .clients
        .get_mut(&client_id)
        .ok_or_else(|| AppError::not_found(format!("unknown client '{client_id}'")))?;

    validate_session(client, &session)?;
    client.trim_history.push(session.clone());

    state.persist(&data).await?;
    info!(
        client_id = %client_id,
        date = %session.date,
        horses = session.horses.len(),
        "recorded trim session"
    );

    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn get_appointments(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Json<Vec<AppointmentForecast>> {
    let data = state.data.lock().await;
    Json(current_appointments(&data, query.date))
}

pub async fn get_projected_appointments(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Json<Vec<AppointmentForecast>> {
    let data = state.data.lock().await;
    Json(projected_appointments(&data, query.date))
}

pub async fn book_appointment(
    State(state): State<AppState>,
    Json(request): Json<NewAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let mut data = state.data.lock().await;
    if !data.clients.contains_key(&request.client_id) {
        return Err(AppError::not_found(format!(
            "unknown client '{}'",
            request.client_id
        )));
    }

    let appointment = Appointment {
        id: next_appointment_id(&data.appointments),
        client_id: request.client_id,
        date: request.date,
        time: request.time,
    };
    data.appointments.push(appointment.clone());

    state.persist(&data).await?;
    info!(
        appointment_id = %appointment.id,
        client_id = %appointment.client_id,
        date = %appointment.date,
        "booked appointment"
    );

    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Json<DaySchedule> {
    let data = state.data.lock().await;
    Json(day_schedule(&data, query.date))
}

pub async fn get_settings(State(state): State<AppState>) -> Json<ScheduleOptions> {
    let data = state.data.lock().await;
    Json(data.settings)
}

pub async fn put_settings(
    State(state): State<AppState>,
    Json(settings): Json<ScheduleOptions>,
) -> Result<Json<ScheduleOptions>, AppError> {
    let mut data = state.data.lock().await;
    data.settings = settings;
    state.persist(&data).await?;
    info!(?settings, "updated schedule options");
    Ok(Json(settings))
}

fn validate_session(client: &Client, session: &TrimSession) -> Result<(), AppError> {
    if session.horses.is_empty() {
        return Err(AppError::bad_request("a session needs at least one horse"));
    }

    let mut seen = HashSet::new();
    for entry in &session.horses {
        if !seen.insert(entry.horse_id.as_str()) {
            return Err(AppError::bad_request(format!(
                "horse '{}' listed twice in one session",
                entry.horse_id
            )));
        }
        if !client.horses.iter().any(|horse| horse.horse_id == entry.horse_id) {
            return Err(AppError::bad_request(format!(
                "horse '{}' is not on the roster of client '{}'",
                entry.horse_id, client.id
            )));
        }
    }

    Ok(())
}

fn next_appointment_id(existing: &[Appointment]) -> String {
    let next = existing
        .iter()
        .filter_map(|appointment| appointment.id.strip_prefix("appt-")?.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    format!("appt-{next}")
}
