use crate::grouping::SessionHistory;
use crate::models::{
    AppData, Appointment, AppointmentForecast, Client, DEFAULT_TRIM_CYCLE_DAYS, DaySchedule,
};
use crate::predictor::predict_for_client;
use chrono::{Duration, Local, NaiveDate};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Cycle lengths tried, shortest first, when projecting unbooked visits.
pub const PROJECTION_CYCLE_DAYS: [u32; 10] = [7, 14, 21, 28, 35, 42, 49, 56, 63, 70];

/// A client's cycle: the stored value, else the mean gap between visits
/// snapped to the nearest projection length, else 42 days.
pub fn client_cycle_days(client: &Client) -> u32 {
    match client.trim_cycle_days {
        Some(days) if days > 0 => days,
        _ => match SessionHistory::new(&client.trim_history).mean_visit_gap() {
            Some(gap) => nearest_projection_cycle(gap),
            None => DEFAULT_TRIM_CYCLE_DAYS,
        },
    }
}

/// Rounds a day count to the nearest whole week within 7..=70.
pub fn nearest_projection_cycle(days: u32) -> u32 {
    let weeks = (f64::from(days) / 7.0).round() as u32;
    let shortest = PROJECTION_CYCLE_DAYS[0];
    let longest = PROJECTION_CYCLE_DAYS[PROJECTION_CYCLE_DAYS.len() - 1];
    (weeks * 7).clamp(shortest, longest)
}

/// Booked appointments on `date`, ordered by time with untimed ones last.
pub fn current_appointments(data: &AppData, date: NaiveDate) -> Vec<AppointmentForecast> {
    let mut booked: Vec<&Appointment> = data
        .appointments
        .iter()
        .filter(|appointment| appointment.date == date)
        .collect();
    booked.sort_by_key(|appointment| (appointment.time.is_none(), appointment.time));

    booked
        .into_iter()
        .filter_map(|appointment| {
            let Some(client) = data.clients.get(&appointment.client_id) else {
                warn!(
                    appointment_id = %appointment.id,
                    client_id = %appointment.client_id,
                    "appointment references unknown client"
                );
                return None;
            };
            let prediction = predict_for_client(data, &client.id, date)?;
            Some(AppointmentForecast {
                appointment_id: Some(appointment.id.clone()),
                client_id: client.id.clone(),
                client_name: client.name.clone(),
                date,
                time: appointment.time,
                projected_from: None,
                prediction,
            })
        })
        .collect()
}

pub fn projected_appointments(data: &AppData, date: NaiveDate) -> Vec<AppointmentForecast> {
    projected_appointments_at(Local::now().date_naive(), data, date)
}

/// Visits likely to land on `date` that nobody has booked yet.
///
/// Walks back one cycle length at a time. A client booked on the lookback
/// date whose cycle matches that length is projected onto `date`, unless they
/// already have a booking after the lookback date up to `date`. The walk stops
/// once the lookback date falls before `today`.
pub fn projected_appointments_at(
    today: NaiveDate,
    data: &AppData,
    date: NaiveDate,
) -> Vec<AppointmentForecast> {
    let mut projected = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for cycle in PROJECTION_CYCLE_DAYS {
        let Some(lookback) = date.checked_sub_signed(Duration::days(i64::from(cycle))) else {
            break;
        };
        if lookback < today {
            break;
        }

        for appointment in data.appointments.iter().filter(|a| a.date == lookback) {
            let Some(client) = data.clients.get(&appointment.client_id) else {
                continue;
            };
            if seen.contains(client.id.as_str()) || client_cycle_days(client) != cycle {
                continue;
            }
            if has_booking_between(data, &client.id, lookback, date) {
                debug!(client_id = %client.id, %lookback, "already rebooked, not projecting");
                continue;
            }
            let Some(prediction) = predict_for_client(data, &client.id, date) else {
                continue;
            };

            seen.insert(client.id.as_str());
            projected.push(AppointmentForecast {
                appointment_id: None,
                client_id: client.id.clone(),
                client_name: client.name.clone(),
                date,
                time: appointment.time,
                projected_from: Some(lookback),
                prediction,
            });
        }
    }

    projected
}

pub fn day_schedule(data: &AppData, date: NaiveDate) -> DaySchedule {
    day_schedule_at(Local::now().date_naive(), data, date)
}

pub fn day_schedule_at(today: NaiveDate, data: &AppData, date: NaiveDate) -> DaySchedule {
    let booked = current_appointments(data, date);
    let projected = projected_appointments_at(today, data, date);
    let total_time_minutes = booked
        .iter()
        .chain(projected.iter())
        .map(|forecast| forecast.prediction.total_time_minutes)
        .fold(0, u32::saturating_add);

    DaySchedule {
        date,
        booked,
        projected,
        total_time_minutes,
    }
}

fn has_booking_between(data: &AppData, client_id: &str, after: NaiveDate, until: NaiveDate) -> bool {
    data.appointments.iter().any(|appointment| {
        appointment.client_id == client_id && appointment.date > after && appointment.date <= until
    })
}
