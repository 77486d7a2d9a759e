use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Days between services assumed for a horse (or client) with no cycle on record.
pub const DEFAULT_TRIM_CYCLE_DAYS: u32 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    #[default]
    Trim,
    HalfSet,
    FullSet,
}

impl ServiceType {
    /// Maps a raw session service code such as `front_left` or `full_right`
    /// onto the service it bills as.
    pub fn from_service_code(code: &str) -> Self {
        if code.contains("front_") {
            ServiceType::HalfSet
        } else if code.contains("full_") {
            ServiceType::FullSet
        } else {
            ServiceType::Trim
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Horse {
    pub horse_id: String,
    pub name: String,
    #[serde(default)]
    pub horse_type: String,
    #[serde(default)]
    pub service_type: ServiceType,
    #[serde(default)]
    pub trim_cycle_days: Option<u32>,
}

impl Horse {
    pub fn cycle_days(&self) -> u32 {
        positive_or_default(self.trim_cycle_days)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicedHorse {
    pub horse_id: String,
    pub service_code: String,
}

/// One completed farrier visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimSession {
    pub date: NaiveDate,
    pub horses: Vec<ServicedHorse>,
}

impl TrimSession {
    pub fn entry_for(&self, horse_id: &str) -> Option<&ServicedHorse> {
        self.horses.iter().find(|entry| entry.horse_id == horse_id)
    }

    pub fn includes(&self, horse_id: &str) -> bool {
        self.entry_for(horse_id).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub trim_cycle_days: Option<u32>,
    #[serde(default)]
    pub horses: Vec<Horse>,
    #[serde(default)]
    pub trim_history: Vec<TrimSession>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub client_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<NaiveTime>,
}

/// Average durations used to turn a predicted visit into minutes.
///
/// Every field tolerates missing or malformed input and counts as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ScheduleOptions {
    #[serde(default, deserialize_with = "lenient_minutes")]
    pub avg_drive_time_minutes: u32,
    #[serde(default, deserialize_with = "lenient_minutes")]
    pub avg_trim_minutes: u32,
    #[serde(default, deserialize_with = "lenient_minutes")]
    pub half_set_minutes: u32,
    #[serde(default, deserialize_with = "lenient_minutes")]
    pub full_set_minutes: u32,
}

impl ScheduleOptions {
    pub fn minutes_for(&self, service: ServiceType) -> u32 {
        match service {
            ServiceType::Trim => self.avg_trim_minutes,
            ServiceType::HalfSet => self.half_set_minutes,
            ServiceType::FullSet => self.full_set_minutes,
        }
    }
}

fn lenient_minutes<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(minutes_from_value).unwrap_or(0))
}

fn minutes_from_value(value: &Value) -> Option<u32> {
    let minutes = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (minutes.is_finite() && minutes >= 0.0).then(|| minutes.round().min(u32::MAX as f64) as u32)
}

pub(crate) fn positive_or_default(days: Option<u32>) -> u32 {
    match days {
        Some(days) if days > 0 => days,
        _ => DEFAULT_TRIM_CYCLE_DAYS,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppData {
    #[serde(default)]
    pub clients: BTreeMap<String, Client>,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
    #[serde(default)]
    pub settings: ScheduleOptions,
}

/// A set of horses that has been serviced together, exactly, at least once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceGroup {
    pub horse_ids: BTreeSet<String>,
    pub dates: Vec<NaiveDate>,
    pub interval_days: u32,
    pub frequency: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredGroup {
    pub group: ServiceGroup,
    pub due_score: f64,
    pub group_size_bonus: f64,
    pub frequency_bonus: f64,
    pub consistency_bonus: f64,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    ServiceGroup,
    IndividualDue,
    LargeHerd,
    FullRoster,
    NoHorses,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictedHorse {
    #[serde(flatten)]
    pub horse: Horse,
    pub predicted_service: ServiceType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct ServiceBreakdown {
    pub trims: usize,
    pub half_sets: usize,
    pub full_sets: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub source: PredictionSource,
    pub horses: Vec<PredictedHorse>,
    pub total_time_minutes: u32,
    pub service_breakdown: ServiceBreakdown,
    pub selected_group: Option<ScoredGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentForecast {
    pub appointment_id: Option<String>,
    pub client_id: String,
    pub client_name: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub projected_from: Option<NaiveDate>,
    pub prediction: PredictionResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub booked: Vec<AppointmentForecast>,
    pub projected: Vec<AppointmentForecast>,
    pub total_time_minutes: u32,
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct NewAppointmentRequest {
    pub client_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<NaiveTime>,
}
