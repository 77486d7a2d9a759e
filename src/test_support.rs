use crate::models::{Horse, ServiceType, ServicedHorse, TrimSession};
use chrono::NaiveDate;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn session(date: NaiveDate, horse_ids: &[&str]) -> TrimSession {
    TrimSession {
        date,
        horses: horse_ids
            .iter()
            .map(|id| ServicedHorse {
                horse_id: id.to_string(),
                service_code: "trim".to_string(),
            })
            .collect(),
    }
}

pub fn horse(horse_id: &str, service_type: ServiceType) -> Horse {
    Horse {
        horse_id: horse_id.to_string(),
        name: format!("Horse {horse_id}"),
        horse_type: "horse".to_string(),
        service_type,
        trim_cycle_days: None,
    }
}

pub fn roster(horse_ids: &[&str]) -> Vec<Horse> {
    horse_ids
        .iter()
        .map(|id| horse(id, ServiceType::Trim))
        .collect()
}
