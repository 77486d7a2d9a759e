use crate::models::{DEFAULT_TRIM_CYCLE_DAYS, ServiceGroup, TrimSession};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A client's trim history ordered oldest first.
///
/// Sorting is stable, so sessions sharing a date keep their recorded order.
#[derive(Debug, Clone)]
pub struct SessionHistory<'a> {
    sessions: Vec<&'a TrimSession>,
}

impl<'a> SessionHistory<'a> {
    pub fn new(history: &'a [TrimSession]) -> Self {
        let mut sessions: Vec<&TrimSession> = history.iter().collect();
        sessions.sort_by_key(|session| session.date);
        Self { sessions }
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn sessions(&self) -> &[&'a TrimSession] {
        &self.sessions
    }

    fn latest_with(&self, horse_id: &str) -> Option<&'a TrimSession> {
        self.sessions
            .iter()
            .rev()
            .find(|session| session.includes(horse_id))
            .copied()
    }

    pub fn last_service_date(&self, horse_id: &str) -> Option<NaiveDate> {
        self.latest_with(horse_id).map(|session| session.date)
    }

    pub fn last_service_code(&self, horse_id: &str) -> Option<&'a str> {
        self.latest_with(horse_id)
            .and_then(|session| session.entry_for(horse_id))
            .map(|entry| entry.service_code.as_str())
    }

    /// Most frequent number of horses per visit. Ties go to the smaller size.
    pub fn most_common_size(&self) -> Option<usize> {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for session in &self.sessions {
            *counts.entry(session.horses.len()).or_default() += 1;
        }

        let mut best: Option<(usize, usize)> = None;
        for (size, count) in counts {
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((size, count));
            }
        }
        best.map(|(size, _)| size)
    }

    /// Rounded mean gap between distinct visit dates, if there are at least two.
    pub fn mean_visit_gap(&self) -> Option<u32> {
        let mut dates: Vec<NaiveDate> = self.sessions.iter().map(|session| session.date).collect();
        dates.dedup();
        (dates.len() >= 2).then(|| mean_interval_days(&dates))
    }
}

/// Collects sessions into groups of identical horse-id sets.
///
/// Groups come back in the order their horse set first appears in the
/// history, which keeps tie-breaking during selection reproducible.
pub fn build_service_groups(history: &SessionHistory<'_>) -> Vec<ServiceGroup> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<ServiceGroup> = Vec::new();

    for session in history.sessions() {
        let horse_ids: BTreeSet<String> = session
            .horses
            .iter()
            .map(|entry| entry.horse_id.clone())
            .collect();
        if horse_ids.is_empty() {
            continue;
        }

        let key = group_key(&horse_ids);
        match slots.get(&key) {
            Some(&slot) => groups[slot].dates.push(session.date),
            None => {
                slots.insert(key, groups.len());
                groups.push(ServiceGroup {
                    horse_ids,
                    dates: vec![session.date],
                    interval_days: DEFAULT_TRIM_CYCLE_DAYS,
                    frequency: 0,
                });
            }
        }
    }

    for group in &mut groups {
        group.frequency = group.dates.len();
        group.interval_days = mean_interval_days(&group.dates);
    }

    groups
}

pub fn group_key(horse_ids: &BTreeSet<String>) -> String {
    horse_ids
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Rounded mean of consecutive gaps in an ascending date list.
pub fn mean_interval_days(dates: &[NaiveDate]) -> u32 {
    if dates.len() < 2 {
        return DEFAULT_TRIM_CYCLE_DAYS;
    }

    let total: i64 = dates
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_days())
        .sum();
    let mean = total as f64 / (dates.len() - 1) as f64;
    mean.round().max(0.0) as u32
}
