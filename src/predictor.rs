use crate::directory::ClientDirectory;
use crate::grouping::{SessionHistory, build_service_groups};
use crate::models::{
    Horse, PredictedHorse, PredictionResult, PredictionSource, ScheduleOptions, ScoredGroup,
    ServiceBreakdown, ServiceType, TrimSession,
};
use crate::scoring::{
    SMALL_HERD_LIMIT, individually_due_horses, large_herd_selection, select_best_group,
};
use chrono::NaiveDate;
use tracing::debug;

/// Everything one prediction reads. Nothing here is mutated.
#[derive(Debug, Clone, Copy)]
pub struct PredictionInput<'a> {
    pub client_id: &'a str,
    pub horses: &'a [Horse],
    pub trim_history: &'a [TrimSession],
    pub target_date: NaiveDate,
    pub options: &'a ScheduleOptions,
}

/// Predicts which horses get which service at the visit on `target_date`.
pub fn predict_session(input: &PredictionInput<'_>) -> PredictionResult {
    if input.horses.is_empty() {
        debug!(client_id = input.client_id, "no horses on roster");
        return PredictionResult {
            source: PredictionSource::NoHorses,
            horses: Vec::new(),
            total_time_minutes: 0,
            service_breakdown: ServiceBreakdown::default(),
            selected_group: None,
        };
    }

    let history = SessionHistory::new(input.trim_history);
    if history.is_empty() {
        debug!(client_id = input.client_id, "no trim history, predicting full roster");
        let horses = input.horses.iter().map(with_stored_service).collect();
        return finish(PredictionSource::FullRoster, horses, None, input.options);
    }

    let groups = build_service_groups(&history);

    if let Some(scored) = select_best_group(&groups, input.horses, &history, input.target_date) {
        debug!(
            client_id = input.client_id,
            horses = ?scored.group.horse_ids,
            score = scored.score,
            "service group selected"
        );
        let horses = input
            .horses
            .iter()
            .filter(|horse| scored.group.horse_ids.contains(&horse.horse_id))
            .map(|horse| PredictedHorse {
                horse: horse.clone(),
                predicted_service: history
                    .last_service_code(&horse.horse_id)
                    .map_or(ServiceType::Trim, ServiceType::from_service_code),
            })
            .collect();
        return finish(PredictionSource::ServiceGroup, horses, Some(scored), input.options);
    }

    if input.horses.len() <= SMALL_HERD_LIMIT {
        let due = individually_due_horses(input.horses, &history, input.target_date);
        if due.is_empty() {
            debug!(client_id = input.client_id, "nothing individually due, predicting full roster");
            let horses = input.horses.iter().map(with_stored_service).collect();
            return finish(PredictionSource::FullRoster, horses, None, input.options);
        }

        debug!(client_id = input.client_id, due = due.len(), "individual due-date fallback");
        let horses = due
            .into_iter()
            .map(|horse| PredictedHorse {
                horse: horse.clone(),
                predicted_service: history
                    .last_service_code(&horse.horse_id)
                    .map_or(horse.service_type, ServiceType::from_service_code),
            })
            .collect();
        return finish(PredictionSource::IndividualDue, horses, None, input.options);
    }

    let picked = large_herd_selection(input.horses, &history, input.target_date);
    debug!(client_id = input.client_id, picked = picked.len(), "large herd fallback");
    let horses = picked.into_iter().map(with_stored_service).collect();
    finish(PredictionSource::LargeHerd, horses, None, input.options)
}

/// Runs [`predict_session`] for a client held by `directory`.
///
/// Returns `None` for an unknown client.
pub fn predict_for_client<D>(
    directory: &D,
    client_id: &str,
    target_date: NaiveDate,
) -> Option<PredictionResult>
where
    D: ClientDirectory + ?Sized,
{
    let horses = directory.roster(client_id)?;
    let trim_history = directory.trim_history(client_id)?;
    Some(predict_session(&PredictionInput {
        client_id,
        horses,
        trim_history,
        target_date,
        options: directory.schedule_options(),
    }))
}

pub fn estimate_minutes(horses: &[PredictedHorse], options: &ScheduleOptions) -> u32 {
    horses
        .iter()
        .map(|horse| options.minutes_for(horse.predicted_service))
        .fold(options.avg_drive_time_minutes, u32::saturating_add)
}

pub fn service_breakdown(horses: &[PredictedHorse]) -> ServiceBreakdown {
    let mut breakdown = ServiceBreakdown::default();
    for horse in horses {
        match horse.predicted_service {
            ServiceType::Trim => breakdown.trims += 1,
            ServiceType::HalfSet => breakdown.half_sets += 1,
            ServiceType::FullSet => breakdown.full_sets += 1,
        }
    }
    breakdown
}

fn with_stored_service(horse: &Horse) -> PredictedHorse {
    PredictedHorse {
        horse: horse.clone(),
        predicted_service: horse.service_type,
    }
}

fn finish(
    source: PredictionSource,
    horses: Vec<PredictedHorse>,
    selected_group: Option<ScoredGroup>,
    options: &ScheduleOptions,
) -> PredictionResult {
    PredictionResult {
        source,
        total_time_minutes: estimate_minutes(&horses, options),
        service_breakdown: service_breakdown(&horses),
        horses,
        selected_group,
    }
}
