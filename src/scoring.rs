use crate::grouping::SessionHistory;
use crate::models::{Horse, ScoredGroup, ServiceGroup};
use chrono::NaiveDate;
use tracing::debug;

const DUE_WEIGHT: f64 = 2.0;
const GROUP_SIZE_WEIGHT: f64 = 3.0;
const FREQUENCY_WEIGHT: f64 = 2.0;
const CONSISTENCY_WEIGHT: f64 = 1.5;

/// Herds of four (donkey quartets, mostly) are serviced as a unit.
const QUARTET_SIZE: usize = 4;
const QUARTET_BONUS: f64 = 3.0;
const CONSISTENCY_BONUS: f64 = 2.0;
const FREQUENCY_BONUS_SCALE: f64 = 2.0;

/// Rosters this small are predicted horse by horse when no group qualifies.
pub const SMALL_HERD_LIMIT: usize = 4;

pub fn group_size_bonus(group_size: usize, roster_size: usize) -> f64 {
    if group_size == QUARTET_SIZE {
        QUARTET_BONUS
    } else if roster_size == 0 {
        0.0
    } else {
        group_size as f64 / roster_size as f64
    }
}

/// Scores one group against the current roster.
///
/// Returns `None` when a member horse is no longer on the roster.
pub fn score_group(
    group: &ServiceGroup,
    roster: &[Horse],
    history: &SessionHistory<'_>,
    target: NaiveDate,
    max_frequency: usize,
) -> Option<ScoredGroup> {
    let members = group
        .horse_ids
        .iter()
        .map(|id| roster.iter().find(|horse| &horse.horse_id == id))
        .collect::<Option<Vec<&Horse>>>()?;
    if members.is_empty() {
        return None;
    }

    let most_recent_service = group
        .horse_ids
        .iter()
        .filter_map(|id| history.last_service_date(id))
        .max()?;
    let days_since_last_service = (target - most_recent_service).num_days();

    let cycle_total: f64 = members.iter().map(|horse| f64::from(horse.cycle_days())).sum();
    let expected_days = (cycle_total / members.len() as f64).round().max(1.0);
    let due_score = days_since_last_service as f64 / expected_days;

    let group_size_bonus = group_size_bonus(members.len(), roster.len());
    let frequency_bonus = if max_frequency == 0 {
        0.0
    } else {
        group.frequency as f64 / max_frequency as f64 * FREQUENCY_BONUS_SCALE
    };
    let consistency_bonus = if group.frequency >= 2 {
        CONSISTENCY_BONUS
    } else {
        0.0
    };

    let score = due_score * DUE_WEIGHT
        + group_size_bonus * GROUP_SIZE_WEIGHT
        + frequency_bonus * FREQUENCY_WEIGHT
        + consistency_bonus * CONSISTENCY_WEIGHT;

    Some(ScoredGroup {
        group: group.clone(),
        due_score,
        group_size_bonus,
        frequency_bonus,
        consistency_bonus,
        score,
    })
}

/// Picks the highest positive-scoring group. The earliest group wins ties.
pub fn select_best_group(
    groups: &[ServiceGroup],
    roster: &[Horse],
    history: &SessionHistory<'_>,
    target: NaiveDate,
) -> Option<ScoredGroup> {
    let max_frequency = groups.iter().map(|group| group.frequency).max().unwrap_or(0);
    let mut best: Option<ScoredGroup> = None;

    for group in groups {
        let Some(scored) = score_group(group, roster, history, target, max_frequency) else {
            debug!(horses = ?group.horse_ids, "group disqualified, member no longer on roster");
            continue;
        };
        if scored.score <= 0.0 {
            continue;
        }
        if best.as_ref().is_none_or(|current| scored.score > current.score) {
            best = Some(scored);
        }
    }

    best
}

/// Horses whose own cycle has elapsed by `target`, or that were never serviced.
pub fn individually_due_horses<'r>(
    roster: &'r [Horse],
    history: &SessionHistory<'_>,
    target: NaiveDate,
) -> Vec<&'r Horse> {
    roster
        .iter()
        .filter(|horse| match history.last_service_date(&horse.horse_id) {
            Some(last) => (target - last).num_days() >= i64::from(horse.cycle_days()),
            None => true,
        })
        .collect()
}

/// Large-herd approximation: take as many of the most overdue horses as the
/// client usually has done per visit.
pub fn large_herd_selection<'r>(
    roster: &'r [Horse],
    history: &SessionHistory<'_>,
    target: NaiveDate,
) -> Vec<&'r Horse> {
    let visit_size = history.most_common_size().unwrap_or(roster.len());

    let mut ranked: Vec<(&Horse, i64)> = roster
        .iter()
        .map(|horse| {
            let overdue = history
                .last_service_date(&horse.horse_id)
                .map_or(i64::MAX, |last| (target - last).num_days());
            (horse, overdue)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    ranked
        .into_iter()
        .take(visit_size)
        .map(|(horse, _)| horse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::build_service_groups;
    use crate::test_support::{date, roster, session};
    use chrono::Duration;

    #[test]
    fn quartet_bonus_ignores_roster_size() {
        assert_eq!(group_size_bonus(4, 4), 3.0);
        assert_eq!(group_size_bonus(4, 12), 3.0);
        assert_eq!(group_size_bonus(3, 6), 0.5);
        assert_eq!(group_size_bonus(5, 10), 0.5);
        assert_eq!(group_size_bonus(1, 1), 1.0);
    }

    #[test]
    fn quartet_due_on_cycle_scores_one() {
        let horses = roster(&["a", "b", "c", "d"]);
        let first = date(2026, 1, 5);
        let sessions: Vec<_> = (0..3)
            .map(|i| session(first + Duration::days(42 * i), &["a", "b", "c", "d"]))
            .collect();
        let history = SessionHistory::new(&sessions);
        let groups = build_service_groups(&history);
        let target = first + Duration::days(42 * 3);

        let best = select_best_group(&groups, &horses, &history, target).unwrap();
        assert_eq!(best.group.horse_ids.len(), 4);
        assert!((best.due_score - 1.0).abs() < 1e-9);
        assert_eq!(best.group_size_bonus, 3.0);
        assert_eq!(best.frequency_bonus, 2.0);
        assert_eq!(best.consistency_bonus, 2.0);
        assert!((best.score - (2.0 + 9.0 + 4.0 + 3.0)).abs() < 1e-9);
    }

    #[test]
    fn group_with_departed_horse_never_selected() {
        let horses = roster(&["a", "b"]);
        let sessions = vec![
            session(date(2026, 1, 1), &["a", "b", "gone"]),
            session(date(2026, 2, 12), &["a", "b", "gone"]),
            session(date(2026, 3, 1), &["a"]),
        ];
        let history = SessionHistory::new(&sessions);
        let groups = build_service_groups(&history);

        assert!(score_group(&groups[0], &horses, &history, date(2026, 6, 1), 2).is_none());

        let best = select_best_group(&groups, &horses, &history, date(2026, 6, 1)).unwrap();
        assert_eq!(best.group.horse_ids.iter().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn only_group_wins_for_large_roster() {
        let horses = roster(&["a", "b", "c", "d", "e", "f"]);
        let sessions = vec![
            session(date(2025, 1, 1), &["a", "b"]),
            session(date(2025, 2, 12), &["a", "b"]),
        ];
        let history = SessionHistory::new(&sessions);
        let groups = build_service_groups(&history);

        let best = select_best_group(&groups, &horses, &history, date(2027, 1, 1)).unwrap();
        assert_eq!(best.group.horse_ids.len(), 2);
        assert!((best.group_size_bonus - 2.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn group_due_at_its_own_interval_is_selected() {
        let horses = roster(&["a", "b", "c"]);
        let sessions = vec![
            session(date(2026, 1, 1), &["a", "b"]),
            session(date(2026, 1, 15), &["c"]),
            session(date(2026, 2, 12), &["a", "b"]),
        ];
        let history = SessionHistory::new(&sessions);
        let groups = build_service_groups(&history);
        let pair = &groups[0];
        let target = date(2026, 2, 12) + Duration::days(i64::from(pair.interval_days));

        let best = select_best_group(&groups, &horses, &history, target).unwrap();
        assert_eq!(best.group, *pair);
    }

    #[test]
    fn ties_keep_first_discovered_group() {
        let horses = roster(&["a", "b"]);
        let sessions = vec![
            session(date(2026, 1, 1), &["a"]),
            session(date(2026, 1, 1), &["b"]),
        ];
        let history = SessionHistory::new(&sessions);
        let groups = build_service_groups(&history);

        let best = select_best_group(&groups, &horses, &history, date(2026, 2, 12)).unwrap();
        assert!(best.group.horse_ids.contains("a"));
    }

    #[test]
    fn negative_scores_do_not_qualify() {
        let horses = roster(&["a", "b", "c", "d", "e"]);
        let sessions = vec![session(date(2026, 6, 1), &["a"])];
        let history = SessionHistory::new(&sessions);
        let groups = build_service_groups(&history);

        // 0.2*3 + 2*2 = 4.6 from bonuses; due score of -3 brings it under zero
        let target = date(2026, 6, 1) - Duration::days(42 * 3);
        assert!(select_best_group(&groups, &horses, &history, target).is_none());
    }

    #[test]
    fn individual_check_uses_each_horses_cycle() {
        let mut horses = roster(&["a", "b", "c"]);
        horses[1].trim_cycle_days = Some(60);
        let sessions = vec![session(date(2026, 1, 1), &["a", "b"])];
        let history = SessionHistory::new(&sessions);

        let due = individually_due_horses(&horses, &history, date(2026, 2, 15));
        let ids: Vec<&str> = due.iter().map(|horse| horse.horse_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn large_herd_takes_most_overdue_at_usual_visit_size() {
        let horses = roster(&["a", "b", "c", "d", "e", "f"]);
        let sessions = vec![
            session(date(2026, 1, 1), &["a", "b"]),
            session(date(2026, 2, 1), &["c", "d"]),
            session(date(2026, 3, 1), &["e", "a", "b"]),
        ];
        let history = SessionHistory::new(&sessions);

        let picked = large_herd_selection(&horses, &history, date(2026, 4, 1));
        let ids: Vec<&str> = picked.iter().map(|horse| horse.horse_id.as_str()).collect();
        // f was never serviced, then c and d from February
        assert_eq!(ids, vec!["f", "c"]);
    }
}
