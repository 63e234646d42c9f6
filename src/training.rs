use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::match_store::MatchRecord;
use crate::outcome::Outcome;
use crate::predictor::FeatureMatrix;
use crate::team_season::TeamSeasonStats;

/// Meetings considered for the head-to-head block.
pub const H2H_WINDOW: usize = 5;

/// Prior-season values per side, in `FEATURE_NAMES` order.
const TEAM_BLOCK: usize = 12;

pub const FEATURE_NAMES: [&str; 30] = [
    "points_home",
    "points_away",
    "goal_diff_home",
    "goal_diff_away",
    "goals_scored_home",
    "goals_scored_away",
    "goals_conceded_home",
    "goals_conceded_away",
    "wins_home",
    "wins_away",
    "possession_home",
    "possession_away",
    "shots_on_target_home",
    "shots_on_target_away",
    "fouls_home",
    "fouls_away",
    "passes_home",
    "passes_away",
    "corners_home",
    "corners_away",
    "attacks_home",
    "attacks_away",
    "dangerous_attacks_home",
    "dangerous_attacks_away",
    "h2h_home_wins",
    "h2h_away_wins",
    "h2h_draws",
    "h2h_avg_goal_diff_home",
    "h2h_avg_goals_home_scored",
    "h2h_avg_goals_away_scored",
];

pub fn feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    pub match_id: u64,
    pub season: String,
    pub date: String,
    pub home_team: String,
    pub away_team: String,
    /// Values in `FEATURE_NAMES` order.
    pub features: Vec<f64>,
    pub result: Option<Outcome>,
}

/// Head-to-head summary seen from the current home club.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeadToHead {
    pub meetings: usize,
    pub home_wins: u32,
    pub away_wins: u32,
    pub draws: u32,
    pub avg_goal_diff_home: f64,
    pub avg_goals_home_scored: f64,
    pub avg_goals_away_scored: f64,
}

/// Summarizes the most recent finished meetings of the two clubs, in either
/// orientation, played strictly before `before_date`.
pub fn head_to_head(
    home: &str,
    away: &str,
    history: &[MatchRecord],
    before_date: &str,
) -> HeadToHead {
    let mut meetings: Vec<&MatchRecord> = history
        .iter()
        .filter(|m| m.is_finished() && m.date.as_str() < before_date)
        .filter(|m| {
            (m.home_team == home && m.away_team == away)
                || (m.home_team == away && m.away_team == home)
        })
        .collect();
    meetings.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.match_id.cmp(&a.match_id)));
    meetings.truncate(H2H_WINDOW);

    let mut h2h = HeadToHead::default();
    let mut scored_home = 0i32;
    let mut scored_away = 0i32;
    for m in &meetings {
        let (Some(hg), Some(ag)) = (m.home_goals, m.away_goals) else {
            continue;
        };
        // goals from the current home club's point of view
        let (ours, theirs) = if m.home_team == home { (hg, ag) } else { (ag, hg) };
        scored_home += ours;
        scored_away += theirs;
        h2h.meetings += 1;
        match ours.cmp(&theirs) {
            std::cmp::Ordering::Greater => h2h.home_wins += 1,
            std::cmp::Ordering::Less => h2h.away_wins += 1,
            std::cmp::Ordering::Equal => h2h.draws += 1,
        }
    }
    if h2h.meetings > 0 {
        let n = h2h.meetings as f64;
        h2h.avg_goal_diff_home = (scored_home - scored_away) as f64 / n;
        h2h.avg_goals_home_scored = scored_home as f64 / n;
        h2h.avg_goals_away_scored = scored_away as f64 / n;
    }
    h2h
}

// Missing match stats count as zero, like a club with no prior season.
fn team_block(stats: Option<&TeamSeasonStats>) -> [f64; TEAM_BLOCK] {
    let Some(s) = stats else {
        return [0.0; TEAM_BLOCK];
    };
    let means = &s.overall_means;
    [
        s.points as f64,
        s.goal_difference as f64,
        s.goals_scored as f64,
        s.goals_conceded as f64,
        s.wins as f64,
        means.possession.unwrap_or(0.0),
        means.shots_on_target.unwrap_or(0.0),
        means.fouls.unwrap_or(0.0),
        means.passes.unwrap_or(0.0),
        means.corners.unwrap_or(0.0),
        means.attacks.unwrap_or(0.0),
        means.dangerous_attacks.unwrap_or(0.0),
    ]
}

fn feature_row(
    m: &MatchRecord,
    prior: &HashMap<&str, &TeamSeasonStats>,
    history: &[MatchRecord],
) -> Vec<f64> {
    let home = team_block(prior.get(m.home_team.as_str()).copied());
    let away = team_block(prior.get(m.away_team.as_str()).copied());
    let h2h = head_to_head(&m.home_team, &m.away_team, history, &m.date);

    let mut row = Vec::with_capacity(FEATURE_NAMES.len());
    for (h, a) in home.into_iter().zip(away) {
        row.push(h);
        row.push(a);
    }
    row.extend([
        h2h.home_wins as f64,
        h2h.away_wins as f64,
        h2h.draws as f64,
        h2h.avg_goal_diff_home,
        h2h.avg_goals_home_scored,
        h2h.avg_goals_away_scored,
    ]);
    row
}

/// One row per match. Prior-season aggregates are zero for teams without a
/// prior row; unfinished matches get no label.
pub fn build_feature_rows(
    matches: &[MatchRecord],
    prior: &[TeamSeasonStats],
    history: &[MatchRecord],
) -> Vec<TrainingRow> {
    let prior: HashMap<&str, &TeamSeasonStats> =
        prior.iter().map(|s| (s.team.as_str(), s)).collect();
    matches
        .iter()
        .map(|m| TrainingRow {
            match_id: m.match_id,
            season: m.season.clone(),
            date: m.date.clone(),
            home_team: m.home_team.clone(),
            away_team: m.away_team.clone(),
            features: feature_row(m, &prior, history),
            result: m.outcome(),
        })
        .collect()
}

/// Labeled rows only: matches without a final score are dropped.
pub fn build_training_rows(
    matches: &[MatchRecord],
    prior: &[TeamSeasonStats],
    history: &[MatchRecord],
) -> Vec<TrainingRow> {
    let mut rows = build_feature_rows(matches, prior, history);
    rows.retain(|r| r.result.is_some());
    log::info!("built {} labeled training rows", rows.len());
    rows
}

/// A season calendar ready for simulation: feature matrix plus the home and
/// away team lists aligned with its rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarFeatures {
    pub features: FeatureMatrix,
    #[serde(default)]
    pub teams_home: Vec<String>,
    #[serde(default)]
    pub teams_away: Vec<String>,
}

pub fn calendar_features(
    matches: &[MatchRecord],
    prior: &[TeamSeasonStats],
    history: &[MatchRecord],
) -> Result<CalendarFeatures> {
    let rows = build_feature_rows(matches, prior, history);
    let teams_home = rows.iter().map(|r| r.home_team.clone()).collect();
    let teams_away = rows.iter().map(|r| r.away_team.clone()).collect();
    let features = FeatureMatrix::new(
        feature_names(),
        rows.into_iter().map(|r| r.features).collect(),
    )?;
    Ok(CalendarFeatures {
        features,
        teams_home,
        teams_away,
    })
}

#[cfg(test)]
mod tests {
    use super::{FEATURE_NAMES, build_training_rows, calendar_features, head_to_head};
    use crate::match_store::{MatchRecord, SideStats};
    use crate::outcome::Outcome;
    use crate::team_season::{StatMeans, TeamSeasonStats};

    fn m(id: u64, date: &str, h: &str, a: &str, goals: Option<(i32, i32)>) -> MatchRecord {
        MatchRecord {
            match_id: id,
            season: "S".into(),
            date: date.into(),
            home_team: h.into(),
            away_team: a.into(),
            home_goals: goals.map(|g| g.0),
            away_goals: goals.map(|g| g.1),
            home_stats: SideStats::default(),
            away_stats: SideStats::default(),
        }
    }

    #[test]
    fn head_to_head_uses_both_orientations() {
        let history = vec![
            m(1, "2020-01-01", "A", "B", Some((2, 0))),
            m(2, "2020-02-01", "B", "A", Some((3, 1))),
            m(3, "2020-03-01", "A", "B", Some((1, 1))),
            m(4, "2020-04-01", "A", "C", Some((5, 0))),
            m(5, "2021-01-01", "A", "B", Some((4, 0))),
        ];
        let h = head_to_head("A", "B", &history, "2020-12-31");
        assert_eq!(h.meetings, 3);
        assert_eq!((h.home_wins, h.away_wins, h.draws), (1, 1, 1));
        // A scored 2 + 1 + 1, B scored 0 + 3 + 1
        assert!((h.avg_goals_home_scored - 4.0 / 3.0).abs() < 1e-12);
        assert!((h.avg_goals_away_scored - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(h.avg_goal_diff_home, 0.0);
    }

    #[test]
    fn head_to_head_keeps_five_most_recent() {
        let history: Vec<MatchRecord> = (1..=7)
            .map(|i| {
                let goals = if i <= 2 { (0, 3) } else { (1, 0) };
                m(i, &format!("2020-0{i}-01"), "A", "B", Some(goals))
            })
            .collect();
        let h = head_to_head("A", "B", &history, "2021-01-01");
        assert_eq!(h.meetings, 5);
        assert_eq!(h.home_wins, 5);
    }

    #[test]
    fn training_rows_use_prior_stats_and_labels() {
        let prior = vec![TeamSeasonStats {
            team: "A".into(),
            points: 70,
            wins: 21,
            goal_difference: 25,
            overall_means: StatMeans {
                fouls: Some(11.5),
                dangerous_attacks: Some(48.0),
                ..StatMeans::default()
            },
            ..TeamSeasonStats::default()
        }];
        let season = vec![
            m(10, "2021-08-01", "A", "B", Some((0, 1))),
            m(11, "2021-08-08", "B", "A", None),
        ];
        let rows = build_training_rows(&season, &prior, &[]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].result, Some(Outcome::Away));
        assert_eq!(rows[0].features.len(), FEATURE_NAMES.len());
        assert_eq!(rows[0].features[0], 70.0);
        assert_eq!(rows[0].features[1], 0.0);
        assert_eq!(rows[0].features[2], 25.0);
        let value = |name: &str| {
            let idx = FEATURE_NAMES.iter().position(|n| *n == name).unwrap();
            rows[0].features[idx]
        };
        assert_eq!(value("wins_home"), 21.0);
        assert_eq!(value("fouls_home"), 11.5);
        assert_eq!(value("dangerous_attacks_home"), 48.0);
        // No prior row for B, and A has no recorded passes.
        assert_eq!(value("wins_away"), 0.0);
        assert_eq!(value("passes_home"), 0.0);

        let cal = calendar_features(&season, &prior, &[]).unwrap();
        assert_eq!(cal.features.len(), 2);
        assert_eq!(cal.teams_home, vec!["A", "B"]);
        assert_eq!(cal.teams_away, vec!["B", "A"]);
        assert_eq!(cal.features.column_index("points_away"), Some(1));
    }
}
