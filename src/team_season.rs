use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::competition_ranks;
use crate::match_store::{MatchRecord, SideStats};
use crate::outcome::Outcome;

/// Mean per-match statistics; fields stay `None` when no match reported them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatMeans {
    pub possession: Option<f64>,
    pub shots_on_target: Option<f64>,
    pub fouls: Option<f64>,
    pub passes: Option<f64>,
    pub corners: Option<f64>,
    pub attacks: Option<f64>,
    pub dangerous_attacks: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamSeasonStats {
    pub team: String,
    pub season: String,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub home_wins: u32,
    pub away_wins: u32,
    pub points: u32,
    pub home_points: u32,
    pub away_points: u32,
    pub goals_scored: i32,
    pub goals_conceded: i32,
    pub goal_difference: i32,
    pub home_goal_difference: i32,
    pub away_goal_difference: i32,
    pub home_means: StatMeans,
    pub away_means: StatMeans,
    pub overall_means: StatMeans,
    /// Final table position; equal points share the better position.
    pub position: usize,
}

#[derive(Default)]
struct StatSums {
    sums: [f64; 7],
    counts: [u32; 7],
}

impl StatSums {
    fn add(&mut self, s: &SideStats) {
        let values = [
            s.possession,
            s.shots_on_target,
            s.fouls,
            s.passes,
            s.corners,
            s.attacks,
            s.dangerous_attacks,
        ];
        for (i, v) in values.into_iter().enumerate() {
            if let Some(v) = v.filter(|v| v.is_finite()) {
                self.sums[i] += v;
                self.counts[i] += 1;
            }
        }
    }

    fn merged(&self, other: &StatSums) -> StatSums {
        let mut out = StatSums::default();
        for i in 0..7 {
            out.sums[i] = self.sums[i] + other.sums[i];
            out.counts[i] = self.counts[i] + other.counts[i];
        }
        out
    }

    fn means(&self) -> StatMeans {
        let m = |i: usize| (self.counts[i] > 0).then(|| self.sums[i] / self.counts[i] as f64);
        StatMeans {
            possession: m(0),
            shots_on_target: m(1),
            fouls: m(2),
            passes: m(3),
            corners: m(4),
            attacks: m(5),
            dangerous_attacks: m(6),
        }
    }
}

#[derive(Default)]
struct Accumulator {
    stats: TeamSeasonStats,
    home: StatSums,
    away: StatSums,
}

/// Aggregates one season's finished matches into a per-team table, sorted by
/// position and then team name. Unfinished matches are ignored.
pub fn compute_team_season_stats(season: &str, matches: &[MatchRecord]) -> Vec<TeamSeasonStats> {
    let mut acc: BTreeMap<String, Accumulator> = BTreeMap::new();

    for m in matches.iter().filter(|m| m.season == season) {
        let (Some(hg), Some(ag), Some(outcome)) = (m.home_goals, m.away_goals, m.outcome()) else {
            continue;
        };
        let (home_pts, away_pts) = outcome.points();

        let home = acc.entry(m.home_team.clone()).or_default();
        record_side(&mut home.stats, hg, ag, home_pts);
        home.stats.home_points += home_pts;
        home.stats.home_goal_difference += hg - ag;
        if outcome == Outcome::Home {
            home.stats.home_wins += 1;
        }
        home.home.add(&m.home_stats);

        let away = acc.entry(m.away_team.clone()).or_default();
        record_side(&mut away.stats, ag, hg, away_pts);
        away.stats.away_points += away_pts;
        away.stats.away_goal_difference += ag - hg;
        if outcome == Outcome::Away {
            away.stats.away_wins += 1;
        }
        away.away.add(&m.away_stats);
    }

    let mut rows: Vec<TeamSeasonStats> = acc
        .into_iter()
        .map(|(team, a)| TeamSeasonStats {
            team,
            season: season.to_string(),
            goal_difference: a.stats.goals_scored - a.stats.goals_conceded,
            home_means: a.home.means(),
            away_means: a.away.means(),
            overall_means: a.home.merged(&a.away).means(),
            ..a.stats
        })
        .collect();

    let points: Vec<f64> = rows.iter().map(|r| r.points as f64).collect();
    for (row, rank) in rows.iter_mut().zip(competition_ranks(&points)) {
        row.position = rank;
    }
    rows.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.team.cmp(&b.team)));
    rows
}

fn record_side(s: &mut TeamSeasonStats, scored: i32, conceded: i32, points: u32) {
    s.played += 1;
    s.points += points;
    s.goals_scored += scored;
    s.goals_conceded += conceded;
    match scored.cmp(&conceded) {
        std::cmp::Ordering::Greater => s.wins += 1,
        std::cmp::Ordering::Equal => s.draws += 1,
        std::cmp::Ordering::Less => s.losses += 1,
    }
}

#[cfg(test)]
mod tests {
    use super::compute_team_season_stats;
    use crate::match_store::{MatchRecord, SideStats};

    fn m(
        id: u64,
        h: &str,
        a: &str,
        hg: Option<i32>,
        ag: Option<i32>,
        hp: Option<f64>,
    ) -> MatchRecord {
        MatchRecord {
            match_id: id,
            season: "S1".into(),
            date: format!("2023-08-{:02}", id),
            home_team: h.into(),
            away_team: a.into(),
            home_goals: hg,
            away_goals: ag,
            home_stats: SideStats {
                possession: hp,
                ..SideStats::default()
            },
            away_stats: SideStats {
                possession: hp.map(|p| 100.0 - p),
                ..SideStats::default()
            },
        }
    }

    #[test]
    fn aggregates_points_goals_and_positions() {
        let rows = compute_team_season_stats(
            "S1",
            &[
                m(1, "A", "B", Some(2), Some(0), Some(60.0)),
                m(2, "B", "C", Some(1), Some(1), Some(50.0)),
                m(3, "C", "A", Some(0), Some(3), None),
                m(4, "A", "C", None, None, None),
            ],
        );
        assert_eq!(rows.len(), 3);
        let a = &rows[0];
        assert_eq!(a.team, "A");
        assert_eq!((a.played, a.wins, a.points), (2, 2, 6));
        assert_eq!((a.home_wins, a.away_wins), (1, 1));
        assert_eq!(a.goal_difference, 5);
        assert_eq!(a.home_means.possession, Some(60.0));
        assert_eq!(a.away_means.possession, None);
        assert_eq!(a.position, 1);

        // B and C both have 1 point and share second place.
        assert_eq!(rows[1].team, "B");
        assert_eq!(rows[1].position, 2);
        assert_eq!(rows[2].team, "C");
        assert_eq!(rows[2].position, 2);
        assert_eq!(rows[1].overall_means.possession, Some(45.0));
    }

    #[test]
    fn other_seasons_are_ignored() {
        let mut other = m(1, "A", "B", Some(1), Some(0), None);
        other.season = "S0".into();
        assert!(compute_team_season_stats("S1", &[other]).is_empty());
    }
}
