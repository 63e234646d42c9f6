use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SimError};
use crate::outcome::{Outcome, Prob3};
use crate::sampler::OutcomeSampler;

/// League points per team, ordered by team name.
pub type TeamPoints = BTreeMap<String, u32>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub index: usize,
    pub home: String,
    pub away: String,
}

/// Fixtures paired with their normalized outcome probabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Calendar {
    fixtures: Vec<Fixture>,
    probs: Vec<Prob3>,
    #[serde(skip)]
    samplers: Vec<OutcomeSampler>,
}

impl Calendar {
    /// Builds the calendar; without explicit team lists, placeholder names are
    /// generated from the fixture position. A row with no positive mass is
    /// rejected here, before any trial runs.
    pub fn new(
        probs: Vec<Prob3>,
        teams_home: Option<Vec<String>>,
        teams_away: Option<Vec<String>>,
    ) -> Result<Self> {
        let n = probs.len();
        check_len("teams_home", n, teams_home.as_deref())?;
        check_len("teams_away", n, teams_away.as_deref())?;

        let mut home_iter = teams_home.map(Vec::into_iter);
        let mut away_iter = teams_away.map(Vec::into_iter);
        let fixtures = (0..n)
            .map(|index| Fixture {
                index,
                home: home_iter
                    .as_mut()
                    .and_then(Iterator::next)
                    .unwrap_or_else(|| format!("Team_Home_{index}")),
                away: away_iter
                    .as_mut()
                    .and_then(Iterator::next)
                    .unwrap_or_else(|| format!("Team_Away_{index}")),
            })
            .collect();
        let samplers = probs
            .iter()
            .enumerate()
            .map(|(fixture, p)| {
                OutcomeSampler::new(p).ok_or(SimError::DegenerateProbabilities { fixture })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            fixtures,
            probs,
            samplers,
        })
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    pub fn probs(&self) -> &[Prob3] {
        &self.probs
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Fixture, &Prob3)> {
        self.fixtures.iter().zip(&self.probs)
    }

    /// Expected points per team, without sampling.
    pub fn expected_points(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        for (fixture, p) in self.iter() {
            let (h, a) = p.expected_points();
            *out.entry(fixture.home.clone()).or_insert(0.0) += h;
            *out.entry(fixture.away.clone()).or_insert(0.0) += a;
        }
        out
    }
}

fn check_len(field: &'static str, expected: usize, teams: Option<&[String]>) -> Result<()> {
    match teams {
        Some(t) if t.len() != expected => Err(SimError::TeamListLength {
            field,
            expected,
            actual: t.len(),
        }),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchLogEntry {
    pub fixture: usize,
    pub home: String,
    pub away: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeasonTrial {
    pub points: TeamPoints,
    pub log: Vec<MatchLogEntry>,
}

/// Adds the points for one result. Both teams are entered in the table even
/// when they score nothing, so a side that loses every match still appears.
pub fn award_points(points: &mut TeamPoints, home: &str, away: &str, outcome: Outcome) {
    let (h, a) = outcome.points();
    *points.entry(home.to_string()).or_insert(0) += h;
    *points.entry(away.to_string()).or_insert(0) += a;
}

/// Plays every fixture once and returns the table plus the match log.
pub fn simulate_season<R: Rng + ?Sized>(calendar: &Calendar, rng: &mut R) -> SeasonTrial {
    let mut trial = SeasonTrial {
        points: TeamPoints::new(),
        log: Vec::with_capacity(calendar.len()),
    };
    for (fixture, sampler) in calendar.fixtures.iter().zip(&calendar.samplers) {
        let outcome = sampler.sample(rng);
        award_points(&mut trial.points, &fixture.home, &fixture.away, outcome);
        trial.log.push(MatchLogEntry {
            fixture: fixture.index,
            home: fixture.home.clone(),
            away: fixture.away.clone(),
            outcome,
        });
    }
    trial
}

/// Same draws as `simulate_season`, without keeping the match log.
pub fn simulate_season_points<R: Rng + ?Sized>(calendar: &Calendar, rng: &mut R) -> TeamPoints {
    let mut points = TeamPoints::new();
    for (fixture, sampler) in calendar.fixtures.iter().zip(&calendar.samplers) {
        let outcome = sampler.sample(rng);
        award_points(&mut points, &fixture.home, &fixture.away, outcome);
    }
    points
}

/// One recorded match from the season being compared against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealResult {
    pub home_team: String,
    pub away_team: String,
    pub result: String,
}

pub const REAL_RESULT_COLUMNS: [&str; 3] = ["home_team", "away_team", "result"];

/// Parses a JSON array of result records, reporting any absent columns by name.
pub fn real_results_from_json(value: &Value) -> Result<Vec<RealResult>> {
    let rows = value.as_array().ok_or_else(|| SimError::MissingColumns {
        table: "real results",
        columns: REAL_RESULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
    })?;

    let mut missing: Vec<String> = Vec::new();
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let field = |name: &str| row.get(name).and_then(value_as_label);
        match (field("home_team"), field("away_team"), field("result")) {
            (Some(home_team), Some(away_team), Some(result)) => out.push(RealResult {
                home_team,
                away_team,
                result,
            }),
            _ => {
                for col in REAL_RESULT_COLUMNS {
                    if row.get(col).and_then(value_as_label).is_none()
                        && !missing.iter().any(|m| m == col)
                    {
                        missing.push(col.to_string());
                    }
                }
            }
        }
    }
    if !missing.is_empty() {
        return Err(SimError::MissingColumns {
            table: "real results",
            columns: missing,
        });
    }
    Ok(out)
}

fn value_as_label(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Table from recorded results: every team starts at zero, no sampling.
pub fn real_season_points(results: &[RealResult]) -> Result<TeamPoints> {
    let mut points = TeamPoints::new();
    for row in results {
        points.entry(row.home_team.clone()).or_insert(0);
        points.entry(row.away_team.clone()).or_insert(0);
    }
    for row in results {
        let outcome = Outcome::from_label(&row.result)?;
        award_points(&mut points, &row.home_team, &row.away_team, outcome);
    }
    Ok(points)
}
