use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::outcome::{Outcome, Prob3};

/// What to do with a fixture whose probabilities are all zero after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Abort the session with `SimError::DegenerateProbabilities`.
    #[default]
    Reject,
    /// Replace the row with 1/3, 1/3, 1/3 and log a warning.
    Uniform,
}

impl FromStr for DegeneratePolicy {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "uniform" => Ok(Self::Uniform),
            other => Err(format!("unknown degenerate policy `{other}`")),
        }
    }
}

/// Column positions of each outcome in the predictor's raw output, resolved by
/// class name once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassMap {
    home: usize,
    draw: usize,
    away: usize,
    width: usize,
}

impl ClassMap {
    pub fn from_class_names<S: AsRef<str>>(classes: &[S]) -> Result<Self> {
        let find = |outcome: Outcome| -> Result<usize> {
            classes
                .iter()
                .position(|c| c.as_ref().trim().eq_ignore_ascii_case(outcome.label()))
                .ok_or_else(|| SimError::MissingClass {
                    class: outcome.label().to_string(),
                })
        };
        Ok(Self {
            home: find(Outcome::Home)?,
            draw: find(Outcome::Draw)?,
            away: find(Outcome::Away)?,
            width: classes.len(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn index_of(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    pub fn map_row(&self, row: &[f64]) -> Result<Prob3> {
        if row.len() != self.width {
            return Err(SimError::ClassCount {
                expected: self.width,
                actual: row.len(),
            });
        }
        Ok(Prob3 {
            home: row[self.home],
            draw: row[self.draw],
            away: row[self.away],
        })
    }
}

/// Clamps negative (or non-finite) components to zero and rescales to sum 1.
/// An all-zero row stays all-zero; see `normalize_rows` for how that is handled.
pub fn normalize(raw: Prob3) -> Prob3 {
    let clamp = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
    let home = clamp(raw.home);
    let draw = clamp(raw.draw);
    let away = clamp(raw.away);
    let mut sum = home + draw + away;
    if sum == 0.0 {
        sum = 1.0;
    }
    Prob3 {
        home: home / sum,
        draw: draw / sum,
        away: away / sum,
    }
}

pub fn normalize_rows(raw: &[Prob3], policy: DegeneratePolicy) -> Result<Vec<Prob3>> {
    let mut out = Vec::with_capacity(raw.len());
    for (idx, row) in raw.iter().enumerate() {
        let p = normalize(*row);
        if !p.is_zero() {
            out.push(p);
            continue;
        }
        match policy {
            DegeneratePolicy::Reject => {
                return Err(SimError::DegenerateProbabilities { fixture: idx });
            }
            DegeneratePolicy::Uniform => {
                log::warn!("fixture {idx}: all-zero probabilities, using uniform triple");
                out.push(Prob3::uniform());
            }
        }
    }
    Ok(out)
}

/// Maps raw predictor rows onto triples by class name, then normalizes them.
pub fn probabilities_from_raw(
    raw: &[Vec<f64>],
    classes: &ClassMap,
    policy: DegeneratePolicy,
) -> Result<Vec<Prob3>> {
    let mapped = raw
        .iter()
        .map(|row| classes.map_row(row))
        .collect::<Result<Vec<_>>>()?;
    normalize_rows(&mapped, policy)
}
