use std::collections::BTreeMap;
use std::str::FromStr;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::season::{Calendar, TeamPoints, simulate_season_points};

pub const DEFAULT_TRIALS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialMode {
    /// One stream seeded once, trials drawn in order.
    #[default]
    Sequential,
    /// Trial `i` draws from stream `i` of the seeded generator. Reproducible for
    /// a fixed seed, but not the same draws as `Sequential`.
    Parallel,
}

impl FromStr for TrialMode {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(Self::Sequential),
            "parallel" | "par" => Ok(Self::Parallel),
            other => Err(format!("unknown trial mode `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub trials: usize,
    pub seed: Option<u64>,
    pub mode: TrialMode,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            seed: None,
            mode: TrialMode::Sequential,
        }
    }
}

/// Point totals of every trial. Frozen once the run completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrialEnsemble {
    points_by_team: BTreeMap<String, Vec<u32>>,
    tables: Vec<TeamPoints>,
}

impl TrialEnsemble {
    pub fn from_tables(tables: Vec<TeamPoints>) -> Self {
        let mut points_by_team: BTreeMap<String, Vec<u32>> = BTreeMap::new();
        for table in &tables {
            for (team, pts) in table {
                points_by_team.entry(team.clone()).or_default().push(*pts);
            }
        }
        Self {
            points_by_team,
            tables,
        }
    }

    pub fn trials(&self) -> usize {
        self.tables.len()
    }

    pub fn teams(&self) -> impl Iterator<Item = &str> {
        self.points_by_team.keys().map(String::as_str)
    }

    pub fn points(&self, team: &str) -> Option<&[u32]> {
        self.points_by_team.get(team).map(Vec::as_slice)
    }

    pub fn points_by_team(&self) -> &BTreeMap<String, Vec<u32>> {
        &self.points_by_team
    }

    /// Per-trial tables, in trial order.
    pub fn tables(&self) -> &[TeamPoints] {
        &self.tables
    }

    pub fn mean_points(&self) -> BTreeMap<String, f64> {
        self.points_by_team
            .iter()
            .map(|(team, pts)| {
                let mean = if pts.is_empty() {
                    0.0
                } else {
                    pts.iter().map(|&p| p as f64).sum::<f64>() / pts.len() as f64
                };
                (team.clone(), mean)
            })
            .collect()
    }
}

pub fn run_trials(calendar: &Calendar, config: &SimulationConfig) -> Result<TrialEnsemble> {
    if config.trials == 0 {
        return Err(SimError::InvalidTrialCount);
    }
    log::info!(
        "running {} trials over {} fixtures ({:?}, seed {:?})",
        config.trials,
        calendar.len(),
        config.mode,
        config.seed
    );

    let ensemble = match config.mode {
        TrialMode::Sequential => {
            let mut rng = match config.seed {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            };
            run_trials_with_rng(calendar, config.trials, &mut rng)?
        }
        TrialMode::Parallel => {
            let base = config.seed.unwrap_or_else(rand::random);
            run_trials_parallel(calendar, config.trials, base)
        }
    };

    log::info!("finished {} trials", ensemble.trials());
    Ok(ensemble)
}

/// Runs `trials` seasons drawing from a caller-owned stream.
pub fn run_trials_with_rng<R: Rng + ?Sized>(
    calendar: &Calendar,
    trials: usize,
    rng: &mut R,
) -> Result<TrialEnsemble> {
    if trials == 0 {
        return Err(SimError::InvalidTrialCount);
    }
    let step = (trials / 10).max(1);
    let mut tables = Vec::with_capacity(trials);
    for i in 0..trials {
        tables.push(simulate_season_points(calendar, rng));
        if (i + 1) % step == 0 {
            log::debug!("trial {}/{}", i + 1, trials);
        }
    }
    Ok(TrialEnsemble::from_tables(tables))
}

fn run_trials_parallel(calendar: &Calendar, trials: usize, seed: u64) -> TrialEnsemble {
    let tables = (0..trials)
        .into_par_iter()
        .map(|i| {
            let mut rng = trial_rng(seed, i);
            simulate_season_points(calendar, &mut rng)
        })
        .collect::<Vec<_>>();
    TrialEnsemble::from_tables(tables)
}

// Same key for every trial; the trial index only selects the stream.
fn trial_rng(seed: u64, trial: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(trial as u64);
    rng
}
