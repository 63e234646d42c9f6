use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::monte_carlo::TrialEnsemble;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamDistributionSummary {
    pub team: String,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub min: u32,
    pub max: u32,
    /// 2.5th and 97.5th percentiles.
    pub ci95: (f64, f64),
}

/// Team -> (finishing position -> share of trials).
pub type RankProbabilityTable = BTreeMap<String, BTreeMap<usize, f64>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DistributionAnalysis {
    pub trials: usize,
    pub summaries: BTreeMap<String, TeamDistributionSummary>,
    pub rank_probabilities: RankProbabilityTable,
}

impl DistributionAnalysis {
    /// Summaries ordered by mean points, best first.
    pub fn standings(&self) -> Vec<&TeamDistributionSummary> {
        let mut rows: Vec<&TeamDistributionSummary> = self.summaries.values().collect();
        rows.sort_by(|a, b| {
            b.mean
                .partial_cmp(&a.mean)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.team.cmp(&b.team))
        });
        rows
    }

    pub fn title_probability(&self, team: &str) -> f64 {
        self.top_n_probability(team, 1)
    }

    pub fn podium_probability(&self, team: &str) -> f64 {
        self.top_n_probability(team, 3)
    }

    pub fn top_n_probability(&self, team: &str, n: usize) -> f64 {
        self.rank_probabilities
            .get(team)
            .map(|ranks| ranks.range(..=n).map(|(_, p)| p).sum::<f64>())
            .unwrap_or(0.0)
    }
}

pub fn analyze(ensemble: &TrialEnsemble) -> DistributionAnalysis {
    let summaries = ensemble
        .points_by_team()
        .iter()
        .filter_map(|(team, pts)| summarize(team, pts).map(|s| (team.clone(), s)))
        .collect();
    DistributionAnalysis {
        trials: ensemble.trials(),
        summaries,
        rank_probabilities: rank_probabilities(ensemble),
    }
}

pub fn summarize(team: &str, points: &[u32]) -> Option<TeamDistributionSummary> {
    if points.is_empty() {
        return None;
    }
    let mut sorted: Vec<f64> = points.iter().map(|&p| p as f64).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Some(TeamDistributionSummary {
        team: team.to_string(),
        mean,
        median: percentile(&sorted, 50.0),
        std_dev: var.sqrt(),
        min: points.iter().copied().min().unwrap_or(0),
        max: points.iter().copied().max().unwrap_or(0),
        ci95: (percentile(&sorted, 2.5), percentile(&sorted, 97.5)),
    })
}

/// Linear-interpolation percentile over an ascending slice; `q` in 0..=100.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = (q.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

/// Standard competition ranking, descending: tied values share the best rank
/// and the next distinct value skips past them (1, 2, 2, 4).
pub fn competition_ranks(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(Ordering::Equal)
    });

    let mut ranks = vec![0usize; values.len()];
    for (pos, &idx) in order.iter().enumerate() {
        ranks[idx] = match pos {
            0 => 1,
            _ if values[idx] == values[order[pos - 1]] => ranks[order[pos - 1]],
            _ => pos + 1,
        };
    }
    ranks
}

pub fn rank_probabilities(ensemble: &TrialEnsemble) -> RankProbabilityTable {
    let n = ensemble.trials();
    let mut counts: BTreeMap<String, BTreeMap<usize, usize>> = BTreeMap::new();
    for table in ensemble.tables() {
        let teams: Vec<&String> = table.keys().collect();
        let values: Vec<f64> = table.values().map(|&p| p as f64).collect();
        for (team, rank) in teams.into_iter().zip(competition_ranks(&values)) {
            *counts
                .entry(team.clone())
                .or_default()
                .entry(rank)
                .or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .map(|(team, by_rank)| {
            let probs = by_rank
                .into_iter()
                .map(|(rank, c)| (rank, c as f64 / n as f64))
                .collect();
            (team, probs)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{competition_ranks, percentile, summarize};

    #[test]
    fn ties_share_the_better_rank() {
        assert_eq!(competition_ranks(&[60.0, 55.0, 60.0, 40.0]), vec![1, 3, 1, 4]);
        assert_eq!(competition_ranks(&[10.0, 20.0, 20.0, 5.0]), vec![3, 1, 1, 4]);
        assert!(competition_ranks(&[]).is_empty());
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let s = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&s, 50.0) - 2.5).abs() < 1e-12);
        assert!((percentile(&s, 2.5) - 1.075).abs() < 1e-12);
        assert!((percentile(&s, 97.5) - 3.925).abs() < 1e-12);
        assert_eq!(percentile(&s, 0.0), 1.0);
        assert_eq!(percentile(&s, 100.0), 4.0);
    }

    #[test]
    fn single_trial_collapses() {
        let s = summarize("A", &[42]).unwrap();
        assert_eq!(s.mean, 42.0);
        assert_eq!(s.median, 42.0);
        assert_eq!(s.std_dev, 0.0);
        assert_eq!((s.min, s.max), (42, 42));
        assert_eq!(s.ci95, (42.0, 42.0));
    }

    #[test]
    fn population_std_dev() {
        let s = summarize("A", &[2, 4, 4, 4, 5, 5, 7, 9]).unwrap();
        assert!((s.mean - 5.0).abs() < 1e-12);
        assert!((s.std_dev - 2.0).abs() < 1e-12);
        assert!((s.median - 4.5).abs() < 1e-12);
    }

    #[test]
    fn empty_sample_has_no_summary() {
        assert!(summarize("A", &[]).is_none());
    }
}
