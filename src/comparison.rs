use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::analysis::competition_ranks;
use crate::season::TeamPoints;

const TOP_N: usize = 4;

/// One team's simulated vs real standing. `None` marks a team absent from
/// that side; it is never treated as zero points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub team: String,
    pub model_points: Option<f64>,
    pub real_points: Option<f64>,
    pub diff_points: Option<f64>,
    pub model_rank: Option<usize>,
    pub real_rank: Option<usize>,
    pub diff_rank: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonMetrics {
    pub mae_points: Option<f64>,
    pub rmse_points: Option<f64>,
    pub spearman_ranks: Option<f64>,
    pub top4_overlap: usize,
    pub champion_model: Option<String>,
    pub champion_real: Option<String>,
    pub champion_match: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    /// Ordered by real rank, teams missing from the real table last.
    pub rows: Vec<ComparisonRow>,
    pub metrics: ComparisonMetrics,
}

impl ComparisonReport {
    pub fn row(&self, team: &str) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.team == team)
    }
}

pub fn compare(model_means: &BTreeMap<String, f64>, real_points: &TeamPoints) -> ComparisonReport {
    let teams: Vec<String> = model_means
        .keys()
        .chain(real_points.keys())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let model: Vec<Option<f64>> = teams.iter().map(|t| model_means.get(t).copied()).collect();
    let real: Vec<Option<f64>> = teams
        .iter()
        .map(|t| real_points.get(t).map(|&p| p as f64))
        .collect();
    let model_ranks = ranks_skipping_missing(&model);
    let real_ranks = ranks_skipping_missing(&real);

    let mut rows: Vec<ComparisonRow> = teams
        .into_iter()
        .enumerate()
        .map(|(i, team)| ComparisonRow {
            team,
            model_points: model[i],
            real_points: real[i],
            diff_points: model[i].zip(real[i]).map(|(m, r)| m - r),
            model_rank: model_ranks[i],
            real_rank: real_ranks[i],
            diff_rank: model_ranks[i]
                .zip(real_ranks[i])
                .map(|(m, r)| m as i64 - r as i64),
        })
        .collect();
    rows.sort_by(|a, b| cmp_rank(a.real_rank, b.real_rank));

    let metrics = metrics(&rows);
    log::info!(
        "comparison over {} teams: mae {:?}, spearman {:?}",
        rows.len(),
        metrics.mae_points,
        metrics.spearman_ranks
    );
    ComparisonReport { rows, metrics }
}

fn metrics(rows: &[ComparisonRow]) -> ComparisonMetrics {
    let diffs: Vec<f64> = rows.iter().filter_map(|r| r.diff_points).collect();
    let (mae_points, rmse_points) = if diffs.is_empty() {
        (None, None)
    } else {
        let n = diffs.len() as f64;
        let mae = diffs.iter().map(|d| d.abs()).sum::<f64>() / n;
        let mse = diffs.iter().map(|d| d * d).sum::<f64>() / n;
        (Some(mae), Some(mse.sqrt()))
    };

    let (xs, ys): (Vec<f64>, Vec<f64>) = rows
        .iter()
        .filter_map(|r| r.model_rank.zip(r.real_rank))
        .map(|(m, r)| (m as f64, r as f64))
        .unzip();
    let spearman_ranks = spearman(&xs, &ys);

    let top_model = top_teams(rows, |r| r.model_rank);
    let top_real = top_teams(rows, |r| r.real_rank);
    let top4_overlap = top_model.intersection(&top_real).count();

    let champion_model = champion(rows, |r| r.model_rank);
    let champion_real = champion(rows, |r| r.real_rank);
    let champion_match = champion_model.is_some() && champion_model == champion_real;

    ComparisonMetrics {
        mae_points,
        rmse_points,
        spearman_ranks,
        top4_overlap,
        champion_model,
        champion_real,
        champion_match,
    }
}

fn ranks_skipping_missing(values: &[Option<f64>]) -> Vec<Option<usize>> {
    let present: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();
    let ranks = competition_ranks(&present.iter().map(|(_, v)| *v).collect::<Vec<_>>());
    let mut out = vec![None; values.len()];
    for ((i, _), rank) in present.into_iter().zip(ranks) {
        out[i] = Some(rank);
    }
    out
}

fn cmp_rank(a: Option<usize>, b: Option<usize>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn top_teams<'a>(
    rows: &'a [ComparisonRow],
    rank: impl Fn(&ComparisonRow) -> Option<usize>,
) -> BTreeSet<&'a str> {
    let mut ranked: Vec<(&ComparisonRow, usize)> =
        rows.iter().filter_map(|r| rank(r).map(|k| (r, k))).collect();
    ranked.sort_by_key(|(_, k)| *k);
    ranked
        .into_iter()
        .take(TOP_N)
        .map(|(r, _)| r.team.as_str())
        .collect()
}

/// First team in row order holding the best rank.
fn champion(
    rows: &[ComparisonRow],
    rank: impl Fn(&ComparisonRow) -> Option<usize>,
) -> Option<String> {
    let best = rows.iter().filter_map(|r| rank(r)).min()?;
    rows.iter()
        .find(|r| rank(*r) == Some(best))
        .map(|r| r.team.clone())
}

/// Spearman correlation: Pearson over average ranks. `None` below two pairs
/// or when either side is constant.
pub fn spearman(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    pearson(&average_ranks(xs), &average_ranks(ys))
}

fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));
    let mut out = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end are tied; ranks are 1-based
        let avg = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            out[idx] = avg;
        }
        start = end;
    }
    out
}

fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len() as f64;
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx).powi(2);
        vy += (y - my).powi(2);
    }
    if vx <= 0.0 || vy <= 0.0 {
        return None;
    }
    Some(cov / (vx.sqrt() * vy.sqrt()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{average_ranks, compare, spearman};
    use crate::season::TeamPoints;

    fn means(v: &[(&str, f64)]) -> BTreeMap<String, f64> {
        v.iter().map(|(t, p)| (t.to_string(), *p)).collect()
    }

    fn table(v: &[(&str, u32)]) -> TeamPoints {
        v.iter().map(|(t, p)| (t.to_string(), *p)).collect()
    }

    #[test]
    fn two_team_report() {
        let report = compare(
            &means(&[("A", 58.0), ("B", 56.0)]),
            &table(&[("A", 60), ("B", 55)]),
        );
        let m = &report.metrics;
        assert!((m.mae_points.unwrap() - 1.5).abs() < 1e-12);
        assert!((m.rmse_points.unwrap() - 2.5_f64.sqrt()).abs() < 1e-12);
        assert!((m.spearman_ranks.unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(m.top4_overlap, 2);
        assert!(m.champion_match);
        assert_eq!(m.champion_model.as_deref(), Some("A"));

        let b = report.row("B").unwrap();
        assert_eq!(b.diff_points, Some(1.0));
        assert_eq!(b.model_rank, Some(2));
        assert_eq!(b.real_rank, Some(2));
        assert_eq!(b.diff_rank, Some(0));
    }

    #[test]
    fn missing_team_is_marked_not_zeroed() {
        let report = compare(
            &means(&[("A", 50.0), ("B", 40.0)]),
            &table(&[("A", 52), ("C", 30)]),
        );
        let b = report.row("B").unwrap();
        assert_eq!(b.real_points, None);
        assert_eq!(b.real_rank, None);
        assert_eq!(b.diff_points, None);
        let c = report.row("C").unwrap();
        assert_eq!(c.model_points, None);
        assert_eq!(c.real_rank, Some(2));
        // Only A is on both sides.
        assert!((report.metrics.mae_points.unwrap() - 2.0).abs() < 1e-12);
        assert_eq!(report.metrics.spearman_ranks, None);
        assert_eq!(report.rows.last().unwrap().team, "B");
    }

    #[test]
    fn reversed_order_gives_negative_correlation() {
        let report = compare(
            &means(&[("A", 30.0), ("B", 40.0), ("C", 50.0)]),
            &table(&[("A", 70), ("B", 60), ("C", 50)]),
        );
        assert!((report.metrics.spearman_ranks.unwrap() + 1.0).abs() < 1e-12);
        assert!(!report.metrics.champion_match);
        assert_eq!(report.metrics.champion_real.as_deref(), Some("A"));
        assert_eq!(report.metrics.champion_model.as_deref(), Some("C"));
    }

    #[test]
    fn top_four_overlap_counts_shared_teams() {
        let report = compare(
            &means(&[("A", 80.0), ("B", 70.0), ("C", 60.0), ("D", 50.0), ("E", 45.0)]),
            &table(&[("A", 80), ("B", 70), ("C", 60), ("D", 40), ("E", 50)]),
        );
        assert_eq!(report.metrics.top4_overlap, 3);
    }

    #[test]
    fn average_ranks_split_ties() {
        assert_eq!(average_ranks(&[10.0, 20.0, 20.0, 30.0]), vec![1.0, 2.5, 2.5, 4.0]);
        assert_eq!(spearman(&[1.0], &[1.0]), None);
        assert_eq!(spearman(&[1.0, 1.0], &[1.0, 2.0]), None);
    }
}
