use std::fmt;

use crate::analysis::DistributionAnalysis;
use crate::comparison::ComparisonReport;
use crate::forecast_score::ForecastScore;

const TITLE_ROWS: usize = 5;

/// Expected table and title odds of one run.
pub struct SeasonReport<'a>(pub &'a DistributionAnalysis);

impl fmt::Display for SeasonReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let analysis = self.0;
        let rule = "=".repeat(50);
        writeln!(f, "{rule}")?;
        writeln!(f, "MONTE CARLO SEASON REPORT ({} trials)", analysis.trials)?;
        writeln!(f, "{rule}")?;

        writeln!(f, "\nExpected table (mean points):")?;
        for (i, row) in analysis.standings().iter().enumerate() {
            writeln!(
                f,
                "{:2}. {:<20} {:5.1} pts (95% CI: {:.1}-{:.1})",
                i + 1,
                row.team,
                row.mean,
                row.ci95.0,
                row.ci95.1
            )?;
        }

        let mut titles: Vec<(&str, f64)> = analysis
            .summaries
            .keys()
            .map(|team| (team.as_str(), analysis.title_probability(team)))
            .filter(|(_, p)| *p > 0.0)
            .collect();
        titles.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        writeln!(f, "\nTitle probabilities:")?;
        for (team, p) in titles.into_iter().take(TITLE_ROWS) {
            writeln!(
                f,
                "   {:<20} {:6.2}%  (podium {:6.2}%)",
                team,
                p * 100.0,
                analysis.podium_probability(team) * 100.0
            )?;
        }
        Ok(())
    }
}

/// Model-vs-real table followed by the summary metrics.
pub struct ComparisonTable<'a>(pub &'a ComparisonReport);

impl fmt::Display for ComparisonTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(
            f,
            "{:<20} {:>8} {:>8} {:>7} {:>6} {:>6} {:>6}",
            "team", "model", "real", "diff", "r_mod", "r_real", "d_rank"
        )?;
        for row in &report.rows {
            writeln!(
                f,
                "{:<20} {:>8} {:>8} {:>7} {:>6} {:>6} {:>6}",
                row.team,
                opt(row.model_points.map(|v| format!("{v:.1}"))),
                opt(row.real_points.map(|v| format!("{v:.0}"))),
                opt(row.diff_points.map(|v| format!("{v:+.1}"))),
                opt(row.model_rank.map(|v| v.to_string())),
                opt(row.real_rank.map(|v| v.to_string())),
                opt(row.diff_rank.map(|v| format!("{v:+}"))),
            )?;
        }

        let m = &report.metrics;
        writeln!(f)?;
        writeln!(f, "MAE points:     {}", fixed(m.mae_points, 2))?;
        writeln!(f, "RMSE points:    {}", fixed(m.rmse_points, 2))?;
        writeln!(f, "Spearman ranks: {}", fixed(m.spearman_ranks, 3))?;
        writeln!(f, "Top-4 overlap:  {}/4", m.top4_overlap)?;
        writeln!(
            f,
            "Champion:       model {} / real {} ({})",
            m.champion_model.as_deref().unwrap_or("-"),
            m.champion_real.as_deref().unwrap_or("-"),
            if m.champion_match { "match" } else { "no match" }
        )
    }
}

impl fmt::Display for ForecastScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Fixture forecasts: {} scored, {} without a fixture",
            self.matched, self.unmatched
        )?;
        write!(
            f,
            "Brier {}  log-loss {}  favourite hit rate {}",
            fixed(self.brier, 4),
            fixed(self.log_loss, 4),
            fixed(self.hit_rate, 3)
        )
    }
}

pub fn render_report(analysis: &DistributionAnalysis) -> String {
    SeasonReport(analysis).to_string()
}

pub fn render_comparison(report: &ComparisonReport) -> String {
    ComparisonTable(report).to_string()
}

fn fixed(v: Option<f64>, decimals: usize) -> String {
    opt(v.map(|v| format!("{v:.decimals$}")))
}

fn opt(v: Option<String>) -> String {
    v.unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{render_comparison, render_report};
    use crate::analysis::analyze;
    use crate::comparison::compare;
    use crate::forecast_score::ForecastScore;
    use crate::monte_carlo::TrialEnsemble;

    #[test]
    fn report_lists_teams_by_mean() {
        let tables = vec![
            BTreeMap::from([("A".to_string(), 6), ("B".to_string(), 0)]),
            BTreeMap::from([("A".to_string(), 3), ("B".to_string(), 3)]),
        ];
        let text = render_report(&analyze(&TrialEnsemble::from_tables(tables)));
        let a = text.find(" A ").unwrap();
        let b = text.find(" B ").unwrap();
        assert!(a < b);
        assert!(text.contains("100.00%"));
    }

    #[test]
    fn comparison_marks_missing_values() {
        let means = BTreeMap::from([("A".to_string(), 10.0)]);
        let real = BTreeMap::from([("B".to_string(), 7)]);
        let text = render_comparison(&compare(&means, &real));
        assert!(text.contains("MAE points:     -"));
        assert!(text.contains("no match"));
    }

    #[test]
    fn forecast_score_prints_dashes_when_nothing_matched() {
        let score = ForecastScore {
            matched: 0,
            unmatched: 3,
            brier: None,
            log_loss: None,
            hit_rate: None,
        };
        let text = score.to_string();
        assert!(text.contains("0 scored, 3 without a fixture"));
        assert!(text.contains("Brier -"));

        let scored = ForecastScore {
            brier: Some(0.5),
            ..score
        };
        assert!(scored.to_string().contains("Brier 0.5000"));
    }
}
