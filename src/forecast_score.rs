use std::collections::HashMap;

use serde::Serialize;

use crate::error::Result;
use crate::outcome::{Outcome, Prob3};
use crate::season::{Calendar, RealResult};

/// How well a calendar's per-fixture triples called the recorded results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastScore {
    /// Results paired with a calendar fixture.
    pub matched: usize,
    /// Results whose pairing is absent from the calendar (or already used up).
    pub unmatched: usize,
    /// Mean multi-class Brier score, 0 is perfect and 2 is the worst case.
    pub brier: Option<f64>,
    pub log_loss: Option<f64>,
    /// Share of results whose most likely class was the one that happened.
    pub hit_rate: Option<f64>,
}

// Floor for the log-loss so a zero-probability result stays finite.
const MIN_PROB: f64 = 1e-12;

/// Pairs each recorded result with the next unused fixture that has the same
/// home and away club, then scores the predicted triple of that fixture.
pub fn score_calendar(calendar: &Calendar, results: &[RealResult]) -> Result<ForecastScore> {
    let mut by_pairing: HashMap<(&str, &str), Vec<&Prob3>> = HashMap::new();
    // Reversed so that popping yields fixtures in calendar order.
    for (fixture, p) in calendar.fixtures().iter().zip(calendar.probs()).rev() {
        by_pairing
            .entry((fixture.home.as_str(), fixture.away.as_str()))
            .or_default()
            .push(p);
    }

    let mut unmatched = 0usize;
    let mut scored: Vec<(Prob3, Outcome)> = Vec::with_capacity(results.len());
    for row in results {
        let outcome = Outcome::from_label(&row.result)?;
        let next = by_pairing
            .get_mut(&(row.home_team.as_str(), row.away_team.as_str()))
            .and_then(Vec::pop);
        match next {
            Some(p) => scored.push((*p, outcome)),
            None => unmatched += 1,
        }
    }
    if unmatched > 0 {
        log::warn!("{unmatched} recorded results have no fixture in the calendar");
    }

    let matched = scored.len();
    if matched == 0 {
        return Ok(ForecastScore {
            matched,
            unmatched,
            brier: None,
            log_loss: None,
            hit_rate: None,
        });
    }

    let n = matched as f64;
    let brier = scored.iter().map(|(p, o)| brier_term(p, *o)).sum::<f64>() / n;
    let log_loss = scored
        .iter()
        .map(|(p, o)| -p.get(*o).max(MIN_PROB).ln())
        .sum::<f64>()
        / n;
    let hits = scored.iter().filter(|(p, o)| favourite(p) == *o).count();
    Ok(ForecastScore {
        matched,
        unmatched,
        brier: Some(brier),
        log_loss: Some(log_loss),
        hit_rate: Some(hits as f64 / n),
    })
}

fn brier_term(p: &Prob3, outcome: Outcome) -> f64 {
    [Outcome::Home, Outcome::Draw, Outcome::Away]
        .into_iter()
        .map(|o| {
            let hit = if o == outcome { 1.0 } else { 0.0 };
            (p.get(o) - hit).powi(2)
        })
        .sum()
}

// Ties go to the home side, then the draw.
fn favourite(p: &Prob3) -> Outcome {
    if p.home >= p.draw && p.home >= p.away {
        Outcome::Home
    } else if p.draw >= p.away {
        Outcome::Draw
    } else {
        Outcome::Away
    }
}

#[cfg(test)]
mod tests {
    use super::score_calendar;
    use crate::error::SimError;
    use crate::outcome::Prob3;
    use crate::season::{Calendar, RealResult};

    fn result(home: &str, away: &str, label: &str) -> RealResult {
        RealResult {
            home_team: home.into(),
            away_team: away.into(),
            result: label.into(),
        }
    }

    fn calendar() -> Calendar {
        Calendar::new(
            vec![Prob3::new(1.0, 0.0, 0.0), Prob3::new(0.2, 0.5, 0.3)],
            Some(vec!["Lyon".into(), "Nice".into()]),
            Some(vec!["Nice".into(), "Lyon".into()]),
        )
        .unwrap()
    }

    #[test]
    fn certain_and_spread_forecasts() {
        let results = vec![
            result("Lyon", "Nice", "home_win"),
            result("Nice", "Lyon", "away_win"),
        ];
        let score = score_calendar(&calendar(), &results).unwrap();
        assert_eq!((score.matched, score.unmatched), (2, 0));
        // 0 for the certain call, 0.04 + 0.25 + 0.49 for the second.
        assert!((score.brier.unwrap() - 0.39).abs() < 1e-12);
        assert!((score.log_loss.unwrap() - (-(0.3f64).ln()) / 2.0).abs() < 1e-12);
        assert_eq!(score.hit_rate, Some(0.5));
    }

    #[test]
    fn results_outside_the_calendar_are_counted_not_scored() {
        let results = vec![
            result("Lyon", "Brest", "draw"),
            result("Lyon", "Nice", "draw"),
            result("Lyon", "Nice", "draw"),
        ];
        let score = score_calendar(&calendar(), &results).unwrap();
        assert_eq!((score.matched, score.unmatched), (1, 2));
        // Draw at zero probability: floored, not infinite.
        assert!(score.log_loss.unwrap().is_finite());
        assert_eq!(score.hit_rate, Some(0.0));
    }

    #[test]
    fn nothing_matched_leaves_metrics_empty() {
        let score = score_calendar(&calendar(), &[result("Lille", "Brest", "draw")]).unwrap();
        assert_eq!(score.matched, 0);
        assert_eq!(score.brier, None);
    }

    #[test]
    fn bad_label_is_an_error() {
        let err = score_calendar(&calendar(), &[result("Lyon", "Nice", "forfeit")]).unwrap_err();
        assert!(matches!(err, SimError::InvalidResultLabel { .. }));
    }
}
