use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

pub const WIN_POINTS: u32 = 3;
pub const DRAW_POINTS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    #[serde(rename = "home_win")]
    Home,
    Draw,
    #[serde(rename = "away_win")]
    Away,
}

impl Outcome {
    /// Parses the recorded result labels used by the fixtures store.
    pub fn from_label(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "home_win" => Ok(Outcome::Home),
            "draw" => Ok(Outcome::Draw),
            "away_win" => Ok(Outcome::Away),
            _ => Err(SimError::InvalidResultLabel {
                label: raw.to_string(),
            }),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Home => "home_win",
            Outcome::Draw => "draw",
            Outcome::Away => "away_win",
        }
    }

    /// Points for (home, away) under 3/1/0 scoring.
    pub fn points(self) -> (u32, u32) {
        match self {
            Outcome::Home => (WIN_POINTS, 0),
            Outcome::Draw => (DRAW_POINTS, DRAW_POINTS),
            Outcome::Away => (0, WIN_POINTS),
        }
    }

    pub fn is_decisive(self) -> bool {
        self != Outcome::Draw
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prob3 {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Prob3 {
    pub fn new(home: f64, draw: f64, away: f64) -> Self {
        Self { home, draw, away }
    }

    pub fn uniform() -> Self {
        Self {
            home: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away: 1.0 / 3.0,
        }
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    pub fn sum(&self) -> f64 {
        self.home + self.draw + self.away
    }

    pub fn is_zero(&self) -> bool {
        self.home == 0.0 && self.draw == 0.0 && self.away == 0.0
    }

    /// Expected league points for the home and away side.
    pub fn expected_points(&self) -> (f64, f64) {
        let win = WIN_POINTS as f64;
        let draw = DRAW_POINTS as f64;
        (
            self.home * win + self.draw * draw,
            self.away * win + self.draw * draw,
        )
    }
}

pub fn classify_outcome(home_goals: i32, away_goals: i32) -> Outcome {
    if home_goals > away_goals {
        Outcome::Home
    } else if home_goals < away_goals {
        Outcome::Away
    } else {
        Outcome::Draw
    }
}

#[cfg(test)]
mod tests {
    use super::{Outcome, Prob3, classify_outcome};

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(Outcome::from_label("home_win").unwrap(), Outcome::Home);
        assert_eq!(Outcome::from_label(" Draw ").unwrap(), Outcome::Draw);
        assert_eq!(Outcome::from_label("AWAY_WIN").unwrap(), Outcome::Away);
        assert!(Outcome::from_label("victoire").is_err());
    }

    #[test]
    fn points_follow_three_one_zero() {
        assert_eq!(Outcome::Home.points(), (3, 0));
        assert_eq!(Outcome::Draw.points(), (1, 1));
        assert_eq!(Outcome::Away.points(), (0, 3));
    }

    #[test]
    fn classify_uses_goal_difference() {
        assert_eq!(classify_outcome(2, 1), Outcome::Home);
        assert_eq!(classify_outcome(0, 0), Outcome::Draw);
        assert_eq!(classify_outcome(1, 3), Outcome::Away);
    }

    #[test]
    fn expected_points_match_triple() {
        let (h, a) = Prob3::new(0.7, 0.2, 0.1).expected_points();
        assert!((h - 2.3).abs() < 1e-12);
        assert!((a - 0.5).abs() < 1e-12);
    }
}
