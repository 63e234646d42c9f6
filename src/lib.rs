pub mod analysis;
pub mod comparison;
pub mod config;
pub mod error;
pub mod forecast_score;
pub mod match_csv;
pub mod match_store;
pub mod monte_carlo;
pub mod normalize;
pub mod outcome;
pub mod predictor;
pub mod report;
pub mod sampler;
pub mod season;
pub mod session;
pub mod team_season;
pub mod training;

pub use error::{Result, SimError};
pub use monte_carlo::{SimulationConfig, TrialEnsemble, TrialMode, run_trials};
pub use outcome::{Outcome, Prob3};
pub use season::{Calendar, TeamPoints};
pub use session::{SimulationResult, SimulationSession};
