use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("{field} has {actual} entries but the calendar has {expected} fixtures")]
    TeamListLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{table} is missing required columns: {}", columns.join(", "))]
    MissingColumns {
        table: &'static str,
        columns: Vec<String>,
    },
    #[error("no simulation has been run in this session")]
    NoSimulation,
    #[error("fixture {fixture} has an all-zero probability row")]
    DegenerateProbabilities { fixture: usize },
    #[error("predictor does not expose class `{class}`")]
    MissingClass { class: String },
    #[error("predictor returned {actual} classes, expected {expected}")]
    ClassCount { expected: usize, actual: usize },
    #[error("feature row has {actual} values, expected {expected}")]
    FeatureMismatch { expected: usize, actual: usize },
    #[error("trial count must be positive")]
    InvalidTrialCount,
    #[error("unknown result label `{label}`")]
    InvalidResultLabel { label: String },
    #[error("failed to load model from {path}: {reason}")]
    ModelLoad { path: String, reason: String },
}
