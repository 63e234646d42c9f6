use serde::Serialize;

use crate::analysis::{DistributionAnalysis, analyze};
use crate::comparison::{ComparisonReport, compare};
use crate::error::{Result, SimError};
use crate::forecast_score::{ForecastScore, score_calendar};
use crate::monte_carlo::{SimulationConfig, TrialEnsemble, run_trials};
use crate::normalize::{ClassMap, DegeneratePolicy, probabilities_from_raw};
use crate::outcome::Prob3;
use crate::predictor::{FeatureMatrix, OutcomePredictor};
use crate::season::{Calendar, RealResult, TeamPoints, real_season_points};

#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub config: SimulationConfig,
    pub calendar: Calendar,
    pub ensemble: TrialEnsemble,
    pub analysis: DistributionAnalysis,
}

/// A loaded predictor plus the results of the most recent run. Each call to
/// `simulate` replaces the previous result and clears any comparison.
pub struct SimulationSession<P: OutcomePredictor> {
    predictor: P,
    classes: ClassMap,
    policy: DegeneratePolicy,
    last: Option<SimulationResult>,
    comparison: Option<ComparisonReport>,
}

impl<P: OutcomePredictor> SimulationSession<P> {
    pub fn new(predictor: P, policy: DegeneratePolicy) -> Result<Self> {
        let classes = ClassMap::from_class_names(predictor.classes())?;
        Ok(Self {
            predictor,
            classes,
            policy,
            last: None,
            comparison: None,
        })
    }

    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    /// Normalized outcome probabilities for every calendar row.
    pub fn predict_probabilities(&self, features: &FeatureMatrix) -> Result<Vec<Prob3>> {
        let missing = features.missing_columns(self.predictor.feature_names());
        if !missing.is_empty() {
            log::warn!("calendar is missing model features: {}", missing.join(", "));
        }
        let raw = self.predictor.predict(features)?;
        if raw.len() != features.len() {
            return Err(SimError::FeatureMismatch {
                expected: features.len(),
                actual: raw.len(),
            });
        }
        let probs = probabilities_from_raw(&raw, &self.classes, self.policy)?;
        log::info!("probabilities computed for {} fixtures", probs.len());
        Ok(probs)
    }

    pub fn simulate(
        &mut self,
        features: &FeatureMatrix,
        teams_home: Option<Vec<String>>,
        teams_away: Option<Vec<String>>,
        config: SimulationConfig,
    ) -> Result<&SimulationResult> {
        let probs = self.predict_probabilities(features)?;
        let calendar = Calendar::new(probs, teams_home, teams_away)?;
        self.simulate_calendar(calendar, config)
    }

    /// Runs the trials on a calendar whose probabilities are already normalized.
    pub fn simulate_calendar(
        &mut self,
        calendar: Calendar,
        config: SimulationConfig,
    ) -> Result<&SimulationResult> {
        let ensemble = run_trials(&calendar, &config)?;
        let analysis = analyze(&ensemble);
        self.comparison = None;
        let result = self.last.insert(SimulationResult {
            config,
            calendar,
            ensemble,
            analysis,
        });
        Ok(&*result)
    }

    pub fn last_result(&self) -> Option<&SimulationResult> {
        self.last.as_ref()
    }

    pub fn last_comparison(&self) -> Option<&ComparisonReport> {
        self.comparison.as_ref()
    }

    pub fn compare(&mut self, real_points: &TeamPoints) -> Result<&ComparisonReport> {
        let last = self.last.as_ref().ok_or(SimError::NoSimulation)?;
        let report = compare(&last.ensemble.mean_points(), real_points);
        let report = self.comparison.insert(report);
        Ok(&*report)
    }

    pub fn compare_results(&mut self, results: &[RealResult]) -> Result<&ComparisonReport> {
        if self.last.is_none() {
            return Err(SimError::NoSimulation);
        }
        let real = real_season_points(results)?;
        self.compare(&real)
    }

    /// Scores the last run's fixture probabilities against recorded results.
    pub fn score_forecast(&self, results: &[RealResult]) -> Result<ForecastScore> {
        let last = self.last.as_ref().ok_or(SimError::NoSimulation)?;
        score_calendar(&last.calendar, results)
    }
}
