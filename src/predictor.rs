use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Named feature columns, one row per fixture. Every row is as wide as the
/// column list, including rows read from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFeatureMatrix")]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

#[derive(Deserialize)]
struct RawFeatureMatrix {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl TryFrom<RawFeatureMatrix> for FeatureMatrix {
    type Error = SimError;

    fn try_from(raw: RawFeatureMatrix) -> Result<Self> {
        FeatureMatrix::new(raw.columns, raw.rows)
    }
}

impl FeatureMatrix {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(bad) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(SimError::FeatureMismatch {
                expected: columns.len(),
                actual: bad.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn missing_columns<S: AsRef<str>>(&self, wanted: &[S]) -> Vec<String> {
        wanted
            .iter()
            .map(|w| w.as_ref())
            .filter(|w| self.column_index(w).is_none())
            .map(str::to_string)
            .collect()
    }

    /// Reorders (and drops) columns to exactly `wanted`.
    pub fn select<S: AsRef<str>>(&self, wanted: &[S]) -> Result<FeatureMatrix> {
        let missing = self.missing_columns(wanted);
        if !missing.is_empty() {
            return Err(SimError::MissingColumns {
                table: "calendar features",
                columns: missing,
            });
        }
        let idx: Vec<usize> = wanted
            .iter()
            .filter_map(|w| self.column_index(w.as_ref()))
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| idx.iter().map(|&i| row[i]).collect())
            .collect();
        Ok(FeatureMatrix {
            columns: wanted.iter().map(|w| w.as_ref().to_string()).collect(),
            rows,
        })
    }
}

/// Maps a feature matrix to raw per-class scores, one row per fixture, with
/// columns ordered as `classes()`.
pub trait OutcomePredictor {
    fn classes(&self) -> &[String];
    fn feature_names(&self) -> &[String];
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Vec<f64>>>;
}

/// Multinomial logistic model exported from the training pipeline as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxModel {
    pub feature_names: Vec<String>,
    pub classes: Vec<String>,
    /// One weight vector per class, aligned with `feature_names`.
    pub weights: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
    #[serde(default)]
    pub feature_means: Option<Vec<f64>>,
    #[serde(default)]
    pub feature_scales: Option<Vec<f64>>,
    #[serde(default)]
    pub reference_accuracy: Option<f64>,
}

impl SoftmaxModel {
    pub fn load(path: &Path) -> Result<Self> {
        let load_err = |reason: String| SimError::ModelLoad {
            path: path.display().to_string(),
            reason,
        };
        let raw = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let model: SoftmaxModel =
            serde_json::from_str(&raw).map_err(|e| load_err(e.to_string()))?;
        model.validate().map_err(load_err)?;
        if let Some(acc) = model.reference_accuracy {
            log::info!("model loaded from {} (reference accuracy {acc:.4})", path.display());
        } else {
            log::info!("model loaded from {}", path.display());
        }
        Ok(model)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        let n_features = self.feature_names.len();
        if self.classes.is_empty() {
            return Err("model has no classes".to_string());
        }
        if self.weights.len() != self.classes.len() || self.intercepts.len() != self.classes.len()
        {
            return Err(format!(
                "expected {} weight rows and intercepts, got {} and {}",
                self.classes.len(),
                self.weights.len(),
                self.intercepts.len()
            ));
        }
        if let Some(row) = self.weights.iter().find(|w| w.len() != n_features) {
            return Err(format!(
                "weight row has {} values, expected {n_features}",
                row.len()
            ));
        }
        let optional = [
            ("feature_means", &self.feature_means),
            ("feature_scales", &self.feature_scales),
        ];
        for (name, values) in optional {
            if let Some(v) = values
                && v.len() != n_features
            {
                return Err(format!(
                    "{name} has {} values, expected {n_features}",
                    v.len()
                ));
            }
        }
        Ok(())
    }

    fn scores(&self, row: &[f64]) -> Vec<f64> {
        let x: Vec<f64> = row
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mean = self.feature_means.as_ref().map_or(0.0, |m| m[i]);
                let scale = self
                    .feature_scales
                    .as_ref()
                    .map_or(1.0, |s| if s[i].abs() > 1e-12 { s[i] } else { 1.0 });
                (v - mean) / scale
            })
            .collect();

        let logits: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.intercepts)
            .map(|(w, b)| b + w.iter().zip(&x).map(|(wi, xi)| wi * xi).sum::<f64>())
            .collect();

        let mx = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|l| (l - mx).exp()).collect();
        let den = exps.iter().sum::<f64>().max(1e-12);
        exps.into_iter().map(|e| e / den).collect()
    }
}

impl OutcomePredictor for SoftmaxModel {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Vec<f64>>> {
        let aligned = features.select(&self.feature_names)?;
        Ok(aligned.rows().iter().map(|row| self.scores(row)).collect())
    }
}
