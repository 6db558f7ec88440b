//! Next purchase day prediction.
//!
//! Candidate classifiers are trained on a seeded shuffle split, scored on
//! the held-out rows by accuracy, and the winner serves all predictions.
//! Identical input and seed reproduce the same split, the same winner, and
//! the same predictions.

mod forest;
mod logistic;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

pub use forest::RandomForestClassifier;
pub use logistic::LogisticRegressionClassifier;

use crate::config::ModelConfig;
use crate::domain::{CustomerId, ItemId};
use crate::errors::PipelineError;
use crate::features::EngineeredRecord;

/// Model inputs, in feature-vector order. The target, day of month, is
/// deliberately absent along with `day_of_year`, which would encode it.
pub const FEATURE_NAMES: [&str; 12] = [
    "customer_id",
    "item_code",
    "month",
    "day_of_week",
    "is_weekend",
    "season",
    "total_purchases",
    "unique_items",
    "tenure_days",
    "purchase_frequency",
    "item_frequency",
    "customer_item_count",
];

/// A trainable model family behind a uniform fit/predict surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum CandidateModel {
    RandomForest(RandomForestClassifier),
    LogisticRegression(LogisticRegressionClassifier),
}

impl CandidateModel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RandomForest(_) => "random_forest",
            Self::LogisticRegression(_) => "logistic_regression",
        }
    }

    fn fit(&mut self, features: &[Vec<f64>], labels: &[u8]) {
        match self {
            Self::RandomForest(model) => model.fit(features, labels),
            Self::LogisticRegression(model) => model.fit(features, labels),
        }
    }

    pub fn predict_with_confidence(&self, row: &[f64]) -> (u8, f64) {
        match self {
            Self::RandomForest(model) => model.predict_with_confidence(row),
            Self::LogisticRegression(model) => model.predict_with_confidence(row),
        }
    }

    /// Per-feature weights for families that expose them. A forest whose
    /// trees never split carries no weights to report.
    pub fn feature_importance(&self) -> Option<BTreeMap<String, f64>> {
        match self {
            Self::RandomForest(model) if !model.importances().is_empty() => Some(
                FEATURE_NAMES
                    .iter()
                    .map(|name| name.to_string())
                    .zip(model.importances().iter().copied())
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Held-out accuracy for one candidate family.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub name: String,
    pub accuracy: f64,
}

/// Outcome of the train-and-select pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub best_model: String,
    pub accuracy: f64,
    pub candidate_scores: Vec<CandidateScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_importance: Option<BTreeMap<String, f64>>,
    pub training_rows: usize,
    pub holdout_rows: usize,
}

/// Day prediction for one customer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(rename = "Member_number")]
    pub customer_id: CustomerId,
    /// Predicted day of month, 1 to 31.
    pub predicted_day: u8,
    #[serde(rename = "prediction_confidence")]
    pub confidence: f64,
}

/// Per-customer record consumed by campaign targeting. Recommendation
/// enrichment fills `product_recommendations` after prediction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerForecast {
    #[serde(rename = "Member_number")]
    pub customer_id: CustomerId,
    pub name: String,
    pub email: String,
    pub purchase_count: u64,
    pub predicted_day: u8,
    pub prediction_confidence: f64,
    pub product_recommendations: Vec<ItemId>,
}

/// Full prediction-stage output consumed by reporting and campaigns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    pub model_performance: TrainingReport,
    /// Predicted day of month to number of customers.
    pub day_predictions: BTreeMap<u8, usize>,
    pub high_confidence_customers: Vec<PredictionResult>,
    pub customer_segments: Vec<CustomerForecast>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TrainedState {
    model: CandidateModel,
    report: TrainingReport,
    item_codes: BTreeMap<ItemId, usize>,
}

/// Trains candidate models and serves per-customer day predictions.
#[derive(Debug)]
pub struct BehaviorPredictor {
    config: ModelConfig,
    state: Option<TrainedState>,
}

impl BehaviorPredictor {
    pub fn new(config: ModelConfig) -> Self {
        Self { config, state: None }
    }

    pub fn is_trained(&self) -> bool {
        self.state.is_some()
    }

    pub fn training_report(&self) -> Option<&TrainingReport> {
        self.state.as_ref().map(|state| &state.report)
    }

    /// Trains every candidate on the seeded split and keeps the winner.
    ///
    /// Items are encoded by lexicographic rank, so the encoding does not
    /// depend on row order. Accuracy ties keep the earlier candidate.
    pub fn train(
        &mut self,
        records: &[EngineeredRecord],
    ) -> Result<&TrainingReport, PipelineError> {
        if records.is_empty() {
            return Err(PipelineError::InsufficientData(
                "no engineered records to train on".to_string(),
            ));
        }

        let item_codes: BTreeMap<ItemId, usize> = records
            .iter()
            .map(|record| record.item_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .enumerate()
            .map(|(code, item)| (item, code))
            .collect();

        let features: Vec<Vec<f64>> =
            records.iter().map(|record| feature_row(record, &item_codes)).collect();
        let targets: Vec<u8> = records.iter().map(|record| record.day_of_month as u8).collect();

        let mut indices: Vec<usize> = (0..records.len()).collect();
        let mut rng = StdRng::seed_from_u64(self.config.random_seed);
        indices.shuffle(&mut rng);

        let holdout_len =
            (((records.len() as f64) * self.config.test_fraction).ceil() as usize)
                .min(records.len());
        let (holdout_idx, train_idx) = indices.split_at(holdout_len);
        if train_idx.is_empty() {
            return Err(PipelineError::InsufficientData(format!(
                "training split is empty for {} rows at test fraction {}",
                records.len(),
                self.config.test_fraction
            )));
        }

        let train_x: Vec<Vec<f64>> = train_idx.iter().map(|&i| features[i].clone()).collect();
        let train_y: Vec<u8> = train_idx.iter().map(|&i| targets[i]).collect();
        let holdout_x: Vec<Vec<f64>> = holdout_idx.iter().map(|&i| features[i].clone()).collect();
        let holdout_y: Vec<u8> = holdout_idx.iter().map(|&i| targets[i]).collect();

        let mut candidates = vec![
            CandidateModel::RandomForest(RandomForestClassifier::new(
                self.config.n_estimators,
                self.config.max_tree_depth,
                self.config.random_seed,
            )),
            CandidateModel::LogisticRegression(LogisticRegressionClassifier::new()),
        ];

        let mut scores = Vec::with_capacity(candidates.len());
        for candidate in candidates.iter_mut() {
            candidate.fit(&train_x, &train_y);
            scores.push(CandidateScore {
                name: candidate.name().to_string(),
                accuracy: accuracy_on(candidate, &holdout_x, &holdout_y),
            });
        }

        let mut best = 0;
        for (index, score) in scores.iter().enumerate() {
            if score.accuracy > scores[best].accuracy {
                best = index;
            }
        }

        let model = candidates.remove(best);
        let report = TrainingReport {
            best_model: scores[best].name.clone(),
            accuracy: scores[best].accuracy,
            feature_importance: model.feature_importance(),
            candidate_scores: scores,
            training_rows: train_idx.len(),
            holdout_rows: holdout_len,
        };

        let state = self.state.insert(TrainedState { model, report, item_codes });
        Ok(&state.report)
    }

    /// Predicts the next purchase day for every customer in the input.
    ///
    /// Each customer is scored on their most recent engineered record,
    /// equal dates resolving to the later row. A customer is high
    /// confidence when the winning class probability strictly exceeds the
    /// configured threshold.
    pub fn predict(&self, records: &[EngineeredRecord]) -> Result<PredictionReport, PipelineError> {
        let state = self.state.as_ref().ok_or(PipelineError::UntrainedModel)?;

        let mut latest: BTreeMap<CustomerId, &EngineeredRecord> = BTreeMap::new();
        for record in records {
            match latest.get(&record.customer_id) {
                Some(existing) if existing.date > record.date => {}
                _ => {
                    latest.insert(record.customer_id, record);
                }
            }
        }

        let mut day_predictions: BTreeMap<u8, usize> = BTreeMap::new();
        let mut high_confidence = Vec::new();
        let mut forecasts = Vec::with_capacity(latest.len());

        for (customer_id, record) in latest {
            let row = feature_row(record, &state.item_codes);
            let (predicted_day, confidence) = state.model.predict_with_confidence(&row);

            *day_predictions.entry(predicted_day).or_insert(0) += 1;
            if confidence > self.config.confidence_threshold {
                high_confidence.push(PredictionResult { customer_id, predicted_day, confidence });
            }
            forecasts.push(CustomerForecast {
                customer_id,
                name: record.customer_name.clone(),
                email: record.customer_email.clone(),
                purchase_count: record.total_purchases,
                predicted_day,
                prediction_confidence: confidence,
                product_recommendations: Vec::new(),
            });
        }

        Ok(PredictionReport {
            model_performance: state.report.clone(),
            day_predictions,
            high_confidence_customers: high_confidence,
            customer_segments: forecasts,
        })
    }

    /// Writes the winning model, its report, and the item encoding as one
    /// JSON artifact.
    pub fn save_artifact(&self, path: &Path) -> Result<(), PipelineError> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| PipelineError::State("no trained model to save".to_string()))?;

        let payload = serde_json::to_string_pretty(state)
            .map_err(|err| PipelineError::Artifact(format!("serialize model artifact: {err}")))?;
        fs::write(path, payload).map_err(|err| {
            PipelineError::Artifact(format!("write model artifact `{}`: {err}", path.display()))
        })
    }

    /// Restores a previously saved artifact, replacing any trained state.
    pub fn load_artifact(&mut self, path: &Path) -> Result<(), PipelineError> {
        let payload = fs::read_to_string(path).map_err(|err| {
            PipelineError::Artifact(format!("read model artifact `{}`: {err}", path.display()))
        })?;
        let state: TrainedState = serde_json::from_str(&payload)
            .map_err(|err| PipelineError::Artifact(format!("parse model artifact: {err}")))?;

        self.state = Some(state);
        Ok(())
    }
}

/// Items absent from the training vocabulary encode one past the end.
fn feature_row(record: &EngineeredRecord, item_codes: &BTreeMap<ItemId, usize>) -> Vec<f64> {
    let item_code = item_codes.get(&record.item_id).copied().unwrap_or(item_codes.len());
    vec![
        record.customer_id.0 as f64,
        item_code as f64,
        record.month as f64,
        record.day_of_week as f64,
        if record.is_weekend { 1.0 } else { 0.0 },
        record.season.code() as f64,
        record.total_purchases as f64,
        record.unique_items as f64,
        record.tenure_days as f64,
        record.purchase_frequency,
        record.item_frequency as f64,
        record.customer_item_count as f64,
    ]
}

fn accuracy_on(model: &CandidateModel, features: &[Vec<f64>], labels: &[u8]) -> f64 {
    if features.is_empty() {
        return 0.0;
    }
    let correct = features
        .iter()
        .zip(labels)
        .filter(|(row, label)| model.predict_with_confidence(row).0 == **label)
        .count();
    correct as f64 / features.len() as f64
}
