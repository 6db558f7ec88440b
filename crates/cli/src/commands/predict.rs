use std::collections::BTreeMap;
use std::path::PathBuf;

use cartwise_core::config::ConfigOverrides;
use cartwise_core::features::FeatureEngineer;
use cartwise_core::prediction::{BehaviorPredictor, CandidateScore};
use serde::Serialize;

use crate::commands::{self, CommandResult};
use crate::loader;

pub fn run(input: PathBuf, config_path: Option<PathBuf>, seed: Option<u64>) -> CommandResult {
    let overrides = ConfigOverrides { random_seed: seed, ..ConfigOverrides::default() };
    let config = match commands::load_config(config_path, overrides) {
        Ok(config) => config,
        Err(error) => return commands::config_failure("predict", &error),
    };

    let raw = match loader::load_transactions(&input) {
        Ok(raw) => raw,
        Err(error) => return commands::load_failure("predict", &error),
    };

    let mut engineer = FeatureEngineer::new();
    engineer.load_records(raw);
    if let Err(error) = engineer.engineer_features() {
        return commands::pipeline_failure("predict", &error);
    }
    let records = engineer.records();

    let mut predictor = BehaviorPredictor::new(config.model.clone());
    if let Err(error) = predictor.train(records) {
        return commands::pipeline_failure("predict", &error);
    }
    let predictions = match predictor.predict(records) {
        Ok(report) => report,
        Err(error) => return commands::pipeline_failure("predict", &error),
    };

    #[derive(Serialize)]
    struct PredictOutput<'a> {
        command: &'static str,
        best_model: &'a str,
        accuracy: f64,
        candidate_scores: &'a [CandidateScore],
        training_rows: usize,
        holdout_rows: usize,
        day_predictions: &'a BTreeMap<u8, usize>,
        high_confidence_customers: usize,
        customers: usize,
    }

    let performance = &predictions.model_performance;
    let payload = PredictOutput {
        command: "predict",
        best_model: &performance.best_model,
        accuracy: performance.accuracy,
        candidate_scores: &performance.candidate_scores,
        training_rows: performance.training_rows,
        holdout_rows: performance.holdout_rows,
        day_predictions: &predictions.day_predictions,
        high_confidence_customers: predictions.high_confidence_customers.len(),
        customers: predictions.customer_segments.len(),
    };

    CommandResult { exit_code: 0, output: commands::pretty_json("predict", &payload) }
}
