use std::path::PathBuf;

use cartwise_core::config::ConfigOverrides;
use cartwise_core::domain::CustomerId;
use cartwise_core::features::FeatureEngineer;
use cartwise_core::recommendation::RecommendationEngine;
use serde::Serialize;

use crate::commands::{self, CommandResult};
use crate::loader;

pub fn run(
    input: PathBuf,
    customer: u64,
    top: Option<usize>,
    config_path: Option<PathBuf>,
) -> CommandResult {
    let config = match commands::load_config(config_path, ConfigOverrides::default()) {
        Ok(config) => config,
        Err(error) => return commands::config_failure("recommend", &error),
    };
    let limit = top.unwrap_or(config.marketing.max_recommendations);

    let raw = match loader::load_transactions(&input) {
        Ok(raw) => raw,
        Err(error) => return commands::load_failure("recommend", &error),
    };

    let mut engineer = FeatureEngineer::new();
    engineer.load_records(raw);
    if let Err(error) = engineer.engineer_features() {
        return commands::pipeline_failure("recommend", &error);
    }

    let engine = RecommendationEngine::from_records(engineer.records());
    let recommendations = engine.recommend_for(CustomerId(customer), limit);

    #[derive(Serialize)]
    struct RecommendationLine {
        item: String,
        score: f64,
    }

    #[derive(Serialize)]
    struct RecommendOutput {
        command: &'static str,
        customer: u64,
        recommendations: Vec<RecommendationLine>,
    }

    // An unknown customer or one with no co-purchase signal gets an empty
    // list, not an error.
    let payload = RecommendOutput {
        command: "recommend",
        customer,
        recommendations: recommendations
            .into_iter()
            .map(|affinity| RecommendationLine {
                item: affinity.item_id.0,
                score: affinity.score,
            })
            .collect(),
    };

    CommandResult { exit_code: 0, output: commands::pretty_json("recommend", &payload) }
}
