use std::fs;
use std::path::PathBuf;

use cartwise_core::campaign::{CampaignLedger, CampaignPlanner};
use cartwise_core::config::ConfigOverrides;
use cartwise_core::domain::CampaignBucket;
use cartwise_core::features::FeatureEngineer;
use cartwise_core::prediction::BehaviorPredictor;
use cartwise_core::recommendation::RecommendationEngine;
use cartwise_core::segmentation::{segment_counts, SegmentationEngine};
use serde::Serialize;

use crate::commands::{self, CommandResult};
use crate::{export, loader, report};

pub const SEGMENTATION_CSV: &str = "customer_segmentation_rfm.csv";
pub const PREDICTIONS_CSV: &str = "customer_predictions.csv";
pub const CAMPAIGNS_CSV: &str = "campaign_results.csv";
pub const MODEL_ARTIFACT: &str = "customer_behavior_model.json";
pub const SUMMARY_FILE: &str = "executive_summary.md";

/// Marketing playbook caps: vouchers reach at most ten lapsed customers
/// per run, recommendation mails at most twenty.
const VOUCHER_BATCH_CAP: usize = 10;
const RECOMMENDATION_BATCH_CAP: usize = 20;

pub struct RunArgs {
    pub input: PathBuf,
    pub config_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub seed: Option<u64>,
}

pub fn run(args: RunArgs) -> CommandResult {
    let overrides = ConfigOverrides { random_seed: args.seed, ..ConfigOverrides::default() };
    let config = match commands::load_config(args.config_path, overrides) {
        Ok(config) => config,
        Err(error) => return commands::config_failure("run", &error),
    };

    let raw = match loader::load_transactions(&args.input) {
        Ok(raw) => raw,
        Err(error) => return commands::load_failure("run", &error),
    };

    let mut engineer = FeatureEngineer::new();
    engineer.load_records(raw);
    if let Err(error) = engineer.engineer_features() {
        return commands::pipeline_failure("run", &error);
    }
    let records = engineer.records();
    let summary = match engineer.summary() {
        Ok(summary) => summary,
        Err(error) => return commands::pipeline_failure("run", &error),
    };
    tracing::info!(
        event_name = "pipeline.features_engineered",
        records = summary.total_records,
        customers = summary.unique_customers,
        items = summary.unique_items,
        "features engineered"
    );

    let segments = match SegmentationEngine::new().segment_customers(engineer.profiles()) {
        Ok(segments) => segments,
        Err(error) => return commands::pipeline_failure("run", &error),
    };
    let counts = segment_counts(&segments);
    tracing::info!(
        event_name = "pipeline.customers_segmented",
        customers = segments.len(),
        segments = counts.len(),
        "customers segmented"
    );

    let mut predictor = BehaviorPredictor::new(config.model.clone());
    let training = match predictor.train(records) {
        Ok(report) => report.clone(),
        Err(error) => return commands::pipeline_failure("run", &error),
    };
    tracing::info!(
        event_name = "pipeline.model_trained",
        best_model = %training.best_model,
        accuracy = training.accuracy,
        "model trained"
    );

    let mut predictions = match predictor.predict(records) {
        Ok(report) => report,
        Err(error) => return commands::pipeline_failure("run", &error),
    };

    let recommender = RecommendationEngine::from_records(records);
    for forecast in &mut predictions.customer_segments {
        forecast.product_recommendations = recommender
            .recommend_for(forecast.customer_id, config.marketing.max_recommendations)
            .into_iter()
            .map(|affinity| affinity.item_id)
            .collect();
    }

    let planner = CampaignPlanner::new(config.marketing.clone());
    let today = chrono::Local::now().date_naive();

    let high_value: Vec<_> = predictions
        .customer_segments
        .iter()
        .filter(|forecast| {
            planner.selector().classify_count(forecast.purchase_count)
                == CampaignBucket::HighValue
        })
        .cloned()
        .collect();
    let low_engagement: Vec<_> = predictions
        .customer_segments
        .iter()
        .filter(|forecast| {
            planner.selector().classify_count(forecast.purchase_count)
                == CampaignBucket::LowEngagement
        })
        .take(VOUCHER_BATCH_CAP)
        .cloned()
        .collect();
    let with_recommendations: Vec<_> = predictions
        .customer_segments
        .iter()
        .filter(|forecast| !forecast.product_recommendations.is_empty())
        .take(RECOMMENDATION_BATCH_CAP)
        .cloned()
        .collect();

    let discounts = planner.plan_discounts(&high_value, today);
    let vouchers = planner.plan_vouchers(&low_engagement, today);
    let recommendation_mails = planner.plan_recommendations(&with_recommendations);

    let mut ledger = CampaignLedger::new();
    ledger.record_all(&discounts.emails);
    ledger.record_all(&vouchers);
    ledger.record_all(&recommendation_mails);
    let campaigns = ledger.report();
    tracing::info!(
        event_name = "pipeline.campaigns_planned",
        discounts = discounts.emails.len(),
        vouchers = vouchers.len(),
        recommendations = recommendation_mails.len(),
        "campaigns planned"
    );

    if let Err(error) = export::ensure_output_dir(&args.output_dir) {
        return commands::export_failure("run", &error);
    }
    if let Err(error) =
        export::write_segmentation_csv(&args.output_dir.join(SEGMENTATION_CSV), &segments)
    {
        return commands::export_failure("run", &error);
    }
    if let Err(error) = export::write_predictions_csv(
        &args.output_dir.join(PREDICTIONS_CSV),
        &predictions.customer_segments,
    ) {
        return commands::export_failure("run", &error);
    }
    if let Err(error) =
        export::write_campaign_csv(&args.output_dir.join(CAMPAIGNS_CSV), ledger.entries())
    {
        return commands::export_failure("run", &error);
    }
    if let Err(error) = predictor.save_artifact(&args.output_dir.join(MODEL_ARTIFACT)) {
        return commands::pipeline_failure("run", &error);
    }

    let summary_text =
        report::executive_summary(&summary, &counts, &predictions, &campaigns, today);
    let summary_path = args.output_dir.join(SUMMARY_FILE);
    if let Err(error) = fs::write(&summary_path, &summary_text) {
        return CommandResult::failure(
            "run",
            "export",
            format!("could not write `{}`: {error}", summary_path.display()),
            8,
        );
    }
    tracing::info!(
        event_name = "pipeline.results_exported",
        output_dir = %args.output_dir.display(),
        "results exported"
    );

    #[derive(Serialize)]
    struct RunOutput<'a> {
        command: &'static str,
        status: &'static str,
        records: u64,
        customers: u64,
        items: u64,
        best_model: &'a str,
        accuracy: f64,
        high_confidence_customers: usize,
        emails_planned: usize,
        output_dir: String,
        files: Vec<&'static str>,
    }

    let payload = RunOutput {
        command: "run",
        status: "ok",
        records: summary.total_records,
        customers: summary.unique_customers,
        items: summary.unique_items,
        best_model: &training.best_model,
        accuracy: training.accuracy,
        high_confidence_customers: predictions.high_confidence_customers.len(),
        emails_planned: campaigns.summary.total_planned,
        output_dir: args.output_dir.display().to_string(),
        files: vec![
            SEGMENTATION_CSV,
            PREDICTIONS_CSV,
            CAMPAIGNS_CSV,
            MODEL_ARTIFACT,
            SUMMARY_FILE,
        ],
    };

    CommandResult { exit_code: 0, output: commands::pretty_json("run", &payload) }
}
