use std::collections::BTreeMap;
use std::path::PathBuf;

use cartwise_core::config::ConfigOverrides;
use cartwise_core::features::FeatureEngineer;
use cartwise_core::segmentation::{segment_counts, SegmentationEngine};
use serde::Serialize;

use crate::commands::{self, CommandResult};
use crate::loader;

pub fn run(input: PathBuf, config_path: Option<PathBuf>, limit: usize) -> CommandResult {
    // Segmentation has no tunables today; loading still validates the file.
    if let Err(error) = commands::load_config(config_path, ConfigOverrides::default()) {
        return commands::config_failure("segment", &error);
    }

    let raw = match loader::load_transactions(&input) {
        Ok(raw) => raw,
        Err(error) => return commands::load_failure("segment", &error),
    };

    let mut engineer = FeatureEngineer::new();
    engineer.load_records(raw);
    if let Err(error) = engineer.engineer_features() {
        return commands::pipeline_failure("segment", &error);
    }

    let records = match SegmentationEngine::new().segment_customers(engineer.profiles()) {
        Ok(records) => records,
        Err(error) => return commands::pipeline_failure("segment", &error),
    };

    let segments: BTreeMap<&'static str, usize> = segment_counts(&records)
        .into_iter()
        .map(|(segment, count)| (segment.label(), count))
        .collect();

    #[derive(Serialize)]
    struct SegmentRow<'a> {
        #[serde(rename = "Member_number")]
        member_number: u64,
        recency: i64,
        frequency: u64,
        monetary: u64,
        rfm_score: &'a str,
        segment: &'static str,
    }

    #[derive(Serialize)]
    struct SegmentOutput<'a> {
        command: &'static str,
        customers: usize,
        segments: BTreeMap<&'static str, usize>,
        rows: Vec<SegmentRow<'a>>,
    }

    let rows = records
        .iter()
        .take(limit)
        .map(|record| SegmentRow {
            member_number: record.customer_id.0,
            recency: record.recency,
            frequency: record.frequency,
            monetary: record.monetary,
            rfm_score: &record.rfm_code,
            segment: record.segment.label(),
        })
        .collect();

    let payload = SegmentOutput {
        command: "segment",
        customers: records.len(),
        segments,
        rows,
    };

    CommandResult { exit_code: 0, output: commands::pretty_json("segment", &payload) }
}
