use std::fs;
use std::path::PathBuf;

use cartwise_cli::commands::run::RunArgs;
use cartwise_cli::commands::{predict, recommend, run, segment};
use serde_json::Value;
use tempfile::TempDir;

/// Eight customers with six purchases each. Every customer covers six of
/// the seven items, so each one has exactly one co-purchased item left to
/// recommend. Extra `channel` column exercises the loader's tolerance for
/// unexpected columns.
fn write_fixture(dir: &TempDir) -> PathBuf {
    let items = [
        "whole milk",
        "rolls/buns",
        "yogurt",
        "tropical fruit",
        "soda",
        "bottled water",
        "sausage",
    ];
    let mut contents = String::from("Member_number,item,Date,name,email,channel\n");
    for i in 0..48u32 {
        let member = 1000 + (i % 8);
        let item = items[(i as usize) % items.len()];
        let day = i % 28 + 1;
        let month = i % 12 + 1;
        contents.push_str(&format!(
            "{member},{item},{day:02}-{month:02}-2015,Customer {member},c{member}@example.com,web\n"
        ));
    }

    let path = dir.path().join("transactions.csv");
    fs::write(&path, contents).unwrap();
    path
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

#[test]
fn run_command_writes_every_output_file() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir);
    let output_dir = dir.path().join("out");

    let result = run::run(RunArgs {
        input,
        config_path: None,
        output_dir: output_dir.clone(),
        seed: Some(7),
    });
    assert_eq!(result.exit_code, 0, "expected successful pipeline run: {}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "run");
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["records"], 48);
    assert_eq!(payload["customers"], 8);

    for file in [
        "customer_segmentation_rfm.csv",
        "customer_predictions.csv",
        "campaign_results.csv",
        "customer_behavior_model.json",
        "executive_summary.md",
    ] {
        assert!(output_dir.join(file).exists(), "missing output file {file}");
    }

    let summary = fs::read_to_string(output_dir.join("executive_summary.md")).unwrap();
    assert!(summary.contains("EXECUTIVE SUMMARY"));
    assert!(summary.contains("- **Total Customers**: 8"));

    // Fixture customers all sit in the regular bucket with one recommended
    // item each, so the campaign ledger holds one recommendation mail per
    // customer and nothing else.
    let campaigns = fs::read_to_string(output_dir.join("campaign_results.csv")).unwrap();
    assert_eq!(campaigns.lines().count(), 9, "header plus eight recommendation mails");
}

#[test]
fn run_fails_cleanly_on_missing_input() {
    let dir = TempDir::new().unwrap();

    let result = run::run(RunArgs {
        input: dir.path().join("absent.csv"),
        config_path: None,
        output_dir: dir.path().join("out"),
        seed: None,
    });
    assert_eq!(result.exit_code, 3, "expected input failure code");

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "run");
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "input_read");
}

#[test]
fn segment_command_reports_the_distribution() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir);

    let result = segment::run(input, None, 3);
    assert_eq!(result.exit_code, 0, "expected successful segmentation: {}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "segment");
    assert_eq!(payload["customers"], 8);
    assert_eq!(payload["rows"].as_array().unwrap().len(), 3);

    let total: u64 = payload["segments"]
        .as_object()
        .unwrap()
        .values()
        .map(|count| count.as_u64().unwrap())
        .sum();
    assert_eq!(total, 8, "segment counts should cover every customer");
}

#[test]
fn segment_requires_five_customers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("small.csv");
    let mut contents = String::from("Member_number,item,Date,name,email\n");
    for member in 1000..1004 {
        contents.push_str(&format!(
            "{member},whole milk,10-03-2015,Customer {member},c{member}@example.com\n"
        ));
    }
    fs::write(&path, contents).unwrap();

    let result = segment::run(path, None, 10);
    assert_eq!(result.exit_code, 5, "expected insufficient data code");

    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "insufficient_data");
}

#[test]
fn predict_command_is_deterministic_for_a_seed() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir);

    let first = predict::run(input.clone(), None, Some(11));
    let second = predict::run(input, None, Some(11));

    assert_eq!(first.exit_code, 0, "expected successful prediction: {}", first.output);
    assert_eq!(first.output, second.output);

    let payload = parse_payload(&first.output);
    assert_eq!(payload["command"], "predict");
    assert_eq!(payload["customers"], 8);
    let best_model = payload["best_model"].as_str().unwrap();
    assert!(best_model == "random_forest" || best_model == "logistic_regression");
}

#[test]
fn recommend_command_excludes_owned_items() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pairs.csv");
    fs::write(
        &path,
        "Member_number,item,Date,name,email\n\
         1000,milk,05-01-2015,Ana,ana@example.com\n\
         1000,bread,09-01-2015,Ana,ana@example.com\n\
         1001,milk,06-01-2015,Ben,ben@example.com\n\
         1001,eggs,11-01-2015,Ben,ben@example.com\n",
    )
    .unwrap();

    let result = recommend::run(path, 1000, None, None);
    assert_eq!(result.exit_code, 0, "expected successful recommendation: {}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "recommend");
    let items: Vec<&str> = payload["recommendations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|line| line["item"].as_str().unwrap())
        .collect();
    assert_eq!(items, vec!["eggs"], "only the co-purchased item should surface");
}

#[test]
fn recommend_unknown_customer_is_an_empty_success() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir);

    let result = recommend::run(input, 9999, Some(5), None);
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["customer"], 9999);
    assert!(payload["recommendations"].as_array().unwrap().is_empty());
}
