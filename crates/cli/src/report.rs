//! Renders the executive summary written alongside the CSV exports.

use std::collections::BTreeMap;

use cartwise_core::campaign::CampaignReport;
use cartwise_core::features::DataSummary;
use cartwise_core::prediction::PredictionReport;
use cartwise_core::segmentation::Segment;
use chrono::NaiveDate;

const TOP_ITEM_LINES: usize = 5;

pub(crate) fn executive_summary(
    data: &DataSummary,
    segments: &BTreeMap<Segment, usize>,
    predictions: &PredictionReport,
    campaigns: &CampaignReport,
    generated_on: NaiveDate,
) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("# EXECUTIVE SUMMARY - Customer Behavior Analysis & Marketing Performance".into());
    lines.push(String::new());

    lines.push("## Key Business Metrics".into());
    lines.push(format!("- **Total Customers**: {}", data.unique_customers));
    lines.push(format!("- **Total Purchases**: {}", data.total_records));
    let per_customer = if data.unique_customers == 0 {
        0.0
    } else {
        data.total_records as f64 / data.unique_customers as f64
    };
    lines.push(format!("- **Average Purchases per Customer**: {per_customer:.2}"));
    lines.push(format!("- **Unique Items**: {}", data.unique_items));
    lines.push(format!("- **Date Range**: {} to {}", data.first_date, data.last_date));
    lines.push(String::new());

    lines.push("## Customer Segmentation Insights".into());
    let mut ranked: Vec<(&Segment, &usize)> = segments.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (segment, count) in ranked {
        lines.push(format!("- **{}**: {count} customers", segment.label()));
    }
    lines.push(String::new());

    lines.push("## Predictive Model Performance".into());
    lines.push(format!("- **Best Model**: {}", predictions.model_performance.best_model));
    lines.push(format!(
        "- **Holdout Accuracy**: {:.1}%",
        predictions.model_performance.accuracy * 100.0
    ));
    lines.push(format!(
        "- **High Confidence Predictions**: {} customers",
        predictions.high_confidence_customers.len()
    ));
    if let Some((day, count)) =
        predictions.day_predictions.iter().max_by_key(|(day, count)| (**count, 31 - **day))
    {
        lines.push(format!("- **Most Predicted Purchase Day**: {day} ({count} customers)"));
    }
    lines.push(String::new());

    lines.push("## Marketing Campaign Results".into());
    lines.push(format!("- **Total Emails Planned**: {}", campaigns.summary.total_planned));
    lines.push(format!("- **Discount Campaigns**: {}", campaigns.summary.discounts_planned));
    lines.push(format!("- **Voucher Campaigns**: {}", campaigns.summary.vouchers_planned));
    lines.push(format!(
        "- **Recommendation Campaigns**: {}",
        campaigns.summary.recommendations_planned
    ));
    lines.push(String::new());

    lines.push("## Top 5 Most Popular Items".into());
    for (rank, (item, count)) in data.top_items.iter().take(TOP_ITEM_LINES).enumerate() {
        lines.push(format!("{}. {item} ({count} purchases)", rank + 1));
    }
    lines.push(String::new());

    lines.push("---".into());
    lines.push(format!("Report Generated: {generated_on}"));
    lines.push(String::new());

    lines.join("\n")
}
