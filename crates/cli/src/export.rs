//! CSV exports for the pipeline outputs.

use std::path::{Path, PathBuf};

use cartwise_core::campaign::LedgerEntry;
use cartwise_core::prediction::CustomerForecast;
use cartwise_core::segmentation::RfmRecord;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not create output directory `{path}`: {source}")]
    CreateDir { path: PathBuf, source: std::io::Error },
    #[error("could not write `{path}`: {source}")]
    Write { path: PathBuf, source: csv::Error },
}

pub fn ensure_output_dir(path: &Path) -> Result<(), ExportError> {
    std::fs::create_dir_all(path)
        .map_err(|source| ExportError::CreateDir { path: path.to_path_buf(), source })
}

/// Column names mirror the segmentation table consumed by downstream
/// marketing tooling.
#[derive(Serialize)]
struct SegmentationRow<'a> {
    #[serde(rename = "Member_number")]
    member_number: u64,
    #[serde(rename = "Recency")]
    recency: i64,
    #[serde(rename = "Frequency")]
    frequency: u64,
    #[serde(rename = "Monetary")]
    monetary: u64,
    #[serde(rename = "R_Score")]
    r_score: u8,
    #[serde(rename = "F_Score")]
    f_score: u8,
    #[serde(rename = "M_Score")]
    m_score: u8,
    #[serde(rename = "RFM_Score")]
    rfm_code: &'a str,
    #[serde(rename = "Segment")]
    segment: &'a str,
}

pub fn write_segmentation_csv(path: &Path, rows: &[RfmRecord]) -> Result<(), ExportError> {
    let wrap = |source| ExportError::Write { path: path.to_path_buf(), source };
    let mut writer = csv::Writer::from_path(path).map_err(wrap)?;
    for row in rows {
        writer
            .serialize(SegmentationRow {
                member_number: row.customer_id.0,
                recency: row.recency,
                frequency: row.frequency,
                monetary: row.monetary,
                r_score: row.r_score,
                f_score: row.f_score,
                m_score: row.m_score,
                rfm_code: &row.rfm_code,
                segment: row.segment.label(),
            })
            .map_err(wrap)?;
    }
    writer.flush().map_err(|source| wrap(csv::Error::from(source)))
}

#[derive(Serialize)]
struct PredictionRow<'a> {
    #[serde(rename = "Member_number")]
    member_number: u64,
    name: &'a str,
    email: &'a str,
    purchase_count: u64,
    predicted_day: u8,
    prediction_confidence: f64,
    product_recommendations: String,
}

pub fn write_predictions_csv(path: &Path, rows: &[CustomerForecast]) -> Result<(), ExportError> {
    let wrap = |source| ExportError::Write { path: path.to_path_buf(), source };
    let mut writer = csv::Writer::from_path(path).map_err(wrap)?;
    for row in rows {
        let recommendations = row
            .product_recommendations
            .iter()
            .map(|item| item.0.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        writer
            .serialize(PredictionRow {
                member_number: row.customer_id.0,
                name: &row.name,
                email: &row.email,
                purchase_count: row.purchase_count,
                predicted_day: row.predicted_day,
                prediction_confidence: row.prediction_confidence,
                product_recommendations: recommendations,
            })
            .map_err(wrap)?;
    }
    writer.flush().map_err(|source| wrap(csv::Error::from(source)))
}

#[derive(Serialize)]
struct CampaignRow<'a> {
    campaign: &'a str,
    recipient: &'a str,
    subject: &'a str,
}

pub fn write_campaign_csv(path: &Path, entries: &[LedgerEntry]) -> Result<(), ExportError> {
    let wrap = |source| ExportError::Write { path: path.to_path_buf(), source };
    let mut writer = csv::Writer::from_path(path).map_err(wrap)?;
    for entry in entries {
        writer
            .serialize(CampaignRow {
                campaign: entry.kind.label(),
                recipient: &entry.recipient,
                subject: &entry.subject,
            })
            .map_err(wrap)?;
    }
    writer.flush().map_err(|source| wrap(csv::Error::from(source)))
}
