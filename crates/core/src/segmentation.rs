//! RFM segmentation.
//!
//! Recency, frequency, and monetary values are scored 1 to 5 by quantile
//! bucketing, concatenated into a three-digit code, and mapped to a named
//! segment. Frequency and monetary are ranked before bucketing so heavily
//! tied counts still spread across all five scores.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{CustomerId, CustomerProfile};
use crate::errors::PipelineError;

/// Quantile scoring needs at least this many customers.
pub const MIN_CUSTOMERS: usize = 5;

const SCORE_BUCKETS: usize = 5;

/// Named marketing segment derived from an RFM code.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Segment {
    Champions,
    #[serde(rename = "Loyal Customers")]
    LoyalCustomers,
    #[serde(rename = "Potential Loyalists")]
    PotentialLoyalists,
    #[serde(rename = "New Customers")]
    NewCustomers,
    #[serde(rename = "At Risk")]
    AtRisk,
    #[serde(rename = "Cannot Lose Them")]
    CannotLoseThem,
    Others,
}

impl Segment {
    pub fn label(self) -> &'static str {
        match self {
            Self::Champions => "Champions",
            Self::LoyalCustomers => "Loyal Customers",
            Self::PotentialLoyalists => "Potential Loyalists",
            Self::NewCustomers => "New Customers",
            Self::AtRisk => "At Risk",
            Self::CannotLoseThem => "Cannot Lose Them",
            Self::Others => "Others",
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Scored RFM row for one customer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfmRecord {
    pub customer_id: CustomerId,
    /// Days since the customer's last purchase, relative to the newest
    /// purchase in the dataset.
    pub recency: i64,
    /// Total purchase rows.
    pub frequency: u64,
    /// Distinct items bought, the basket-data stand-in for spend.
    pub monetary: u64,
    pub r_score: u8,
    pub f_score: u8,
    pub m_score: u8,
    pub rfm_code: String,
    pub segment: Segment,
}

#[derive(Debug, Default)]
pub struct SegmentationEngine;

impl SegmentationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Scores every customer and assigns segments.
    ///
    /// Recency is measured against the newest purchase across all profiles,
    /// so the most recent buyer always has recency zero. Output order
    /// follows ascending customer id.
    pub fn segment_customers(
        &self,
        profiles: &BTreeMap<CustomerId, CustomerProfile>,
    ) -> Result<Vec<RfmRecord>, PipelineError> {
        if profiles.len() < MIN_CUSTOMERS {
            return Err(PipelineError::InsufficientData(format!(
                "need at least {MIN_CUSTOMERS} customers for segmentation, got {}",
                profiles.len()
            )));
        }

        let as_of = match profiles.values().map(|profile| profile.last_purchase).max() {
            Some(date) => date,
            None => {
                return Err(PipelineError::InsufficientData(
                    "no purchases available for segmentation".to_string(),
                ))
            }
        };

        let recency: Vec<f64> = profiles
            .values()
            .map(|profile| (as_of - profile.last_purchase).num_days() as f64)
            .collect();
        let frequency: Vec<f64> =
            profiles.values().map(|profile| profile.total_purchases as f64).collect();
        let monetary: Vec<f64> =
            profiles.values().map(|profile| profile.unique_items as f64).collect();

        // Recency is bucketed on raw values; frequency and monetary on
        // first-seen ranks so duplicate counts never collapse a bucket.
        let recency_edges = quantile_boundaries(&recency, SCORE_BUCKETS);
        let frequency_ranks = first_seen_ranks(&frequency);
        let frequency_edges = quantile_boundaries(&frequency_ranks, SCORE_BUCKETS);
        let monetary_ranks = first_seen_ranks(&monetary);
        let monetary_edges = quantile_boundaries(&monetary_ranks, SCORE_BUCKETS);

        let records = profiles
            .values()
            .enumerate()
            .map(|(index, profile)| {
                let r_score = (SCORE_BUCKETS - bucket_index(recency[index], &recency_edges)) as u8;
                let f_score = (bucket_index(frequency_ranks[index], &frequency_edges) + 1) as u8;
                let m_score = (bucket_index(monetary_ranks[index], &monetary_edges) + 1) as u8;
                let rfm_code = format!("{r_score}{f_score}{m_score}");
                let segment = segment_for_code(&rfm_code);

                RfmRecord {
                    customer_id: profile.customer_id,
                    recency: recency[index] as i64,
                    frequency: profile.total_purchases,
                    monetary: profile.unique_items,
                    r_score,
                    f_score,
                    m_score,
                    rfm_code,
                    segment,
                }
            })
            .collect();

        Ok(records)
    }
}

/// Customers per segment, in segment declaration order.
pub fn segment_counts(records: &[RfmRecord]) -> BTreeMap<Segment, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.segment).or_insert(0) += 1;
    }
    counts
}

/// Maps a three-digit RFM code to its segment. The published code table is
/// intentionally partial; anything unlisted is `Others`.
pub fn segment_for_code(code: &str) -> Segment {
    match code {
        "555" | "554" | "544" | "545" | "454" | "455" | "445" => Segment::Champions,
        "543" | "444" | "435" | "355" | "354" | "345" | "344" | "335" => Segment::LoyalCustomers,
        "512" | "511" | "422" | "421" | "412" | "411" | "311" => Segment::PotentialLoyalists,
        "533" | "532" | "531" | "523" | "522" | "521" | "515" | "514" | "513" | "425" | "424"
        | "413" | "414" | "415" | "315" | "314" | "313" => Segment::NewCustomers,
        "155" | "154" | "144" | "214" | "215" | "115" | "114" => Segment::AtRisk,
        "255" | "254" | "245" | "244" | "253" | "252" | "243" | "242" | "235" | "234" | "225"
        | "224" | "153" | "152" | "145" | "143" | "142" | "135" | "134" | "125" | "124" => {
            Segment::CannotLoseThem
        }
        _ => Segment::Others,
    }
}

/// Dense ranks starting at 1; ties resolve towards the earlier position.
fn first_seen_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]).then(a.cmp(&b)));

    let mut ranks = vec![0.0; values.len()];
    for (rank, index) in order.into_iter().enumerate() {
        ranks[index] = (rank + 1) as f64;
    }
    ranks
}

/// Upper bucket edges at linearly interpolated quantiles. The final edge is
/// the sample maximum so `bucket_index` always finds a home.
fn quantile_boundaries(values: &[f64], buckets: usize) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();

    (1..=buckets)
        .map(|k| {
            if k == buckets {
                sorted[n - 1]
            } else {
                let pos = (n - 1) as f64 * k as f64 / buckets as f64;
                let lo = pos.floor() as usize;
                let hi = pos.ceil() as usize;
                sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
            }
        })
        .collect()
}

fn bucket_index(value: f64, edges: &[f64]) -> usize {
    edges
        .iter()
        .position(|edge| value <= *edge)
        .unwrap_or(edges.len().saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn profile(id: u64, total: u64, unique: u64, last_day: u32) -> CustomerProfile {
        let first = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
        let last = NaiveDate::from_ymd_opt(2015, 1, last_day).unwrap();
        let tenure_days = (last - first).num_days();
        CustomerProfile {
            customer_id: CustomerId(id),
            name: format!("Customer {id}"),
            email: format!("customer{id}@example.com"),
            total_purchases: total,
            unique_items: unique,
            first_purchase: first,
            last_purchase: last,
            tenure_days,
            purchase_frequency: total as f64 / (tenure_days + 1) as f64,
        }
    }

    fn profile_map(profiles: Vec<CustomerProfile>) -> BTreeMap<CustomerId, CustomerProfile> {
        profiles.into_iter().map(|profile| (profile.customer_id, profile)).collect()
    }

    #[test]
    fn distinct_values_fill_buckets_evenly() {
        let profiles = profile_map(
            (1..=10).map(|id| profile(id, id, id, id as u32)).collect(),
        );

        let records = SegmentationEngine::new().segment_customers(&profiles).unwrap();
        assert_eq!(records.len(), 10);

        for score in 1..=5u8 {
            assert_eq!(records.iter().filter(|r| r.r_score == score).count(), 2);
            assert_eq!(records.iter().filter(|r| r.f_score == score).count(), 2);
            assert_eq!(records.iter().filter(|r| r.m_score == score).count(), 2);
        }

        // Latest buyer with the richest history scores 555.
        let best = records.iter().find(|r| r.customer_id == CustomerId(10)).unwrap();
        assert_eq!(best.recency, 0);
        assert_eq!(best.rfm_code, "555");
        assert_eq!(best.segment, Segment::Champions);

        // Oldest, thinnest history scores 111.
        let worst = records.iter().find(|r| r.customer_id == CustomerId(1)).unwrap();
        assert_eq!(worst.recency, 9);
        assert_eq!(worst.rfm_code, "111");
        assert_eq!(worst.segment, Segment::Others);
    }

    #[test]
    fn tied_counts_still_spread_across_scores() {
        let profiles = profile_map(
            (1..=7).map(|id| profile(id, 4, 4, id as u32)).collect(),
        );

        let records = SegmentationEngine::new().segment_customers(&profiles).unwrap();
        let f_scores: Vec<u8> = records.iter().map(|r| r.f_score).collect();
        assert_eq!(f_scores, vec![1, 1, 2, 3, 4, 5, 5]);

        let m_scores: Vec<u8> = records.iter().map(|r| r.m_score).collect();
        assert_eq!(m_scores, vec![1, 1, 2, 3, 4, 5, 5]);
    }

    #[test]
    fn known_codes_map_to_their_segments() {
        assert_eq!(segment_for_code("555"), Segment::Champions);
        assert_eq!(segment_for_code("543"), Segment::LoyalCustomers);
        assert_eq!(segment_for_code("311"), Segment::PotentialLoyalists);
        assert_eq!(segment_for_code("533"), Segment::NewCustomers);
        assert_eq!(segment_for_code("155"), Segment::AtRisk);
        assert_eq!(segment_for_code("124"), Segment::CannotLoseThem);
        assert_eq!(segment_for_code("111"), Segment::Others);
        assert_eq!(segment_for_code("222"), Segment::Others);
    }

    #[test]
    fn too_few_customers_is_insufficient_data() {
        let profiles = profile_map((1..=4).map(|id| profile(id, id, id, id as u32)).collect());

        let error = SegmentationEngine::new().segment_customers(&profiles).unwrap_err();
        assert_eq!(error.class(), "insufficient_data");
    }

    #[test]
    fn segmentation_is_deterministic() {
        let profiles = profile_map(
            (1..=12).map(|id| profile(id, (id * 7) % 5 + 1, id % 4 + 1, id as u32)).collect(),
        );

        let engine = SegmentationEngine::new();
        let first = engine.segment_customers(&profiles).unwrap();
        let second = engine.segment_customers(&profiles).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn counts_cover_every_customer_once() {
        let profiles = profile_map(
            (1..=10).map(|id| profile(id, id, id, id as u32)).collect(),
        );
        let records = SegmentationEngine::new().segment_customers(&profiles).unwrap();

        let counts = segment_counts(&records);
        assert_eq!(counts.values().sum::<usize>(), records.len());
    }
}
