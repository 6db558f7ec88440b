use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::transaction::CustomerId;

/// Aggregate view of one customer across their whole purchase history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: CustomerId,
    pub name: String,
    pub email: String,
    /// Number of transaction rows attributed to the customer.
    pub total_purchases: u64,
    /// Number of distinct items the customer has ever bought.
    pub unique_items: u64,
    pub first_purchase: NaiveDate,
    pub last_purchase: NaiveDate,
    /// Days between first and last purchase.
    pub tenure_days: i64,
    /// Purchases per day of tenure, denominator offset by one so a
    /// single-day history still yields a finite rate.
    pub purchase_frequency: f64,
}

/// Campaign audience a customer falls into, decided by purchase counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignBucket {
    HighValue,
    Regular,
    LowEngagement,
}

impl CampaignBucket {
    pub fn label(self) -> &'static str {
        match self {
            Self::HighValue => "high_value",
            Self::Regular => "regular",
            Self::LowEngagement => "low_engagement",
        }
    }
}
