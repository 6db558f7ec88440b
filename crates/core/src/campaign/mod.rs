//! Campaign bucketing, planning, and the planned-mail ledger.
//!
//! Nothing here sends anything. Planning stops at fully materialized
//! message payloads; transport is an external collaborator with its own
//! delivery rules.

mod templates;

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::MarketingConfig;
use crate::domain::{CampaignBucket, CustomerProfile};
use crate::prediction::CustomerForecast;

/// Discount offers expire a week out.
pub const DISCOUNT_VALID_DAYS: i64 = 7;
/// Vouchers expire a month out.
pub const VOUCHER_VALID_DAYS: i64 = 30;
/// How many ledger entries the report keeps.
const RECENT_ENTRIES: usize = 10;

const VALIDITY_DATE_FORMAT: &str = "%B %d, %Y";

/// Threshold bucketing over purchase counts.
#[derive(Clone, Copy, Debug)]
pub struct CampaignSelector {
    high_value_threshold: u64,
    low_engagement_threshold: u64,
}

impl CampaignSelector {
    pub fn new(marketing: &MarketingConfig) -> Self {
        Self {
            high_value_threshold: marketing.high_value_threshold,
            low_engagement_threshold: marketing.low_engagement_threshold,
        }
    }

    pub fn classify(&self, profile: &CustomerProfile) -> CampaignBucket {
        self.classify_count(profile.total_purchases)
    }

    pub fn classify_count(&self, total_purchases: u64) -> CampaignBucket {
        if total_purchases > self.high_value_threshold {
            CampaignBucket::HighValue
        } else if total_purchases <= self.low_engagement_threshold {
            CampaignBucket::LowEngagement
        } else {
            CampaignBucket::Regular
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CampaignKind {
    #[serde(rename = "discount")]
    Discount,
    #[serde(rename = "voucher")]
    Voucher,
    #[serde(rename = "recommendations")]
    Recommendation,
}

impl CampaignKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Discount => "discount",
            Self::Voucher => "voucher",
            Self::Recommendation => "recommendations",
        }
    }
}

/// One materialized message, ready for an external transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlannedEmail {
    pub kind: CampaignKind,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Discount batch plus how the rates split across buckets.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscountBatch {
    pub emails: Vec<PlannedEmail>,
    pub high_value: usize,
    pub regular: usize,
}

/// Builds message batches from customer forecasts.
#[derive(Clone, Debug)]
pub struct CampaignPlanner {
    marketing: MarketingConfig,
    selector: CampaignSelector,
}

impl CampaignPlanner {
    pub fn new(marketing: MarketingConfig) -> Self {
        let selector = CampaignSelector::new(&marketing);
        Self { marketing, selector }
    }

    pub fn selector(&self) -> &CampaignSelector {
        &self.selector
    }

    /// One discount mail per customer. The rate follows the customer's
    /// bucket, low engagement falling through to the regular rate. The
    /// offered product is the customer's top recommendation when one
    /// exists.
    pub fn plan_discounts(
        &self,
        customers: &[CustomerForecast],
        today: NaiveDate,
    ) -> DiscountBatch {
        let valid_until = validity(today, DISCOUNT_VALID_DAYS);
        let mut emails = Vec::with_capacity(customers.len());
        let mut high_value = 0;
        let mut regular = 0;

        for customer in customers {
            let rate = match self.selector.classify_count(customer.purchase_count) {
                CampaignBucket::HighValue => {
                    high_value += 1;
                    self.marketing.high_value_discount
                }
                _ => {
                    regular += 1;
                    self.marketing.regular_discount
                }
            };
            let percent = (rate * 100.0).round() as u32;
            let product = customer
                .product_recommendations
                .first()
                .map(|item| item.0.as_str())
                .unwrap_or("selected items");

            emails.push(PlannedEmail {
                kind: CampaignKind::Discount,
                recipient: customer.email.clone(),
                subject: format!("{percent}% OFF Special Offer - Just for You!"),
                body: templates::discount_body(&customer.name, product, percent, &valid_until),
            });
        }

        DiscountBatch { emails, high_value, regular }
    }

    pub fn plan_vouchers(
        &self,
        customers: &[CustomerForecast],
        today: NaiveDate,
    ) -> Vec<PlannedEmail> {
        let valid_until = validity(today, VOUCHER_VALID_DAYS);
        customers
            .iter()
            .map(|customer| PlannedEmail {
                kind: CampaignKind::Voucher,
                recipient: customer.email.clone(),
                subject: format!(
                    "Special ${} Voucher - We Miss You!",
                    self.marketing.voucher_amount
                ),
                body: templates::voucher_body(
                    &customer.name,
                    self.marketing.voucher_amount,
                    &valid_until,
                ),
            })
            .collect()
    }

    /// Customers without recommendations are skipped, not failed.
    pub fn plan_recommendations(&self, customers: &[CustomerForecast]) -> Vec<PlannedEmail> {
        customers
            .iter()
            .filter(|customer| !customer.product_recommendations.is_empty())
            .map(|customer| PlannedEmail {
                kind: CampaignKind::Recommendation,
                recipient: customer.email.clone(),
                subject: "Products You Might Love - Personalized Just for You!".to_string(),
                body: templates::recommendation_body(
                    &customer.name,
                    &customer.product_recommendations,
                ),
            })
            .collect()
    }
}

fn validity(today: NaiveDate, days: i64) -> String {
    (today + Duration::days(days)).format(VALIDITY_DATE_FORMAT).to_string()
}

/// Running totals over everything recorded in the ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignStats {
    pub total_planned: usize,
    pub discounts_planned: usize,
    pub vouchers_planned: usize,
    pub recommendations_planned: usize,
}

/// Ledger line for one planned message; bodies are not retained.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub kind: CampaignKind,
    pub recipient: String,
    pub subject: String,
}

/// Report payload: totals, the most recent entries, per-kind counts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CampaignReport {
    pub summary: CampaignStats,
    pub recent: Vec<LedgerEntry>,
    pub by_kind: BTreeMap<String, usize>,
}

#[derive(Clone, Debug, Default)]
pub struct CampaignLedger {
    stats: CampaignStats,
    entries: Vec<LedgerEntry>,
}

impl CampaignLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, email: &PlannedEmail) {
        self.stats.total_planned += 1;
        match email.kind {
            CampaignKind::Discount => self.stats.discounts_planned += 1,
            CampaignKind::Voucher => self.stats.vouchers_planned += 1,
            CampaignKind::Recommendation => self.stats.recommendations_planned += 1,
        }
        self.entries.push(LedgerEntry {
            kind: email.kind,
            recipient: email.recipient.clone(),
            subject: email.subject.clone(),
        });
    }

    pub fn record_all(&mut self, emails: &[PlannedEmail]) {
        for email in emails {
            self.record(email);
        }
    }

    pub fn stats(&self) -> CampaignStats {
        self.stats
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn report(&self) -> CampaignReport {
        let start = self.entries.len().saturating_sub(RECENT_ENTRIES);
        let mut by_kind = BTreeMap::new();
        for entry in &self.entries {
            *by_kind.entry(entry.kind.label().to_string()).or_insert(0) += 1;
        }

        CampaignReport {
            summary: self.stats,
            recent: self.entries[start..].to_vec(),
            by_kind,
        }
    }
}
