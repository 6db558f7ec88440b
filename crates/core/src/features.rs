//! Feature engineering over raw purchase rows.
//!
//! The [`FeatureEngineer`] owns the load-then-engineer state machine: rows
//! are loaded as strings, dates are validated in one pass, and every row is
//! then joined with calendar features and per-customer aggregates. All
//! downstream stages (segmentation, prediction, recommendation) consume the
//! output of this module rather than raw rows.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::{CustomerId, CustomerProfile, ItemId, RawTransaction, Season, TransactionRecord};
use crate::errors::PipelineError;

/// Input date layout, day first.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

const TOP_LIST_LEN: usize = 10;

/// One purchase row with every derived feature attached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineeredRecord {
    pub customer_id: CustomerId,
    pub item_id: ItemId,
    pub date: NaiveDate,
    pub customer_name: String,
    pub customer_email: String,
    pub day_of_month: u32,
    pub month: u32,
    pub year: i32,
    /// 0 is Monday, 6 is Sunday.
    pub day_of_week: u32,
    pub day_of_year: u32,
    pub is_weekend: bool,
    pub season: Season,
    pub total_purchases: u64,
    pub unique_items: u64,
    pub tenure_days: i64,
    pub purchase_frequency: f64,
    /// How often the item appears across the whole dataset.
    pub item_frequency: u64,
    /// How often this customer bought this item.
    pub customer_item_count: u64,
}

/// Dataset overview used by reports and the data stage log line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataSummary {
    pub total_records: u64,
    pub unique_customers: u64,
    pub unique_items: u64,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    /// Most purchased items, count descending, capped at ten.
    pub top_items: Vec<(ItemId, u64)>,
    /// Most active customers, count descending, capped at ten.
    pub top_customers: Vec<(CustomerId, u64)>,
}

/// Load-then-engineer pipeline stage.
#[derive(Debug, Default)]
pub struct FeatureEngineer {
    raw: Vec<RawTransaction>,
    loaded: bool,
    engineered: bool,
    records: Vec<EngineeredRecord>,
    profiles: BTreeMap<CustomerId, CustomerProfile>,
    max_date: Option<NaiveDate>,
}

struct ProfileDraft {
    name: String,
    email: String,
    total: u64,
    items: BTreeSet<ItemId>,
    first: NaiveDate,
    last: NaiveDate,
}

impl FeatureEngineer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any previously loaded data and resets engineered output.
    pub fn load_records(&mut self, raw: Vec<RawTransaction>) {
        self.raw = raw;
        self.loaded = true;
        self.engineered = false;
        self.records.clear();
        self.profiles.clear();
        self.max_date = None;
    }

    /// Validates dates and derives all row and customer level features.
    ///
    /// The whole input is parsed before any aggregation so a malformed date
    /// anywhere in the file fails the run instead of skewing aggregates.
    pub fn engineer_features(&mut self) -> Result<&[EngineeredRecord], PipelineError> {
        if !self.loaded {
            return Err(PipelineError::State(
                "no records loaded; call load_records first".to_string(),
            ));
        }

        let parsed = parse_rows(&self.raw)?;

        let mut item_totals: HashMap<ItemId, u64> = HashMap::new();
        let mut pair_counts: HashMap<(CustomerId, ItemId), u64> = HashMap::new();
        let mut drafts: BTreeMap<CustomerId, ProfileDraft> = BTreeMap::new();

        for record in &parsed {
            *item_totals.entry(record.item_id.clone()).or_insert(0) += 1;
            *pair_counts
                .entry((record.customer_id, record.item_id.clone()))
                .or_insert(0) += 1;

            let draft = drafts.entry(record.customer_id).or_insert_with(|| ProfileDraft {
                name: record.customer_name.clone(),
                email: record.customer_email.clone(),
                total: 0,
                items: BTreeSet::new(),
                first: record.date,
                last: record.date,
            });
            draft.total += 1;
            draft.items.insert(record.item_id.clone());
            if record.date < draft.first {
                draft.first = record.date;
            }
            if record.date > draft.last {
                draft.last = record.date;
            }
        }

        self.profiles = drafts
            .into_iter()
            .map(|(customer_id, draft)| {
                let tenure_days = (draft.last - draft.first).num_days();
                let profile = CustomerProfile {
                    customer_id,
                    name: draft.name,
                    email: draft.email,
                    total_purchases: draft.total,
                    unique_items: draft.items.len() as u64,
                    first_purchase: draft.first,
                    last_purchase: draft.last,
                    tenure_days,
                    purchase_frequency: draft.total as f64 / (tenure_days + 1) as f64,
                };
                (customer_id, profile)
            })
            .collect();

        self.max_date = parsed.iter().map(|record| record.date).max();
        self.records = parsed
            .into_iter()
            .map(|record| {
                let profile = &self.profiles[&record.customer_id];
                let item_frequency = item_totals[&record.item_id];
                let customer_item_count =
                    pair_counts[&(record.customer_id, record.item_id.clone())];
                let day_of_week = record.date.weekday().num_days_from_monday();

                EngineeredRecord {
                    day_of_month: record.date.day(),
                    month: record.date.month(),
                    year: record.date.year(),
                    day_of_week,
                    day_of_year: record.date.ordinal(),
                    is_weekend: day_of_week >= 5,
                    season: Season::from_date(record.date),
                    total_purchases: profile.total_purchases,
                    unique_items: profile.unique_items,
                    tenure_days: profile.tenure_days,
                    purchase_frequency: profile.purchase_frequency,
                    item_frequency,
                    customer_item_count,
                    customer_id: record.customer_id,
                    item_id: record.item_id,
                    date: record.date,
                    customer_name: record.customer_name,
                    customer_email: record.customer_email,
                }
            })
            .collect();
        self.engineered = true;

        Ok(&self.records)
    }

    pub fn records(&self) -> &[EngineeredRecord] {
        &self.records
    }

    pub fn profiles(&self) -> &BTreeMap<CustomerId, CustomerProfile> {
        &self.profiles
    }

    /// Most recent purchase date across the dataset, if any rows exist.
    pub fn max_date(&self) -> Option<NaiveDate> {
        self.max_date
    }

    pub fn summary(&self) -> Result<DataSummary, PipelineError> {
        if !self.engineered {
            return Err(PipelineError::State(
                "features have not been engineered yet".to_string(),
            ));
        }

        let (first_date, last_date) = match (
            self.records.iter().map(|record| record.date).min(),
            self.max_date,
        ) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(PipelineError::InsufficientData(
                    "no transactions available to summarize".to_string(),
                ))
            }
        };

        let mut item_counts: BTreeMap<&ItemId, u64> = BTreeMap::new();
        let mut customer_counts: BTreeMap<CustomerId, u64> = BTreeMap::new();
        for record in &self.records {
            *item_counts.entry(&record.item_id).or_insert(0) += 1;
            *customer_counts.entry(record.customer_id).or_insert(0) += 1;
        }

        let unique_items = item_counts.len() as u64;
        let mut top_items: Vec<(ItemId, u64)> =
            item_counts.into_iter().map(|(item, count)| (item.clone(), count)).collect();
        top_items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_items.truncate(TOP_LIST_LEN);

        let mut top_customers: Vec<(CustomerId, u64)> = customer_counts.into_iter().collect();
        top_customers.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_customers.truncate(TOP_LIST_LEN);

        Ok(DataSummary {
            total_records: self.records.len() as u64,
            unique_customers: self.profiles.len() as u64,
            unique_items,
            first_date,
            last_date,
            top_items,
            top_customers,
        })
    }
}

fn parse_rows(raw: &[RawTransaction]) -> Result<Vec<TransactionRecord>, PipelineError> {
    let mut parsed = Vec::with_capacity(raw.len());

    for (index, row) in raw.iter().enumerate() {
        let date = NaiveDate::parse_from_str(row.date.trim(), DATE_FORMAT).map_err(|_| {
            PipelineError::DataFormat(format!(
                "row {index}: unparseable date `{}` (expected {DATE_FORMAT})",
                row.date
            ))
        })?;

        parsed.push(TransactionRecord {
            customer_id: CustomerId(row.member_number),
            item_id: ItemId(row.item.clone()),
            date,
            customer_name: row.name.clone(),
            customer_email: row.email.clone(),
        });
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_tx(member: u64, item: &str, date: &str) -> RawTransaction {
        RawTransaction {
            member_number: member,
            item: item.to_string(),
            date: date.to_string(),
            name: format!("Customer {member}"),
            email: format!("customer{member}@example.com"),
        }
    }

    #[test]
    fn engineering_before_loading_is_a_state_error() {
        let mut engineer = FeatureEngineer::new();
        let error = engineer.engineer_features().unwrap_err();
        assert_eq!(error.class(), "state");
    }

    #[test]
    fn malformed_date_is_a_data_format_error() {
        let mut engineer = FeatureEngineer::new();
        engineer.load_records(vec![
            raw_tx(1000, "whole milk", "15-03-2015"),
            raw_tx(1001, "rolls/buns", "2015-03-15"),
        ]);

        let error = engineer.engineer_features().unwrap_err();
        assert_eq!(error.class(), "data_format");
        assert!(error.to_string().contains("2015-03-15"));
    }

    #[test]
    fn calendar_features_match_known_dates() {
        let mut engineer = FeatureEngineer::new();
        // 15-03-2015 was a Sunday, 02-01-2015 a Friday.
        engineer.load_records(vec![
            raw_tx(1000, "whole milk", "15-03-2015"),
            raw_tx(1000, "rolls/buns", "02-01-2015"),
        ]);

        let records = engineer.engineer_features().unwrap().to_vec();

        let sunday = &records[0];
        assert_eq!(sunday.day_of_month, 15);
        assert_eq!(sunday.month, 3);
        assert_eq!(sunday.year, 2015);
        assert_eq!(sunday.day_of_week, 6);
        assert!(sunday.is_weekend);
        assert_eq!(sunday.day_of_year, 74);
        assert_eq!(sunday.season, Season::Spring);

        let friday = &records[1];
        assert_eq!(friday.day_of_week, 4);
        assert!(!friday.is_weekend);
        assert_eq!(friday.day_of_year, 2);
        assert_eq!(friday.season, Season::Winter);
    }

    #[test]
    fn profiles_aggregate_counts_dates_and_frequency() {
        let mut engineer = FeatureEngineer::new();
        engineer.load_records(vec![
            raw_tx(1000, "whole milk", "05-01-2015"),
            raw_tx(1000, "whole milk", "15-01-2015"),
            raw_tx(1000, "yogurt", "10-01-2015"),
            raw_tx(2000, "rolls/buns", "01-02-2015"),
        ]);
        engineer.engineer_features().unwrap();

        let profile = &engineer.profiles()[&CustomerId(1000)];
        assert_eq!(profile.total_purchases, 3);
        assert_eq!(profile.unique_items, 2);
        assert_eq!(profile.first_purchase, NaiveDate::from_ymd_opt(2015, 1, 5).unwrap());
        assert_eq!(profile.last_purchase, NaiveDate::from_ymd_opt(2015, 1, 15).unwrap());
        assert_eq!(profile.tenure_days, 10);
        assert!((profile.purchase_frequency - 3.0 / 11.0).abs() < 1e-12);

        // Name and email come from the first row seen for the customer.
        assert_eq!(profile.name, "Customer 1000");
        assert_eq!(profile.email, "customer1000@example.com");

        assert_eq!(engineer.max_date(), NaiveDate::from_ymd_opt(2015, 2, 1));
    }

    #[test]
    fn item_and_pair_frequencies_count_across_the_dataset() {
        let mut engineer = FeatureEngineer::new();
        engineer.load_records(vec![
            raw_tx(1000, "whole milk", "05-01-2015"),
            raw_tx(1000, "whole milk", "06-01-2015"),
            raw_tx(2000, "whole milk", "07-01-2015"),
            raw_tx(2000, "yogurt", "08-01-2015"),
        ]);

        let records = engineer.engineer_features().unwrap();

        assert_eq!(records[0].item_frequency, 3);
        assert_eq!(records[0].customer_item_count, 2);
        assert_eq!(records[2].item_frequency, 3);
        assert_eq!(records[2].customer_item_count, 1);
        assert_eq!(records[3].item_frequency, 1);
        assert_eq!(records[3].customer_item_count, 1);
    }

    #[test]
    fn summary_ranks_top_lists_by_count_then_id() {
        let mut engineer = FeatureEngineer::new();
        engineer.load_records(vec![
            raw_tx(1000, "yogurt", "05-01-2015"),
            raw_tx(1000, "yogurt", "06-01-2015"),
            raw_tx(2000, "whole milk", "07-01-2015"),
            raw_tx(2000, "rolls/buns", "08-01-2015"),
            raw_tx(3000, "rolls/buns", "09-01-2015"),
        ]);
        engineer.engineer_features().unwrap();

        let summary = engineer.summary().unwrap();
        assert_eq!(summary.total_records, 5);
        assert_eq!(summary.unique_customers, 3);
        assert_eq!(summary.unique_items, 3);
        assert_eq!(summary.first_date, NaiveDate::from_ymd_opt(2015, 1, 5).unwrap());
        assert_eq!(summary.last_date, NaiveDate::from_ymd_opt(2015, 1, 9).unwrap());

        // Ties resolve towards the lexicographically smaller item.
        let items: Vec<&str> =
            summary.top_items.iter().map(|(item, _)| item.0.as_str()).collect();
        assert_eq!(items, vec!["rolls/buns", "yogurt", "whole milk"]);

        let customers: Vec<u64> =
            summary.top_customers.iter().map(|(customer, _)| customer.0).collect();
        assert_eq!(customers, vec![1000, 2000, 3000]);
    }

    #[test]
    fn overlapping_histories_count_distinct_items_once() {
        let mut engineer = FeatureEngineer::new();
        engineer.load_records(vec![
            raw_tx(1000, "milk", "05-01-2015"),
            raw_tx(1000, "bread", "06-01-2015"),
            raw_tx(1001, "milk", "07-01-2015"),
            raw_tx(1001, "eggs", "08-01-2015"),
        ]);
        engineer.engineer_features().unwrap();

        let summary = engineer.summary().unwrap();
        assert_eq!(summary.total_records, 4);
        assert_eq!(summary.unique_customers, 2);
        assert_eq!(summary.unique_items, 3);
    }

    #[test]
    fn summary_requires_engineered_non_empty_data() {
        let mut engineer = FeatureEngineer::new();
        assert_eq!(engineer.summary().unwrap_err().class(), "state");

        engineer.load_records(Vec::new());
        let records = engineer.engineer_features().unwrap();
        assert!(records.is_empty());
        assert_eq!(engineer.summary().unwrap_err().class(), "insufficient_data");
    }

    #[test]
    fn reloading_resets_previous_output() {
        let mut engineer = FeatureEngineer::new();
        engineer.load_records(vec![raw_tx(1000, "whole milk", "05-01-2015")]);
        engineer.engineer_features().unwrap();
        assert_eq!(engineer.records().len(), 1);

        engineer.load_records(vec![
            raw_tx(2000, "yogurt", "06-01-2015"),
            raw_tx(2000, "yogurt", "07-01-2015"),
        ]);
        assert!(engineer.records().is_empty());

        let records = engineer.engineer_features().unwrap();
        assert_eq!(records.len(), 2);
        assert!(engineer.profiles().get(&CustomerId(1000)).is_none());
    }
}
