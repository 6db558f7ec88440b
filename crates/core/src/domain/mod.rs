//! Core domain types shared across pipeline stages.

mod customer;
mod transaction;

pub use customer::{CampaignBucket, CustomerProfile};
pub use transaction::{CustomerId, ItemId, RawTransaction, Season, TransactionRecord};
