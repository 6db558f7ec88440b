//! Reads raw transaction exports into domain records.

use std::path::{Path, PathBuf};

use cartwise_core::domain::RawTransaction;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not open transactions file `{path}`: {source}")]
    Open { path: PathBuf, source: csv::Error },
    #[error("malformed row in `{path}`: {source}")]
    Parse { path: PathBuf, source: csv::Error },
}

impl LoadError {
    pub fn class(&self) -> &'static str {
        match self {
            LoadError::Open { .. } => "input_read",
            LoadError::Parse { .. } => "input_parse",
        }
    }
}

/// One row of the point-of-sale export. Column names follow the upstream
/// system; extra columns are ignored.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Member_number")]
    member_number: u64,
    item: String,
    #[serde(rename = "Date")]
    date: String,
    name: String,
    email: String,
}

pub fn load_transactions(path: &Path) -> Result<Vec<RawTransaction>, LoadError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|source| LoadError::Open { path: path.to_path_buf(), source })?;

    let mut transactions = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        let row = row.map_err(|source| LoadError::Parse { path: path.to_path_buf(), source })?;
        transactions.push(RawTransaction {
            member_number: row.member_number,
            item: row.item,
            date: row.date,
            name: row.name,
            email: row.email,
        });
    }
    Ok(transactions)
}
