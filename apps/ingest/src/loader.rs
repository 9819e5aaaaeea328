//! Reads crawler output files into holder batches.
//!
//! A file is either a JSON array of records or newline-delimited JSON.

use std::path::Path;

use tokenholder_core::errors::ValidationError;
use tokenholder_core::holders::HolderRecord;
use tokenholder_core::{Error, Result};

pub fn load_holders(path: &Path) -> Result<Vec<HolderRecord>> {
    let contents = std::fs::read_to_string(path)?;
    parse_holders(&contents)
}

pub fn parse_holders(contents: &str) -> Result<Vec<HolderRecord>> {
    let trimmed = contents.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<HolderRecord>(line).map_err(|e| {
                Error::from(ValidationError::InvalidInput(format!(
                    "line {}: {}",
                    index + 1,
                    e
                )))
            })
        })
        .collect()
}
