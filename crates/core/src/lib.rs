//! Tokenholder Core - holder records, classification and upsert routing.
//!
//! This crate holds the reconciliation logic for observed token balances.
//! It is database-agnostic: persistence goes through the [`holders::HolderStore`]
//! trait, which is implemented by the `storage-sqlite` crate.

pub mod errors;
pub mod holders;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
