//! Database models for token holders.

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;

use crate::errors::StorageError;
use tokenholder_core::holders::{HolderCategory, HolderKind, HolderRecord};

/// Columns written by every holder upsert, in bind order.
pub const INSERT_COLUMNS: [&str; 8] = [
    "signer",
    "evm_address",
    "holder_type",
    "token_address",
    "nft_id",
    "balance",
    "info",
    "timestamp",
];

/// Columns overwritten when a row hits its category's conflict target.
pub const UPDATE_COLUMNS: [&str; 3] = ["balance", "timestamp", "info"];

/// Unique columns plus partial-index predicate identifying a category's rows.
///
/// Each target mirrors one partial unique index of the `token_holder` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictTarget {
    pub columns: &'static [&'static str],
    pub predicate: &'static str,
}

impl ConflictTarget {
    pub fn for_category(category: HolderCategory) -> Self {
        match category {
            HolderCategory::AccountToken => ConflictTarget {
                columns: &["signer", "token_address"],
                predicate: "evm_address IS NULL AND nft_id IS NULL",
            },
            HolderCategory::ContractToken => ConflictTarget {
                columns: &["evm_address", "token_address"],
                predicate: "signer IS NULL AND nft_id IS NULL",
            },
            HolderCategory::AccountNft => ConflictTarget {
                columns: &["signer", "token_address", "nft_id"],
                predicate: "evm_address IS NULL AND nft_id IS NOT NULL",
            },
            HolderCategory::ContractNft => ConflictTarget {
                columns: &["evm_address", "token_address", "nft_id"],
                predicate: "signer IS NULL AND nft_id IS NOT NULL",
            },
        }
    }

    /// Renders `ON CONFLICT (...) WHERE ... DO UPDATE SET ...`.
    pub fn on_conflict_clause(&self) -> String {
        let updates = UPDATE_COLUMNS
            .iter()
            .map(|column| format!("{column} = excluded.{column}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "ON CONFLICT ({}) WHERE {} DO UPDATE SET {}",
            self.columns.join(", "),
            self.predicate,
            updates
        )
    }
}

/// Row as stored in `token_holder`.
#[derive(Queryable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::token_holder)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TokenHolderDB {
    pub id: i64,
    pub signer: Option<String>,
    pub evm_address: Option<String>,
    pub holder_type: String,
    pub token_address: String,
    pub nft_id: Option<String>,
    pub balance: String,
    pub info: String,
    pub timestamp: String,
}

/// Row about to be upserted. Values are bound in [`INSERT_COLUMNS`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTokenHolderDB {
    pub signer: Option<String>,
    pub evm_address: Option<String>,
    pub holder_type: String,
    pub token_address: String,
    pub nft_id: Option<String>,
    pub balance: String,
    pub info: String,
    pub timestamp: String,
}

impl TryFrom<&HolderRecord> for NewTokenHolderDB {
    type Error = StorageError;

    fn try_from(record: &HolderRecord) -> Result<Self, Self::Error> {
        // Only the identity that matches the kind is stored; the other stays NULL
        // so the row falls inside exactly one partial index.
        let identity = record.holder_identity().map(str::to_string);
        let (signer, evm_address) = match record.kind {
            HolderKind::Account => (identity, None),
            HolderKind::Contract => (None, identity),
        };

        Ok(Self {
            signer,
            evm_address,
            holder_type: record.kind.as_str().to_string(),
            token_address: record.token_address.clone(),
            nft_id: record.nft_id.clone(),
            balance: record.balance.to_string(),
            info: serde_json::to_string(&record.info)?,
            timestamp: format_timestamp(&record.timestamp),
        })
    }
}

impl TryFrom<TokenHolderDB> for HolderRecord {
    type Error = StorageError;

    fn try_from(db: TokenHolderDB) -> Result<Self, Self::Error> {
        let kind: HolderKind = db
            .holder_type
            .parse()
            .map_err(|e| invalid_row(db.id, e))?;
        let balance = db.balance.parse().map_err(|e| invalid_row(db.id, e))?;
        let info = serde_json::from_str(&db.info).map_err(|e| invalid_row(db.id, e))?;
        let timestamp = DateTime::parse_from_rfc3339(&db.timestamp)
            .map_err(|e| invalid_row(db.id, e))?
            .with_timezone(&Utc);

        Ok(HolderRecord {
            signer_address: db.signer,
            evm_address: db.evm_address,
            kind,
            token_address: db.token_address,
            nft_id: db.nft_id,
            balance,
            info,
            timestamp,
        })
    }
}

/// Fixed-width RFC 3339 with nanoseconds, so stored values round-trip exactly
/// and sort as text.
pub(crate) fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn invalid_row(id: i64, err: impl std::fmt::Display) -> StorageError {
    StorageError::InvalidRow(format!("token_holder row {}: {}", id, err))
}
