use crate::errors::Result;
use crate::holders::holders_model::{HolderCategory, HolderRecord};
use crate::holders::holders_service::BatchSummary;
use async_trait::async_trait;

/// Storage capability for holder balances.
///
/// Implementations issue one bulk upsert per call against the conflict target
/// of `category`: on a key conflict `balance`, `timestamp` and `info` are
/// overwritten and every other column is left as is.
#[async_trait]
pub trait HolderStore: Send + Sync {
    /// Writes one deduplicated category group. Returns the number of rows written.
    async fn upsert_holders(
        &self,
        category: HolderCategory,
        holders: &[HolderRecord],
    ) -> Result<usize>;

    /// Loads stored holders for a token, across all categories.
    fn get_token_holders(&self, token_address: &str) -> Result<Vec<HolderRecord>>;
}

/// Trait for holder reconciliation operations
#[async_trait]
pub trait HolderServiceTrait: Send + Sync {
    async fn insert_holders(&self, holders: Vec<HolderRecord>) -> Result<BatchSummary>;
    fn get_token_holders(&self, token_address: &str) -> Result<Vec<HolderRecord>>;
}
