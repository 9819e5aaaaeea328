use async_trait::async_trait;
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::holders_classifier::{classify_holders, DedupPolicy};
use super::holders_model::{HolderCategory, HolderRecord};
use super::holders_traits::{HolderServiceTrait, HolderStore};
use crate::errors::{Error, Result};

/// Outcome of a fully written batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Rows sent to storage per category. Empty categories are absent.
    pub written: BTreeMap<HolderCategory, usize>,
    /// Records that matched no category.
    pub skipped: usize,
}

impl BatchSummary {
    pub fn written_for(&self, category: HolderCategory) -> usize {
        self.written.get(&category).copied().unwrap_or(0)
    }

    pub fn total_written(&self) -> usize {
        self.written.values().sum()
    }
}

/// Routes classified holder groups to the store, one bulk upsert per category.
pub struct HolderService {
    holder_store: Arc<dyn HolderStore>,
    dedup_policy: DedupPolicy,
}

impl HolderService {
    pub fn new(holder_store: Arc<dyn HolderStore>, dedup_policy: DedupPolicy) -> Self {
        Self {
            holder_store,
            dedup_policy,
        }
    }

    pub fn dedup_policy(&self) -> DedupPolicy {
        self.dedup_policy
    }
}

#[async_trait]
impl HolderServiceTrait for HolderService {
    /// Classifies `holders` and writes each non-empty category in
    /// [`HolderCategory::WRITE_ORDER`]. Stops at the first failing category;
    /// earlier categories remain committed.
    async fn insert_holders(&self, holders: Vec<HolderRecord>) -> Result<BatchSummary> {
        let received = holders.len();
        let classified = classify_holders(holders, self.dedup_policy);
        debug!(
            "Classified {} holder records into {} rows ({} skipped)",
            received,
            classified.len(),
            classified.skipped()
        );

        let mut summary = BatchSummary {
            skipped: classified.skipped(),
            ..Default::default()
        };

        for category in HolderCategory::WRITE_ORDER {
            let group = classified.group(category);
            if group.is_empty() {
                continue;
            }

            info!("Inserting {} holders", category);
            self.holder_store
                .upsert_holders(category, group)
                .await
                .map_err(|source| Error::HolderWrite {
                    category,
                    source: Box::new(source),
                })?;
            summary.written.insert(category, group.len());
        }

        Ok(summary)
    }

    fn get_token_holders(&self, token_address: &str) -> Result<Vec<HolderRecord>> {
        self.holder_store.get_token_holders(token_address)
    }
}
