//! Partitions a batch of holder records into categories and collapses duplicate keys.

use log::warn;
use std::collections::HashMap;

use super::holders_model::{HolderCategory, HolderKey, HolderRecord};
use crate::errors::ValidationError;

/// Which record survives when several share a category key within one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// The first record in input order wins.
    #[default]
    FirstSeen,
    /// The last record in input order wins.
    LastSeen,
}

impl std::str::FromStr for DedupPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first_seen" => Ok(DedupPolicy::FirstSeen),
            "last" | "last_seen" => Ok(DedupPolicy::LastSeen),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown dedup policy '{}'",
                other
            ))),
        }
    }
}

/// A batch split into the four categories, each free of duplicate keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedHolders {
    pub account_tokens: Vec<HolderRecord>,
    pub contract_tokens: Vec<HolderRecord>,
    pub account_nfts: Vec<HolderRecord>,
    pub contract_nfts: Vec<HolderRecord>,
    skipped: usize,
}

impl ClassifiedHolders {
    pub fn group(&self, category: HolderCategory) -> &[HolderRecord] {
        match category {
            HolderCategory::AccountToken => &self.account_tokens,
            HolderCategory::ContractToken => &self.contract_tokens,
            HolderCategory::AccountNft => &self.account_nfts,
            HolderCategory::ContractNft => &self.contract_nfts,
        }
    }

    fn group_mut(&mut self, category: HolderCategory) -> &mut Vec<HolderRecord> {
        match category {
            HolderCategory::AccountToken => &mut self.account_tokens,
            HolderCategory::ContractToken => &mut self.contract_tokens,
            HolderCategory::AccountNft => &mut self.account_nfts,
            HolderCategory::ContractNft => &mut self.contract_nfts,
        }
    }

    /// Total records across all groups.
    pub fn len(&self) -> usize {
        HolderCategory::WRITE_ORDER
            .iter()
            .map(|category| self.group(*category).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records left out because the identity required by their kind was absent.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Classifies and deduplicates a batch.
///
/// Records whose kind-specific identity is missing belong to no category and
/// are dropped (counted in [`ClassifiedHolders::skipped`]). Everything else is
/// passed through uninterpreted.
pub fn classify_holders<I>(records: I, policy: DedupPolicy) -> ClassifiedHolders
where
    I: IntoIterator<Item = HolderRecord>,
{
    let mut classified = ClassifiedHolders::default();
    let mut seen: HashMap<HolderCategory, HashMap<HolderKey, usize>> = HashMap::new();

    for record in records {
        let Some(key) = record.key() else {
            warn!(
                "Skipping {} holder record for token {} without a holder identity",
                record.kind, record.token_address
            );
            classified.skipped += 1;
            continue;
        };

        let category = record.category();
        let index = seen.entry(category).or_default();
        let group = classified.group_mut(category);

        match index.get(&key) {
            Some(&position) => {
                if policy == DedupPolicy::LastSeen {
                    group[position] = record;
                }
            }
            None => {
                index.insert(key, group.len());
                group.push(record);
            }
        }
    }

    classified
}
