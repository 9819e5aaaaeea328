//! Holders module - domain models, classification, services, and traits.

mod holders_classifier;
mod holders_model;
mod holders_service;
mod holders_traits;


pub use holders_classifier::{classify_holders, ClassifiedHolders, DedupPolicy};
pub use holders_model::{
    normalize_identity, Balance, HolderCategory, HolderInfo, HolderKey, HolderKind, HolderRecord,
};
pub use holders_service::{BatchSummary, HolderService};
pub use holders_traits::{HolderServiceTrait, HolderStore};
