//! Token holder domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;

/// Free-form metadata attached to a holder observation.
///
/// Always an object; a missing or `null` payload becomes an empty map.
pub type HolderInfo = serde_json::Map<String, serde_json::Value>;

/// Whether a balance is held by an externally owned account or by a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HolderKind {
    Account,
    Contract,
}

impl HolderKind {
    /// Tag stored in the `holder_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            HolderKind::Account => "Account",
            HolderKind::Contract => "Contract",
        }
    }
}

impl fmt::Display for HolderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HolderKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Account" => Ok(HolderKind::Account),
            "Contract" => Ok(HolderKind::Contract),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown holder type '{}'",
                other
            ))),
        }
    }
}

/// One of the four disjoint (holder kind x asset kind) partitions.
///
/// Each category has its own uniqueness key and its own conflict target in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HolderCategory {
    AccountNft,
    ContractNft,
    AccountToken,
    ContractToken,
}

impl HolderCategory {
    /// Order in which categories are written for every batch.
    pub const WRITE_ORDER: [HolderCategory; 4] = [
        HolderCategory::AccountNft,
        HolderCategory::ContractNft,
        HolderCategory::AccountToken,
        HolderCategory::ContractToken,
    ];

    pub fn of(kind: HolderKind, is_nft: bool) -> Self {
        match (kind, is_nft) {
            (HolderKind::Account, true) => HolderCategory::AccountNft,
            (HolderKind::Contract, true) => HolderCategory::ContractNft,
            (HolderKind::Account, false) => HolderCategory::AccountToken,
            (HolderKind::Contract, false) => HolderCategory::ContractToken,
        }
    }

    pub fn holder_kind(&self) -> HolderKind {
        match self {
            HolderCategory::AccountNft | HolderCategory::AccountToken => HolderKind::Account,
            HolderCategory::ContractNft | HolderCategory::ContractToken => HolderKind::Contract,
        }
    }

    pub fn is_nft(&self) -> bool {
        matches!(self, HolderCategory::AccountNft | HolderCategory::ContractNft)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HolderCategory::AccountNft => "account nft",
            HolderCategory::ContractNft => "contract nft",
            HolderCategory::AccountToken => "account token",
            HolderCategory::ContractToken => "contract token",
        }
    }
}

impl fmt::Display for HolderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniqueness key of a holder record within its category.
///
/// `nft_id` is `None` for fungible categories.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HolderKey {
    pub identity: String,
    pub token_address: String,
    pub nft_id: Option<String>,
}

/// Token amount in raw (smallest) units.
///
/// Chain balances routinely exceed 128 bits, so the amount is kept as a
/// canonical digit string rather than a fixed-width number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Balance(String);

impl Balance {
    pub fn zero() -> Self {
        Balance("0".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == "0"
    }
}

impl FromStr for Balance {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidBalance(s.to_string()));
        }
        let canonical = trimmed.trim_start_matches('0');
        if canonical.is_empty() {
            Ok(Balance::zero())
        } else {
            Ok(Balance(canonical.to_string()))
        }
    }
}

impl From<u64> for Balance {
    fn from(value: u64) -> Self {
        Balance(value.to_string())
    }
}

impl From<u128> for Balance {
    fn from(value: u128) -> Self {
        Balance(value.to_string())
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Balance {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Numbers keep their source digits (`arbitrary_precision`), so integers
        // wider than u64 are not routed through f64.
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => s.parse().map_err(serde::de::Error::custom),
            serde_json::Value::Number(n) => n.to_string().parse().map_err(serde::de::Error::custom),
            other => Err(serde::de::Error::custom(ValidationError::InvalidBalance(
                other.to_string(),
            ))),
        }
    }
}

/// One observed ownership fact, as delivered by the crawler.
///
/// Exactly one of `signer_address` / `evm_address` is meaningful, selected by
/// `kind`. Empty strings are mapped to `None` on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolderRecord {
    #[serde(default, deserialize_with = "blank_input_format::deserialize_identity")]
    pub signer_address: Option<String>,
    #[serde(default, deserialize_with = "blank_input_format::deserialize_identity")]
    pub evm_address: Option<String>,
    #[serde(rename = "type")]
    pub kind: HolderKind,
    pub token_address: String,
    #[serde(default)]
    pub nft_id: Option<String>,
    pub balance: Balance,
    #[serde(default, deserialize_with = "blank_input_format::deserialize_info")]
    pub info: HolderInfo,
    pub timestamp: DateTime<Utc>,
}

impl HolderRecord {
    /// Creates a fungible-token observation for the identity matching `kind`.
    pub fn new(
        kind: HolderKind,
        identity: impl Into<String>,
        token_address: impl Into<String>,
        balance: Balance,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let identity = normalize_identity(Some(identity.into()));
        let (signer_address, evm_address) = match kind {
            HolderKind::Account => (identity, None),
            HolderKind::Contract => (None, identity),
        };
        Self {
            signer_address,
            evm_address,
            kind,
            token_address: token_address.into(),
            nft_id: None,
            balance,
            info: HolderInfo::new(),
            timestamp,
        }
    }

    pub fn with_nft_id(mut self, nft_id: impl Into<String>) -> Self {
        self.nft_id = Some(nft_id.into());
        self
    }

    pub fn with_info(mut self, info: HolderInfo) -> Self {
        self.info = info;
        self
    }

    pub fn is_nft(&self) -> bool {
        self.nft_id.is_some()
    }

    pub fn category(&self) -> HolderCategory {
        HolderCategory::of(self.kind, self.is_nft())
    }

    /// The identity that counts for this record's kind. The other field is ignored.
    pub fn holder_identity(&self) -> Option<&str> {
        let identity = match self.kind {
            HolderKind::Account => self.signer_address.as_deref(),
            HolderKind::Contract => self.evm_address.as_deref(),
        };
        identity.filter(|value| !value.is_empty())
    }

    /// Uniqueness key within the record's category, or `None` when the
    /// identity required by `kind` is missing.
    pub fn key(&self) -> Option<HolderKey> {
        let identity = self.holder_identity()?;
        Some(HolderKey {
            identity: identity.to_string(),
            token_address: self.token_address.clone(),
            nft_id: self.nft_id.clone(),
        })
    }
}

/// Maps the crawler's empty-string sentinel to `None`.
pub fn normalize_identity(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

mod blank_input_format {
    use super::{normalize_identity, HolderInfo};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize_identity<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(normalize_identity(raw))
    }

    pub fn deserialize_info<'de, D>(deserializer: D) -> Result<HolderInfo, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<HolderInfo>::deserialize(deserializer)?;
        Ok(raw.unwrap_or_default())
    }
}
