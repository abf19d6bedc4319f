//! Shared Safe value types
//!
//! Transactions, account configuration, versions and salt nonces. These are
//! immutable value objects: the core hashes and validates them but never
//! mutates account state.

use crate::error::ErrorCode;
use ethers_core::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Head and terminator of the on-chain owner and module linked lists.
pub const SENTINEL_ADDRESS: Address = ethers_core::types::H160([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
]);

pub const ZERO_ADDRESS: Address = ethers_core::types::H160([0u8; 20]);

// =============================================================================
// Versions
// =============================================================================

/// Safe contract versions with known hashing and setup rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SafeVersion {
    V1_0_0,
    V1_1_1,
    V1_2_0,
    V1_3_0,
    V1_4_1,
}

impl SafeVersion {
    pub const ALL: [SafeVersion; 5] = [
        SafeVersion::V1_0_0,
        SafeVersion::V1_1_1,
        SafeVersion::V1_2_0,
        SafeVersion::V1_3_0,
        SafeVersion::V1_4_1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1_0_0 => "1.0.0",
            Self::V1_1_1 => "1.1.1",
            Self::V1_2_0 => "1.2.0",
            Self::V1_3_0 => "1.3.0",
            Self::V1_4_1 => "1.4.1",
        }
    }

    /// Domain separators bind the chain id starting with 1.3.0
    pub fn domain_includes_chain_id(&self) -> bool {
        *self >= Self::V1_3_0
    }

    /// `setup` gained the fallback handler argument after 1.0.0
    pub fn setup_has_fallback_handler(&self) -> bool {
        *self > Self::V1_0_0
    }
}

impl Default for SafeVersion {
    fn default() -> Self {
        Self::V1_3_0
    }
}

impl fmt::Display for SafeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SafeVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('v');
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == trimmed)
            .ok_or_else(|| ConfigError::UnknownVersion(s.to_string()))
    }
}

impl TryFrom<String> for SafeVersion {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SafeVersion> for String {
    fn from(version: SafeVersion) -> Self {
        version.as_str().to_string()
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// How the account dispatches the inner call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum OperationType {
    #[default]
    Call = 0,
    DelegateCall = 1,
}

/// A Safe transaction, hashed field by field in this order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeTransaction {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub operation: OperationType,
    pub safe_tx_gas: U256,
    pub base_gas: U256,
    pub gas_price: U256,
    pub gas_token: Address,
    pub refund_receiver: Address,
    pub nonce: U256,
}

impl SafeTransaction {
    /// Plain call with zeroed gas parameters and nonce 0
    pub fn call(to: Address, value: U256, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            value,
            data: data.into(),
            operation: OperationType::Call,
            safe_tx_gas: U256::zero(),
            base_gas: U256::zero(),
            gas_price: U256::zero(),
            gas_token: ZERO_ADDRESS,
            refund_receiver: ZERO_ADDRESS,
            nonce: U256::zero(),
        }
    }

    pub fn with_operation(mut self, operation: OperationType) -> Self {
        self.operation = operation;
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<U256>) -> Self {
        self.nonce = nonce.into();
        self
    }

    /// Apply optional gas/refund/nonce overrides
    pub fn with_options(mut self, options: &TransactionOptions) -> Self {
        if let Some(v) = options.safe_tx_gas {
            self.safe_tx_gas = v;
        }
        if let Some(v) = options.base_gas {
            self.base_gas = v;
        }
        if let Some(v) = options.gas_price {
            self.gas_price = v;
        }
        if let Some(v) = options.gas_token {
            self.gas_token = v;
        }
        if let Some(v) = options.refund_receiver {
            self.refund_receiver = v;
        }
        if let Some(v) = options.nonce {
            self.nonce = v;
        }
        self
    }
}

/// Optional overrides for prepared transactions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOptions {
    pub safe_tx_gas: Option<U256>,
    pub base_gas: Option<U256>,
    pub gas_price: Option<U256>,
    pub gas_token: Option<Address>,
    pub refund_receiver: Option<Address>,
    pub nonce: Option<U256>,
}

// =============================================================================
// Account configuration
// =============================================================================

/// Owners, threshold and setup parameters of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountConfig {
    pub owners: Vec<Address>,
    pub threshold: usize,
    #[serde(default)]
    pub fallback_handler: Option<Address>,
    #[serde(default)]
    pub version: SafeVersion,
    #[serde(default)]
    pub to: Address,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub payment_token: Address,
    #[serde(default)]
    pub payment: U256,
    #[serde(default)]
    pub payment_receiver: Address,
}

impl AccountConfig {
    pub fn new(owners: Vec<Address>, threshold: usize) -> Self {
        Self {
            owners,
            threshold,
            fallback_handler: None,
            version: SafeVersion::default(),
            to: ZERO_ADDRESS,
            data: Bytes::default(),
            payment_token: ZERO_ADDRESS,
            payment: U256::zero(),
            payment_receiver: ZERO_ADDRESS,
        }
    }

    pub fn with_version(mut self, version: SafeVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_fallback_handler(mut self, handler: Address) -> Self {
        self.fallback_handler = Some(handler);
        self
    }

    pub fn is_owner(&self, address: &Address) -> bool {
        self.owners.contains(address)
    }

    /// Check the same invariants the `setup` call enforces on-chain
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owners.is_empty() {
            return Err(ConfigError::NoOwners);
        }
        if self.threshold == 0 || self.threshold > self.owners.len() {
            return Err(ConfigError::InvalidThreshold {
                threshold: self.threshold,
                owners: self.owners.len(),
            });
        }

        let mut seen = HashSet::with_capacity(self.owners.len());
        for owner in &self.owners {
            if *owner == ZERO_ADDRESS || *owner == SENTINEL_ADDRESS {
                return Err(ConfigError::InvalidOwner(*owner));
            }
            if !seen.insert(*owner) {
                return Err(ConfigError::DuplicateOwner(*owner));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Salt nonce
// =============================================================================

/// Non-negative salt nonce fed to `createProxyWithNonce`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaltNonce(pub U256);

impl SaltNonce {
    /// ABI encoding as `uint256`
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        self.0.to_big_endian(&mut out);
        out
    }
}

impl From<u64> for SaltNonce {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<U256> for SaltNonce {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl FromStr for SaltNonce {
    type Err = ConfigError;

    /// Accepts decimal or `0x` hex; rejects negative values
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.starts_with('-') {
            return Err(ConfigError::NegativeSaltNonce(trimmed.to_string()));
        }

        let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
            Some(hex_digits) => U256::from_str_radix(hex_digits, 16).ok(),
            None => U256::from_dec_str(trimmed).ok(),
        };

        parsed
            .map(SaltNonce)
            .ok_or_else(|| ConfigError::InvalidSaltNonce(trimmed.to_string()))
    }
}

/// Account configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Owner list must have at least one owner")]
    NoOwners,

    #[error("Threshold {threshold} must be between 1 and the owner count {owners}")]
    InvalidThreshold { threshold: usize, owners: usize },

    #[error("Invalid owner address: {0:?}")]
    InvalidOwner(Address),

    #[error("Duplicate owner address: {0:?}")]
    DuplicateOwner(Address),

    #[error("saltNonce must be greater than or equal to 0, got {0}")]
    NegativeSaltNonce(String),

    #[error("Invalid saltNonce: {0}")]
    InvalidSaltNonce(String),

    #[error("Unknown Safe version: {0}")]
    UnknownVersion(String),
}

impl ConfigError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownVersion(_) => ErrorCode::UnsupportedVersion,
            _ => ErrorCode::InvalidConfig,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn test_version_parse_and_order() {
        assert_eq!("1.3.0".parse::<SafeVersion>().unwrap(), SafeVersion::V1_3_0);
        assert_eq!("v1.4.1".parse::<SafeVersion>().unwrap(), SafeVersion::V1_4_1);
        assert!("2.0.0".parse::<SafeVersion>().is_err());
        assert!(SafeVersion::V1_1_1 < SafeVersion::V1_3_0);
        assert!(!SafeVersion::V1_2_0.domain_includes_chain_id());
        assert!(SafeVersion::V1_3_0.domain_includes_chain_id());
        assert!(!SafeVersion::V1_0_0.setup_has_fallback_handler());
    }

    #[test]
    fn test_version_serde() {
        let json = serde_json::to_string(&SafeVersion::V1_4_1).unwrap();
        assert_eq!(json, "\"1.4.1\"");
        let parsed: SafeVersion = serde_json::from_str("\"1.1.1\"").unwrap();
        assert_eq!(parsed, SafeVersion::V1_1_1);
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(AccountConfig::new(vec![], 1).validate(), Err(ConfigError::NoOwners));
        assert!(matches!(
            AccountConfig::new(vec![addr(1)], 0).validate(),
            Err(ConfigError::InvalidThreshold { threshold: 0, owners: 1 })
        ));
        assert!(matches!(
            AccountConfig::new(vec![addr(1), addr(2)], 3).validate(),
            Err(ConfigError::InvalidThreshold { .. })
        ));
        assert_eq!(
            AccountConfig::new(vec![addr(1), addr(1)], 1).validate(),
            Err(ConfigError::DuplicateOwner(addr(1)))
        );
        assert_eq!(
            AccountConfig::new(vec![SENTINEL_ADDRESS], 1).validate(),
            Err(ConfigError::InvalidOwner(SENTINEL_ADDRESS))
        );
        assert!(AccountConfig::new(vec![addr(1), addr(2)], 2).validate().is_ok());
    }

    #[test]
    fn test_config_json_defaults() {
        let json = r#"{"owners":["0x1111111111111111111111111111111111111111"],"threshold":1}"#;
        let config: AccountConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.version, SafeVersion::V1_3_0);
        assert_eq!(config.fallback_handler, None);
        assert_eq!(config.payment, U256::zero());
    }

    #[test]
    fn test_salt_nonce_parsing() {
        assert_eq!("42".parse::<SaltNonce>().unwrap(), SaltNonce::from(42));
        assert_eq!("0x2a".parse::<SaltNonce>().unwrap(), SaltNonce::from(42));
        assert!(matches!(
            "-1".parse::<SaltNonce>(),
            Err(ConfigError::NegativeSaltNonce(_))
        ));
        assert!(matches!(
            "abc".parse::<SaltNonce>(),
            Err(ConfigError::InvalidSaltNonce(_))
        ));
        assert_eq!(SaltNonce::from(1).to_be_bytes()[31], 1);
    }

    #[test]
    fn test_transaction_options_override() {
        let options = TransactionOptions {
            base_gas: Some(U256::from(111)),
            nonce: Some(U256::from(555)),
            ..Default::default()
        };
        let tx = SafeTransaction::call(addr(9), U256::zero(), Vec::new()).with_options(&options);
        assert_eq!(tx.base_gas, U256::from(111));
        assert_eq!(tx.nonce, U256::from(555));
        assert_eq!(tx.gas_price, U256::zero());
    }
}
