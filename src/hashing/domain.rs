//! Safe EIP-712 domains
//!
//! The verifying contract is always the account itself. From 1.3.0 on the
//! chain id is part of the domain; older versions bind the address only.

use crate::types::SafeVersion;
use crate::utils::crypto::{keccak256, keccak256_concat, pad_address};
use ethers_core::types::{Address, U256};
use serde::{Deserialize, Serialize};

pub const DOMAIN_TYPE: &str = "EIP712Domain(uint256 chainId,address verifyingContract)";
pub const LEGACY_DOMAIN_TYPE: &str = "EIP712Domain(address verifyingContract)";

/// Account and chain a hash is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashDomain {
    /// Deployed or predicted account address
    pub safe_address: Address,
    pub chain_id: u64,
    pub version: SafeVersion,
}

impl HashDomain {
    pub fn new(safe_address: Address, chain_id: u64, version: SafeVersion) -> Self {
        Self {
            safe_address,
            chain_id,
            version,
        }
    }

    /// Same chain and version, different account
    pub fn for_account(&self, safe_address: Address, version: SafeVersion) -> Self {
        Self {
            safe_address,
            chain_id: self.chain_id,
            version,
        }
    }

    pub fn separator(&self) -> [u8; 32] {
        domain_separator(self)
    }
}

/// `hashStruct(EIP712Domain)` for the account
pub fn domain_separator(domain: &HashDomain) -> [u8; 32] {
    let contract = pad_address(&domain.safe_address);

    if domain.version.domain_includes_chain_id() {
        let mut chain_id = [0u8; 32];
        U256::from(domain.chain_id).to_big_endian(&mut chain_id);
        keccak256_concat(&[&keccak256(DOMAIN_TYPE.as_bytes()), &chain_id, &contract])
    } else {
        keccak256_concat(&[&keccak256(LEGACY_DOMAIN_TYPE.as_bytes()), &contract])
    }
}
