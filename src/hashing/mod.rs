//! Safe Hash Engine
//!
//! Domain-separated EIP-712 hashes for Safe transactions and messages.
//! Everything here is pure: identical inputs always produce identical hashes,
//! so independent signers derive byte-identical digests.
//!
//! A hash only needs the account's intended address and chain id, so
//! counterfactual (not yet deployed) accounts hash the same way.
//!
//! # Example
//! ```rust,ignore
//! use safe_core::hashing::{safe_tx_hash, HashDomain};
//!
//! let domain = HashDomain::new(safe_address, 1, SafeVersion::V1_3_0);
//! let hash = safe_tx_hash(&domain, &tx);
//! ```

pub mod domain;
pub mod engine;
pub mod typed_data;

pub use domain::*;
pub use engine::*;
pub use typed_data::{TypedData, TypedDataDomain, TypedDataError, TypedDataField};
