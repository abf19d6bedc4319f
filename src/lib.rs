//! Safe Core Library
//!
//! Off-chain authorization core for Safe multi-signature accounts.
//!
//! # Architecture
//!
//! This crate provides:
//! - **hashing**: Domain-separated EIP-712 hashes for transactions and messages
//! - **signatures**: Owner signatures, signing helpers and the contract blob format
//! - **verifier**: Threshold checks, recursing into owners that are Safe accounts
//! - **deployment**: Deployment registry and counterfactual address prediction
//! - **modules**: Module list pagination and enable/disable transactions
//! - **state**: The account-state reader the rest of the crate consumes
//!
//! Node access, transaction relaying and key custody live outside the crate.
//! Callers plug in an [`AccountStateReader`] and a [`DeploymentRegistry`].
//!
//! # Logging
//!
//! Decisions are logged through the `log` facade with `safe_core::*` targets.
//! The crate never installs a logger.
//!
//! # Example
//!
//! ```rust,ignore
//! use safe_core::{hashing, signatures, ThresholdVerifier};
//!
//! let domain = hashing::HashDomain::new(safe, chain_id, config.version);
//! let hash = hashing::safe_tx_hash(&domain, &tx);
//!
//! let mut set = signatures::SignatureSet::new();
//! set.insert(signatures::sign_hash(&hash, &key, SigningMethod::EthSignTypedData)?);
//!
//! let ok = ThresholdVerifier::new(&reader, chain_id).is_satisfied(safe, &config, &hash, &set)?;
//! let blob = set.encode();
//! ```

pub mod deployment;
pub mod error;
pub mod hashing;
pub mod modules;
pub mod signatures;
pub mod state;
pub mod types;
pub mod utils;
pub mod verifier;

pub use deployment::{AddressPredictor, DeploymentConfig, DeploymentRegistry, StaticDeploymentRegistry};
pub use error::{ErrorCode, SafeCoreError, SafeCoreResult};
pub use hashing::{HashDomain, Payload, SafeMessage};
pub use signatures::{SafeSignature, SignatureSet, SigningMethod};
pub use state::{AccountStateReader, InMemoryAccountState};
pub use types::{AccountConfig, OperationType, SafeTransaction, SafeVersion, SaltNonce};
pub use verifier::ThresholdVerifier;
