//! Threshold Verifier
//!
//! Off-chain mirror of the contract's `checkNSignatures`: decides whether a
//! signature set authorizes a hash for an account, recursing into owners that
//! are themselves Safe accounts.
//!
//! A nested owner vouches for the outer hash by satisfying its own threshold
//! over `SafeMessage(outer_hash)` in its own domain. Accounts on the current
//! recursion path are tracked so a cyclic owner graph fails instead of
//! recursing forever.

use crate::error::ErrorCode;
use crate::hashing::{nested_message_hash, HashDomain};
use crate::signatures::{decode, recover_signer, SafeSignature, SignatureError, SignatureSet};
use crate::state::{AccountStateReader, ReaderError};
use crate::types::{AccountConfig, ConfigError};
use crate::{log_debug, log_warn};
use ethers_core::types::{Address, H256};
use std::collections::HashSet;

const LOG_TARGET: &str = "safe_core::verifier";

/// Why a signature set does not authorize a hash
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("{provided} signatures provided, threshold is {threshold}")]
    BelowThreshold { provided: usize, threshold: usize },

    #[error("Signer {signer:?} is not an owner")]
    UnknownSigner { signer: Address },

    #[error("Signature from {signer:?} does not recover to the signer")]
    InvalidSignature {
        signer: Address,
        recovered: Option<Address>,
    },

    #[error("Owner {signer:?} has not approved the hash")]
    NotApproved { signer: Address },

    #[error("Nested account {signer:?} rejected its signature: {source}")]
    NestedVerificationFailed {
        signer: Address,
        #[source]
        source: Box<VerificationError>,
    },

    #[error("Account {account:?} signs for itself through its owner graph")]
    CyclicSignerGraph { account: Address },

    #[error(transparent)]
    Malformed(#[from] SignatureError),

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error(transparent)]
    Reader(#[from] ReaderError),
}

impl VerificationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            VerificationError::BelowThreshold { .. } => ErrorCode::BelowThreshold,
            VerificationError::UnknownSigner { .. } => ErrorCode::UnknownSigner,
            VerificationError::InvalidSignature { .. } => ErrorCode::InvalidSignature,
            VerificationError::NotApproved { .. } => ErrorCode::NotApproved,
            VerificationError::NestedVerificationFailed { .. } => ErrorCode::NestedVerificationFailed,
            VerificationError::CyclicSignerGraph { .. } => ErrorCode::CyclicSignerGraph,
            VerificationError::Malformed(e) => e.code(),
            VerificationError::InvalidConfig(e) => e.code(),
            VerificationError::Reader(e) => e.code(),
        }
    }

    /// Failures that keep their identity when raised inside a nested account
    fn passes_through_nesting(&self) -> bool {
        matches!(
            self,
            VerificationError::CyclicSignerGraph { .. } | VerificationError::Reader(_)
        )
    }
}

/// Threshold checks for accounts on one chain
pub struct ThresholdVerifier<'a, R: AccountStateReader + ?Sized> {
    reader: &'a R,
    chain_id: u64,
}

impl<'a, R: AccountStateReader + ?Sized> ThresholdVerifier<'a, R> {
    pub fn new(reader: &'a R, chain_id: u64) -> Self {
        Self { reader, chain_id }
    }

    /// Accept or reject `signatures` over `hash` for `account` with `config`.
    ///
    /// `config` is taken as given so counterfactual accounts can be checked;
    /// pre-approvals and nested owners are resolved through the reader.
    pub fn verify(
        &self,
        account: Address,
        config: &AccountConfig,
        hash: &H256,
        signatures: &SignatureSet,
    ) -> Result<(), VerificationError> {
        let mut path = HashSet::new();
        path.insert(account);
        self.verify_on_path(account, config, hash, signatures, &mut path)
    }

    /// Like [`verify`](Self::verify), but a set that is simply too small is
    /// `Ok(false)` rather than an error
    pub fn is_satisfied(
        &self,
        account: Address,
        config: &AccountConfig,
        hash: &H256,
        signatures: &SignatureSet,
    ) -> Result<bool, VerificationError> {
        match self.verify(account, config, hash, signatures) {
            Ok(()) => Ok(true),
            Err(VerificationError::BelowThreshold { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Decode an encoded blob and check it against the account's current
    /// on-chain owners and threshold
    pub fn is_valid_signature(
        &self,
        account: Address,
        hash: &H256,
        signature_bytes: &[u8],
    ) -> Result<bool, VerificationError> {
        let config = self.reader.account_config(account)?;
        let signatures = decode(signature_bytes, hash)?;
        self.is_satisfied(account, &config, hash, &signatures)
    }

    fn verify_on_path(
        &self,
        account: Address,
        config: &AccountConfig,
        hash: &H256,
        signatures: &SignatureSet,
        path: &mut HashSet<Address>,
    ) -> Result<(), VerificationError> {
        config.validate()?;

        if signatures.len() < config.threshold {
            log_debug!(
                LOG_TARGET,
                "below threshold",
                account = account,
                provided = signatures.len(),
                threshold = config.threshold
            );
            return Err(VerificationError::BelowThreshold {
                provided: signatures.len(),
                threshold: config.threshold,
            });
        }

        let mut valid = 0usize;
        for signature in signatures {
            let signer = signature.signer();
            if !config.is_owner(&signer) {
                return Err(VerificationError::UnknownSigner { signer });
            }

            match signature {
                SafeSignature::Ecdsa(ecdsa) => {
                    let recovered = recover_signer(hash, ecdsa).ok();
                    if recovered != Some(signer) {
                        return Err(VerificationError::InvalidSignature { signer, recovered });
                    }
                }
                SafeSignature::PreApproved(_) => {
                    if !self.reader.is_hash_approved(account, signer, hash)? {
                        return Err(VerificationError::NotApproved { signer });
                    }
                }
                SafeSignature::Contract(contract) => {
                    self.verify_nested(signer, &contract.data, hash, path)?;
                }
            }

            log_debug!(LOG_TARGET, "signature accepted", signer = signer, kind = signature.kind());
            valid += 1;
        }

        if valid < config.threshold {
            return Err(VerificationError::BelowThreshold {
                provided: valid,
                threshold: config.threshold,
            });
        }
        Ok(())
    }

    fn verify_nested(
        &self,
        nested_account: Address,
        blob: &[u8],
        outer_hash: &H256,
        path: &mut HashSet<Address>,
    ) -> Result<(), VerificationError> {
        if !path.insert(nested_account) {
            log_warn!(LOG_TARGET, "cyclic owner graph", account = nested_account);
            return Err(VerificationError::CyclicSignerGraph { account: nested_account });
        }

        let result = self.check_nested(nested_account, blob, outer_hash, path);
        path.remove(&nested_account);

        result.map_err(|e| {
            if e.passes_through_nesting() {
                e
            } else {
                VerificationError::NestedVerificationFailed {
                    signer: nested_account,
                    source: Box::new(e),
                }
            }
        })
    }

    fn check_nested(
        &self,
        nested_account: Address,
        blob: &[u8],
        outer_hash: &H256,
        path: &mut HashSet<Address>,
    ) -> Result<(), VerificationError> {
        let config = self.reader.account_config(nested_account).map_err(|e| {
            log_warn!(LOG_TARGET, "nested account lookup failed", account = nested_account, error = e);
            e
        })?;

        let domain = HashDomain::new(nested_account, self.chain_id, config.version);
        let nested_hash = nested_message_hash(&domain, outer_hash);
        let signatures = decode(blob, &nested_hash)?;

        log_debug!(
            LOG_TARGET,
            "verifying nested account",
            account = nested_account,
            nested_hash = nested_hash,
            signatures = signatures.len()
        );
        self.verify_on_path(nested_account, &config, &nested_hash, &signatures, path)
    }
}
