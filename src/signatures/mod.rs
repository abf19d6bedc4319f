//! Signature Codec
//!
//! Value types for owner signatures, the byte-exact blob format the Safe
//! contracts expect, and owner-side signing helpers.
//!
//! Three kinds of owner signature exist:
//! - ECDSA over the hash (typed-data signing) or its EIP-191 form (eth_sign)
//! - Contract signatures from owners that are themselves Safe accounts
//! - Pre-approved markers for owners that called `approveHash` on-chain

pub mod codec;
pub mod signer;
pub mod types;

pub use codec::{build_contract_signature, decode, encode, SIGNATURE_LENGTH_BYTES};
pub use signer::{recover_signer, sign_hash};
pub use types::*;

use crate::error::ErrorCode;

/// Errors from encoding, decoding and signing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Static signature region of {len} bytes is not a multiple of 65")]
    InvalidLength { len: usize },

    #[error("Signature {index}: dynamic offset {offset} is outside a blob of {len} bytes")]
    OffsetOutOfBounds { index: usize, offset: String, len: usize },

    #[error("Signature {index}: dynamic offset {offset} points into the static region")]
    OffsetInStaticRegion { index: usize, offset: usize },

    #[error("Signature {index}: unsupported v byte {v}")]
    UnsupportedV { index: usize, v: u8 },

    #[error("Signature {index}: signer word has non-zero high bytes")]
    DirtyAddressPadding { index: usize },

    #[error("Signature {index}: signer could not be recovered: {reason}")]
    Unrecoverable { index: usize, reason: String },

    #[error("V byte {v} is not an ECDSA signing mode")]
    InvalidRecoveryByte { v: u8 },

    #[error("Recovery failed: {0}")]
    Recovery(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),
}

impl SignatureError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SignatureError::Unrecoverable { .. } | SignatureError::Recovery(_) => ErrorCode::InvalidSignature,
            SignatureError::InvalidPrivateKey(_) => ErrorCode::InvalidConfig,
            _ => ErrorCode::MalformedSignature,
        }
    }
}
