//! Unified error types for Safe Core
//!
//! Every subsystem owns a `thiserror` enum with the offending address or
//! field attached. All of them convert into [`SafeCoreError`], which carries a
//! stable [`ErrorCode`] for callers that only care about the category.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::deployment::{PredictionError, RegistryError};
use crate::hashing::TypedDataError;
use crate::modules::ModuleError;
use crate::signatures::SignatureError;
use crate::state::ReaderError;
use crate::types::ConfigError;
use crate::verifier::VerificationError;

/// Crate-wide error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafeCoreError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl SafeCoreError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfig, msg)
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Encoding, msg)
    }
}

impl fmt::Display for SafeCoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for SafeCoreError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Signature errors
    MalformedSignature,
    InvalidSignature,
    UnknownSigner,
    NotApproved,
    NestedVerificationFailed,
    CyclicSignerGraph,
    BelowThreshold,

    // Deployment errors
    UnsupportedVersion,
    UnknownVersionOrChain,

    // Module errors
    InvalidPageSize,
    NotDeployed,
    InvalidModuleAddress,
    ModuleAlreadyEnabled,
    ModuleNotEnabled,

    // Input errors
    InvalidConfig,
    Encoding,

    // Collaborator failures
    Reader,
    Registry,
}

/// Result type alias for Safe Core operations
pub type SafeCoreResult<T> = Result<T, SafeCoreError>;

macro_rules! impl_from_subsystem_error {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for SafeCoreError {
                fn from(e: $source) -> Self {
                    SafeCoreError::new(e.code(), e.to_string())
                }
            }
        )*
    };
}

impl_from_subsystem_error!(
    SignatureError,
    VerificationError,
    PredictionError,
    RegistryError,
    ModuleError,
    ReaderError,
    ConfigError,
);

impl From<TypedDataError> for SafeCoreError {
    fn from(e: TypedDataError) -> Self {
        SafeCoreError::new(ErrorCode::Encoding, e.to_string())
    }
}

impl From<serde_json::Error> for SafeCoreError {
    fn from(e: serde_json::Error) -> Self {
        SafeCoreError::new(ErrorCode::Encoding, e.to_string())
    }
}

impl From<hex::FromHexError> for SafeCoreError {
    fn from(e: hex::FromHexError) -> Self {
        SafeCoreError::new(ErrorCode::Encoding, e.to_string())
    }
}
