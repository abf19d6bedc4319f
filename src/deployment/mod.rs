//! Account Deployment
//!
//! Counterfactual deployment support:
//! - Deployment registry (factory, singletons, fallback handler, creation code)
//! - `setup` / `createProxyWithNonce` call data
//! - Address prediction for the standard CREATE2 and zkSync Era schemes

pub mod initializer;
pub mod predictor;
pub mod registry;

pub use initializer::{encode_create_proxy_with_nonce, encode_setup_call, selector};
pub use predictor::*;
pub use registry::*;
