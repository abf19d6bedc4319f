//! Counterfactual address prediction
//!
//! Computes where `createProxyWithNonce` will deploy an account before it
//! exists. Two derivation schemes exist; which one applies is decided by
//! chain id alone, through [`DerivationScheme::for_chain`].

use super::initializer::{encode_create_proxy_with_nonce, encode_setup_call};
use super::registry::{DeploymentInfo, DeploymentRegistry, RegistryError};
use crate::error::ErrorCode;
use crate::types::{AccountConfig, ConfigError, SaltNonce, SafeVersion};
use crate::utils::crypto::{keccak256, keccak256_concat, pad_address};
use crate::{log_debug, log_warn};
use ethers_core::types::{Address, Bytes, H256, U256};
use ethers_core::utils::get_create2_address;
use serde::{Deserialize, Serialize};

const LOG_TARGET: &str = "safe_core::deployment";

/// Seed of the chain-specific default salt nonce
pub const PREDETERMINED_SALT_NONCE: &str = "0xb1073742015cbcf5a3a4d9d1ae33ecf619439710b89475f92e2abd2117e90f90";

/// `keccak256("zksyncCreate2")`
pub const ZKSYNC_CREATE2_PREFIX: [u8; 32] = [
    0x20, 0x20, 0xdb, 0xa9, 0x1b, 0x30, 0xcc, 0x00, 0x06, 0x18, 0x8a, 0xf7, 0x94, 0xc2, 0xfb, 0x30,
    0xdd, 0x85, 0x20, 0xdb, 0x7e, 0x2c, 0x08, 0x8b, 0x7f, 0xc7, 0xc1, 0x03, 0xc0, 0x0c, 0xa4, 0x94,
];

/// Deployed proxy bytecode hash on zkSync Era, 1.3.0
const ZKSYNC_PROXY_BYTECODE_HASH_V1_3_0: [u8; 32] = [
    0x01, 0x00, 0x00, 0x41, 0x24, 0x42, 0x6f, 0xb9, 0xeb, 0xb2, 0x5e, 0x27, 0xd6, 0x70, 0xc0, 0x68,
    0xe5, 0x2f, 0x9b, 0xa6, 0x31, 0xbd, 0x38, 0x32, 0x79, 0xa1, 0x88, 0xbe, 0x47, 0xe3, 0xf8, 0x6d,
];

/// Chains that do not use the standard CREATE2 formula
const DERIVATION_TABLE: &[(u64, DerivationScheme)] = &[
    // zkSync Era mainnet
    (324, DerivationScheme::ZkSyncCreate2),
    // zkSync Era testnet
    (280, DerivationScheme::ZkSyncCreate2),
];

/// Address derivation formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivationScheme {
    /// `keccak256(0xff ++ factory ++ salt ++ keccak256(initCode))[12..]`
    Create2,
    /// `keccak256(prefix ++ pad32(factory) ++ salt ++ bytecodeHash ++ keccak256(input))[12..]`
    ZkSyncCreate2,
}

impl DerivationScheme {
    pub fn for_chain(chain_id: u64) -> Self {
        DERIVATION_TABLE
            .iter()
            .find(|(id, _)| *id == chain_id)
            .map(|(_, scheme)| *scheme)
            .unwrap_or(DerivationScheme::Create2)
    }
}

/// Deployed proxy bytecode hash for the zkSync scheme
pub fn zksync_proxy_bytecode_hash(version: SafeVersion) -> Option<[u8; 32]> {
    match version {
        SafeVersion::V1_3_0 => Some(ZKSYNC_PROXY_BYTECODE_HASH_V1_3_0),
        _ => None,
    }
}

/// Per-prediction deployment options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    /// Defaults to [`default_salt_nonce`] for the chain
    #[serde(default)]
    pub salt_nonce: Option<SaltNonce>,
    /// Deploy against the L1 singleton even where an L2 singleton exists
    #[serde(default)]
    pub use_l1_singleton: bool,
}

impl DeploymentConfig {
    pub fn with_salt_nonce(mut self, salt_nonce: impl Into<SaltNonce>) -> Self {
        self.salt_nonce = Some(salt_nonce.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredictionError {
    #[error("No zkSync proxy bytecode hash for Safe {version} (chain {chain_id})")]
    UnsupportedVersion { version: SafeVersion, chain_id: u64 },

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl PredictionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PredictionError::UnsupportedVersion { .. } => ErrorCode::UnsupportedVersion,
            PredictionError::InvalidConfig(e) => e.code(),
            PredictionError::Registry(e) => e.code(),
        }
    }
}

/// `keccak256(utf8(PREDETERMINED_SALT_NONCE ++ decimal(chain_id)))`, so the
/// same configuration lands on different addresses on different chains
pub fn default_salt_nonce(chain_id: u64) -> SaltNonce {
    let seed = format!("{}{}", PREDETERMINED_SALT_NONCE, chain_id);
    SaltNonce(U256::from_big_endian(&keccak256(seed.as_bytes())))
}

/// `keccak256(keccak256(initializer) ++ uint256(salt_nonce))`
pub fn proxy_salt(initializer: &[u8], salt_nonce: SaltNonce) -> H256 {
    H256(keccak256_concat(&[&keccak256(initializer), &salt_nonce.to_be_bytes()]))
}

/// zkSync Era CREATE2 address of a proxy deployed by `factory`
pub fn zksync_create2_address(
    factory: Address,
    salt: &H256,
    bytecode_hash: &[u8; 32],
    constructor_input: &[u8],
) -> Address {
    let hash = keccak256_concat(&[
        &ZKSYNC_CREATE2_PREFIX,
        &pad_address(&factory),
        salt.as_bytes(),
        bytecode_hash,
        &keccak256(constructor_input),
    ]);
    Address::from_slice(&hash[12..])
}

/// Everything needed to deploy and locate one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    pub deployment: DeploymentInfo,
    pub singleton: Address,
    pub initializer: Bytes,
    pub salt_nonce: SaltNonce,
    pub salt: H256,
}

/// Predicts account addresses from a deployment registry
pub struct AddressPredictor<'a, D: DeploymentRegistry + ?Sized> {
    registry: &'a D,
}

impl<'a, D: DeploymentRegistry + ?Sized> AddressPredictor<'a, D> {
    pub fn new(registry: &'a D) -> Self {
        Self { registry }
    }

    /// Resolve contracts, initializer and salt for `config` on `chain_id`
    pub fn plan(
        &self,
        config: &AccountConfig,
        chain_id: u64,
        deployment: &DeploymentConfig,
    ) -> Result<DeploymentPlan, PredictionError> {
        config.validate()?;

        let version = config.version;
        let info = self.registry.deployment(version, chain_id).map_err(|e| {
            log_warn!(LOG_TARGET, "registry lookup failed", version = version, chain_id = chain_id, error = e);
            e
        })?;

        let initializer = self.encode_setup_call(config, &info)?;
        let salt_nonce = deployment.salt_nonce.unwrap_or_else(|| default_salt_nonce(chain_id));
        let salt = proxy_salt(&initializer, salt_nonce);
        let singleton = info.singleton(deployment.use_l1_singleton);

        Ok(DeploymentPlan {
            deployment: info,
            singleton,
            initializer,
            salt_nonce,
            salt,
        })
    }

    /// Address the proxy will have once deployed
    pub fn predict_address(
        &self,
        config: &AccountConfig,
        chain_id: u64,
        deployment: &DeploymentConfig,
    ) -> Result<Address, PredictionError> {
        let scheme = DerivationScheme::for_chain(chain_id);
        let zksync_bytecode_hash = match scheme {
            DerivationScheme::Create2 => None,
            DerivationScheme::ZkSyncCreate2 => Some(zksync_proxy_bytecode_hash(config.version).ok_or(
                PredictionError::UnsupportedVersion {
                    version: config.version,
                    chain_id,
                },
            )?),
        };

        let plan = self.plan(config, chain_id, deployment)?;
        let constructor_input = pad_address(&plan.singleton);

        let address = match zksync_bytecode_hash {
            Some(bytecode_hash) => zksync_create2_address(
                plan.deployment.proxy_factory,
                &plan.salt,
                &bytecode_hash,
                &constructor_input,
            ),
            None => {
                let mut init_code = plan.deployment.proxy_creation_code.to_vec();
                init_code.extend_from_slice(&constructor_input);
                get_create2_address(plan.deployment.proxy_factory, plan.salt.as_bytes(), init_code)
            }
        };

        log_debug!(
            LOG_TARGET,
            "predicted account address",
            address = address,
            chain_id = chain_id,
            scheme = scheme,
            salt = plan.salt
        );
        Ok(address)
    }

    /// Factory address followed by the `createProxyWithNonce` call data, as
    /// used for ERC-4337 `initCode`
    pub fn predicted_init_code(
        &self,
        config: &AccountConfig,
        chain_id: u64,
        deployment: &DeploymentConfig,
    ) -> Result<Bytes, PredictionError> {
        let plan = self.plan(config, chain_id, deployment)?;
        let call = encode_create_proxy_with_nonce(plan.singleton, &plan.initializer, plan.salt_nonce);

        let mut init_code = plan.deployment.proxy_factory.as_bytes().to_vec();
        init_code.extend_from_slice(&call);
        Ok(Bytes::from(init_code))
    }

    /// `setup` initializer, taking the fallback handler from the registry
    /// when the config has none
    pub fn encode_setup_call(&self, config: &AccountConfig, info: &DeploymentInfo) -> Result<Bytes, PredictionError> {
        let handler = if config.version.setup_has_fallback_handler() {
            config
                .fallback_handler
                .or(info.fallback_handler)
                .ok_or(RegistryError::MissingContract {
                    contract: "compatibility fallback handler",
                    version: info.version,
                    chain_id: info.chain_id,
                })?
        } else {
            Address::zero()
        };

        Ok(encode_setup_call(config, config.version, handler))
    }
}
