//! Prediction Integration Tests
//!
//! Counterfactual accounts from registry data through to verified
//! signatures, including the shared registry cache.

use ethers_core::types::{Address, Bytes, U256};
use safe_core::deployment::{CachedRegistry, RegistryCache, ZKSYNC_CREATE2_PREFIX};
use safe_core::error::{ErrorCode, SafeCoreError};
use safe_core::hashing::{safe_tx_hash, HashDomain};
use safe_core::signatures::{sign_hash, SignatureSet, SigningMethod};
use safe_core::utils::crypto::address_from_private_key;
use safe_core::{
    AccountConfig, AddressPredictor, DeploymentConfig, DeploymentRegistry, InMemoryAccountState, SafeTransaction,
    SafeVersion, StaticDeploymentRegistry, ThresholdVerifier,
};
use std::sync::Arc;

const REGISTRY_JSON: &str = r#"{
    "snapshot": "2023-06",
    "deployments": [
        {
            "version": "1.3.0",
            "chainId": 1,
            "proxyFactory": "0xa6b71e26c5e0845f74c812102ca7114b6a896ab2",
            "safeSingleton": "0xd9db270c1b5e3bd161e8c8503c55ceabee709552",
            "safeL2Singleton": "0x3e5c63644e683549055b9be8653de26e0b4cd36e",
            "fallbackHandler": "0xf48f2b2d2a534e402487b3ee7c18c33aec0fe5e4",
            "proxyCreationCode": "0x608060405234801561001057600080fd5b50"
        },
        {
            "version": "1.3.0",
            "chainId": 137,
            "proxyFactory": "0xa6b71e26c5e0845f74c812102ca7114b6a896ab2",
            "safeSingleton": "0xd9db270c1b5e3bd161e8c8503c55ceabee709552",
            "safeL2Singleton": "0x3e5c63644e683549055b9be8653de26e0b4cd36e",
            "fallbackHandler": "0xf48f2b2d2a534e402487b3ee7c18c33aec0fe5e4",
            "proxyCreationCode": "0x608060405234801561001057600080fd5b50"
        },
        {
            "version": "1.3.0",
            "chainId": 324,
            "proxyFactory": "0xdaec33641865e4651fb43181c6db6f7232ee91c2",
            "safeSingleton": "0xb00ce5cce8b7bcba3dd85d28e40acbd9a2a8f9ab",
            "safeL2Singleton": "0x1727c2c531cf966f902e5927b98490fdfb3b2b70",
            "fallbackHandler": "0x2f870a80647bbc554f3a0ebd093f11b4d2a7492a",
            "proxyCreationCode": "0x00"
        },
        {
            "version": "1.4.1",
            "chainId": 324,
            "proxyFactory": "0xdaec33641865e4651fb43181c6db6f7232ee91c2",
            "safeSingleton": "0xb00ce5cce8b7bcba3dd85d28e40acbd9a2a8f9ab",
            "fallbackHandler": "0x2f870a80647bbc554f3a0ebd093f11b4d2a7492a",
            "proxyCreationCode": "0x00"
        }
    ]
}"#;

// MARK: - Helper Functions

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn registry() -> StaticDeploymentRegistry {
    StaticDeploymentRegistry::from_json(REGISTRY_JSON).unwrap()
}

fn owner(byte: u8) -> Address {
    address_from_private_key(&[byte; 32]).unwrap()
}

fn config() -> AccountConfig {
    AccountConfig::new(vec![owner(1), owner(2)], 2)
}

// MARK: - Counterfactual Accounts

#[test]
fn test_counterfactual_account_signs_before_deployment() {
    init_logging();
    let registry = registry();
    let predictor = AddressPredictor::new(&registry);
    let config = config();
    let account = predictor
        .predict_address(&config, 1, &DeploymentConfig::default())
        .unwrap();

    let tx = SafeTransaction::call(Address::repeat_byte(0x42), U256::from(1000), Bytes::new());
    let hash = safe_tx_hash(&HashDomain::new(account, 1, config.version), &tx);
    let set: SignatureSet = [1u8, 2]
        .iter()
        .map(|k| sign_hash(&hash, &[*k; 32], SigningMethod::EthSignTypedData).unwrap().into())
        .collect();

    // Nothing deployed yet: the config is supplied by the caller
    let undeployed = InMemoryAccountState::new();
    let verifier = ThresholdVerifier::new(&undeployed, 1);
    assert!(verifier.is_satisfied(account, &config, &hash, &set).unwrap());
    assert_eq!(
        verifier.is_valid_signature(account, &hash, &set.encode()).unwrap_err().code(),
        ErrorCode::NotDeployed
    );

    // Once deployed the same blob verifies against on-chain state
    let deployed = InMemoryAccountState::new().with_account(account, &config);
    let verifier = ThresholdVerifier::new(&deployed, 1);
    assert!(verifier.is_valid_signature(account, &hash, &set.encode()).unwrap());
}

#[test]
fn test_same_config_differs_across_chains_by_default() {
    let registry = registry();
    let predictor = AddressPredictor::new(&registry);

    let mainnet = predictor.predict_address(&config(), 1, &DeploymentConfig::default()).unwrap();
    let polygon = predictor.predict_address(&config(), 137, &DeploymentConfig::default()).unwrap();
    assert_ne!(mainnet, polygon);

    let pinned = DeploymentConfig::default().with_salt_nonce(0u64);
    assert_eq!(
        predictor.predict_address(&config(), 1, &pinned).unwrap(),
        predictor.predict_address(&config(), 137, &pinned).unwrap()
    );
}

#[test]
fn test_owner_order_changes_address() {
    let registry = registry();
    let predictor = AddressPredictor::new(&registry);
    let deployment = DeploymentConfig::default().with_salt_nonce(1u64);

    let swapped = AccountConfig::new(vec![owner(2), owner(1)], 2);
    assert_ne!(
        predictor.predict_address(&config(), 1, &deployment).unwrap(),
        predictor.predict_address(&swapped, 1, &deployment).unwrap()
    );
}

#[test]
fn test_init_code_starts_with_factory() {
    let registry = registry();
    let predictor = AddressPredictor::new(&registry);

    let init_code = predictor
        .predicted_init_code(&config(), 1, &DeploymentConfig::default())
        .unwrap();
    let factory = registry.deployment(SafeVersion::V1_3_0, 1).unwrap().proxy_factory;

    assert_eq!(&init_code[..20], factory.as_bytes());
    // createProxyWithNonce(address,bytes,uint256)
    assert_eq!(hex::encode(&init_code[20..24]), "1688f0b9");
}

// MARK: - zkSync Era

#[test]
fn test_zksync_prediction() {
    let registry = registry();
    let predictor = AddressPredictor::new(&registry);
    let deployment = DeploymentConfig::default().with_salt_nonce(9u64);

    let zk = predictor.predict_address(&config(), 324, &deployment).unwrap();
    assert_ne!(zk, Address::zero());
    assert_eq!(zk, predictor.predict_address(&config(), 324, &deployment).unwrap());
    assert_eq!(hex::encode(&ZKSYNC_CREATE2_PREFIX[..4]), "2020dba9");
}

#[test]
fn test_zksync_unsupported_version_maps_to_error_code() {
    let registry = registry();
    let predictor = AddressPredictor::new(&registry);
    let config = config().with_version(SafeVersion::V1_4_1);

    let err: SafeCoreError = predictor
        .predict_address(&config, 324, &DeploymentConfig::default())
        .unwrap_err()
        .into();
    assert_eq!(err.code, ErrorCode::UnsupportedVersion);
}

// MARK: - Registry Cache

#[test]
fn test_shared_cache_across_threads() {
    init_logging();
    let cache = Arc::new(RegistryCache::new());
    let registry = CachedRegistry::new(registry(), cache.clone());
    let expected = AddressPredictor::new(&registry)
        .predict_address(&config(), 1, &DeploymentConfig::default())
        .unwrap();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let registry = registry.clone();
            scope.spawn(move || {
                let predictor = AddressPredictor::new(&registry);
                for chain_id in [1, 137] {
                    predictor
                        .predict_address(&config(), chain_id, &DeploymentConfig::default())
                        .unwrap();
                }
                assert_eq!(
                    predictor.predict_address(&config(), 1, &DeploymentConfig::default()).unwrap(),
                    expected
                );
            });
        }
    });

    assert_eq!(cache.len(), 2);
}

#[test]
fn test_cached_unknown_chain_is_not_stored() {
    let cache = Arc::new(RegistryCache::new());
    let registry = CachedRegistry::new(registry(), cache.clone());
    let predictor = AddressPredictor::new(&registry);

    let err = predictor
        .predict_address(&config(), 10, &DeploymentConfig::default())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnknownVersionOrChain);
    assert!(cache.is_empty());
}
