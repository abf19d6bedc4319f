//! Call data for account creation

use crate::types::{AccountConfig, SaltNonce, SafeVersion};
use crate::utils::crypto::keccak256;
use ethers_core::abi::{encode, Token};
use ethers_core::types::{Address, Bytes, U256};

pub const SETUP_SIGNATURE: &str = "setup(address[],uint256,address,bytes,address,address,uint256,address)";
/// 1.0.0 and earlier take no fallback handler
pub const LEGACY_SETUP_SIGNATURE: &str = "setup(address[],uint256,address,bytes,address,uint256,address)";
pub const CREATE_PROXY_WITH_NONCE_SIGNATURE: &str = "createProxyWithNonce(address,bytes,uint256)";

/// First four bytes of `keccak256(signature)`
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn encode_call(signature: &str, tokens: &[Token]) -> Bytes {
    let mut call = selector(signature).to_vec();
    call.extend_from_slice(&encode(tokens));
    Bytes::from(call)
}

/// `setup(...)` initializer for `version`.
///
/// `fallback_handler` is ignored for versions without that argument.
pub fn encode_setup_call(config: &AccountConfig, version: SafeVersion, fallback_handler: Address) -> Bytes {
    let owners = Token::Array(config.owners.iter().copied().map(Token::Address).collect());
    let threshold = Token::Uint(U256::from(config.threshold));

    if version.setup_has_fallback_handler() {
        encode_call(
            SETUP_SIGNATURE,
            &[
                owners,
                threshold,
                Token::Address(config.to),
                Token::Bytes(config.data.to_vec()),
                Token::Address(fallback_handler),
                Token::Address(config.payment_token),
                Token::Uint(config.payment),
                Token::Address(config.payment_receiver),
            ],
        )
    } else {
        encode_call(
            LEGACY_SETUP_SIGNATURE,
            &[
                owners,
                threshold,
                Token::Address(config.to),
                Token::Bytes(config.data.to_vec()),
                Token::Address(config.payment_token),
                Token::Uint(config.payment),
                Token::Address(config.payment_receiver),
            ],
        )
    }
}

/// `createProxyWithNonce(singleton, initializer, saltNonce)`
pub fn encode_create_proxy_with_nonce(singleton: Address, initializer: &Bytes, salt_nonce: SaltNonce) -> Bytes {
    encode_call(
        CREATE_PROXY_WITH_NONCE_SIGNATURE,
        &[
            Token::Address(singleton),
            Token::Bytes(initializer.to_vec()),
            Token::Uint(salt_nonce.0),
        ],
    )
}
