//! Owner-side ECDSA signing and recovery

use super::types::{EcdsaSignature, SigningMethod};
use super::SignatureError;
use crate::utils::crypto::{address_from_private_key, eth_message_hash, recover_prehash, sign_prehash};
use ethers_core::types::{Address, H256};
use zeroize::Zeroizing;

/// Sign a Safe hash as an owner.
///
/// `EthSignTypedData` signs the hash itself (`v` = 27/28). `EthSign` signs the
/// EIP-191 prefixed hash and shifts `v` by 4 (`v` = 31/32) so the contract
/// knows to apply the prefix when verifying.
pub fn sign_hash(
    hash: &H256,
    private_key: &[u8],
    method: SigningMethod,
) -> Result<EcdsaSignature, SignatureError> {
    if private_key.len() != 32 {
        return Err(SignatureError::InvalidPrivateKey(format!(
            "expected 32 bytes, got {}",
            private_key.len()
        )));
    }

    // Local copy is wiped on drop
    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(private_key);

    let signer = address_from_private_key(key.as_ref())
        .map_err(|e| SignatureError::InvalidPrivateKey(e.to_string()))?;

    let (digest, v_offset) = match method {
        SigningMethod::EthSignTypedData => (hash.0, 27),
        SigningMethod::EthSign => (eth_message_hash(hash.as_bytes()), 31),
    };

    let (compact, recovery_id) =
        sign_prehash(&digest, key.as_ref()).map_err(|e| SignatureError::InvalidPrivateKey(e.to_string()))?;

    Ok(EcdsaSignature::new(
        signer,
        H256::from_slice(&compact[..32]),
        H256::from_slice(&compact[32..]),
        recovery_id + v_offset,
    ))
}

/// Recover the address that produced `signature` over `hash`, applying the
/// eth_sign prefix rule when `v` is 31 or 32.
///
/// The `signer` field of the signature is ignored.
pub fn recover_signer(hash: &H256, signature: &EcdsaSignature) -> Result<Address, SignatureError> {
    let (digest, recovery_id) = match signature.v {
        27 | 28 => (hash.0, signature.v - 27),
        31 | 32 => (eth_message_hash(hash.as_bytes()), signature.v - 31),
        v => return Err(SignatureError::InvalidRecoveryByte { v }),
    };

    recover_prehash(&digest, &signature.r, &signature.s, recovery_id)
        .map_err(|e| SignatureError::Recovery(e.to_string()))
}
