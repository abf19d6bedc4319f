//! Hashing and secp256k1 primitives
//!
//! Thin helpers over `tiny-keccak` and `secp256k1` shared by the hashing,
//! signing and deployment modules.

use ethers_core::types::{Address, H256};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use tiny_keccak::{Hasher, Keccak};

/// EIP-191 prefix for `eth_sign` / `personal_sign`
const ETH_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Keccak256 hash
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// Keccak256 over several slices without concatenating them first
pub fn keccak256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// EIP-191 personal message hash
pub fn eth_message_hash(message: &[u8]) -> [u8; 32] {
    let prefix = format!("{}{}", ETH_MESSAGE_PREFIX, message.len());
    keccak256_concat(&[prefix.as_bytes(), message])
}

/// Left-pad an address into a 32-byte ABI word
pub fn pad_address(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// Derive the Ethereum address of a secp256k1 public key
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    // Uncompressed key without the 0x04 tag
    let uncompressed = public_key.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    Address::from_slice(&hash[12..])
}

/// Address controlled by a raw 32-byte private key
pub fn address_from_private_key(private_key: &[u8]) -> Result<Address, secp256k1::Error> {
    let secp = Secp256k1::signing_only();
    let secret_key = SecretKey::from_slice(private_key)?;
    Ok(public_key_to_address(&PublicKey::from_secret_key(&secp, &secret_key)))
}

/// Sign a 32-byte digest, returning `(r || s, recovery id)`
pub fn sign_prehash(digest: &[u8; 32], private_key: &[u8]) -> Result<([u8; 64], u8), secp256k1::Error> {
    let secp = Secp256k1::signing_only();
    let secret_key = SecretKey::from_slice(private_key)?;
    let message = Message::from_digest(*digest);

    let (recovery_id, compact) = secp
        .sign_ecdsa_recoverable(&message, &secret_key)
        .serialize_compact();

    Ok((compact, recovery_id.to_i32() as u8))
}

/// Recover the signer address of `(r, s, recovery id)` over a digest
pub fn recover_prehash(
    digest: &[u8; 32],
    r: &H256,
    s: &H256,
    recovery_id: u8,
) -> Result<Address, secp256k1::Error> {
    let secp = Secp256k1::verification_only();
    let rec_id = RecoveryId::from_i32(recovery_id as i32)?;

    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(r.as_bytes());
    compact[32..].copy_from_slice(s.as_bytes());

    let signature = RecoverableSignature::from_compact(&compact, rec_id)?;
    let public_key = secp.recover_ecdsa(&Message::from_digest(*digest), &signature)?;
    Ok(public_key_to_address(&public_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::utils::to_checksum;

    const TEST_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_keccak256_concat_matches_single_pass() {
        assert_eq!(keccak256_concat(&[b"hello ", b"world"]), keccak256(b"hello world"));
    }

    #[test]
    fn test_eth_message_hash() {
        // personal_sign("hello")
        assert_eq!(
            hex::encode(eth_message_hash(b"hello")),
            "50b2c43fd39106bafbba0da34fc430e1f91e3c96ea2acee2bc34119f92b37750"
        );
    }

    #[test]
    fn test_address_from_private_key() {
        let key = hex::decode(TEST_KEY).unwrap();
        let address = address_from_private_key(&key).unwrap();
        assert_eq!(
            to_checksum(&address, None),
            "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23"
        );
    }

    #[test]
    fn test_sign_and_recover() {
        let key = hex::decode(TEST_KEY).unwrap();
        let digest = keccak256(b"safe");
        let (compact, recovery_id) = sign_prehash(&digest, &key).unwrap();

        let r = H256::from_slice(&compact[..32]);
        let s = H256::from_slice(&compact[32..]);
        let recovered = recover_prehash(&digest, &r, &s, recovery_id).unwrap();
        assert_eq!(recovered, address_from_private_key(&key).unwrap());
    }

    #[test]
    fn test_pad_address() {
        let word = pad_address(&Address::repeat_byte(0xab));
        assert_eq!(&word[..12], &[0u8; 12]);
        assert_eq!(&word[12..], &[0xab; 20]);
    }
}
