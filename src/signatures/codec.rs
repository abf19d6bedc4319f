//! Signature blob encoding
//!
//! Layout of an encoded blob:
//!
//! ```text
//! [ static slot 0 | static slot 1 | ... | dynamic part 0 | dynamic part 1 | ... ]
//!   65 bytes each, ascending signer     uint256 length ++ raw bytes
//! ```
//!
//! Contract signatures point at their dynamic part through `s`, as an offset
//! from the start of the blob.

use super::signer::recover_signer;
use super::types::{ContractSignature, EcdsaSignature, SafeSignature, SignatureSet};
use super::SignatureError;
use ethers_core::types::{Address, Bytes, H256, U256};
use std::collections::BTreeMap;

pub const SIGNATURE_LENGTH_BYTES: usize = 65;

/// Encode signatures sorted by ascending signer address.
///
/// Later entries for an already-seen signer replace earlier ones.
pub fn encode<'a, I>(signatures: I) -> Bytes
where
    I: IntoIterator<Item = &'a SafeSignature>,
{
    let sorted: BTreeMap<Address, &SafeSignature> = signatures
        .into_iter()
        .map(|sig| (sig.signer(), sig))
        .collect();

    let static_len = sorted.len() * SIGNATURE_LENGTH_BYTES;
    let mut static_part = Vec::with_capacity(static_len);
    let mut dynamic_part = Vec::new();

    for signature in sorted.values() {
        let offset = static_len + dynamic_part.len();
        static_part.extend_from_slice(&signature.static_part(offset));

        if let SafeSignature::Contract(contract) = signature {
            let mut length = [0u8; 32];
            U256::from(contract.data.len()).to_big_endian(&mut length);
            dynamic_part.extend_from_slice(&length);
            dynamic_part.extend_from_slice(&contract.data);
        }
    }

    static_part.extend_from_slice(&dynamic_part);
    Bytes::from(static_part)
}

/// Decode a signature blob.
///
/// ECDSA signers are recovered from `hash`, so a blob can only be decoded
/// against the hash it was produced for. Ordering is not enforced and a
/// repeated signer keeps its last entry.
pub fn decode(data: &[u8], hash: &H256) -> Result<SignatureSet, SignatureError> {
    let static_end = static_region_len(data)?;
    let mut set = SignatureSet::new();

    for (index, slot) in data[..static_end].chunks_exact(SIGNATURE_LENGTH_BYTES).enumerate() {
        let r = H256::from_slice(&slot[..32]);
        let s = H256::from_slice(&slot[32..64]);
        let v = slot[64];

        let signature = match v {
            0 => {
                let signer = word_to_address(index, &r)?;
                let offset = word_to_offset(index, &s, data.len())?;
                SafeSignature::Contract(ContractSignature {
                    signer,
                    data: read_dynamic(index, data, offset)?,
                })
            }
            1 => SafeSignature::pre_approved(word_to_address(index, &r)?),
            27 | 28 | 31 | 32 => {
                let mut ecdsa = EcdsaSignature::new(Address::zero(), r, s, v);
                ecdsa.signer = recover_signer(hash, &ecdsa).map_err(|e| SignatureError::Unrecoverable {
                    index,
                    reason: e.to_string(),
                })?;
                SafeSignature::Ecdsa(ecdsa)
            }
            v => return Err(SignatureError::UnsupportedV { index, v }),
        };

        set.insert(signature);
    }

    Ok(set)
}

/// Wrap a nested account's signatures as a contract signature on its behalf
pub fn build_contract_signature(nested: &SignatureSet, nested_account: Address) -> ContractSignature {
    ContractSignature {
        signer: nested_account,
        data: nested.encode(),
    }
}

/// The static region runs up to the first dynamic part, or to the end of
/// the blob when there is none.
fn static_region_len(data: &[u8]) -> Result<usize, SignatureError> {
    let mut static_end = data.len();
    let mut index = 0;

    while (index + 1) * SIGNATURE_LENGTH_BYTES <= static_end {
        let slot = &data[index * SIGNATURE_LENGTH_BYTES..(index + 1) * SIGNATURE_LENGTH_BYTES];
        if slot[64] == 0 {
            let offset = word_to_offset(index, &H256::from_slice(&slot[32..64]), data.len())?;
            if offset < (index + 1) * SIGNATURE_LENGTH_BYTES {
                return Err(SignatureError::OffsetInStaticRegion { index, offset });
            }
            static_end = static_end.min(offset);
        }
        index += 1;
    }

    if index * SIGNATURE_LENGTH_BYTES != static_end {
        return Err(SignatureError::InvalidLength { len: static_end });
    }

    Ok(static_end)
}

fn word_to_address(index: usize, word: &H256) -> Result<Address, SignatureError> {
    if word.as_bytes()[..12].iter().any(|b| *b != 0) {
        return Err(SignatureError::DirtyAddressPadding { index });
    }
    Ok(Address::from_slice(&word.as_bytes()[12..]))
}

fn word_to_offset(index: usize, word: &H256, len: usize) -> Result<usize, SignatureError> {
    let value = U256::from_big_endian(word.as_bytes());
    if value > U256::from(len) {
        return Err(SignatureError::OffsetOutOfBounds {
            index,
            offset: value.to_string(),
            len,
        });
    }
    Ok(value.as_usize())
}

fn read_dynamic(index: usize, data: &[u8], offset: usize) -> Result<Bytes, SignatureError> {
    let out_of_bounds = |offset: usize| SignatureError::OffsetOutOfBounds {
        index,
        offset: offset.to_string(),
        len: data.len(),
    };

    let body_start = offset
        .checked_add(32)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| out_of_bounds(offset))?;
    let length = U256::from_big_endian(&data[offset..body_start]);
    if length > U256::from(data.len() - body_start) {
        return Err(out_of_bounds(offset));
    }

    let body_end = body_start + length.as_usize();
    Ok(Bytes::from(data[body_start..body_end].to_vec()))
}
