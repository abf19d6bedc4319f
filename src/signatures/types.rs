//! Signature value types

use super::codec;
use crate::utils::crypto::pad_address;
use ethers_core::types::{Address, Bytes, H256};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};

/// How an owner produced an ECDSA signature.
///
/// The verifying contract tells the two apart by `v`: eth_sign signatures
/// carry `v + 4` and are checked against the EIP-191 prefixed hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningMethod {
    EthSign,
    EthSignTypedData,
}

/// Recoverable ECDSA signature with the signer it claims to come from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EcdsaSignature {
    pub signer: Address,
    pub r: H256,
    pub s: H256,
    /// 27/28 for typed-data signing, 31/32 for eth_sign
    pub v: u8,
}

impl EcdsaSignature {
    pub fn new(signer: Address, r: H256, s: H256, v: u8) -> Self {
        Self { signer, r, s, v }
    }

    /// Signing method implied by `v`, if `v` is one of the four known values
    pub fn method(&self) -> Option<SigningMethod> {
        match self.v {
            27 | 28 => Some(SigningMethod::EthSignTypedData),
            31 | 32 => Some(SigningMethod::EthSign),
            _ => None,
        }
    }

    /// `r || s || v`
    pub fn to_rsv(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(self.r.as_bytes());
        out[32..64].copy_from_slice(self.s.as_bytes());
        out[64] = self.v;
        out
    }
}

/// Signature from an owner that is itself a Safe account
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractSignature {
    pub signer: Address,
    /// Encoded signature set of the nested account
    pub data: Bytes,
}

/// Marker for an owner that called `approveHash` on-chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreApprovedSignature {
    pub signer: Address,
}

/// A single owner's signature
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SafeSignature {
    Ecdsa(EcdsaSignature),
    Contract(ContractSignature),
    PreApproved(PreApprovedSignature),
}

impl SafeSignature {
    pub fn pre_approved(signer: Address) -> Self {
        SafeSignature::PreApproved(PreApprovedSignature { signer })
    }

    pub fn signer(&self) -> Address {
        match self {
            SafeSignature::Ecdsa(sig) => sig.signer,
            SafeSignature::Contract(sig) => sig.signer,
            SafeSignature::PreApproved(sig) => sig.signer,
        }
    }

    /// Whether the signature has a dynamic part after the static region
    pub fn is_dynamic(&self) -> bool {
        matches!(self, SafeSignature::Contract(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SafeSignature::Ecdsa(_) => "ecdsa",
            SafeSignature::Contract(_) => "contract",
            SafeSignature::PreApproved(_) => "pre_approved",
        }
    }

    /// Static 65-byte slot. For contract signatures `offset` is the position
    /// of the dynamic part measured from the start of the blob.
    pub(crate) fn static_part(&self, offset: usize) -> [u8; 65] {
        match self {
            SafeSignature::Ecdsa(sig) => sig.to_rsv(),
            SafeSignature::PreApproved(sig) => {
                let mut out = [0u8; 65];
                out[..32].copy_from_slice(&pad_address(&sig.signer));
                out[64] = 1;
                out
            }
            SafeSignature::Contract(sig) => {
                let mut out = [0u8; 65];
                out[..32].copy_from_slice(&pad_address(&sig.signer));
                out[56..64].copy_from_slice(&(offset as u64).to_be_bytes());
                out
            }
        }
    }

    /// Encode as a one-entry signature blob
    pub fn to_bytes(&self) -> Bytes {
        codec::encode([self])
    }
}

impl From<EcdsaSignature> for SafeSignature {
    fn from(sig: EcdsaSignature) -> Self {
        SafeSignature::Ecdsa(sig)
    }
}

impl From<ContractSignature> for SafeSignature {
    fn from(sig: ContractSignature) -> Self {
        SafeSignature::Contract(sig)
    }
}

impl From<PreApprovedSignature> for SafeSignature {
    fn from(sig: PreApprovedSignature) -> Self {
        SafeSignature::PreApproved(sig)
    }
}

/// Signatures keyed by signer, iterated in ascending address order.
///
/// One entry per signer: adding a second signature from the same owner
/// replaces the first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureSet {
    signatures: BTreeMap<Address, SafeSignature>,
}

impl SignatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a signature, returning the one it replaced
    pub fn insert(&mut self, signature: impl Into<SafeSignature>) -> Option<SafeSignature> {
        let signature = signature.into();
        self.signatures.insert(signature.signer(), signature)
    }

    pub fn with(mut self, signature: impl Into<SafeSignature>) -> Self {
        self.insert(signature);
        self
    }

    pub fn get(&self, signer: &Address) -> Option<&SafeSignature> {
        self.signatures.get(signer)
    }

    pub fn remove(&mut self, signer: &Address) -> Option<SafeSignature> {
        self.signatures.remove(signer)
    }

    pub fn contains(&self, signer: &Address) -> bool {
        self.signatures.contains_key(signer)
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn signers(&self) -> impl Iterator<Item = &Address> {
        self.signatures.keys()
    }

    pub fn iter(&self) -> btree_map::Values<'_, Address, SafeSignature> {
        self.signatures.values()
    }

    /// Encoded blob for `execTransaction` / `isValidSignature`
    pub fn encode(&self) -> Bytes {
        codec::encode(self.iter())
    }
}

impl FromIterator<SafeSignature> for SignatureSet {
    fn from_iter<I: IntoIterator<Item = SafeSignature>>(iter: I) -> Self {
        let mut set = SignatureSet::new();
        for signature in iter {
            set.insert(signature);
        }
        set
    }
}

impl IntoIterator for SignatureSet {
    type Item = SafeSignature;
    type IntoIter = btree_map::IntoValues<Address, SafeSignature>;

    fn into_iter(self) -> Self::IntoIter {
        self.signatures.into_values()
    }
}

impl<'a> IntoIterator for &'a SignatureSet {
    type Item = &'a SafeSignature;
    type IntoIter = btree_map::Values<'a, Address, SafeSignature>;

    fn into_iter(self) -> Self::IntoIter {
        self.signatures.values()
    }
}
