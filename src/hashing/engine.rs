//! Canonical transaction and message hashes

use super::domain::HashDomain;
use super::typed_data::{TypedData, TypedDataError, EIP712_PREFIX};
use crate::types::SafeTransaction;
use crate::utils::crypto::{eth_message_hash, keccak256, keccak256_concat, pad_address};
use ethers_core::types::{Bytes, H256, U256};
use serde::{Deserialize, Serialize};

pub const SAFE_TX_TYPE: &str = "SafeTx(address to,uint256 value,bytes data,uint8 operation,uint256 safeTxGas,uint256 baseGas,uint256 gasPrice,address gasToken,address refundReceiver,uint256 nonce)";
pub const SAFE_MESSAGE_TYPE: &str = "SafeMessage(bytes message)";

/// Off-chain statement an account can attest to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "payload")]
pub enum SafeMessage {
    /// UTF-8 text, hashed as an EIP-191 personal message
    Text(String),
    /// Raw bytes, hashed as an EIP-191 personal message
    Bytes(Bytes),
    /// EIP-712 payload, hashed with its own domain
    Typed(Box<TypedData>),
}

impl SafeMessage {
    /// The 32 bytes that end up in `SafeMessage(bytes message)`
    pub fn content_hash(&self) -> Result<H256, TypedDataError> {
        let hash = match self {
            SafeMessage::Text(text) => eth_message_hash(text.as_bytes()),
            SafeMessage::Bytes(bytes) => eth_message_hash(bytes),
            SafeMessage::Typed(typed) => typed.signing_hash()?,
        };
        Ok(H256(hash))
    }
}

impl From<&str> for SafeMessage {
    fn from(text: &str) -> Self {
        SafeMessage::Text(text.to_string())
    }
}

/// What gets hashed
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    Transaction(&'a SafeTransaction),
    Message(&'a SafeMessage),
}

/// Canonical hash of a transaction or message for one account on one chain
pub fn hash(domain: &HashDomain, payload: Payload<'_>) -> Result<H256, TypedDataError> {
    match payload {
        Payload::Transaction(tx) => Ok(safe_tx_hash(domain, tx)),
        Payload::Message(message) => safe_message_hash(domain, message),
    }
}

/// `hashStruct(SafeTx)`
pub fn safe_tx_struct_hash(tx: &SafeTransaction) -> [u8; 32] {
    let mut operation = [0u8; 32];
    operation[31] = tx.operation as u8;

    keccak256_concat(&[
        &keccak256(SAFE_TX_TYPE.as_bytes()),
        &pad_address(&tx.to),
        &word(tx.value),
        &keccak256(&tx.data),
        &operation,
        &word(tx.safe_tx_gas),
        &word(tx.base_gas),
        &word(tx.gas_price),
        &pad_address(&tx.gas_token),
        &pad_address(&tx.refund_receiver),
        &word(tx.nonce),
    ])
}

/// Hash the owners sign and `execTransaction` checks
pub fn safe_tx_hash(domain: &HashDomain, tx: &SafeTransaction) -> H256 {
    H256(typed_hash(domain, &safe_tx_struct_hash(tx)))
}

/// Hash the owners sign for an off-chain message
pub fn safe_message_hash(domain: &HashDomain, message: &SafeMessage) -> Result<H256, TypedDataError> {
    let content = message.content_hash()?;
    Ok(H256(typed_hash(domain, &message_struct_hash(content.as_bytes()))))
}

/// Hash a nested owner account signs to vouch for `outer_hash`.
///
/// The raw 32-byte outer hash is the message, without any EIP-191 prefix:
/// `SafeMessage(keccak256(outer_hash))`. This is the `bytes32`
/// `isValidSignature(hash, signature)` path, which `checkNSignatures` takes
/// from 1.5.0 on and the fallback handler exposes for off-chain messages.
/// `checkNSignatures` in 1.3.0 and 1.4.1 passes the transaction preimage
/// instead, giving `SafeMessage(safeTxHash)`; that form is not produced here.
pub fn nested_message_hash(domain: &HashDomain, outer_hash: &H256) -> H256 {
    H256(typed_hash(domain, &message_struct_hash(outer_hash.as_bytes())))
}

fn message_struct_hash(message: &[u8]) -> [u8; 32] {
    keccak256_concat(&[&keccak256(SAFE_MESSAGE_TYPE.as_bytes()), &keccak256(message)])
}

fn typed_hash(domain: &HashDomain, struct_hash: &[u8; 32]) -> [u8; 32] {
    keccak256_concat(&[EIP712_PREFIX, &domain.separator(), struct_hash])
}

fn word(value: U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}
