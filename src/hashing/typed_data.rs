//! EIP-712 typed structured data
//!
//! Hashes arbitrary typed payloads so they can be attested as Safe messages.
//! Reference: <https://eips.ethereum.org/EIPS/eip-712>

use crate::utils::crypto::{keccak256, keccak256_concat};
use ethers_core::types::{Address, H256, I256, U256};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Magic prefix for EIP-712 encoding
pub(crate) const EIP712_PREFIX: &[u8] = b"\x19\x01";

const DOMAIN_TYPE_NAME: &str = "EIP712Domain";

/// A field in a struct type definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedDataField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl TypedDataField {
    pub fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
        }
    }
}

/// The EIP-712 domain; only present fields take part in the separator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataDomain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Number, decimal string or hex string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<H256>,
}

/// Complete typed data payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    pub types: BTreeMap<String, Vec<TypedDataField>>,
    pub primary_type: String,
    pub domain: TypedDataDomain,
    pub message: serde_json::Value,
}

/// Errors raised while hashing typed data
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypedDataError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid value for type {type_name}: {value}")]
    InvalidValue { type_name: String, value: String },
}

impl TypedData {
    /// Parse typed data from a JSON string
    pub fn from_json(json: &str) -> Result<Self, TypedDataError> {
        serde_json::from_str(json).map_err(|e| TypedDataError::InvalidJson(e.to_string()))
    }

    /// `keccak256("\x19\x01" || domainSeparator || hashStruct(message))`
    pub fn signing_hash(&self) -> Result<[u8; 32], TypedDataError> {
        let domain_separator = self.domain_separator()?;
        let struct_hash = self.hash_struct(&self.primary_type, &self.message)?;
        Ok(keccak256_concat(&[EIP712_PREFIX, &domain_separator, &struct_hash]))
    }

    pub fn domain_separator(&self) -> Result<[u8; 32], TypedDataError> {
        let domain = &self.domain;
        let mut fields = Vec::new();
        let mut encoded = Vec::new();

        if let Some(ref name) = domain.name {
            fields.push(TypedDataField::new("name", "string"));
            encoded.extend_from_slice(&keccak256(name.as_bytes()));
        }
        if let Some(ref version) = domain.version {
            fields.push(TypedDataField::new("version", "string"));
            encoded.extend_from_slice(&keccak256(version.as_bytes()));
        }
        if let Some(ref chain_id) = domain.chain_id {
            fields.push(TypedDataField::new("chainId", "uint256"));
            encoded.extend_from_slice(&u256_word(parse_uint("uint256", chain_id)?));
        }
        if let Some(ref contract) = domain.verifying_contract {
            fields.push(TypedDataField::new("verifyingContract", "address"));
            encoded.extend_from_slice(&crate::utils::crypto::pad_address(contract));
        }
        if let Some(ref salt) = domain.salt {
            fields.push(TypedDataField::new("salt", "bytes32"));
            encoded.extend_from_slice(salt.as_bytes());
        }

        let type_hash = keccak256(format_type(DOMAIN_TYPE_NAME, &fields).as_bytes());
        Ok(keccak256_concat(&[&type_hash, &encoded]))
    }

    /// `Name(type field,...)` followed by referenced struct types, sorted
    pub fn encode_type(&self, type_name: &str) -> Result<String, TypedDataError> {
        let fields = self.fields_of(type_name)?;
        let mut result = format_type(type_name, fields);

        for dependency in self.dependencies(type_name) {
            if dependency != type_name {
                result.push_str(&format_type(&dependency, self.fields_of(&dependency)?));
            }
        }
        Ok(result)
    }

    pub fn type_hash(&self, type_name: &str) -> Result<[u8; 32], TypedDataError> {
        Ok(keccak256(self.encode_type(type_name)?.as_bytes()))
    }

    /// `keccak256(typeHash || encodeData(value))`
    pub fn hash_struct(
        &self,
        type_name: &str,
        value: &serde_json::Value,
    ) -> Result<[u8; 32], TypedDataError> {
        let object = value.as_object().ok_or_else(|| invalid(type_name, value))?;

        let mut encoded = self.type_hash(type_name)?.to_vec();
        for field in self.fields_of(type_name)? {
            let field_value = object
                .get(&field.name)
                .ok_or_else(|| TypedDataError::MissingField(format!("{}.{}", type_name, field.name)))?;
            encoded.extend_from_slice(&self.encode_field(&field.type_name, field_value)?);
        }
        Ok(keccak256(&encoded))
    }

    fn encode_field(
        &self,
        type_name: &str,
        value: &serde_json::Value,
    ) -> Result<[u8; 32], TypedDataError> {
        if let Some(element_type) = array_element_type(type_name) {
            let items = value.as_array().ok_or_else(|| invalid(type_name, value))?;
            let mut encoded = Vec::with_capacity(items.len() * 32);
            for item in items {
                encoded.extend_from_slice(&self.encode_field(element_type, item)?);
            }
            return Ok(keccak256(&encoded));
        }

        if self.types.contains_key(type_name) {
            return self.hash_struct(type_name, value);
        }

        match type_name {
            "string" => {
                let s = value.as_str().ok_or_else(|| invalid(type_name, value))?;
                Ok(keccak256(s.as_bytes()))
            }
            "bytes" => Ok(keccak256(&parse_hex(type_name, value)?)),
            _ => encode_atomic(type_name, value),
        }
    }

    fn fields_of(&self, type_name: &str) -> Result<&[TypedDataField], TypedDataError> {
        self.types
            .get(type_name)
            .map(Vec::as_slice)
            .ok_or_else(|| TypedDataError::UnknownType(type_name.to_string()))
    }

    /// Struct types reachable from `type_name`, including itself
    fn dependencies(&self, type_name: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        let mut to_visit = vec![type_name.to_string()];

        while let Some(current) = to_visit.pop() {
            let Some(fields) = self.types.get(&current) else {
                continue;
            };
            if !found.insert(current) {
                continue;
            }
            for field in fields {
                let base = base_type(&field.type_name);
                if self.types.contains_key(base) && !found.contains(base) {
                    to_visit.push(base.to_string());
                }
            }
        }
        found
    }
}

fn format_type(type_name: &str, fields: &[TypedDataField]) -> String {
    let members: Vec<String> = fields
        .iter()
        .map(|f| format!("{} {}", f.type_name, f.name))
        .collect();
    format!("{}({})", type_name, members.join(","))
}

/// `Person[]` -> `Person`, `uint256[2][]` -> `uint256`
fn base_type(type_name: &str) -> &str {
    type_name.find('[').map_or(type_name, |pos| &type_name[..pos])
}

/// Strip the outermost array dimension, if any
fn array_element_type(type_name: &str) -> Option<&str> {
    if !type_name.ends_with(']') {
        return None;
    }
    type_name.rfind('[').map(|pos| &type_name[..pos])
}

fn encode_atomic(type_name: &str, value: &serde_json::Value) -> Result<[u8; 32], TypedDataError> {
    if type_name == "address" {
        let address = value
            .as_str()
            .and_then(|s| Address::from_str(s).ok())
            .ok_or_else(|| invalid(type_name, value))?;
        return Ok(crate::utils::crypto::pad_address(&address));
    }

    if type_name == "bool" {
        let flag = match value {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::String(s) if s == "true" || s == "false" => s == "true",
            _ => return Err(invalid(type_name, value)),
        };
        let mut word = [0u8; 32];
        word[31] = flag as u8;
        return Ok(word);
    }

    if type_name.starts_with("uint") {
        return Ok(u256_word(parse_uint(type_name, value)?));
    }

    if type_name.starts_with("int") {
        return Ok(u256_word(parse_int(type_name, value)?.into_raw()));
    }

    if let Some(size) = type_name.strip_prefix("bytes").and_then(|n| n.parse::<usize>().ok()) {
        let bytes = parse_hex(type_name, value)?;
        if size == 0 || size > 32 || bytes.len() > size {
            return Err(invalid(type_name, value));
        }
        let mut word = [0u8; 32];
        word[..bytes.len()].copy_from_slice(&bytes);
        return Ok(word);
    }

    Err(TypedDataError::UnknownType(type_name.to_string()))
}

fn u256_word(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

fn parse_uint(type_name: &str, value: &serde_json::Value) -> Result<U256, TypedDataError> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_u64().map(U256::from),
        serde_json::Value::String(s) => match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex_digits) => U256::from_str_radix(hex_digits, 16).ok(),
            None => U256::from_dec_str(s).ok(),
        },
        _ => None,
    };
    parsed.ok_or_else(|| invalid(type_name, value))
}

fn parse_int(type_name: &str, value: &serde_json::Value) -> Result<I256, TypedDataError> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_i64().map(I256::from),
        serde_json::Value::String(s) => I256::from_dec_str(s).ok(),
        _ => None,
    };
    parsed.ok_or_else(|| invalid(type_name, value))
}

fn parse_hex(type_name: &str, value: &serde_json::Value) -> Result<Vec<u8>, TypedDataError> {
    let s = value.as_str().ok_or_else(|| invalid(type_name, value))?;
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    hex::decode(digits).map_err(|_| invalid(type_name, value))
}

fn invalid(type_name: &str, value: &serde_json::Value) -> TypedDataError {
    TypedDataError::InvalidValue {
        type_name: type_name.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod typed_data_tests {
    use super::*;

    const MAIL_EXAMPLE: &str = r#"{
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "version", "type": "string"},
                {"name": "chainId", "type": "uint256"},
                {"name": "verifyingContract", "type": "address"}
            ],
            "Person": [
                {"name": "name", "type": "string"},
                {"name": "wallet", "type": "address"}
            ],
            "Mail": [
                {"name": "from", "type": "Person"},
                {"name": "to", "type": "Person"},
                {"name": "contents", "type": "string"}
            ]
        },
        "primaryType": "Mail",
        "domain": {
            "name": "Ether Mail",
            "version": "1",
            "chainId": 1,
            "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
        },
        "message": {
            "from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
            "to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
            "contents": "Hello, Bob!"
        }
    }"#;

    #[test]
    fn test_mail_signing_hash() {
        let typed_data = TypedData::from_json(MAIL_EXAMPLE).unwrap();
        let hash = typed_data.signing_hash().unwrap();

        // Expected hash from the EIP-712 reference example
        assert_eq!(
            hex::encode(hash),
            "be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
        );
    }

    #[test]
    fn test_mail_domain_separator() {
        let typed_data = TypedData::from_json(MAIL_EXAMPLE).unwrap();
        assert_eq!(
            hex::encode(typed_data.domain_separator().unwrap()),
            "f2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f"
        );
    }

    #[test]
    fn test_encode_type_with_dependencies() {
        let typed_data = TypedData::from_json(MAIL_EXAMPLE).unwrap();
        assert_eq!(
            typed_data.encode_type("Mail").unwrap(),
            "Mail(Person from,Person to,string contents)Person(string name,address wallet)"
        );
    }

    #[test]
    fn test_missing_field() {
        let mut typed_data = TypedData::from_json(MAIL_EXAMPLE).unwrap();
        typed_data.message.as_object_mut().unwrap().remove("contents");
        assert_eq!(
            typed_data.signing_hash(),
            Err(TypedDataError::MissingField("Mail.contents".to_string()))
        );
    }

    #[test]
    fn test_array_and_int_fields() {
        let json = r#"{
            "types": {
                "Batch": [
                    {"name": "amounts", "type": "int256[]"},
                    {"name": "tag", "type": "bytes4"}
                ]
            },
            "primaryType": "Batch",
            "domain": {"chainId": "0x1"},
            "message": {"amounts": [-1, "2"], "tag": "0xdeadbeef"}
        }"#;
        let typed_data = TypedData::from_json(json).unwrap();
        assert!(typed_data.signing_hash().is_ok());
    }

    #[test]
    fn test_type_helpers() {
        assert_eq!(base_type("Person[]"), "Person");
        assert_eq!(array_element_type("uint256[2][]"), Some("uint256[2]"));
        assert_eq!(array_element_type("address"), None);
    }
}
