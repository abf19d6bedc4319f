//! Module Manager
//!
//! Reads the account's sentinel-terminated module list page by page and
//! prepares the self-calls that link modules in and out of it.
//!
//! ```text
//! SENTINEL -> module_n -> ... -> module_1 -> SENTINEL
//! ```

use crate::error::ErrorCode;
use crate::state::{AccountStateReader, ModulePage, ReaderError};
use crate::types::{SafeTransaction, TransactionOptions, SENTINEL_ADDRESS, ZERO_ADDRESS};
use crate::utils::crypto::keccak256;
use crate::{log_debug, log_warn};
use ethers_core::abi::{encode, Token};
use ethers_core::types::{Address, Bytes, U256};
use std::collections::HashSet;

const LOG_TARGET: &str = "safe_core::modules";

/// Page size used when walking the whole list
pub const MODULE_PAGE_SIZE: usize = 10;

pub const ENABLE_MODULE_SIGNATURE: &str = "enableModule(address)";
pub const DISABLE_MODULE_SIGNATURE: &str = "disableModule(address,address)";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModuleError {
    #[error("Invalid page size for fetching paginated modules: {page_size}")]
    InvalidPageSize { page_size: usize },

    #[error("Safe is not deployed: {account:?}")]
    NotDeployed { account: Address },

    #[error("Invalid module address provided: {module:?}")]
    InvalidModuleAddress { module: Address },

    #[error("Module provided is already enabled: {module:?}")]
    ModuleAlreadyEnabled { module: Address },

    #[error("Module provided is not enabled yet: {module:?}")]
    ModuleNotEnabled { module: Address },

    #[error("Module list of {account:?} does not terminate at the sentinel")]
    CorruptList { account: Address },

    #[error(transparent)]
    Reader(#[from] ReaderError),
}

impl ModuleError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ModuleError::InvalidPageSize { .. } => ErrorCode::InvalidPageSize,
            ModuleError::NotDeployed { .. } => ErrorCode::NotDeployed,
            ModuleError::InvalidModuleAddress { .. } => ErrorCode::InvalidModuleAddress,
            ModuleError::ModuleAlreadyEnabled { .. } => ErrorCode::ModuleAlreadyEnabled,
            ModuleError::ModuleNotEnabled { .. } => ErrorCode::ModuleNotEnabled,
            ModuleError::CorruptList { .. } => ErrorCode::Reader,
            ModuleError::Reader(e) => e.code(),
        }
    }
}

fn ensure_deployed<R: AccountStateReader + ?Sized>(reader: &R, account: Address) -> Result<(), ModuleError> {
    if reader.is_deployed(account)? {
        Ok(())
    } else {
        Err(ModuleError::NotDeployed { account })
    }
}

/// Up to `page_size` modules following `cursor`; the sentinel starts at the head
pub fn get_modules_paginated<R: AccountStateReader + ?Sized>(
    reader: &R,
    account: Address,
    cursor: Address,
    page_size: usize,
) -> Result<ModulePage, ModuleError> {
    if page_size == 0 {
        return Err(ModuleError::InvalidPageSize { page_size });
    }
    ensure_deployed(reader, account)?;

    let page = reader.get_modules_paginated(account, cursor, page_size).map_err(|e| {
        log_warn!(LOG_TARGET, "module page read failed", account = account, cursor = cursor, error = e);
        e
    })?;

    log_debug!(
        LOG_TARGET,
        "module page fetched",
        account = account,
        cursor = cursor,
        count = page.modules.len(),
        next = page.next
    );
    Ok(page)
}

/// Every enabled module, head first
pub fn get_modules<R: AccountStateReader + ?Sized>(reader: &R, account: Address) -> Result<Vec<Address>, ModuleError> {
    let mut modules = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = SENTINEL_ADDRESS;

    loop {
        let page = get_modules_paginated(reader, account, cursor, MODULE_PAGE_SIZE)?;
        let exhausted = page.is_last() || page.modules.is_empty();

        for module in page.modules {
            if !seen.insert(module) {
                return Err(ModuleError::CorruptList { account });
            }
            modules.push(module);
        }

        if exhausted {
            return Ok(modules);
        }
        cursor = page.next;
    }
}

pub fn is_module_enabled<R: AccountStateReader + ?Sized>(
    reader: &R,
    account: Address,
    module: Address,
) -> Result<bool, ModuleError> {
    Ok(get_modules(reader, account)?.contains(&module))
}

fn validate_module_address(module: Address) -> Result<(), ModuleError> {
    if module == ZERO_ADDRESS || module == SENTINEL_ADDRESS {
        return Err(ModuleError::InvalidModuleAddress { module });
    }
    Ok(())
}

fn encode_module_call(signature: &str, args: &[Address]) -> Bytes {
    let hash = keccak256(signature.as_bytes());
    let tokens: Vec<Token> = args.iter().copied().map(Token::Address).collect();

    let mut call = hash[..4].to_vec();
    call.extend_from_slice(&encode(&tokens));
    Bytes::from(call)
}

fn self_call<R: AccountStateReader + ?Sized>(
    reader: &R,
    account: Address,
    data: Bytes,
    options: &TransactionOptions,
) -> Result<SafeTransaction, ModuleError> {
    let nonce = match options.nonce {
        Some(nonce) => nonce,
        None => reader.get_nonce(account)?,
    };

    Ok(SafeTransaction::call(account, U256::zero(), data)
        .with_options(options)
        .with_nonce(nonce))
}

/// Prepare `enableModule(module)` as a call from the account to itself
pub fn create_enable_module_tx<R: AccountStateReader + ?Sized>(
    reader: &R,
    account: Address,
    module: Address,
    options: &TransactionOptions,
) -> Result<SafeTransaction, ModuleError> {
    validate_module_address(module)?;
    if get_modules(reader, account)?.contains(&module) {
        return Err(ModuleError::ModuleAlreadyEnabled { module });
    }

    let data = encode_module_call(ENABLE_MODULE_SIGNATURE, &[module]);
    self_call(reader, account, data, options)
}

/// Prepare `disableModule(prev, module)`, where `prev` is the list entry
/// pointing at `module`
pub fn create_disable_module_tx<R: AccountStateReader + ?Sized>(
    reader: &R,
    account: Address,
    module: Address,
    options: &TransactionOptions,
) -> Result<SafeTransaction, ModuleError> {
    validate_module_address(module)?;
    let modules = get_modules(reader, account)?;

    let index = modules
        .iter()
        .position(|m| *m == module)
        .ok_or(ModuleError::ModuleNotEnabled { module })?;
    let prev = if index == 0 { SENTINEL_ADDRESS } else { modules[index - 1] };

    let data = encode_module_call(DISABLE_MODULE_SIGNATURE, &[prev, module]);
    self_call(reader, account, data, options)
}
