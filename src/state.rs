//! Account State Reader
//!
//! Narrow read interface over the on-chain state of Safe accounts. Verification,
//! module pagination and transaction preparation only ever read through this
//! trait; RPC transports live outside the crate and implement it.
//!
//! [`InMemoryAccountState`] mirrors the contract storage layout closely enough
//! to stand in for a node in tests and offline tooling.

use crate::error::ErrorCode;
use crate::types::{AccountConfig, SafeVersion, SENTINEL_ADDRESS};
use ethers_core::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// =============================================================================
// Types
// =============================================================================

/// One page of the module linked list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePage {
    pub modules: Vec<Address>,
    /// Cursor for the following page, the sentinel once the list is exhausted
    pub next: Address,
}

impl ModulePage {
    pub fn is_last(&self) -> bool {
        self.next == SENTINEL_ADDRESS
    }
}

/// Failures reported by a reader
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReaderError {
    #[error("Safe is not deployed: {account:?}")]
    NotDeployed { account: Address },

    #[error("Cursor {cursor:?} is not an enabled module")]
    InvalidCursor { cursor: Address },

    #[error("Invalid page size {page_size}")]
    InvalidPageSize { page_size: usize },

    #[error("Reader backend failure: {0}")]
    Backend(String),
}

impl ReaderError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ReaderError::NotDeployed { .. } => ErrorCode::NotDeployed,
            ReaderError::InvalidPageSize { .. } => ErrorCode::InvalidPageSize,
            ReaderError::InvalidCursor { .. } | ReaderError::Backend(_) => ErrorCode::Reader,
        }
    }
}

/// Read access to deployed accounts
pub trait AccountStateReader {
    fn is_deployed(&self, account: Address) -> Result<bool, ReaderError>;

    /// Owners in on-chain linked-list order
    fn get_owners(&self, account: Address) -> Result<Vec<Address>, ReaderError>;

    fn get_threshold(&self, account: Address) -> Result<usize, ReaderError>;

    fn get_nonce(&self, account: Address) -> Result<U256, ReaderError>;

    fn get_version(&self, account: Address) -> Result<SafeVersion, ReaderError>;

    /// `getModulesPaginated(cursor, page_size)`: modules after `cursor`
    fn get_modules_paginated(
        &self,
        account: Address,
        cursor: Address,
        page_size: usize,
    ) -> Result<ModulePage, ReaderError>;

    /// Whether `owner` called `approveHash(hash)` on `account`
    fn is_hash_approved(&self, account: Address, owner: Address, hash: &H256) -> Result<bool, ReaderError>;

    /// Current owners, threshold and version of a deployed account
    fn account_config(&self, account: Address) -> Result<AccountConfig, ReaderError> {
        let owners = self.get_owners(account)?;
        let threshold = self.get_threshold(account)?;
        let version = self.get_version(account)?;
        Ok(AccountConfig::new(owners, threshold).with_version(version))
    }
}

impl<R: AccountStateReader + ?Sized> AccountStateReader for &R {
    fn is_deployed(&self, account: Address) -> Result<bool, ReaderError> {
        (**self).is_deployed(account)
    }

    fn get_owners(&self, account: Address) -> Result<Vec<Address>, ReaderError> {
        (**self).get_owners(account)
    }

    fn get_threshold(&self, account: Address) -> Result<usize, ReaderError> {
        (**self).get_threshold(account)
    }

    fn get_nonce(&self, account: Address) -> Result<U256, ReaderError> {
        (**self).get_nonce(account)
    }

    fn get_version(&self, account: Address) -> Result<SafeVersion, ReaderError> {
        (**self).get_version(account)
    }

    fn get_modules_paginated(
        &self,
        account: Address,
        cursor: Address,
        page_size: usize,
    ) -> Result<ModulePage, ReaderError> {
        (**self).get_modules_paginated(account, cursor, page_size)
    }

    fn is_hash_approved(&self, account: Address, owner: Address, hash: &H256) -> Result<bool, ReaderError> {
        (**self).is_hash_approved(account, owner, hash)
    }
}

// =============================================================================
// In-memory state
// =============================================================================

#[derive(Debug, Clone)]
struct AccountRecord {
    owners: Vec<Address>,
    threshold: usize,
    version: SafeVersion,
    nonce: U256,
    /// Head first; new modules are linked in at the head
    modules: Vec<Address>,
    approved_hashes: HashSet<(Address, H256)>,
}

/// Deployed accounts held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountState {
    accounts: HashMap<Address, AccountRecord>,
}

impl InMemoryAccountState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy an account with the given owners, threshold and version
    pub fn deploy(&mut self, account: Address, config: &AccountConfig) -> &mut Self {
        self.accounts.insert(
            account,
            AccountRecord {
                owners: config.owners.clone(),
                threshold: config.threshold,
                version: config.version,
                nonce: U256::zero(),
                modules: Vec::new(),
                approved_hashes: HashSet::new(),
            },
        );
        self
    }

    pub fn with_account(mut self, account: Address, config: &AccountConfig) -> Self {
        self.deploy(account, config);
        self
    }

    pub fn set_nonce(&mut self, account: Address, nonce: impl Into<U256>) -> Result<(), ReaderError> {
        self.record_mut(account)?.nonce = nonce.into();
        Ok(())
    }

    /// Link `module` in at the head of the list, like `enableModule`
    pub fn enable_module(&mut self, account: Address, module: Address) -> Result<(), ReaderError> {
        let record = self.record_mut(account)?;
        if !record.modules.contains(&module) {
            record.modules.insert(0, module);
        }
        Ok(())
    }

    pub fn disable_module(&mut self, account: Address, module: Address) -> Result<(), ReaderError> {
        self.record_mut(account)?.modules.retain(|m| *m != module);
        Ok(())
    }

    /// Record an on-chain `approveHash` by `owner`
    pub fn approve_hash(&mut self, account: Address, owner: Address, hash: H256) -> Result<(), ReaderError> {
        self.record_mut(account)?.approved_hashes.insert((owner, hash));
        Ok(())
    }

    fn record(&self, account: Address) -> Result<&AccountRecord, ReaderError> {
        self.accounts
            .get(&account)
            .ok_or(ReaderError::NotDeployed { account })
    }

    fn record_mut(&mut self, account: Address) -> Result<&mut AccountRecord, ReaderError> {
        self.accounts
            .get_mut(&account)
            .ok_or(ReaderError::NotDeployed { account })
    }
}

impl AccountStateReader for InMemoryAccountState {
    fn is_deployed(&self, account: Address) -> Result<bool, ReaderError> {
        Ok(self.accounts.contains_key(&account))
    }

    fn get_owners(&self, account: Address) -> Result<Vec<Address>, ReaderError> {
        Ok(self.record(account)?.owners.clone())
    }

    fn get_threshold(&self, account: Address) -> Result<usize, ReaderError> {
        Ok(self.record(account)?.threshold)
    }

    fn get_nonce(&self, account: Address) -> Result<U256, ReaderError> {
        Ok(self.record(account)?.nonce)
    }

    fn get_version(&self, account: Address) -> Result<SafeVersion, ReaderError> {
        Ok(self.record(account)?.version)
    }

    fn get_modules_paginated(
        &self,
        account: Address,
        cursor: Address,
        page_size: usize,
    ) -> Result<ModulePage, ReaderError> {
        let record = self.record(account)?;
        if page_size == 0 {
            return Err(ReaderError::InvalidPageSize { page_size });
        }

        let start = if cursor == SENTINEL_ADDRESS {
            0
        } else {
            record
                .modules
                .iter()
                .position(|m| *m == cursor)
                .map(|i| i + 1)
                .ok_or(ReaderError::InvalidCursor { cursor })?
        };

        let end = start.saturating_add(page_size).min(record.modules.len());
        let modules = record.modules[start..end].to_vec();

        // Mirrors 1.4.1: the last returned item is the cursor for the next page
        let next = match modules.last() {
            Some(last) if end < record.modules.len() => *last,
            _ => SENTINEL_ADDRESS,
        };

        Ok(ModulePage { modules, next })
    }

    fn is_hash_approved(&self, account: Address, owner: Address, hash: &H256) -> Result<bool, ReaderError> {
        Ok(self.record(account)?.approved_hashes.contains(&(owner, *hash)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn state_with_modules(modules: &[Address]) -> InMemoryAccountState {
        let mut state = InMemoryAccountState::new();
        state.deploy(addr(0xaa), &AccountConfig::new(vec![addr(1)], 1));
        for module in modules {
            state.enable_module(addr(0xaa), *module).unwrap();
        }
        state
    }

    #[test]
    fn test_undeployed_account() {
        let state = InMemoryAccountState::new();
        assert!(!state.is_deployed(addr(0xaa)).unwrap());
        assert_eq!(
            state.get_owners(addr(0xaa)),
            Err(ReaderError::NotDeployed { account: addr(0xaa) })
        );
    }

    #[test]
    fn test_account_config_from_reads() {
        let config = AccountConfig::new(vec![addr(1), addr(2)], 2).with_version(SafeVersion::V1_4_1);
        let state = InMemoryAccountState::new().with_account(addr(0xaa), &config);

        let read = state.account_config(addr(0xaa)).unwrap();
        assert_eq!(read.owners, config.owners);
        assert_eq!(read.threshold, 2);
        assert_eq!(read.version, SafeVersion::V1_4_1);
    }

    #[test]
    fn test_modules_are_linked_at_head() {
        let state = state_with_modules(&[addr(0x10), addr(0x20)]);
        let page = state.get_modules_paginated(addr(0xaa), SENTINEL_ADDRESS, 10).unwrap();
        assert_eq!(page.modules, vec![addr(0x20), addr(0x10)]);
        assert!(page.is_last());
    }

    #[test]
    fn test_pagination_cursor() {
        let state = state_with_modules(&[addr(0x10), addr(0x20), addr(0x30)]);

        let first = state.get_modules_paginated(addr(0xaa), SENTINEL_ADDRESS, 2).unwrap();
        assert_eq!(first.modules, vec![addr(0x30), addr(0x20)]);
        assert_eq!(first.next, addr(0x20));

        let second = state.get_modules_paginated(addr(0xaa), first.next, 2).unwrap();
        assert_eq!(second.modules, vec![addr(0x10)]);
        assert_eq!(second.next, SENTINEL_ADDRESS);
    }

    #[test]
    fn test_exact_fit_page_ends_with_sentinel() {
        let state = state_with_modules(&[addr(0x10), addr(0x20)]);
        let page = state.get_modules_paginated(addr(0xaa), SENTINEL_ADDRESS, 2).unwrap();
        assert_eq!(page.modules.len(), 2);
        assert_eq!(page.next, SENTINEL_ADDRESS);
    }

    #[test]
    fn test_unbounded_page_size() {
        let state = state_with_modules(&[addr(0x10), addr(0x20)]);

        let first = state.get_modules_paginated(addr(0xaa), SENTINEL_ADDRESS, 1).unwrap();
        let rest = state.get_modules_paginated(addr(0xaa), first.next, usize::MAX).unwrap();
        assert_eq!(rest.modules, vec![addr(0x10)]);
        assert_eq!(rest.next, SENTINEL_ADDRESS);

        let all = state.get_modules_paginated(addr(0xaa), SENTINEL_ADDRESS, usize::MAX).unwrap();
        assert_eq!(all.modules, vec![addr(0x20), addr(0x10)]);
        assert!(all.is_last());
    }

    #[test]
    fn test_unknown_cursor() {
        let state = state_with_modules(&[addr(0x10)]);
        assert_eq!(
            state.get_modules_paginated(addr(0xaa), addr(0x99), 1),
            Err(ReaderError::InvalidCursor { cursor: addr(0x99) })
        );
    }

    #[test]
    fn test_hash_approval() {
        let mut state = state_with_modules(&[]);
        let hash = H256::repeat_byte(7);
        assert!(!state.is_hash_approved(addr(0xaa), addr(1), &hash).unwrap());

        state.approve_hash(addr(0xaa), addr(1), hash).unwrap();
        assert!(state.is_hash_approved(addr(0xaa), addr(1), &hash).unwrap());
        assert!(!state.is_hash_approved(addr(0xaa), addr(2), &hash).unwrap());
    }
}
