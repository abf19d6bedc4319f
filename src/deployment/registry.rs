//! Deployment registry
//!
//! Per version and chain: which factory deploys proxies, which singletons
//! they point at, the compatibility fallback handler, and the proxy creation
//! bytecode. Data is loaded from JSON or inserted directly; lookups can be
//! memoized through an injected [`RegistryCache`].

use crate::error::ErrorCode;
use crate::log_info;
use crate::types::SafeVersion;
use ethers_core::types::{Address, Bytes};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Contracts of one Safe release on one chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentInfo {
    pub version: SafeVersion,
    pub chain_id: u64,
    pub proxy_factory: Address,
    pub safe_singleton: Address,
    #[serde(default)]
    pub safe_l2_singleton: Option<Address>,
    #[serde(default)]
    pub fallback_handler: Option<Address>,
    /// `proxyCreationCode()` of the factory
    pub proxy_creation_code: Bytes,
}

impl DeploymentInfo {
    /// Singleton proxies are deployed against
    pub fn singleton(&self, use_l1_singleton: bool) -> Address {
        match self.safe_l2_singleton {
            Some(l2) if !use_l1_singleton => l2,
            _ => self.safe_singleton,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("No deployment of Safe {version} on chain {chain_id}")]
    UnknownVersionOrChain { version: SafeVersion, chain_id: u64 },

    #[error("Safe {version} on chain {chain_id} has no {contract} deployment")]
    MissingContract {
        contract: &'static str,
        version: SafeVersion,
        chain_id: u64,
    },

    #[error("Registry data error: {0}")]
    InvalidData(String),

    #[error("Registry backend failure: {0}")]
    Backend(String),
}

impl RegistryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RegistryError::UnknownVersionOrChain { .. } => ErrorCode::UnknownVersionOrChain,
            RegistryError::InvalidData(_) => ErrorCode::Encoding,
            RegistryError::MissingContract { .. } | RegistryError::Backend(_) => ErrorCode::Registry,
        }
    }
}

/// Source of deployment data
pub trait DeploymentRegistry {
    fn deployment(&self, version: SafeVersion, chain_id: u64) -> Result<DeploymentInfo, RegistryError>;

    /// Identifies the revision of the data; part of every cache key
    fn snapshot(&self) -> String;
}

impl<R: DeploymentRegistry + ?Sized> DeploymentRegistry for &R {
    fn deployment(&self, version: SafeVersion, chain_id: u64) -> Result<DeploymentInfo, RegistryError> {
        (**self).deployment(version, chain_id)
    }

    fn snapshot(&self) -> String {
        (**self).snapshot()
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    snapshot: String,
    deployments: Vec<DeploymentInfo>,
}

/// Registry backed by a fixed table
#[derive(Debug, Clone, Default)]
pub struct StaticDeploymentRegistry {
    snapshot: String,
    deployments: HashMap<(SafeVersion, u64), DeploymentInfo>,
}

impl StaticDeploymentRegistry {
    pub fn new(snapshot: impl Into<String>) -> Self {
        Self {
            snapshot: snapshot.into(),
            deployments: HashMap::new(),
        }
    }

    /// Load `{ "snapshot": "...", "deployments": [ ... ] }`
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile =
            serde_json::from_str(json).map_err(|e| RegistryError::InvalidData(e.to_string()))?;

        let mut registry = Self::new(file.snapshot);
        for info in file.deployments {
            registry.insert(info);
        }

        log_info!(
            "safe_core::deployment",
            "deployment registry loaded",
            snapshot = registry.snapshot,
            deployments = registry.len()
        );
        Ok(registry)
    }

    /// Add or replace the entry for `(info.version, info.chain_id)`
    pub fn insert(&mut self, info: DeploymentInfo) -> &mut Self {
        self.deployments.insert((info.version, info.chain_id), info);
        self
    }

    pub fn len(&self) -> usize {
        self.deployments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deployments.is_empty()
    }
}

impl DeploymentRegistry for StaticDeploymentRegistry {
    fn deployment(&self, version: SafeVersion, chain_id: u64) -> Result<DeploymentInfo, RegistryError> {
        self.deployments
            .get(&(version, chain_id))
            .cloned()
            .ok_or(RegistryError::UnknownVersionOrChain { version, chain_id })
    }

    fn snapshot(&self) -> String {
        self.snapshot.clone()
    }
}

type CacheKey = (SafeVersion, u64, String);

/// Memo of registry lookups keyed by `(version, chain id, snapshot)`.
///
/// Only successful lookups are stored, so collaborator failures are never
/// replayed from the cache.
#[derive(Debug, Default)]
pub struct RegistryCache {
    entries: RwLock<HashMap<CacheKey, DeploymentInfo>>,
}

impl RegistryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load<R: DeploymentRegistry + ?Sized>(
        &self,
        registry: &R,
        version: SafeVersion,
        chain_id: u64,
    ) -> Result<DeploymentInfo, RegistryError> {
        let key = (version, chain_id, registry.snapshot());

        {
            let entries = self
                .entries
                .read()
                .map_err(|_| RegistryError::Backend("registry cache lock poisoned".to_string()))?;
            if let Some(info) = entries.get(&key) {
                return Ok(info.clone());
            }
        }

        let info = registry.deployment(version, chain_id)?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| RegistryError::Backend("registry cache lock poisoned".to_string()))?;
        entries.insert(key, info.clone());
        Ok(info)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A registry whose lookups go through a shared cache
#[derive(Debug, Clone)]
pub struct CachedRegistry<R> {
    inner: R,
    cache: Arc<RegistryCache>,
}

impl<R: DeploymentRegistry> CachedRegistry<R> {
    pub fn new(inner: R, cache: Arc<RegistryCache>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &RegistryCache {
        &self.cache
    }
}

impl<R: DeploymentRegistry> DeploymentRegistry for CachedRegistry<R> {
    fn deployment(&self, version: SafeVersion, chain_id: u64) -> Result<DeploymentInfo, RegistryError> {
        self.cache.get_or_load(&self.inner, version, chain_id)
    }

    fn snapshot(&self) -> String {
        self.inner.snapshot()
    }
}
