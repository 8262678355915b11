//! Node configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default shared registry address holding the record manager resource
pub const DEFAULT_REGISTRY_ADDRESS: &str =
    "0x5ae6f1f3b1d4c9a8e2d7b0c4f6a9138e5d2c7b4a0f8e6d1c3b5a7f9e0d2c4b6a";

/// Which ledger address record reads and writes target.
///
/// The upstream wiring always used one fixed registry address, so "your
/// records" were really everyone's records on one shared resource. That
/// choice is kept as the default but made explicit and switchable here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OwnerScope {
    /// All accounts share one record manager at the fixed registry address
    SharedRegistry,
    /// Each account owns a record manager at its own address
    PerAccount,
}

impl Default for OwnerScope {
    fn default() -> Self {
        OwnerScope::SharedRegistry
    }
}

/// Ledger endpoint and addressing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Base URL of the ledger REST endpoint
    pub rest_url: String,
    /// Address that published the records module and, under
    /// `OwnerScope::SharedRegistry`, holds the shared manager resource
    pub registry_address: String,
    #[serde(default)]
    pub owner_scope: OwnerScope,
    /// Interval between finality polls, milliseconds
    pub finality_poll_ms: u64,
    /// Maximum finality polls before giving up
    pub finality_max_polls: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rest_url: "https://fullnode.testnet.medledger.io".to_string(),
            registry_address: DEFAULT_REGISTRY_ADDRESS.to_string(),
            owner_scope: OwnerScope::default(),
            finality_poll_ms: 1000,
            finality_max_polls: 30,
        }
    }
}

impl LedgerConfig {
    /// Fully qualified record manager resource type
    pub fn manager_resource_type(&self) -> String {
        format!("{}::records::RecordManager", self.registry_address)
    }

    /// Fully qualified entry function id for the records module
    pub fn function_id(&self, name: &str) -> String {
        format!("{}::records::{}", self.registry_address, name)
    }

    /// Address whose manager resource reads and writes target
    pub fn manager_address(&self, owner_account: &str) -> String {
        match self.owner_scope {
            OwnerScope::SharedRegistry => self.registry_address.clone(),
            OwnerScope::PerAccount => owner_account.to_string(),
        }
    }
}

/// Content store (pinning gateway) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentStoreConfig {
    /// Upload endpoint of the pinning gateway service
    pub upload_url: String,
}

impl Default for ContentStoreConfig {
    fn default() -> Self {
        Self {
            upload_url: "http://localhost:3001/api/upload".to_string(),
        }
    }
}

/// Gateway retrieval settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Ordered gateway base URLs tried in sequence; each is joined with the
    /// content reference to form the fetch URL
    pub gateways: Vec<String>,
    /// Bound on each gateway attempt so one stalled gateway cannot stall the
    /// whole fallback chain
    pub attempt_timeout_secs: u64,
    /// Recompute the content digest of fetched bytes where the reference
    /// embeds one
    pub verify_integrity: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            gateways: vec![
                "https://gateway.pinata.cloud/ipfs/".to_string(),
                "https://ipfs.io/ipfs/".to_string(),
                "https://cloudflare-ipfs.com/ipfs/".to_string(),
                "https://dweb.link/ipfs/".to_string(),
            ],
            attempt_timeout_secs: 10,
            verify_integrity: true,
        }
    }
}

/// Client-local persisted state settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStateConfig {
    /// Path of the JSON file backing the keyed local store
    pub path: String,
}

impl Default for LocalStateConfig {
    fn default() -> Self {
        Self {
            path: "medledger_state.json".to_string(),
        }
    }
}

/// Top-level node configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub content_store: ContentStoreConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub local_state: LocalStateConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file, then apply environment overrides
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {}", path.display(), e))?;
        let mut config: AppConfig = serde_yaml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("failed to parse config {}: {}", path.display(), e))?;
        config.apply_env();
        Ok(config)
    }

    /// Environment-driven defaults, same precedence the other daemons use
    pub fn from_env() -> Self {
        let mut config = AppConfig::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("MEDLEDGER_REST_URL") {
            self.ledger.rest_url = url;
        }
        if let Ok(addr) = std::env::var("MEDLEDGER_REGISTRY_ADDRESS") {
            self.ledger.registry_address = addr;
        }
        if let Ok(url) = std::env::var("MEDLEDGER_UPLOAD_URL") {
            self.content_store.upload_url = url;
        }
        if let Ok(gateways) = std::env::var("MEDLEDGER_GATEWAYS") {
            let parsed: Vec<String> = gateways
                .split(',')
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
                .collect();
            if !parsed.is_empty() {
                self.retrieval.gateways = parsed;
            }
        }
        if let Ok(path) = std::env::var("MEDLEDGER_STATE_PATH") {
            self.local_state.path = path;
        }
    }
}
