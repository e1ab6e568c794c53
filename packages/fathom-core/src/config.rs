//! Agent configuration with priority:
//! 1. Environment variables (`FATHOM_STORE_URL`, `FATHOM_CREDENTIALS`)
//! 2. Config file (`~/.config/fathom/config.toml`)
//! 3. Default values

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Default document store URL
const DEFAULT_STORE_URL: &str = "http://localhost:9200";

/// Environment variable overriding the document store URL
const ENV_STORE_URL: &str = "FATHOM_STORE_URL";

/// Environment variable overriding the credentials file path
const ENV_CREDENTIALS: &str = "FATHOM_CREDENTIALS";

/// Default TCP ports probed during the enrichment scan
const DEFAULT_SCAN_PORTS: &[u16] = &[21, 22, 23, 80, 161, 443, 830, 5601, 8443, 9200];

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    store: Option<StoreSection>,
    discovery: Option<DiscoverySection>,
    workers: Option<WorkerSection>,
    indices: Option<IndexSection>,
}

#[derive(Debug, Deserialize, Default)]
struct StoreSection {
    url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct DiscoverySection {
    credentials: Option<PathBuf>,
    scan_ports: Option<Vec<u16>>,
    portscan_enabled: Option<bool>,
    /// CIDR networks swept by the daemon when no explicit target is given.
    networks: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct WorkerSection {
    high: Option<usize>,
    default: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct IndexSection {
    endpoints: Option<String>,
    portscans: Option<String>,
    interfaces: Option<String>,
    vlans: Option<String>,
    vrfs: Option<String>,
    routes: Option<String>,
    neighbors: Option<String>,
    equipment: Option<String>,
    protocols: Option<String>,
    details: Option<String>,
    gateways: Option<String>,
    zones: Option<String>,
}

/// Names of the document store collections.
#[derive(Debug, Clone)]
pub struct IndexNames {
    pub endpoints: String,
    pub portscans: String,
    pub interfaces: String,
    pub vlans: String,
    pub vrfs: String,
    pub routes: String,
    pub neighbors: String,
    pub equipment: String,
    pub protocols: String,
    pub details: String,
    pub gateways: String,
    pub zones: String,
}

impl Default for IndexNames {
    fn default() -> Self {
        Self {
            endpoints: "endpoints".to_string(),
            portscans: "portscans".to_string(),
            interfaces: "interfaces".to_string(),
            vlans: "vlans".to_string(),
            vrfs: "vrfs".to_string(),
            routes: "routes".to_string(),
            neighbors: "neighbors".to_string(),
            equipment: "equipment".to_string(),
            protocols: "protocols".to_string(),
            details: "ep_details".to_string(),
            gateways: "gateways".to_string(),
            zones: "zones".to_string(),
        }
    }
}

impl IndexNames {
    /// Every category collection keyed by hostname — everything except the
    /// base endpoint index. The remove-endpoint cascade walks this list.
    pub fn categories(&self) -> Vec<&str> {
        vec![
            &self.portscans,
            &self.interfaces,
            &self.vlans,
            &self.vrfs,
            &self.routes,
            &self.neighbors,
            &self.equipment,
            &self.protocols,
            &self.details,
            &self.gateways,
            &self.zones,
        ]
    }

    /// All collections, base endpoint index included.
    pub fn all(&self) -> Vec<&str> {
        let mut names = vec![self.endpoints.as_str()];
        names.extend(self.categories());
        names
    }
}

/// Where the configuration came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigSource {
    /// Using default hardcoded values
    Default,
    /// Loaded from environment variable
    Environment,
    /// Loaded from config file
    ConfigFile,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::ConfigFile => write!(f, "config file"),
        }
    }
}

/// Runtime agent configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the document store HTTP API
    pub store_url: String,
    /// Path to the candidate credential file
    pub credentials_path: PathBuf,
    /// TCP ports probed during the enrichment scan
    pub scan_ports: Vec<u16>,
    /// Whether fingerprinting enqueues a follow-up port scan
    pub portscan_enabled: bool,
    /// Networks swept by the daemon when no target is given
    pub networks: Vec<String>,
    /// Worker counts per queue lane
    pub high_workers: usize,
    pub default_workers: usize,
    pub indices: IndexNames,
    /// Source of the store URL (for logging)
    pub source: ConfigSource,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_url: DEFAULT_STORE_URL.to_string(),
            credentials_path: default_credentials_path(),
            scan_ports: DEFAULT_SCAN_PORTS.to_vec(),
            portscan_enabled: true,
            networks: Vec::new(),
            high_workers: 2,
            default_workers: 2,
            indices: IndexNames::default(),
            source: ConfigSource::Default,
        }
    }
}

/// Get the path to the configuration file
fn get_config_file_path() -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|p| p.join("fathom").join("config.toml"))
}

fn default_credentials_path() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|p| p.join("fathom").join("credentials.toml"))
        .unwrap_or_else(|| PathBuf::from("credentials.toml"))
}

/// Load configuration from the config file
fn load_config_file() -> Option<ConfigFile> {
    let path = get_config_file_path()?;

    if !path.exists() {
        return None;
    }

    match fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::debug!("Loaded config from {:?}", path);
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse config file {:?}: {}", path, e);
                None
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read config file {:?}: {}", path, e);
            None
        }
    }
}

/// Load the agent configuration, applying env > file > default priority.
pub fn load_config() -> AppConfig {
    let mut config = AppConfig::default();

    if let Some(file) = load_config_file() {
        config.source = ConfigSource::ConfigFile;
        apply_config_file(&mut config, file);
    }

    // Environment overrides win over the file
    if let Ok(url) = std::env::var(ENV_STORE_URL) {
        let url = url.trim().trim_end_matches('/');
        if !url.is_empty() {
            tracing::info!("Using store URL from environment variable: {}", url);
            config.store_url = url.to_string();
            config.source = ConfigSource::Environment;
        }
    }

    if let Ok(path) = std::env::var(ENV_CREDENTIALS) {
        if !path.trim().is_empty() {
            config.credentials_path = PathBuf::from(path.trim());
        }
    }

    config
}

fn apply_config_file(config: &mut AppConfig, file: ConfigFile) {
    if let Some(store) = file.store {
        if let Some(url) = store.url {
            let url = url.trim().trim_end_matches('/').to_string();
            if !url.is_empty() {
                config.store_url = url;
            }
        }
    }

    if let Some(discovery) = file.discovery {
        if let Some(path) = discovery.credentials {
            config.credentials_path = path;
        }
        if let Some(ports) = discovery.scan_ports {
            if !ports.is_empty() {
                config.scan_ports = ports;
            }
        }
        if let Some(enabled) = discovery.portscan_enabled {
            config.portscan_enabled = enabled;
        }
        if let Some(networks) = discovery.networks {
            config.networks = networks;
        }
    }

    if let Some(workers) = file.workers {
        if let Some(high) = workers.high {
            config.high_workers = high.max(1);
        }
        if let Some(default) = workers.default {
            config.default_workers = default.max(1);
        }
    }

    if let Some(indices) = file.indices {
        let names = &mut config.indices;
        if let Some(v) = indices.endpoints {
            names.endpoints = v;
        }
        if let Some(v) = indices.portscans {
            names.portscans = v;
        }
        if let Some(v) = indices.interfaces {
            names.interfaces = v;
        }
        if let Some(v) = indices.vlans {
            names.vlans = v;
        }
        if let Some(v) = indices.vrfs {
            names.vrfs = v;
        }
        if let Some(v) = indices.routes {
            names.routes = v;
        }
        if let Some(v) = indices.neighbors {
            names.neighbors = v;
        }
        if let Some(v) = indices.equipment {
            names.equipment = v;
        }
        if let Some(v) = indices.protocols {
            names.protocols = v;
        }
        if let Some(v) = indices.details {
            names.details = v;
        }
        if let Some(v) = indices.gateways {
            names.gateways = v;
        }
        if let Some(v) = indices.zones {
            names.zones = v;
        }
    }
}

/// Get the path to the config file for documentation purposes
pub fn get_config_file_path_string() -> String {
    get_config_file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "~/.config/fathom/config.toml".to_string())
}

/// Generate example config file content
pub fn generate_example_config() -> String {
    r#"# Fathom Agent Configuration
# Place this file at: ~/.config/fathom/config.toml

[store]
# Document store HTTP endpoint
# url = "http://localhost:9200"

[discovery]
# Candidate credential file (see `fathom config` for the format)
# credentials = "/etc/fathom/credentials.toml"
# scan_ports = [22, 80, 443]
# portscan_enabled = true
# Networks swept by `fathom daemon` when no target is given
# networks = ["10.0.0.0/24"]

[workers]
# high = 2
# default = 2
"#
    .to_string()
}
