//! Top-level configuration for the exporter.
//!
//! This module aggregates configuration for:
//!
//! - the deployment profile (authentication mode + default gauge set),
//! - the node RPC client (base URL, credential file, timeout),
//! - the Prometheus exporter (listen address),
//! - the collection loop (enabled collectors, interval, query parameters).
//!
//! Every value has a baked-in default. [`ExporterConfig::from_env`] applies
//! the `MMX_*` environment overrides on top of those defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Overrides the credential file path.
pub const ENV_PASSWORD_FILE: &str = "MMX_PASSWORD_FILE";
/// Selects the deployment profile (`session` or `token`).
pub const ENV_PROFILE: &str = "MMX_EXPORTER_PROFILE";
/// Comma-separated list of collectors to run.
pub const ENV_COLLECTORS: &str = "MMX_EXPORTER_COLLECTORS";
/// Base URL of the node RPC API.
pub const ENV_RPC_URL: &str = "MMX_RPC_URL";
/// Per-request RPC timeout in seconds.
pub const ENV_RPC_TIMEOUT_SECS: &str = "MMX_RPC_TIMEOUT_SECS";
/// Address the metrics listener binds to.
pub const ENV_LISTEN: &str = "MMX_EXPORTER_LISTEN";
/// Seconds to wait between collection cycles.
pub const ENV_INTERVAL_SECS: &str = "MMX_EXPORTER_INTERVAL_SECS";

/// Errors raised while building the configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

/// Deployment profile of the exporter.
///
/// The node exposes two flavours of its API: the legacy `/api` surface
/// guarded by a cookie session, and the `/wapi` surface guarded by an API
/// token header. Each profile also carries the gauge set dashboards built
/// against that flavour expect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    /// Cookie-session login, basic node + farm gauges.
    Session,
    /// Header token, full node + farm + block summary + wallet gauges.
    Token,
}

impl Profile {
    /// Credential file used when `MMX_PASSWORD_FILE` is not set.
    pub fn default_credential_path(self) -> PathBuf {
        match self {
            Profile::Session => PathBuf::from("/home/user/mmx-node/PASSWD"),
            Profile::Token => PathBuf::from("/home/user/mmx-node/config/local/api_token"),
        }
    }

    /// Collectors run when `MMX_EXPORTER_COLLECTORS` is not set.
    pub fn default_collectors(self) -> Vec<CollectorKind> {
        match self {
            Profile::Session => vec![CollectorKind::Network, CollectorKind::Farm],
            Profile::Token => CollectorKind::ALL.to_vec(),
        }
    }

    /// Whether the network collector also exports the average fee and
    /// block size gauges.
    pub fn extended_network_gauges(self) -> bool {
        matches!(self, Profile::Token)
    }

    /// RPC paths for this profile's API flavour.
    pub fn endpoints(self) -> Endpoints {
        match self {
            Profile::Session => Endpoints {
                network_info: "/api/node/get_network_info",
                farm_info: "/api/harvester/get_farm_info",
                farm_blocks_summary: "/wapi/farmer/blocks/summary",
                wallet_balance: "/wapi/wallet/balance",
            },
            Profile::Token => Endpoints {
                network_info: "/wapi/node/info",
                farm_info: "/wapi/farm/info",
                farm_blocks_summary: "/wapi/farmer/blocks/summary",
                wallet_balance: "/wapi/wallet/balance",
            },
        }
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" => Ok(Profile::Session),
            "token" => Ok(Profile::Token),
            other => Err(format!("unknown profile `{other}` (expected `session` or `token`)")),
        }
    }
}

/// RPC endpoint paths, relative to the base URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub network_info: &'static str,
    pub farm_info: &'static str,
    pub farm_blocks_summary: &'static str,
    pub wallet_balance: &'static str,
}

/// Identifies one collector. The declaration order is the run order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CollectorKind {
    Network,
    Farm,
    FarmBlocks,
    Wallet,
}

impl CollectorKind {
    pub const ALL: [CollectorKind; 4] = [
        CollectorKind::Network,
        CollectorKind::Farm,
        CollectorKind::FarmBlocks,
        CollectorKind::Wallet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CollectorKind::Network => "network",
            CollectorKind::Farm => "farm",
            CollectorKind::FarmBlocks => "farm_blocks",
            CollectorKind::Wallet => "wallet",
        }
    }
}

impl FromStr for CollectorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase().replace('-', "_");
        CollectorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == needle)
            .ok_or_else(|| format!("unknown collector `{}`", s.trim()))
    }
}

/// Configuration for the node RPC client.
#[derive(Clone, Debug)]
pub struct RpcConfig {
    /// Base URL of the node API, e.g. `"http://localhost:11380"`.
    pub base_url: String,
    /// File holding the login password or API token.
    pub credential_path: PathBuf,
    /// Timeout applied to every RPC request, login included.
    pub timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11380".to_string(),
            credential_path: Profile::Session.default_credential_path(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9877)),
        }
    }
}

/// Configuration for the collection loop.
#[derive(Clone, Debug)]
pub struct CollectionConfig {
    /// Collectors to run each cycle, in run order.
    pub collectors: Vec<CollectorKind>,
    /// Pause between the end of one cycle and the start of the next.
    pub interval: Duration,
    /// `since` window passed to the farmed blocks summary.
    pub block_summary_lookback: u64,
    /// Wallet index queried for balances.
    pub wallet_index: u32,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            collectors: Profile::Session.default_collectors(),
            interval: Duration::from_secs(10),
            block_summary_lookback: 8640,
            wallet_index: 0,
        }
    }
}

/// Top-level configuration for the exporter.
#[derive(Clone, Debug)]
pub struct ExporterConfig {
    pub profile: Profile,
    pub rpc: RpcConfig,
    pub metrics: MetricsConfig,
    pub collection: CollectionConfig,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self::for_profile(Profile::Session)
    }
}

impl ExporterConfig {
    /// Defaults for the given profile.
    pub fn for_profile(profile: Profile) -> Self {
        Self {
            profile,
            rpc: RpcConfig {
                credential_path: profile.default_credential_path(),
                ..RpcConfig::default()
            },
            metrics: MetricsConfig::default(),
            collection: CollectionConfig {
                collectors: profile.default_collectors(),
                ..CollectionConfig::default()
            },
        }
    }

    /// Builds the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Unset variables keep the profile defaults. A variable that is set but
    /// blank is treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let profile = match get(ENV_PROFILE) {
            Some(value) => parse_value(ENV_PROFILE, &value)?,
            None => Profile::Session,
        };
        let mut cfg = Self::for_profile(profile);

        if let Some(path) = get(ENV_PASSWORD_FILE) {
            cfg.rpc.credential_path = PathBuf::from(path.trim());
        }
        if let Some(url) = get(ENV_RPC_URL) {
            cfg.rpc.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(value) = get(ENV_RPC_TIMEOUT_SECS) {
            cfg.rpc.timeout = parse_secs(ENV_RPC_TIMEOUT_SECS, &value)?;
        }
        if let Some(value) = get(ENV_LISTEN) {
            cfg.metrics.listen_addr = parse_value(ENV_LISTEN, &value)?;
        }
        if let Some(value) = get(ENV_INTERVAL_SECS) {
            cfg.collection.interval = parse_secs(ENV_INTERVAL_SECS, &value)?;
        }
        if let Some(value) = get(ENV_COLLECTORS) {
            cfg.collection.collectors = parse_collectors(&value)?;
        }

        Ok(cfg)
    }
}

fn parse_value<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn parse_secs(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = parse_value(var, value)?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            reason: "must be at least 1 second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

/// Parses a collector list, deduplicating and sorting into run order.
fn parse_collectors(value: &str) -> Result<Vec<CollectorKind>, ConfigError> {
    let mut kinds = Vec::new();
    for part in value.split(',').filter(|p| !p.trim().is_empty()) {
        let kind: CollectorKind = parse_value(ENV_COLLECTORS, part)?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    if kinds.is_empty() {
        return Err(ConfigError::Empty { var: ENV_COLLECTORS });
    }
    kinds.sort();
    Ok(kinds)
}
