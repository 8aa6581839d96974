//! Collectors that map node RPC documents onto gauges.
//!
//! Each collector owns the gauges of one endpoint. A collection run fetches
//! one JSON document, decodes every field it needs, and only then writes
//! its gauges, so a failed run leaves the previous values in place and never
//! touches gauges owned by another collector.
//!
//! Failures are returned as [`CollectError`]; the scheduler logs them and
//! moves on to the next collector.

use thiserror::Error;

use crate::config::{CollectorKind, ExporterConfig};
use crate::metrics::{FarmBlockGauges, FarmGauges, MetricsRegistry, NetworkGauges, WalletGauges};
use crate::rpc::{RpcClient, RpcError};

pub mod farm;
pub mod farm_blocks;
pub mod network;
pub mod wallet;

pub use farm::FarmInfoCollector;
pub use farm_blocks::FarmBlocksCollector;
pub use network::NetworkInfoCollector;
pub use wallet::WalletBalanceCollector;

/// Base units per MMX.
pub const MMX_SCALE: f64 = 1_000_000.0;

/// Bytes per terabyte (1024⁴).
pub const BYTES_PER_TB: f64 = 1_099_511_627_776.0;

/// Errors that abort a single collection run.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// A field required by the enabled gauge set was absent.
    #[error("response is missing field `{0}`")]
    MissingField(&'static str),
    /// A nested entry did not have the expected shape.
    #[error("malformed {what}")]
    Malformed {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("no native balance among {entries} wallet entries")]
    NoNativeBalance { entries: usize },
}

impl CollectError {
    /// Whether the node rejected our credential.
    pub fn is_auth(&self) -> bool {
        matches!(self, CollectError::Rpc(e) if e.is_auth())
    }
}

/// One RPC endpoint mapped onto a fixed set of gauges.
pub trait Collector: Send {
    fn kind(&self) -> CollectorKind;

    /// RPC path this collector reads, for log context.
    fn endpoint(&self) -> &'static str;

    /// Fetches the document and updates the gauges.
    fn collect(&self, rpc: &RpcClient) -> Result<(), CollectError>;
}

/// Builds the enabled collectors in run order, registering only their
/// gauges.
pub fn build_collectors(
    cfg: &ExporterConfig,
    metrics: &MetricsRegistry,
) -> Result<Vec<Box<dyn Collector>>, prometheus::Error> {
    let endpoints = cfg.profile.endpoints();
    let mut kinds = cfg.collection.collectors.clone();
    kinds.sort();
    kinds.dedup();

    let mut collectors: Vec<Box<dyn Collector>> = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let collector: Box<dyn Collector> = match kind {
            CollectorKind::Network => Box::new(NetworkInfoCollector::new(
                endpoints.network_info,
                NetworkGauges::register(metrics, cfg.profile.extended_network_gauges())?,
            )),
            CollectorKind::Farm => Box::new(FarmInfoCollector::new(
                endpoints.farm_info,
                FarmGauges::register(metrics)?,
            )),
            CollectorKind::FarmBlocks => Box::new(FarmBlocksCollector::new(
                endpoints.farm_blocks_summary,
                cfg.collection.block_summary_lookback,
                FarmBlockGauges::register(metrics)?,
            )),
            CollectorKind::Wallet => Box::new(WalletBalanceCollector::new(
                endpoints.wallet_balance,
                cfg.collection.wallet_index,
                WalletGauges::register(metrics)?,
            )),
        };
        collectors.push(collector);
    }
    Ok(collectors)
}
