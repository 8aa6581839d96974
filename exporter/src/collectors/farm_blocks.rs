//! Summary of blocks farmed within a lookback window.

use serde::Deserialize;
use tracing::debug;

use super::{CollectError, Collector};
use crate::config::CollectorKind;
use crate::metrics::FarmBlockGauges;
use crate::rpc::RpcClient;

/// Fields of the farmed blocks summary we export.
#[derive(Debug, Deserialize)]
pub struct FarmBlockSummary {
    pub num_blocks: f64,
    pub last_height: f64,
    /// Summed rewards, in MMX.
    pub total_rewards_value: f64,
}

pub struct FarmBlocksCollector {
    endpoint: &'static str,
    lookback: u64,
    gauges: FarmBlockGauges,
}

impl FarmBlocksCollector {
    pub fn new(endpoint: &'static str, lookback: u64, gauges: FarmBlockGauges) -> Self {
        Self {
            endpoint,
            lookback,
            gauges,
        }
    }

    pub fn apply(&self, summary: &FarmBlockSummary) {
        self.gauges.blocks_found.set(summary.num_blocks);
        self.gauges.last_block_height.set(summary.last_height);
        self.gauges.block_rewards.set(summary.total_rewards_value);

        debug!(
            blocks = summary.num_blocks,
            last_height = summary.last_height,
            rewards = summary.total_rewards_value,
            "updated farmed block metrics"
        );
    }
}

impl Collector for FarmBlocksCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::FarmBlocks
    }

    fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    fn collect(&self, rpc: &RpcClient) -> Result<(), CollectError> {
        let summary: FarmBlockSummary =
            rpc.get_json(self.endpoint, &[("since", self.lookback.to_string())])?;
        self.apply(&summary);
        Ok(())
    }
}
