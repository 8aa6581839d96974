//! Harvester plot count and farm size.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{BYTES_PER_TB, CollectError, Collector};
use crate::config::CollectorKind;
use crate::metrics::FarmGauges;
use crate::rpc::RpcClient;

/// Fields of the farm info document we export.
#[derive(Debug, Deserialize)]
pub struct FarmInfo {
    /// `[size class, count]` pairs, one per plot size.
    pub plot_count: Vec<(Value, f64)>,
    pub total_bytes: f64,
    pub total_bytes_effective: f64,
}

impl FarmInfo {
    pub fn total_plots(&self) -> f64 {
        self.plot_count.iter().map(|(_, count)| count).sum()
    }
}

pub struct FarmInfoCollector {
    endpoint: &'static str,
    gauges: FarmGauges,
}

impl FarmInfoCollector {
    pub fn new(endpoint: &'static str, gauges: FarmGauges) -> Self {
        Self { endpoint, gauges }
    }

    pub fn apply(&self, info: &FarmInfo) {
        let plots = info.total_plots();
        let size_tb = info.total_bytes / BYTES_PER_TB;
        let effective_tb = info.total_bytes_effective / BYTES_PER_TB;

        self.gauges.plot_count.set(plots);
        self.gauges.size_tb.set(size_tb);
        self.gauges.size_effective_tb.set(effective_tb);

        debug!(plots, size_tb, effective_tb, "updated farm metrics");
    }
}

impl Collector for FarmInfoCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Farm
    }

    fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    fn collect(&self, rpc: &RpcClient) -> Result<(), CollectError> {
        let info: FarmInfo = rpc.get_json(self.endpoint, &[])?;
        self.apply(&info);
        Ok(())
    }
}
