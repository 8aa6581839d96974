//! Node and chain status.

use serde::Deserialize;
use tracing::debug;

use super::{CollectError, Collector, MMX_SCALE};
use crate::config::CollectorKind;
use crate::metrics::NetworkGauges;
use crate::rpc::RpcClient;

/// An amount as reported by the node.
///
/// The `/api` surface reports raw base units, the `/wapi` surface an object
/// whose `value` is already in MMX.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Amount {
    Raw(f64),
    Value { value: f64 },
}

impl Amount {
    /// Amount in MMX.
    pub fn to_mmx(self) -> f64 {
        match self {
            Amount::Raw(raw) => raw / MMX_SCALE,
            Amount::Value { value } => value,
        }
    }
}

/// Fields of the network info document we export.
#[derive(Debug, Deserialize)]
pub struct NetworkInfo {
    pub is_synced: bool,
    pub height: f64,
    pub vdf_height: f64,
    pub vdf_speed: f64,
    /// Base units.
    pub total_supply: f64,
    pub block_reward: Amount,
    pub space_diff: f64,
    #[serde(default)]
    pub average_txfee: Option<Amount>,
    #[serde(default)]
    pub block_size: Option<f64>,
}

pub struct NetworkInfoCollector {
    endpoint: &'static str,
    gauges: NetworkGauges,
}

impl NetworkInfoCollector {
    pub fn new(endpoint: &'static str, gauges: NetworkGauges) -> Self {
        Self { endpoint, gauges }
    }

    /// Writes `info` into the gauges.
    ///
    /// With the extended gauge set the average fee and block size are
    /// required; nothing is written if either is missing.
    pub fn apply(&self, info: &NetworkInfo) -> Result<(), CollectError> {
        let g = &self.gauges;

        let average_txfee = match (&g.average_tx_fee, info.average_txfee) {
            (Some(gauge), Some(fee)) => Some((gauge, fee.to_mmx())),
            (Some(_), None) => return Err(CollectError::MissingField("average_txfee")),
            (None, _) => None,
        };
        let block_size = match (&g.block_size, info.block_size) {
            (Some(gauge), Some(size)) => Some((gauge, size)),
            (Some(_), None) => return Err(CollectError::MissingField("block_size")),
            (None, _) => None,
        };

        g.synced.set(if info.is_synced { 1.0 } else { 0.0 });
        g.block_height.set(info.height);
        g.vdf_height.set(info.vdf_height);
        g.vdf_speed.set(info.vdf_speed);
        g.total_supply.set(info.total_supply / MMX_SCALE);
        g.block_reward.set(info.block_reward.to_mmx());
        g.space_difficulty.set(info.space_diff);
        if let Some((gauge, fee)) = average_txfee {
            gauge.set(fee);
        }
        if let Some((gauge, size)) = block_size {
            gauge.set(size);
        }

        debug!(
            height = info.height,
            synced = info.is_synced,
            vdf_height = info.vdf_height,
            "updated network metrics"
        );
        Ok(())
    }
}

impl Collector for NetworkInfoCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Network
    }

    fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    fn collect(&self, rpc: &RpcClient) -> Result<(), CollectError> {
        let info: NetworkInfo = rpc.get_json(self.endpoint, &[])?;
        self.apply(&info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsRegistry;

    fn collector(extended: bool) -> NetworkInfoCollector {
        let metrics = MetricsRegistry::new();
        let gauges = NetworkGauges::register(&metrics, extended).expect("register");
        NetworkInfoCollector::new("/wapi/node/info", gauges)
    }

    #[test]
    fn extended_document_maps_onto_gauges() {
        let json = r#"{
            "is_synced": false, "height": 100, "vdf_height": 5, "vdf_speed": 2,
            "total_supply": 5000000, "block_reward": {"value": 0.5}, "space_diff": 3,
            "average_txfee": {"value": 0.01}, "block_size": 1000
        }"#;
        let info: NetworkInfo = serde_json::from_str(json).expect("parse");
        let c = collector(true);
        c.apply(&info).expect("apply");

        let g = &c.gauges;
        assert_eq!(g.synced.get(), 0.0);
        assert_eq!(g.block_height.get(), 100.0);
        assert_eq!(g.vdf_height.get(), 5.0);
        assert_eq!(g.vdf_speed.get(), 2.0);
        assert_eq!(g.total_supply.get(), 5.0);
        assert_eq!(g.block_reward.get(), 0.5);
        assert_eq!(g.space_difficulty.get(), 3.0);
        assert_eq!(g.average_tx_fee.as_ref().unwrap().get(), 0.01);
        assert_eq!(g.block_size.as_ref().unwrap().get(), 1000.0);
    }

    #[test]
    fn raw_block_reward_is_scaled() {
        let json = r#"{
            "is_synced": true, "height": 7, "vdf_height": 8, "vdf_speed": 1.5,
            "total_supply": 123456789, "block_reward": 500000, "space_diff": 42
        }"#;
        let info: NetworkInfo = serde_json::from_str(json).expect("parse");
        let c = collector(false);
        c.apply(&info).expect("apply");

        assert_eq!(c.gauges.synced.get(), 1.0);
        assert_eq!(c.gauges.total_supply.get(), 123456789.0 / 1_000_000.0);
        assert_eq!(c.gauges.block_reward.get(), 0.5);
    }

    #[test]
    fn missing_extended_field_writes_nothing() {
        let json = r#"{
            "is_synced": true, "height": 7, "vdf_height": 8, "vdf_speed": 1,
            "total_supply": 1, "block_reward": 1, "space_diff": 1,
            "average_txfee": {"value": 0.2}
        }"#;
        let info: NetworkInfo = serde_json::from_str(json).expect("parse");
        let c = collector(true);
        c.gauges.block_height.set(99.0);

        let err = c.apply(&info).expect_err("block_size is required");
        assert!(matches!(err, CollectError::MissingField("block_size")));
        assert_eq!(c.gauges.block_height.get(), 99.0);
        assert_eq!(c.gauges.average_tx_fee.as_ref().unwrap().get(), 0.0);
    }

    #[test]
    fn missing_or_mistyped_core_fields_fail_to_decode() {
        assert!(serde_json::from_str::<NetworkInfo>(r#"{"is_synced": true}"#).is_err());
        assert!(
            serde_json::from_str::<NetworkInfo>(
                r#"{"is_synced": "yes", "height": 1, "vdf_height": 1, "vdf_speed": 1,
                    "total_supply": 1, "block_reward": 1, "space_diff": 1}"#
            )
            .is_err()
        );
    }
}
