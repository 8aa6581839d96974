//! Native MMX balance of one wallet.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{CollectError, Collector};
use crate::config::CollectorKind;
use crate::metrics::WalletGauges;
use crate::rpc::RpcClient;

/// The wallet balance document.
///
/// Entries are kept as raw JSON: only the native entry has to carry the
/// balance fields, token entries are never inspected beyond `is_native`.
#[derive(Debug, Deserialize)]
pub struct WalletBalance {
    pub balances: Vec<Value>,
}

/// Balance fields of the native asset entry, in MMX.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct NativeBalance {
    pub total: f64,
    pub spendable: f64,
    pub locked: f64,
    pub reserved: f64,
}

impl WalletBalance {
    /// Decodes the first entry flagged `is_native`.
    pub fn native(&self) -> Result<NativeBalance, CollectError> {
        let entry = self
            .balances
            .iter()
            .find(|entry| entry.get("is_native").and_then(Value::as_bool) == Some(true))
            .ok_or(CollectError::NoNativeBalance {
                entries: self.balances.len(),
            })?;

        NativeBalance::deserialize(entry).map_err(|e| CollectError::Malformed {
            what: "native balance entry",
            source: e,
        })
    }
}

pub struct WalletBalanceCollector {
    endpoint: &'static str,
    index: u32,
    gauges: WalletGauges,
}

impl WalletBalanceCollector {
    pub fn new(endpoint: &'static str, index: u32, gauges: WalletGauges) -> Self {
        Self {
            endpoint,
            index,
            gauges,
        }
    }

    pub fn apply(&self, balance: &WalletBalance) -> Result<(), CollectError> {
        let native = balance.native()?;

        self.gauges.total.set(native.total);
        self.gauges.spendable.set(native.spendable);
        self.gauges.locked.set(native.locked);
        self.gauges.reserved.set(native.reserved);

        debug!(
            wallet = self.index,
            total = native.total,
            spendable = native.spendable,
            "updated wallet metrics"
        );
        Ok(())
    }
}

impl Collector for WalletBalanceCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Wallet
    }

    fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    fn collect(&self, rpc: &RpcClient) -> Result<(), CollectError> {
        let balance: WalletBalance =
            rpc.get_json(self.endpoint, &[("index", self.index.to_string())])?;
        self.apply(&balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsRegistry;

    fn collector() -> WalletBalanceCollector {
        let metrics = MetricsRegistry::new();
        WalletBalanceCollector::new(
            "/wapi/wallet/balance",
            0,
            WalletGauges::register(&metrics).expect("register"),
        )
    }

    #[test]
    fn native_entry_is_selected_among_tokens() {
        let json = r#"{"balances": [
            {"symbol": "USDM", "is_native": false, "total": 900},
            {"symbol": "MMX", "is_native": true, "total": 12.5, "spendable": 10,
             "locked": 2, "reserved": 0.5},
            {"symbol": "OTHER"}
        ]}"#;
        let balance: WalletBalance = serde_json::from_str(json).expect("parse");
        let c = collector();
        c.apply(&balance).expect("apply");

        assert_eq!(c.gauges.total.get(), 12.5);
        assert_eq!(c.gauges.spendable.get(), 10.0);
        assert_eq!(c.gauges.locked.get(), 2.0);
        assert_eq!(c.gauges.reserved.get(), 0.5);
    }

    #[test]
    fn no_native_entry_leaves_gauges_untouched() {
        let c = collector();
        c.gauges.total.set(7.0);

        for json in [
            r#"{"balances": []}"#,
            r#"{"balances": [{"is_native": false, "total": 1, "spendable": 1, "locked": 0, "reserved": 0}]}"#,
        ] {
            let balance: WalletBalance = serde_json::from_str(json).expect("parse");
            let err = c.apply(&balance).expect_err("no native entry");
            assert!(matches!(err, CollectError::NoNativeBalance { .. }));
        }
        assert_eq!(c.gauges.total.get(), 7.0);
        assert_eq!(c.gauges.spendable.get(), 0.0);
    }

    #[test]
    fn incomplete_native_entry_is_malformed() {
        let balance: WalletBalance =
            serde_json::from_str(r#"{"balances": [{"is_native": true, "total": 3}]}"#)
                .expect("parse");
        let c = collector();
        assert!(matches!(
            c.apply(&balance),
            Err(CollectError::Malformed { .. })
        ));
        assert_eq!(c.gauges.total.get(), 0.0);
    }
}
