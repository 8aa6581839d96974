//! Metrics and instrumentation for the exporter.
//!
//! This module defines the Prometheus gauges the collectors write and a
//! small HTTP exporter that serves `/metrics` in Prometheus text format.
//!
//! Typical usage:
//!
//! ```ignore
//! use std::sync::Arc;
//! use mmx_exporter::metrics::{MetricsRegistry, FarmGauges, bind_metrics_listener,
//!     run_prometheus_http_server};
//!
//! let registry = Arc::new(MetricsRegistry::new());
//! let farm = FarmGauges::register(&registry)?;
//! let listener = bind_metrics_listener("0.0.0.0:9877".parse()?).await?;
//!
//! // Serve scrapes in the background:
//! tokio::spawn(run_prometheus_http_server(registry.clone(), listener));
//!
//! // Elsewhere, from the collection loop:
//! farm.plot_count.set(15.0);
//! ```

pub mod prometheus;

pub use prometheus::{
    FarmBlockGauges, FarmGauges, MetricsRegistry, NetworkGauges, WalletGauges,
    bind_metrics_listener, run_prometheus_http_server,
};
