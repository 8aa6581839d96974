//! MMX exporter library crate.
//!
//! This crate polls an MMX node's HTTP RPC API on a fixed interval and
//! republishes node, farm and wallet status as Prometheus gauges:
//!
//! - exporter configuration and deployment profiles (`config`),
//! - loading of the RPC password or API token (`credential`),
//! - a blocking RPC client with pluggable authentication (`rpc`),
//! - the gauge registry and `/metrics` HTTP exporter (`metrics`),
//! - one collector per RPC endpoint (`collectors`),
//! - and the sequential collection loop (`scheduler`).
//!
//! The `mmx-exporter` binary wires these pieces together.

pub mod collectors;
pub mod config;
pub mod credential;
pub mod metrics;
pub mod rpc;
pub mod scheduler;

// Re-export top-level configuration types.
pub use config::{
    CollectionConfig, CollectorKind, ConfigError, ExporterConfig, MetricsConfig, Profile,
    RpcConfig,
};

// Re-export the RPC client and authentication strategies.
pub use rpc::{AuthStrategy, RpcClient, RpcError, SessionAuth, TokenAuth, auth_for_profile};

// Re-export metrics registry and exporter.
pub use metrics::{MetricsRegistry, bind_metrics_listener, run_prometheus_http_server};

// Re-export collectors and the loop driving them.
pub use collectors::{CollectError, Collector, build_collectors};
pub use credential::load_credential;
pub use scheduler::{CycleReport, Scheduler};
