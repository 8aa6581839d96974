//! Prometheus-backed gauges and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry, one strongly-typed gauge group per collector, and an async
//! HTTP exporter that serves `/metrics` using `hyper`.
//!
//! Metric names are consumed verbatim by dashboards and alert rules, so they
//! must not change.

use std::{convert::Infallible, io, net::SocketAddr, sync::Arc, time::Duration};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, Gauge, Opts, Registry, TextEncoder};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Pause after a failed `accept` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Wrapper around the Prometheus registry served on `/metrics`.
///
/// Gauge groups register themselves into it once at startup; it can be
/// wrapped in an [`Arc`] and shared with the HTTP exporter.
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    registry: Registry,
}

impl MetricsRegistry {
    /// Creates an empty registry. Metric names carry their own `mmx_`
    /// prefix, so no registry-level namespace is applied.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    /// Creates and registers a single gauge.
    pub fn gauge(&self, name: &str, help: &str) -> Result<Gauge, prometheus::Error> {
        let gauge = Gauge::with_opts(Opts::new(name, help))?;
        self.registry.register(Box::new(gauge.clone()))?;
        Ok(gauge)
    }

    /// Names of all registered metrics, sorted.
    pub fn metric_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .registry
            .gather()
            .iter()
            .map(|mf| mf.name().to_string())
            .collect();
        names.sort();
        names
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            error!(error = %e, "failed to encode Prometheus metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Node and chain status gauges, written by the network info collector.
#[derive(Clone)]
pub struct NetworkGauges {
    pub synced: Gauge,
    pub block_height: Gauge,
    pub vdf_height: Gauge,
    pub vdf_speed: Gauge,
    pub total_supply: Gauge,
    pub block_reward: Gauge,
    pub space_difficulty: Gauge,
    /// Only registered with the extended gauge set.
    pub average_tx_fee: Option<Gauge>,
    /// Only registered with the extended gauge set.
    pub block_size: Option<Gauge>,
}

impl NetworkGauges {
    pub fn register(metrics: &MetricsRegistry, extended: bool) -> Result<Self, prometheus::Error> {
        let synced = metrics.gauge("mmx_node_synced", "Whether the node is synced (1) or not (0)")?;
        let block_height = metrics.gauge("mmx_block_height", "Current blockchain height")?;
        let vdf_height = metrics.gauge("mmx_vdf_height", "Current VDF height")?;
        let vdf_speed = metrics.gauge("mmx_vdf_speed", "Current VDF speed")?;
        let total_supply = metrics.gauge("mmx_total_supply", "Total supply of MMX")?;
        let block_reward = metrics.gauge("mmx_block_reward", "Current block reward")?;
        let space_difficulty =
            metrics.gauge("mmx_space_difficulty", "Current space difficulty")?;

        let (average_tx_fee, block_size) = if extended {
            (
                Some(metrics.gauge("mmx_average_tx_fee", "Average transaction fee in MMX")?),
                Some(metrics.gauge("mmx_block_size", "Size of the latest block")?),
            )
        } else {
            (None, None)
        };

        Ok(Self {
            synced,
            block_height,
            vdf_height,
            vdf_speed,
            total_supply,
            block_reward,
            space_difficulty,
            average_tx_fee,
            block_size,
        })
    }
}

/// Harvester gauges, written by the farm info collector.
#[derive(Clone)]
pub struct FarmGauges {
    pub plot_count: Gauge,
    pub size_tb: Gauge,
    pub size_effective_tb: Gauge,
}

impl FarmGauges {
    pub fn register(metrics: &MetricsRegistry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            plot_count: metrics.gauge("mmx_plot_count", "Total number of plots")?,
            size_tb: metrics.gauge("mmx_farm_size_tb", "Total farm size in terabytes")?,
            size_effective_tb: metrics.gauge(
                "mmx_farm_size_effective_tb",
                "Total effective farm size in terabytes",
            )?,
        })
    }
}

/// Farmed block gauges over the lookback window.
#[derive(Clone)]
pub struct FarmBlockGauges {
    pub blocks_found: Gauge,
    pub last_block_height: Gauge,
    pub block_rewards: Gauge,
}

impl FarmBlockGauges {
    pub fn register(metrics: &MetricsRegistry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            blocks_found: metrics.gauge(
                "mmx_farm_blocks_found",
                "Number of blocks farmed within the lookback window",
            )?,
            last_block_height: metrics.gauge(
                "mmx_farm_last_block_height",
                "Height of the most recently farmed block",
            )?,
            block_rewards: metrics.gauge(
                "mmx_farm_block_rewards",
                "Total rewards in MMX for blocks farmed within the lookback window",
            )?,
        })
    }
}

/// Native MMX wallet balance gauges.
#[derive(Clone)]
pub struct WalletGauges {
    pub total: Gauge,
    pub spendable: Gauge,
    pub locked: Gauge,
    pub reserved: Gauge,
}

impl WalletGauges {
    pub fn register(metrics: &MetricsRegistry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            total: metrics.gauge("mmx_wallet_balance_total", "Total MMX wallet balance")?,
            spendable: metrics.gauge(
                "mmx_wallet_balance_spendable",
                "Spendable MMX wallet balance",
            )?,
            locked: metrics.gauge("mmx_wallet_balance_locked", "Locked MMX wallet balance")?,
            reserved: metrics.gauge(
                "mmx_wallet_balance_reserved",
                "Reserved MMX wallet balance",
            )?,
        })
    }
}

/// Binds the metrics listener.
///
/// Binding happens before the collection loop starts so that a port
/// conflict aborts startup instead of surfacing later from a background
/// task.
pub async fn bind_metrics_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "metrics exporter listening on /metrics");
    Ok(listener)
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server accepts connections on `listener` and serves `GET /metrics`
/// with the Prometheus text exposition format. All other paths return 404.
/// It runs until the task is dropped.
///
/// This function is `async` and is intended to be spawned onto a Tokio
/// runtime, e.g.:
///
/// ```ignore
/// let listener = bind_metrics_listener(addr).await?;
/// tokio::spawn(run_prometheus_http_server(registry.clone(), listener));
/// ```
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    listener: TcpListener,
) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                // Per-connection accept errors (e.g. EMFILE) must not kill
                // the exporter.
                warn!(error = %e, "failed to accept metrics connection");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        debug!(%peer, "metrics scrape connection");
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                warn!(error = %err, "prometheus HTTP server error");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let mut resp = Response::new(Full::new(Bytes::from(metrics.gather_text())));
            resp.headers_mut().insert(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            Ok(resp)
        }
        _ => {
            let mut resp = Response::new(Full::new(Bytes::from("not found")));
            *resp.status_mut() = StatusCode::NOT_FOUND;
            Ok(resp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn basic_network_set_omits_extended_gauges() {
        let metrics = MetricsRegistry::new();
        let gauges = NetworkGauges::register(&metrics, false).expect("register");
        assert!(gauges.average_tx_fee.is_none());
        assert!(gauges.block_size.is_none());

        let names = metrics.metric_names();
        assert_eq!(names.len(), 7);
        assert!(!names.iter().any(|n| n == "mmx_average_tx_fee"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let metrics = MetricsRegistry::new();
        FarmGauges::register(&metrics).expect("first registration");
        assert!(FarmGauges::register(&metrics).is_err());
    }

    #[test]
    fn gather_text_contains_values() {
        let metrics = MetricsRegistry::new();
        let wallet = WalletGauges::register(&metrics).expect("register");
        wallet.spendable.set(12.5);

        let text = metrics.gather_text();
        assert!(text.contains("# HELP mmx_wallet_balance_spendable Spendable MMX wallet balance"));
        assert!(text.contains("# TYPE mmx_wallet_balance_spendable gauge"));
        assert!(text.contains("mmx_wallet_balance_spendable 12.5"));
    }

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.expect("connect");
        let req = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(req.as_bytes()).await.expect("write");
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.expect("read");
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn exporter_serves_metrics_and_404s_elsewhere() {
        let metrics = Arc::new(MetricsRegistry::new());
        let farm = FarmGauges::register(&metrics).expect("register");
        farm.plot_count.set(15.0);

        let listener = bind_metrics_listener("127.0.0.1:0".parse().unwrap())
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(run_prometheus_http_server(metrics.clone(), listener));

        let ok = get(addr, "/metrics").await;
        assert!(ok.starts_with("HTTP/1.1 200"));
        assert!(ok.contains("text/plain; version=0.0.4"));
        assert!(ok.contains("mmx_plot_count 15"));

        let missing = get(addr, "/").await;
        assert!(missing.starts_with("HTTP/1.1 404"));
    }

    #[tokio::test]
    async fn bind_fails_when_port_is_taken() {
        let first = bind_metrics_listener("127.0.0.1:0".parse().unwrap())
            .await
            .expect("bind");
        let addr = first.local_addr().expect("addr");
        assert!(bind_metrics_listener(addr).await.is_err());
    }
}
