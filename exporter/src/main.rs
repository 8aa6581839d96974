// src/main.rs
//
// MMX exporter binary:
//
// - configuration from MMX_* environment variables
// - Prometheus metrics exporter on /metrics
// - blocking collection loop on a dedicated thread
// - clean shutdown on Ctrl-C / SIGTERM, forced by a second signal

use std::sync::{Arc, mpsc};

use anyhow::{Context, anyhow, bail};
use tokio::signal;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mmx_exporter::{
    ExporterConfig, MetricsRegistry, RpcClient, Scheduler, auth_for_profile,
    bind_metrics_listener, build_collectors, load_credential, run_prometheus_http_server,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mmx_exporter=info")),
        )
        .init();

    if let Err(e) = run().await {
        error!("fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cfg = ExporterConfig::from_env().context("invalid configuration")?;

    info!(
        profile = ?cfg.profile,
        rpc_url = %cfg.rpc.base_url,
        collectors = ?cfg.collection.collectors,
        "starting MMX exporter"
    );

    // ---------------------------
    // Metrics registry + exporter
    // ---------------------------

    let metrics = Arc::new(MetricsRegistry::new());
    let collectors =
        build_collectors(&cfg, &metrics).context("failed to register Prometheus gauges")?;

    let addr = cfg.metrics.listen_addr;
    let listener = bind_metrics_listener(addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {addr}"))?;
    tokio::spawn(run_prometheus_http_server(metrics.clone(), listener));

    // ---------------------------
    // Credential + collection loop
    // ---------------------------

    let credential = load_credential(&cfg.rpc.credential_path);
    let scheduler = Scheduler::new(collectors, cfg.collection.interval);
    let rpc_cfg = cfg.rpc.clone();
    let profile = cfg.profile;
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

    // reqwest's blocking client owns a runtime of its own, so it is built,
    // used and dropped on the blocking thread.
    let mut collection = tokio::task::spawn_blocking(move || -> anyhow::Result<u64> {
        let rpc = RpcClient::from_config(&rpc_cfg, auth_for_profile(profile, credential))
            .context("failed to build RPC client")?;
        Ok(scheduler.run(&rpc, &shutdown_rx))
    });

    tokio::select! {
        res = &mut collection => {
            let cycles = joined(res)?;
            bail!("collection loop stopped unexpectedly after {cycles} cycles")
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received, finishing current cycle (signal again to force)");
            // The loop may already be gone; the join below reports why.
            let _ = shutdown_tx.send(());
            match finish_or_force(collection, shutdown_signal()).await {
                Stop::Finished(res) => {
                    let cycles = res?;
                    info!(cycles, "MMX exporter stopped");
                    Ok(())
                }
                Stop::Forced => {
                    warn!("second shutdown signal, abandoning current cycle");
                    // Dropping the runtime would block on the collection thread.
                    std::process::exit(0)
                }
            }
        }
    }
}

/// How the collection loop ended after shutdown was requested.
#[derive(Debug)]
enum Stop {
    Finished(anyhow::Result<u64>),
    Forced,
}

/// Waits for the loop to finish its current cycle unless `force` resolves
/// first.
async fn finish_or_force(
    collection: JoinHandle<anyhow::Result<u64>>,
    force: impl Future<Output = ()>,
) -> Stop {
    tokio::select! {
        res = collection => Stop::Finished(joined(res)),
        _ = force => Stop::Forced,
    }
}

fn joined(res: Result<anyhow::Result<u64>, JoinError>) -> anyhow::Result<u64> {
    res.map_err(|e| anyhow!("collection loop panicked: {e}"))?
}

/// Waits for Ctrl-C (or SIGTERM on Unix) and returns.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_signal_abandons_a_stuck_cycle() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let collection = tokio::task::spawn_blocking(move || -> anyhow::Result<u64> {
            let _ = release_rx.recv();
            Ok(1)
        });

        let stop = finish_or_force(collection, async {}).await;
        assert!(matches!(stop, Stop::Forced), "{stop:?}");
        drop(release_tx);
    }

    #[tokio::test]
    async fn finished_cycle_is_reported_without_a_second_signal() {
        let collection = tokio::task::spawn_blocking(|| -> anyhow::Result<u64> { Ok(3) });

        match finish_or_force(collection, std::future::pending()).await {
            Stop::Finished(Ok(cycles)) => assert_eq!(cycles, 3),
            other => panic!("expected finished loop, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn panicked_loop_is_reported_as_an_error() {
        let collection =
            tokio::task::spawn_blocking(|| -> anyhow::Result<u64> { panic!("collector blew up") });

        match finish_or_force(collection, std::future::pending()).await {
            Stop::Finished(Err(e)) => assert!(e.to_string().contains("panicked"), "{e:#}"),
            other => panic!("expected panic error, got {other:?}"),
        }
    }
}
