//! The collection loop.
//!
//! Runs every enabled collector once, in order, then waits for the
//! configured interval and starts over. Collector failures are logged and
//! never stop the loop; only a shutdown request does, checked at the end of
//! each cycle and during the wait.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::collectors::{CollectError, Collector};
use crate::rpc::RpcClient;

/// Outcome of one pass over all collectors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct Scheduler {
    collectors: Vec<Box<dyn Collector>>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(collectors: Vec<Box<dyn Collector>>, interval: Duration) -> Self {
        Self {
            collectors,
            interval,
        }
    }

    /// Runs each collector once. Errors are logged and counted.
    pub fn run_cycle(&self, rpc: &RpcClient) -> CycleReport {
        let mut report = CycleReport::default();

        for collector in &self.collectors {
            let name = collector.kind().as_str();
            match collector.collect(rpc) {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    report.failed += 1;
                    let endpoint = collector.endpoint();
                    let auth = e.is_auth();
                    let error = error_chain(e);
                    if auth {
                        error!(collector = name, endpoint, %error, "RPC authentication failed");
                    } else {
                        warn!(collector = name, endpoint, %error, "collection failed");
                    }
                }
            }
        }

        report
    }

    /// Runs cycles until a message arrives on `shutdown` or its sender is
    /// dropped. Returns the number of completed cycles.
    ///
    /// A shutdown request during a cycle takes effect once the cycle is
    /// done; during the wait it takes effect immediately.
    pub fn run(&self, rpc: &RpcClient, shutdown: &Receiver<()>) -> u64 {
        info!(
            collectors = self.collectors.len(),
            interval_secs = self.interval.as_secs_f64(),
            auth = rpc.auth_name(),
            "collection loop started"
        );

        let mut cycles = 0u64;
        loop {
            let start = Instant::now();
            let report = self.run_cycle(rpc);
            cycles += 1;
            debug!(
                cycle = cycles,
                succeeded = report.succeeded,
                failed = report.failed,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "collection cycle finished"
            );

            match shutdown.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        info!(cycles, "collection loop stopped");
        cycles
    }
}

/// Renders `e` followed by every `source()` below it, so the I/O cause of a
/// transport failure ends up in the log line.
pub(crate) fn error_chain(e: CollectError) -> String {
    format!("{:#}", anyhow::Error::new(e))
}
