//! The forwarding loop: connect, fetch, format, send, sleep.

use crate::link::{ConnectionManager, LinkState, PortOpener};
use crate::locator::PortScanner;
use crate::memory::MemoryProbe;
use crate::pipeline::MetricRules;
use crate::source::{FetchError, TelemetrySource};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What happened during one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A full block reached the peripheral.
    Sent,
    /// The telemetry fetch failed; nothing was written.
    Skipped,
    /// The write failed and the link was dropped.
    LinkLost,
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub sent: u64,
    pub skipped: u64,
    pub link_lost: u64,
}

impl CycleStats {
    fn record(&mut self, outcome: CycleOutcome) {
        match outcome {
            CycleOutcome::Sent => self.sent += 1,
            CycleOutcome::Skipped => self.skipped += 1,
            CycleOutcome::LinkLost => self.link_lost += 1,
        }
    }
}

/// Fetch one set of readings and render the block for the peripheral.
pub async fn compose_block<T, M>(
    source: &T,
    memory: &mut M,
    rules: &MetricRules,
) -> Result<String, FetchError>
where
    T: TelemetrySource + ?Sized,
    M: MemoryProbe + ?Sized,
{
    let readings = source.fetch().await?;
    let snapshot = rules.snapshot(&readings, memory.sample());
    Ok(snapshot.render())
}

/// Drives the sequential fetch/format/send cycle.
pub struct Forwarder<S, O, T, M> {
    link: ConnectionManager<S, O>,
    source: T,
    memory: M,
    rules: MetricRules,
    interval: Duration,
}

impl<S, O, T, M> Forwarder<S, O, T, M>
where
    S: PortScanner,
    O: PortOpener,
    T: TelemetrySource,
    M: MemoryProbe,
{
    pub fn new(
        link: ConnectionManager<S, O>,
        source: T,
        memory: M,
        rules: MetricRules,
        interval: Duration,
    ) -> Self {
        Self {
            link,
            source,
            memory,
            rules,
            interval,
        }
    }

    /// Run one cycle against the given link state.
    ///
    /// A disconnected link is re-established first, so no block is ever
    /// written without an open handle.
    pub async fn run_cycle(&mut self, state: &mut LinkState<O::Link>) -> CycleOutcome {
        if !state.is_connected() {
            self.link.connect(state).await;
        }

        let block = match compose_block(&self.source, &mut self.memory, &self.rules).await {
            Ok(block) => block,
            Err(e) => {
                warn!(error = %e, "Skipping cycle");
                return CycleOutcome::Skipped;
            }
        };

        let LinkState::Connected(handle) = &mut *state else {
            return CycleOutcome::LinkLost;
        };

        debug!(path = %handle.path(), "Sending:\n{}", block);

        let result = handle.send(&block).await;
        match result {
            Ok(()) => CycleOutcome::Sent,
            Err(e) => {
                warn!(path = %handle.path(), error = %e, "Serial disconnected. Reconnecting...");
                if let LinkState::Connected(handle) =
                    std::mem::replace(state, LinkState::Disconnected)
                {
                    handle.close().await;
                }
                CycleOutcome::LinkLost
            }
        }
    }

    /// Loop until `shutdown` resolves, then close any open link.
    pub async fn run<F>(mut self, shutdown: F) -> CycleStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut state = LinkState::Disconnected;
        let mut stats = CycleStats::default();

        info!(
            device = %self.link.locator().target(),
            interval_ms = self.interval.as_millis() as u64,
            "Starting forwarder"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                outcome = self.run_cycle(&mut state) => stats.record(outcome),
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!(
            sent = stats.sent,
            skipped = stats.skipped,
            link_lost = stats.link_lost,
            "Shutdown requested"
        );

        if let LinkState::Connected(handle) = state {
            handle.close().await;
        }

        stats
    }
}
