// Retention sweeper: the only component that deletes anything.
//
// Each pass, per stream:
// 1. evict consumers idle longer than the idle timeout
// 2. trim chunks below the lowest remaining cursor (skipped when no cursors remain)
// 3. drop the stream from the registry if it now has no chunks and no consumers

use crate::config::RelayConfig;
use crate::metrics::retention::{CHUNKS_TRIMMED, CONSUMERS_EVICTED, STREAMS_REMOVED};
use crate::relay::registry::StreamRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub sweep_interval: Duration,
    pub consumer_idle_timeout: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}

impl From<&RelayConfig> for RetentionPolicy {
    fn from(config: &RelayConfig) -> Self {
        Self {
            sweep_interval: config.sweep_interval(),
            consumer_idle_timeout: config.consumer_idle_timeout(),
        }
    }
}

/// What one sweep pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub streams_scanned: usize,
    pub consumers_evicted: usize,
    pub chunks_trimmed: usize,
    pub bytes_trimmed: usize,
    pub streams_removed: usize,
}

impl SweepReport {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.consumers_evicted == 0 && self.chunks_trimmed == 0 && self.streams_removed == 0
    }
}

pub struct RetentionSweeper {
    registry: Arc<StreamRegistry>,
    policy: RetentionPolicy,
}

impl RetentionSweeper {
    #[must_use]
    pub fn new(registry: Arc<StreamRegistry>, policy: RetentionPolicy) -> Self {
        Self { registry, policy }
    }

    #[must_use]
    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Run one pass using the current time.
    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(Instant::now())
    }

    /// Run one pass as if the clock read `now`.
    pub fn sweep_at(&self, now: Instant) -> SweepReport {
        let mut report = SweepReport::default();

        for stream in self.registry.entries() {
            report.streams_scanned += 1;

            let idle = {
                let mut state = stream.lock();
                if state.is_retired() {
                    continue;
                }

                let evicted = state.cursors.evict_idle(now, self.policy.consumer_idle_timeout);
                for consumer_id in &evicted {
                    info!(
                        stream_id = %stream.stream_id(),
                        consumer_id = %consumer_id,
                        "Evicted idle consumer"
                    );
                }
                report.consumers_evicted += evicted.len();

                if let Some(floor) = state.cursors.floor() {
                    let trimmed = state.chunks.trim_below(floor);
                    if trimmed.removed > 0 {
                        debug!(
                            stream_id = %stream.stream_id(),
                            floor = floor,
                            removed = trimmed.removed,
                            bytes = trimmed.bytes,
                            "Trimmed consumed chunks"
                        );
                    }
                    report.chunks_trimmed += trimmed.removed;
                    report.bytes_trimmed += trimmed.bytes;
                }

                state.is_idle()
            };

            // The registry re-checks idleness under its own locks
            if idle && self.registry.remove_if_empty(stream.stream_id()) {
                info!(stream_id = %stream.stream_id(), "Removed empty stream");
                report.streams_removed += 1;
            }
        }

        CONSUMERS_EVICTED.inc_by(report.consumers_evicted as u64);
        CHUNKS_TRIMMED.inc_by(report.chunks_trimmed as u64);
        STREAMS_REMOVED.inc_by(report.streams_removed as u64);

        if !report.is_noop() {
            info!(
                streams = report.streams_scanned,
                consumers_evicted = report.consumers_evicted,
                chunks_trimmed = report.chunks_trimmed,
                bytes_trimmed = report.bytes_trimmed,
                streams_removed = report.streams_removed,
                "Retention sweep completed"
            );
        }

        report
    }

    /// Run sweeps every `sweep_interval` until `cancel` fires.
    ///
    /// The first pass happens one interval after spawning.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.policy.sweep_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            interval.tick().await;

            info!(
                interval = ?self.policy.sweep_interval,
                idle_timeout = ?self.policy.consumer_idle_timeout,
                "Retention sweeper started"
            );

            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        info!("Retention sweeper stopped");
                        return;
                    }
                    _ = interval.tick() => {
                        self.sweep();
                    }
                }
            }
        })
    }
}
