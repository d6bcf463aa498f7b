// crates/repute-daemon/src/scheduler.rs
//
// Cycle scheduler for the Repute daemon.
//
// Runs an analysis cycle immediately and then every `interval`, sweeps old
// signals every `sweep_every` cycles, and stops on ctrl-c. A ctrl-c during
// a cycle drops it before publish, so the last published snapshot stands.

use std::time::Duration;

use chrono::{DateTime, Utc};

use repute_core::signal::TimeRange;
use repute_pipeline::{run_cycle, sweep_retention, PipelineContext};

/// What one scheduler tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub cycle_ok: bool,
    pub swept: bool,
}

/// Scheduler that triggers analysis cycles on a timer.
pub struct CycleScheduler {
    ctx: PipelineContext,
    interval: Duration,
    /// Sweep after every N cycles; 0 disables sweeping.
    sweep_every: u64,
    /// Cycles attempted so far.
    cycles_run: u64,
}

impl CycleScheduler {
    pub fn new(ctx: PipelineContext, interval: Duration, sweep_every: u64) -> Self {
        Self {
            ctx,
            interval,
            sweep_every,
            cycles_run: 0,
        }
    }

    pub fn cycles_run(&self) -> u64 {
        self.cycles_run
    }

    /// Run until ctrl-c.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        tracing::info!(
            "Cycle scheduler started (interval={}s, sweep_every={})",
            self.interval.as_secs(),
            self.sweep_every
        );

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Cycle scheduler received shutdown signal mid-cycle");
                    break;
                }
                _ = self.tick(Utc::now()) => {}
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Cycle scheduler received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        Ok(())
    }

    /// Run one cycle, then sweep if this cycle hits the sweep boundary.
    /// Failures are logged; the scheduler keeps going.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        self.cycles_run += 1;

        let cycle_ok = match run_cycle(&self.ctx, now).await {
            Ok(report) => {
                tracing::info!(
                    "Cycle {}: {} vs {} -> winner {} (margin {:.2})",
                    self.cycles_run,
                    report.result.subject_a.overall_score,
                    report.result.subject_b.overall_score,
                    report.result.comparison_metrics.winner,
                    report.result.comparison_metrics.margin
                );
                self.log_stats(now);
                true
            }
            Err(e) => {
                tracing::warn!("Cycle {} failed: {}", self.cycles_run, e);
                false
            }
        };

        let swept = if self.sweep_every > 0 && self.cycles_run % self.sweep_every == 0 {
            match sweep_retention(&self.ctx, now) {
                Ok(report) => {
                    tracing::info!(
                        "Retention sweep: {} records removed (cutoff {})",
                        report.deleted_count,
                        report.cutoff
                    );
                    true
                }
                Err(e) => {
                    tracing::warn!("Retention sweep failed: {}", e);
                    false
                }
            }
        } else {
            false
        };

        TickOutcome { cycle_ok, swept }
    }

    fn log_stats(&self, now: DateTime<Utc>) {
        let stats = TimeRange::last_days(now, self.ctx.config.collect_window_days)
            .and_then(|range| self.ctx.signals.stats(range));
        match stats {
            Ok(stats) => {
                for (subject, s) in &stats.by_subject {
                    tracing::debug!(
                        "{}: {} observations, {} sentiment samples, {} sources",
                        subject,
                        s.observations,
                        s.sentiment_samples,
                        s.sources.len()
                    );
                }
            }
            Err(e) => tracing::trace!("Collection stats unavailable: {}", e),
        }
    }
}
