//! Annotation scheduling.
//!
//! Host mutations arrive as an unordered, high-frequency stream. The first
//! signal of a burst schedules one pass for the next frame; every signal
//! also pushes back a trailing pass that runs once the page goes quiet.
//! Location changes, which may not mutate the tree, force a pass after a
//! settle delay.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};
use xblock_config::TimingConfig;
use xblock_dom::MutationRecord;

use crate::annotator::Annotator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    /// A frame pass is pending.
    Scheduled,
    Running,
}

/// Why a pass ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Frame,
    Trailing,
    Forced,
}

/// The coalescing state machine, free of any clock or task.
#[derive(Debug)]
pub struct PassScheduler {
    state: SchedulerState,
    frame: Duration,
    trailing: Duration,
    frame_at: Option<Instant>,
    trailing_at: Option<Instant>,
    forced_at: Option<Instant>,
}

impl PassScheduler {
    pub fn new(frame: Duration, trailing: Duration) -> Self {
        Self {
            state: SchedulerState::Idle,
            frame,
            trailing,
            frame_at: None,
            trailing_at: None,
            forced_at: None,
        }
    }

    pub fn from_timing(timing: &TimingConfig) -> Self {
        Self::new(timing.frame(), timing.trailing())
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Records a host mutation. Returns `true` when it scheduled a frame
    /// pass and `false` when it was coalesced into one already pending or
    /// running. Either way the trailing pass is pushed back.
    pub fn signal(&mut self, now: Instant) -> bool {
        self.trailing_at = Some(now + self.trailing);
        if self.state != SchedulerState::Idle {
            return false;
        }
        self.state = SchedulerState::Scheduled;
        self.frame_at = Some(now + self.frame);
        true
    }

    /// Requests an unconditional pass at `at`. The earliest request wins.
    pub fn force_at(&mut self, at: Instant) {
        self.forced_at = Some(self.forced_at.map_or(at, |current| current.min(at)));
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        [self.frame_at, self.trailing_at, self.forced_at]
            .into_iter()
            .flatten()
            .min()
    }

    /// Claims the next pass due at `now`, entering `Running`.
    ///
    /// Returns `None` while a pass is running, so two never overlap.
    pub fn due(&mut self, now: Instant) -> Option<PassKind> {
        if self.state == SchedulerState::Running {
            return None;
        }
        let kind = if self.frame_at.is_some_and(|at| at <= now) {
            self.frame_at = None;
            PassKind::Frame
        } else if self.trailing_at.is_some_and(|at| at <= now) {
            self.trailing_at = None;
            PassKind::Trailing
        } else if self.forced_at.is_some_and(|at| at <= now) {
            self.forced_at = None;
            PassKind::Forced
        } else {
            return None;
        };
        self.state = SchedulerState::Running;
        Some(kind)
    }

    /// Ends the running pass.
    pub fn complete(&mut self) {
        if self.state == SchedulerState::Running {
            self.state = if self.frame_at.is_some() {
                SchedulerState::Scheduled
            } else {
                SchedulerState::Idle
            };
        }
    }
}

/// Scheduler counters.
#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    pub signals: AtomicU64,
    pub coalesced: AtomicU64,
    pub frame_passes: AtomicU64,
    pub trailing_passes: AtomicU64,
    pub forced_passes: AtomicU64,
    pub navigations: AtomicU64,
}

/// Point-in-time copy of [`SchedulerMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub signals: u64,
    pub coalesced: u64,
    pub frame_passes: u64,
    pub trailing_passes: u64,
    pub forced_passes: u64,
    pub navigations: u64,
}

impl SchedulerStats {
    pub fn passes(&self) -> u64 {
        self.frame_passes + self.trailing_passes + self.forced_passes
    }
}

impl SchedulerMetrics {
    fn record_signal(&self, scheduled: bool) {
        self.signals.fetch_add(1, Ordering::Relaxed);
        if !scheduled {
            self.coalesced.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_pass(&self, kind: PassKind) {
        let counter = match kind {
            PassKind::Frame => &self.frame_passes,
            PassKind::Trailing => &self.trailing_passes,
            PassKind::Forced => &self.forced_passes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            signals: self.signals.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            frame_passes: self.frame_passes.load(Ordering::Relaxed),
            trailing_passes: self.trailing_passes.load(Ordering::Relaxed),
            forced_passes: self.forced_passes.load(Ordering::Relaxed),
            navigations: self.navigations.load(Ordering::Relaxed),
        }
    }
}

/// Drives [`Annotator`] passes from host mutations and location changes.
pub struct Scheduler {
    annotator: Arc<Annotator>,
    metrics: Arc<SchedulerMetrics>,
}

impl Scheduler {
    pub fn new(annotator: Arc<Annotator>) -> Self {
        Self {
            annotator,
            metrics: Arc::new(SchedulerMetrics::default()),
        }
    }

    pub fn metrics(&self) -> Arc<SchedulerMetrics> {
        self.metrics.clone()
    }

    /// Starts the scheduling task. The first pass is forced after the
    /// initial delay.
    pub fn spawn(self) -> JoinHandle<()> {
        let ctx = self.annotator.factory().context().clone();
        let rx = ctx.doc().write().observe();
        tokio::spawn(async move { self.run(rx).await })
    }

    async fn run(self, mut rx: mpsc::UnboundedReceiver<MutationRecord>) {
        let ctx = self.annotator.factory().context().clone();
        let timing = ctx.timing().clone();
        let mut machine = PassScheduler::from_timing(&timing);
        machine.force_at(Instant::now() + timing.initial_pass_delay());

        let mut last_location = ctx.doc().read().location().to_string();
        let mut poll = tokio::time::interval_at(
            Instant::now() + timing.location_poll(),
            timing.location_poll(),
        );
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Annotation scheduler started");
        loop {
            let deadline = machine.next_deadline();
            tokio::select! {
                record = rx.recv() => match record {
                    Some(record) if record.is_host() => {
                        let scheduled = machine.signal(Instant::now());
                        self.metrics.record_signal(scheduled);
                    }
                    Some(_) => {}
                    None => break,
                },
                _ = poll.tick() => {
                    let current = ctx.doc().read().location().to_string();
                    if current != last_location {
                        debug!(from = %last_location, to = %current, "Location changed");
                        last_location = current;
                        self.metrics.navigations.fetch_add(1, Ordering::Relaxed);
                        machine.force_at(Instant::now() + timing.location_settle());
                    }
                }
                _ = sleep_until(deadline) => {
                    while let Some(kind) = machine.due(Instant::now()) {
                        let report = self.annotator.run_pass();
                        self.metrics.record_pass(kind);
                        machine.complete();
                        debug!(?kind, attached = report.attached(), "Pass finished");
                    }
                }
            }
        }
        info!("Annotation scheduler stopped");
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
