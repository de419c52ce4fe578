//! Progress reporting and cooperative cancellation.
//!
//! Stages report *where they are* as a [`Progress`] value (a [`Phase`] plus
//! a fraction of that phase) and a [`Reporter`] turns it into an overall
//! percentage using a [`ProgressPlan`]. The plan is the only place phase
//! weights live, so no call site rescales another stage's numbers.
//!
//! Reported percentages never go backwards: the reporter drops any value
//! below the last one it emitted.
//!
//! Cancellation is a shared flag ([`CancelToken`]) that long-running stages
//! check between units of work. It never interrupts an encode in flight.

use serde::Serialize;
use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Pipeline phase a progress value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Validate,
    Extract,
    Search,
    Fallback,
    Complete,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Validate => "validating",
            Phase::Extract => "cropping",
            Phase::Search => "optimizing",
            Phase::Fallback => "fallback",
            Phase::Complete => "done",
        }
    }
}

/// Position inside a phase, `fraction` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub phase: Phase,
    pub fraction: f64,
}

impl Progress {
    pub fn new(phase: Phase, fraction: f64) -> Self {
        Self { phase, fraction }
    }

    pub fn start(phase: Phase) -> Self {
        Self::new(phase, 0.0)
    }
}

/// What a sink receives: the phase and the overall percentage in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub percent: f64,
}

/// Receiver of progress events. Purely observational.
pub trait ProgressSink {
    fn report(&self, event: ProgressEvent);
}

impl<F: Fn(ProgressEvent)> ProgressSink for F {
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Percentage span `[start, end)` assigned to each phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressPlan {
    validate: (f64, f64),
    extract: (f64, f64),
    search: (f64, f64),
    fallback: (f64, f64),
}

impl ProgressPlan {
    /// Full pipeline. The optimizer owns 20–100 and keeps the last 5% of
    /// that span for its fallback encode.
    pub fn pipeline() -> Self {
        Self {
            validate: (0.0, 5.0),
            extract: (5.0, 20.0),
            search: (20.0, 96.0),
            fallback: (96.0, 100.0),
        }
    }

    /// The optimizer on its own: grid search 0–95, fallback 95–100.
    pub fn optimizer() -> Self {
        Self {
            validate: (0.0, 0.0),
            extract: (0.0, 0.0),
            search: (0.0, 95.0),
            fallback: (95.0, 100.0),
        }
    }

    /// Resolve a phase-relative position to an overall percentage.
    pub fn percent(&self, progress: Progress) -> f64 {
        let (start, end) = match progress.phase {
            Phase::Validate => self.validate,
            Phase::Extract => self.extract,
            Phase::Search => self.search,
            Phase::Fallback => self.fallback,
            Phase::Complete => return 100.0,
        };
        let fraction = if progress.fraction.is_finite() {
            progress.fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        start + (end - start) * fraction
    }
}

/// Resolves [`Progress`] through a plan and forwards monotonic events to an
/// optional sink.
pub struct Reporter<'a> {
    plan: ProgressPlan,
    sink: Option<&'a dyn ProgressSink>,
    last: Cell<Option<f64>>,
}

impl<'a> Reporter<'a> {
    pub fn new(plan: ProgressPlan, sink: &'a dyn ProgressSink) -> Self {
        Self {
            plan,
            sink: Some(sink),
            last: Cell::new(None),
        }
    }

    /// A reporter that computes nothing and tells no one.
    pub fn silent() -> Self {
        Self {
            plan: ProgressPlan::optimizer(),
            sink: None,
            last: Cell::new(None),
        }
    }

    pub fn report(&self, progress: Progress) {
        let Some(sink) = self.sink else {
            return;
        };
        let percent = self.plan.percent(progress);
        if self.last.get().is_some_and(|last| percent <= last) {
            return;
        }
        self.last.set(Some(percent));
        sink.report(ProgressEvent {
            phase: progress.phase,
            percent,
        });
    }

    pub fn complete(&self) {
        self.report(Progress::start(Phase::Complete));
    }
}

/// Shared cancellation flag, checked between units of work.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
