//! Mutation Watcher
//!
//! Coalesces bursts of DOM mutation batches into one trailing guard pass.
//! The first batch after load also guards immediately.

use crate::state::EngineState;

/// Timer facility supplied by the host (`setTimeout` in the browser).
pub trait Scheduler {
    type Handle;

    /// Arm a one-shot timer firing after `delay_ms`.
    fn schedule(&mut self, delay_ms: u32) -> Self::Handle;

    fn cancel(&mut self, handle: Self::Handle);
}

/// What the caller should do after reporting a mutation batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Engine disarmed; the batch was dropped.
    Ignored,
    /// First batch: guard now. A trailing pass is armed as well.
    GuardNow,
    /// A trailing pass is armed.
    Deferred,
}

#[derive(Debug)]
pub struct MutationWatcher<H> {
    batches: u64,
    pending: Option<H>,
}

impl<H> Default for MutationWatcher<H> {
    fn default() -> Self {
        Self {
            batches: 0,
            pending: None,
        }
    }
}

impl<H> MutationWatcher<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mutation batch and re-arm the debounce timer.
    pub fn observe<S>(&mut self, state: &EngineState, scheduler: &mut S) -> WatchOutcome
    where
        S: Scheduler<Handle = H>,
    {
        if !state.is_armed() {
            return WatchOutcome::Ignored;
        }

        self.batches += 1;
        if let Some(previous) = self.pending.take() {
            scheduler.cancel(previous);
        }
        self.pending = Some(scheduler.schedule(state.mutation_delay_ms));

        if self.batches == 1 {
            WatchOutcome::GuardNow
        } else {
            WatchOutcome::Deferred
        }
    }

    /// The armed timer expired. Returns false for a stale expiry.
    pub fn fire(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Batches seen while armed.
    pub fn batches(&self) -> u64 {
        self.batches
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
