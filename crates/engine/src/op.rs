// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation substrate shared by every pipeline manager.
//!
//! One `Operation` instance may run one workflow at a time; concurrent
//! workflows take distinct manager instances. The operation exclusively
//! owns its cancellation flag, error accumulator and progress sink for the
//! duration of a run.

use mdt_adapters::{Bridge, BridgeError, BridgeOutput, ConfirmAdapter};
use mdt_core::{Clock, OperationProgress, Phase, SystemClock};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Non-blocking progress callback. Front-ends marshal to their UI thread.
pub type ProgressSink = Arc<dyn Fn(OperationProgress) + Send + Sync>;

/// Cancellation, timing, errors and the confirmation-overlay protocol.
#[derive(Clone)]
pub struct Operation<K: Clock = SystemClock> {
    clock: K,
    cancel: mdt_core::CancelToken,
    inner: Arc<Mutex<OpState>>,
}

struct OpState {
    id: Uuid,
    started: Option<Instant>,
    errors: Vec<String>,
    sink: Option<ProgressSink>,
    confirm: Option<Arc<dyn ConfirmAdapter>>,
}

impl Operation<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for Operation<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clock> Operation<K> {
    pub fn with_clock(clock: K) -> Self {
        Self {
            clock,
            cancel: mdt_core::CancelToken::new(),
            inner: Arc::new(Mutex::new(OpState {
                id: Uuid::new_v4(),
                started: None,
                errors: Vec::new(),
                sink: None,
                confirm: None,
            })),
        }
    }

    /// Register the progress callback. Set once before the operation starts.
    pub fn set_progress_sink(&self, sink: ProgressSink) {
        self.inner.lock().sink = Some(sink);
    }

    /// Register the confirmation-overlay adapter.
    pub fn set_confirm(&self, confirm: Arc<dyn ConfirmAdapter>) {
        self.inner.lock().confirm = Some(confirm);
    }

    /// Call at the start of any top-level workflow: resets the cancel
    /// flag, clears accumulated errors and records the start instant.
    pub fn begin(&self) {
        self.cancel.reset();
        let mut state = self.inner.lock();
        state.id = Uuid::new_v4();
        state.started = Some(self.clock.now());
        state.errors.clear();
        tracing::debug!(operation_id = %state.id, "operation started");
    }

    pub fn cancel(&self) {
        tracing::info!("operation cancellation requested");
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> mdt_core::CancelToken {
        self.cancel.clone()
    }

    /// Append a short human-readable error; the operation continues.
    pub fn record_error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message, "operation error recorded");
        self.inner.lock().errors.push(message);
    }

    pub fn errors(&self) -> Vec<String> {
        self.inner.lock().errors.clone()
    }

    pub fn has_errors(&self) -> bool {
        !self.inner.lock().errors.is_empty()
    }

    /// Seconds since `begin`, zero before the first `begin`.
    pub fn elapsed_seconds(&self) -> f64 {
        let started = self.inner.lock().started;
        match started {
            Some(start) => (self.clock.now() - start).as_secs_f64(),
            None => 0.0,
        }
    }

    /// Send progress to the registered sink. Fills `elapsed_seconds`,
    /// extrapolates `eta_seconds` from percent complete, and attaches a
    /// snapshot of accumulated errors when the record carries none.
    pub fn emit(&self, mut progress: OperationProgress) {
        let sink = {
            let state = self.inner.lock();
            if let Some(start) = state.started {
                progress.elapsed_seconds = (self.clock.now() - start).as_secs_f64();
                if progress.percent > 0.0 {
                    let remaining = 100.0 - progress.percent;
                    progress.eta_seconds = progress.elapsed_seconds / progress.percent * remaining;
                }
            }
            if progress.errors.is_empty() && !state.errors.is_empty() {
                progress.errors = state.errors.clone();
            }
            state.sink.clone()
        };
        if let Some(sink) = sink {
            sink(progress);
        }
    }

    /// Terminal phase per the error-list law: `Complete` iff no errors.
    pub fn terminal_phase(&self) -> Phase {
        if self.has_errors() {
            Phase::CompleteWithErrors
        } else {
            Phase::Complete
        }
    }

    /// Emit the terminal progress record and return its phase.
    pub fn emit_terminal(&self) -> Phase {
        let phase = self.terminal_phase();
        self.emit(OperationProgress {
            phase,
            percent: 100.0,
            ..Default::default()
        });
        phase
    }

    /// Run a bridge command that needs the end user to accept a prompt on
    /// the device. Shows the overlay first and dismisses it exactly once,
    /// whatever the outcome.
    pub async fn run_with_confirmation<B: Bridge>(
        &self,
        bridge: &B,
        serial: &str,
        args: &[&str],
        title: &str,
        message: &str,
        timeout: Duration,
    ) -> Result<BridgeOutput, BridgeError> {
        let confirm = self.inner.lock().confirm.clone();
        if let Some(confirm) = &confirm {
            confirm.show(title, message).await;
        }
        tracing::info!(title, "device confirmation requested");
        let result = bridge.run(Some(serial), args, timeout).await;
        if let Some(confirm) = &confirm {
            confirm.dismiss().await;
        }
        result
    }
}

/// Map a stage-local fraction in [0, 1] into an overall percent range.
pub fn scale_percent(range: (f64, f64), fraction: f64) -> f64 {
    let (lo, hi) = range;
    lo + (hi - lo) * fraction.clamp(0.0, 1.0)
}

#[cfg(test)]
#[path = "op_tests.rs"]
mod tests;
