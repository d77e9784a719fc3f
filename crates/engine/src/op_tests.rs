// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mdt_adapters::{ConfirmCall, FakeBridge, FakeConfirm};
use mdt_core::FakeClock;

fn collecting_sink() -> (ProgressSink, Arc<Mutex<Vec<OperationProgress>>>) {
    let seen: Arc<Mutex<Vec<OperationProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    let sink: ProgressSink = Arc::new(move |p| sink_seen.lock().push(p));
    (sink, seen)
}

#[test]
fn begin_resets_cancel_and_errors() {
    let op = Operation::new();
    op.cancel();
    op.record_error("old failure");
    assert!(op.is_cancelled());
    assert!(op.has_errors());

    op.begin();
    assert!(!op.is_cancelled());
    assert!(!op.has_errors());
}

#[test]
fn cancel_flag_persists_until_next_begin() {
    let op = Operation::new();
    op.begin();
    op.cancel();
    assert!(op.is_cancelled());
    // Still set after the operation finishes
    let _ = op.emit_terminal();
    assert!(op.is_cancelled());
    op.begin();
    assert!(!op.is_cancelled());
}

#[test]
fn emit_fills_elapsed_and_eta() {
    let clock = FakeClock::new();
    let op = Operation::with_clock(clock.clone());
    let (sink, seen) = collecting_sink();
    op.set_progress_sink(sink);
    op.begin();

    clock.advance(std::time::Duration::from_secs(30));
    op.emit(OperationProgress {
        phase: Phase::BackingUp,
        percent: 25.0,
        ..Default::default()
    });

    let events = seen.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].elapsed_seconds, 30.0);
    // 30s for 25% -> 90s remaining
    assert_eq!(events[0].eta_seconds, 90.0);
}

#[test]
fn emit_attaches_accumulated_errors() {
    let op = Operation::new();
    let (sink, seen) = collecting_sink();
    op.set_progress_sink(sink);
    op.begin();
    op.record_error("Pull falhou: a.jpg");

    op.emit(OperationProgress::phase(Phase::BackingUp));
    assert_eq!(seen.lock()[0].errors, vec!["Pull falhou: a.jpg".to_string()]);
}

#[test]
fn terminal_phase_follows_error_list() {
    let op = Operation::new();
    op.begin();
    assert_eq!(op.terminal_phase(), Phase::Complete);
    op.record_error("one file failed");
    assert_eq!(op.terminal_phase(), Phase::CompleteWithErrors);
}

#[test]
fn emit_terminal_reports_hundred_percent() {
    let op = Operation::new();
    let (sink, seen) = collecting_sink();
    op.set_progress_sink(sink);
    op.begin();
    let phase = op.emit_terminal();
    assert_eq!(phase, Phase::Complete);
    let events = seen.lock();
    assert_eq!(events[0].phase, Phase::Complete);
    assert_eq!(events[0].percent, 100.0);
}

#[tokio::test]
async fn confirmation_overlay_is_strictly_paired() {
    let bridge = FakeBridge::new();
    let confirm = FakeConfirm::new();
    let op = Operation::new();
    op.set_confirm(Arc::new(confirm.clone()));
    op.begin();

    let output = op
        .run_with_confirmation(
            &bridge,
            "S1",
            &["backup", "-all", "-f", "/tmp/ignore.ab"],
            "Full backup",
            "Confirm the backup on the device",
            Duration::from_secs(5),
        )
        .await
        .unwrap();
    assert!(output.success());
    assert_eq!(confirm.open_overlays(), 0);
    let calls = confirm.calls();
    assert!(matches!(calls[0], ConfirmCall::Show { .. }));
    assert_eq!(calls[1], ConfirmCall::Dismiss);
}

#[test]
fn scale_percent_maps_and_clamps() {
    assert_eq!(scale_percent((0.0, 50.0), 0.5), 25.0);
    assert_eq!(scale_percent((50.0, 80.0), 0.0), 50.0);
    assert_eq!(scale_percent((50.0, 80.0), 2.0), 80.0);
    assert_eq!(scale_percent((80.0, 90.0), 1.0), 90.0);
}
