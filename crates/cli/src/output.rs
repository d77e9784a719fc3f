// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress rendering for interactive runs

use mdt_core::{format_bytes, format_elapsed, OperationProgress};
use mdt_engine::ProgressSink;
use std::io::Write;
use std::sync::Arc;

/// Single-line progress renderer: rewrites the current terminal line and
/// prints a final newline on terminal phases.
pub fn progress_sink() -> ProgressSink {
    Arc::new(|progress: OperationProgress| {
        let mut line = format!("[{:>5.1}%] {}", progress.percent, progress.phase);
        if !progress.sub_phase.is_empty() {
            line.push_str(&format!(" ({})", progress.sub_phase));
        }
        if !progress.current_item.is_empty() {
            line.push_str(&format!(" {}", progress.current_item));
        }
        if progress.items_total > 0 {
            line.push_str(&format!(
                " {}/{}",
                progress.items_done, progress.items_total
            ));
        }
        if progress.bytes_total > 0 {
            line.push_str(&format!(
                " {}/{}",
                format_bytes(progress.bytes_done),
                format_bytes(progress.bytes_total)
            ));
        }
        if progress.eta_seconds > 0.0 {
            line.push_str(&format!(" eta {}", format_elapsed(progress.eta_seconds)));
        }

        let mut stderr = std::io::stderr();
        if progress.phase.is_terminal() {
            let _ = writeln!(stderr, "\r{:<100}", line);
            for error in &progress.errors {
                let _ = writeln!(stderr, "  ! {}", error);
            }
        } else {
            let _ = write!(stderr, "\r{:<100}", line);
            let _ = stderr.flush();
        }
    })
}
