//! The process-wide execution phase.
//!
//! A deployment runs in one of two phases. During a **preview** the engine
//! simulates resource creation, so many values stay unknown and apply
//! callbacks over unknown sources are skipped. During an **apply** the real
//! deployment runs and callbacks execute even over unknown sources, so
//! their side effects happen.
//!
//! The phase is set once per run by the program runtime and read by the
//! output algebra. It lives behind an atomic; tests that flip it serialize
//! themselves through a lock.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

/// The execution phase of the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Simulated run; resource creation is previewed, not performed.
    Preview,
    /// Real run; resources are created and updated.
    Apply,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Preview => f.write_str("preview"),
            Phase::Apply => f.write_str("apply"),
        }
    }
}

static PREVIEWING: AtomicBool = AtomicBool::new(false);

/// Sets the process-wide execution phase.
pub fn set_phase(phase: Phase) {
    tracing::debug!(%phase, "execution phase set");
    PREVIEWING.store(phase == Phase::Preview, Ordering::SeqCst);
}

/// Returns the current execution phase.
#[must_use]
pub fn current_phase() -> Phase {
    if PREVIEWING.load(Ordering::SeqCst) {
        Phase::Preview
    } else {
        Phase::Apply
    }
}

/// Returns `true` while the current phase is a preview (dry run).
#[must_use]
pub fn is_dry_run() -> bool {
    PREVIEWING.load(Ordering::SeqCst)
}
