//! Shared test helpers for output algebra integration tests.

#![allow(dead_code)]

use parking_lot::{Mutex, MutexGuard};

use lodestar_core::{set_phase, Phase, ResourceId, ResourceSet};
use lodestar_output::Output;

static PHASE_LOCK: Mutex<()> = Mutex::new(());

/// Holds the process-wide execution phase for the duration of a test.
///
/// The phase flag is shared by every test in the binary, so tests whose
/// behavior depends on it serialize through this guard; the phase is
/// restored to `Apply` (the default) on drop.
pub struct PhaseGuard {
    _lock: MutexGuard<'static, ()>,
}

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        set_phase(Phase::Apply);
    }
}

/// Acquires the phase lock and switches the process to the given phase.
pub fn with_phase(phase: Phase) -> PhaseGuard {
    let lock = PHASE_LOCK.lock();
    set_phase(phase);
    PhaseGuard { _lock: lock }
}

/// A resource identity set holding a single named identity.
pub fn deps_of(urn: &str) -> ResourceSet {
    ResourceSet::singleton(ResourceId::from_urn(urn))
}

/// An unknown, non-secret output attributed to the named resource.
pub fn unknown_from(urn: &str) -> Output {
    Output::resolved(lodestar_core::Value::Unknown, false, false, deps_of(urn))
}
