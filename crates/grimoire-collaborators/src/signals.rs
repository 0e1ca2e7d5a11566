// grimoire-collaborators/src/signals.rs
// ============================================================================
// Module: Flag-Backed Signals
// Description: AtomicBool-backed PauseSignal/CancellationSignal.
// Purpose: Let a host request a pause or cancellation from another thread
//          while the interpreter runs.
// Dependencies: grimoire-core, std
// ============================================================================

//! ## Overview
//! [`FlagPauseSignal`] and [`FlagCancellationSignal`] are thin, cloneable
//! wrappers over a shared `AtomicBool`, mirroring how the teacher threads a
//! `Host`'s collaborators as cheaply cloneable `Arc`s: a caller keeps one
//! handle to flip the flag, and clones another into the run for the
//! interpreter to poll.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use grimoire_core::{CancellationSignal, PauseSignal};

/// A cloneable, settable pause flag.
#[derive(Clone, Default)]
pub struct FlagPauseSignal {
    flag: Arc<AtomicBool>,
}

impl FlagPauseSignal {
    /// Creates a signal that is not set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a pause at the next resume point.
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clears a previously requested pause.
    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl PauseSignal for FlagPauseSignal {
    fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// A cloneable, settable cancellation flag.
#[derive(Clone, Default)]
pub struct FlagCancellationSignal {
    flag: Arc<AtomicBool>,
}

impl FlagCancellationSignal {
    /// Creates a signal that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

impl CancellationSignal for FlagCancellationSignal {
    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        clippy::dbg_macro,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        reason = "Test-only output and panic-based assertions are permitted."
    )]
    use super::*;

    #[test]
    fn pause_signal_starts_clear_and_tracks_requests() {
        let signal = FlagPauseSignal::new();
        assert!(!signal.is_set());
        signal.request();
        assert!(signal.is_set());
        signal.clear();
        assert!(!signal.is_set());
    }

    #[test]
    fn cloned_signal_shares_state() {
        let signal = FlagPauseSignal::new();
        let clone = signal.clone();
        clone.request();
        assert!(signal.is_set());
    }

    #[test]
    fn cancellation_signal_starts_clear_and_tracks_requests() {
        let signal = FlagCancellationSignal::new();
        assert!(!signal.is_cancelled());
        signal.request();
        assert!(signal.is_cancelled());
    }
}
