//! At-most-one-in-flight refresh debouncing.
//!
//! A burst of change-feed signals for one table (e.g. a bulk import firing
//! row-level notifications) must collapse into a single in-flight refresh
//! plus at most one follow-up, not one fetch per signal. The pending flag is
//! a single slot on purpose: the follow-up refresh is authoritative for
//! everything that arrived while the first was in flight.

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct State {
    in_flight: bool,
    pending: bool,
}

/// Per-table debounce state machine. The driver calls [`Debouncer::begin`]
/// on every signal and starts a refresh only when it returns true; after
/// each refresh completes, [`Debouncer::finish`] reports whether exactly one
/// follow-up is owed.
#[derive(Debug, Default)]
pub struct Debouncer {
    state: Mutex<State>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change signal. Returns true if the caller should start a
    /// refresh now; false if one is already in flight (the signal is folded
    /// into the pending slot).
    pub fn begin(&self) -> bool {
        let mut state = self.state.lock();
        if state.in_flight {
            state.pending = true;
            false
        } else {
            state.in_flight = true;
            true
        }
    }

    /// Record a completed refresh. Returns true if signals arrived in the
    /// meantime and the caller should run exactly one follow-up refresh
    /// (the in-flight slot stays held in that case).
    pub fn finish(&self) -> bool {
        let mut state = self.state.lock();
        if state.pending {
            state.pending = false;
            true
        } else {
            state.in_flight = false;
            false
        }
    }
}
