// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicBool, Ordering};

/// The progress/cancellation collaborator of a route query.
///
/// Both methods are sinks: the search polls `is_cancelled` roughly
/// every hundred expansions and pushes status on the same cadence,
/// and never blocks on either. Cancellation is cooperative, not
/// preemptive — after a poll returns true, the query winds down with
/// a cancelled outcome and its partial state is simply discarded.
pub trait RouteObserver {
    fn is_cancelled(&self) -> bool {
        false
    }

    fn update_status(
        &self,
        _distance_from_start: f32,
        _direct_queue_size: usize,
        _distance_from_end: f32,
        _reverse_queue_size: usize,
    ) {
    }
}

/// An observer that never cancels and discards status updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoObserver;

impl RouteObserver for NoObserver {}

/// A thread-safe cancellation token: hand it to a query and flip it
/// from anywhere.
#[derive(Debug, Default)]
pub struct CancellationFlag(AtomicBool);

impl CancellationFlag {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

impl RouteObserver for CancellationFlag {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_flag_flips_once() {
        let flag = CancellationFlag::new();
        assert!(!flag.is_cancelled());
        flag.cancel();
        assert!(flag.is_cancelled());
        flag.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn default_observer_never_cancels() {
        assert!(!NoObserver.is_cancelled());
        NoObserver.update_status(0.0, 0, 0.0, 0);
    }
}
