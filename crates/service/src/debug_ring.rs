//! Bounded observability buffers fed by the refresh lifecycle.

use std::collections::{BTreeMap, VecDeque};

use gamma_core::{CheckStatus, DebugEvent, TradeabilityCheck};
use serde::{Deserialize, Serialize};

pub const EVENT_CAPACITY: usize = 300;
pub const ERROR_CAPACITY: usize = 120;

/// Recent lifecycle events plus a separate ring for warnings and errors.
#[derive(Debug)]
pub struct DebugEventRing {
    events: VecDeque<DebugEvent>,
    errors: VecDeque<DebugEvent>,
    event_capacity: usize,
    error_capacity: usize,
}

impl Default for DebugEventRing {
    fn default() -> Self {
        Self::new(EVENT_CAPACITY, ERROR_CAPACITY)
    }
}

impl DebugEventRing {
    #[must_use]
    pub fn new(event_capacity: usize, error_capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(event_capacity),
            errors: VecDeque::with_capacity(error_capacity),
            event_capacity: event_capacity.max(1),
            error_capacity: error_capacity.max(1),
        }
    }

    /// Records an event; warnings and errors also go to the error ring.
    pub fn record(&mut self, event: DebugEvent) {
        if event.is_problem() {
            push_bounded(&mut self.errors, event.clone(), self.error_capacity);
        }
        push_bounded(&mut self.events, event, self.event_capacity);
    }

    /// Last `n` events, oldest first.
    #[must_use]
    pub fn recent_events(&self, n: usize) -> Vec<DebugEvent> {
        tail(&self.events, n)
    }

    /// Last `n` warnings and errors, oldest first.
    #[must_use]
    pub fn recent_errors(&self, n: usize) -> Vec<DebugEvent> {
        tail(&self.errors, n)
    }
}

fn push_bounded(ring: &mut VecDeque<DebugEvent>, event: DebugEvent, capacity: usize) {
    while ring.len() >= capacity {
        ring.pop_front();
    }
    ring.push_back(event);
}

fn tail(ring: &VecDeque<DebugEvent>, n: usize) -> Vec<DebugEvent> {
    ring.iter().skip(ring.len().saturating_sub(n)).cloned().collect()
}

/// Per-rule outcome counters across successful refreshes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCounter {
    pub pass: u64,
    pub fail: u64,
    pub warn: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleStats {
    pub rules: BTreeMap<String, RuleCounter>,
}

impl RuleStats {
    pub fn record(&mut self, checks: &[TradeabilityCheck]) {
        for check in checks {
            let counter = self.rules.entry(check.name.clone()).or_default();
            match check.status {
                CheckStatus::Pass => counter.pass += 1,
                CheckStatus::FailBlocking => counter.fail += 1,
                CheckStatus::WarnNonblocking => counter.warn += 1,
            }
        }
    }
}
