// src/engine/queue.rs

use std::collections::HashMap;

use tracing::debug;

use crate::types::TriggerWhileRunningBehaviour;

/// What the caller should do with a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    /// Start a run now.
    Start,
    /// A run is in flight; one follow-up run is now pending.
    Queued,
    /// A follow-up run was already pending; this trigger folds into it.
    Coalesced,
}

#[derive(Debug, Default, Clone, Copy)]
struct BindingState {
    running: usize,
    pending: bool,
}

/// Tracks in-flight runs per watch binding.
///
/// Semantics:
/// - `Queue`: while a binding runs, any number of triggers collapse into a
///   single pending run, started when the current one finishes.
/// - `Concurrent`: every trigger starts a run immediately, so runs of the
///   same binding may overlap.
#[derive(Debug)]
pub struct BindingQueue {
    behaviour: TriggerWhileRunningBehaviour,
    states: HashMap<usize, BindingState>,
}

impl BindingQueue {
    pub fn new(behaviour: TriggerWhileRunningBehaviour) -> Self {
        Self {
            behaviour,
            states: HashMap::new(),
        }
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    /// Record a trigger for `binding`.
    pub fn trigger(&mut self, binding: usize) -> TriggerDecision {
        let state = self.states.entry(binding).or_default();

        let decision = match self.behaviour {
            TriggerWhileRunningBehaviour::Concurrent => TriggerDecision::Start,
            TriggerWhileRunningBehaviour::Queue if state.running == 0 => TriggerDecision::Start,
            TriggerWhileRunningBehaviour::Queue if state.pending => TriggerDecision::Coalesced,
            TriggerWhileRunningBehaviour::Queue => {
                state.pending = true;
                TriggerDecision::Queued
            }
        };

        if decision == TriggerDecision::Start {
            state.running += 1;
        }
        debug!(binding, ?decision, running = state.running, "binding triggered");
        decision
    }

    /// Record that one run of `binding` finished. Returns true when a
    /// pending run should start now; the queue already counts it as running.
    pub fn finish(&mut self, binding: usize) -> bool {
        let state = self.states.entry(binding).or_default();
        state.running = state.running.saturating_sub(1);

        if state.pending && state.running == 0 {
            state.pending = false;
            state.running = 1;
            debug!(binding, "starting pending run");
            return true;
        }
        false
    }

    pub fn is_running(&self, binding: usize) -> bool {
        self.states.get(&binding).is_some_and(|s| s.running > 0)
    }

    pub fn is_pending(&self, binding: usize) -> bool {
        self.states.get(&binding).is_some_and(|s| s.pending)
    }

    /// True when nothing is running or pending.
    pub fn is_idle(&self) -> bool {
        self.states.values().all(|s| s.running == 0 && !s.pending)
    }
}
