//! Discrete-stepping engine (§4.I): a thin, stateful wrapper around a net
//! and its current marking, for callers that want to dispatch one
//! transition at a time rather than run a full reachability search.

use crate::error::{SimError, SimResult};
use crate::net::Net;
use crate::problem::Marking;
use crate::reach;
use std::sync::Arc;

/// Owns the current marking; `dispatch` is atomic — either the transition
/// fires in full or the state is left untouched.
pub struct Engine {
    net: Arc<Net>,
    marking: Marking,
}

impl Engine {
    pub fn new(net: Arc<Net>) -> Self {
        let marking = net.initial_marking();
        Self { net, marking }
    }

    pub fn with_marking(net: Arc<Net>, marking: Marking) -> SimResult<Self> {
        for place_id in marking.keys() {
            if !net.has_place(place_id) {
                return Err(SimError::MalformedProblem(format!(
                    "marking references unknown place '{place_id}'"
                )));
            }
        }
        Ok(Self { net, marking })
    }

    pub fn get_state(&self) -> &Marking {
        &self.marking
    }

    pub fn set_state(&mut self, marking: Marking) {
        self.marking = marking;
    }

    pub fn is_enabled(&self, transition_id: &str) -> bool {
        reach::fire(&self.net, &self.marking, transition_id).is_some()
    }

    /// Fire `transition_id`, mutating `self`'s marking in place.
    pub fn dispatch(&mut self, transition_id: &str) -> SimResult<()> {
        match reach::fire(&self.net, &self.marking, transition_id) {
            Some(next) => {
                self.marking = next;
                Ok(())
            }
            None => Err(SimError::MalformedProblem(format!(
                "transition '{transition_id}' is not enabled"
            ))),
        }
    }

    pub fn enabled_transitions(&self) -> Vec<String> {
        self.net
            .transition_ids()
            .into_iter()
            .filter(|id| self.is_enabled(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::NetBuilder;

    fn turnstile() -> Arc<Net> {
        let mut b = NetBuilder::new();
        b.add_place("locked", vec![1.0], vec![0.0], 0.0, 0.0, None).unwrap();
        b.add_place("unlocked", vec![0.0], vec![0.0], 0.0, 0.0, None).unwrap();
        b.add_transition("coin", None, 0.0, 0.0, None).unwrap();
        b.add_transition("push", None, 0.0, 0.0, None).unwrap();
        b.add_arc("locked", "coin", vec![1.0], false).unwrap();
        b.add_arc("coin", "unlocked", vec![1.0], false).unwrap();
        b.add_arc("unlocked", "push", vec![1.0], false).unwrap();
        b.add_arc("push", "locked", vec![1.0], false).unwrap();
        Arc::new(b.build().unwrap())
    }

    #[test]
    fn dispatch_cycles_turnstile_state() {
        let mut engine = Engine::new(turnstile());
        assert_eq!(engine.enabled_transitions(), vec!["coin".to_string()]);
        engine.dispatch("coin").unwrap();
        assert_eq!(engine.get_state()["unlocked"], 1.0);
        assert_eq!(engine.get_state()["locked"], 0.0);
        assert!(engine.dispatch("push").is_ok());
        assert_eq!(engine.get_state()["locked"], 1.0);
    }

    #[test]
    fn dispatch_rejects_disabled_transition() {
        let mut engine = Engine::new(turnstile());
        let err = engine.dispatch("push").unwrap_err();
        assert!(matches!(err, SimError::MalformedProblem(_)));
    }
}
