//! Hierarchical/orthogonal state-machine compiler (§4.J): lowers a set of
//! states and event-edges into a [`Net`] that the discrete [`crate::engine`]
//! and [`crate::reach`] machinery can run unchanged.
//!
//! Each state becomes one place (token present = active). Crossing an edge
//! consumes the exited chain and produces the entered one, so orthogonal
//! regions (sibling subtrees under the same parent) never interfere: a
//! transition only ever touches the states on its own path. A composite
//! source state compiles to one transition variant per descendant leaf,
//! since only the marking at dispatch time determines which leaf was
//! actually active; a composite target always enters its default leaf.

use std::collections::{HashMap, HashSet};

use crate::error::{SimError, SimResult};
use crate::net::{Net, NetBuilder};

#[derive(Debug, Clone)]
struct StateDef {
    parent: Option<String>,
    initial: bool,
}

#[derive(Debug, Clone)]
struct EdgeDef {
    from: String,
    to: String,
    event: String,
    /// Place id tested (but not consumed) as a guard condition.
    guard: Option<String>,
}

#[derive(Default)]
pub struct StatechartBuilder {
    states: HashMap<String, StateDef>,
    edges: Vec<EdgeDef>,
}

impl StatechartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_state(&mut self, id: impl Into<String>, parent: Option<String>, initial: bool) -> &mut Self {
        self.states.insert(id.into(), StateDef { parent, initial });
        self
    }

    pub fn add_transition(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        event: impl Into<String>,
        guard: Option<String>,
    ) -> &mut Self {
        self.edges.push(EdgeDef { from: from.into(), to: to.into(), event: event.into(), guard });
        self
    }

    fn ancestors_inclusive(&self, id: &str) -> SimResult<HashSet<String>> {
        let mut out = HashSet::new();
        let mut cursor = Some(id.to_string());
        while let Some(current) = cursor {
            if !out.insert(current.clone()) {
                return Err(SimError::MalformedNet(format!("state hierarchy cycle through '{current}'")));
            }
            cursor = self
                .states
                .get(&current)
                .ok_or_else(|| SimError::MalformedNet(format!("unknown state '{current}'")))?
                .parent
                .clone();
        }
        Ok(out)
    }

    fn children_of(&self, id: &str) -> Vec<&String> {
        self.states
            .iter()
            .filter(|(_, def)| def.parent.as_deref() == Some(id))
            .map(|(child, _)| child)
            .collect()
    }

    /// Every leaf descendant of `id` (or `id` itself if it has no children).
    /// A composite state may have any of these active at runtime, so exiting
    /// it must be compiled as one transition variant per leaf.
    fn leaves_under(&self, id: &str) -> Vec<String> {
        let children = self.children_of(id);
        if children.is_empty() {
            return vec![id.to_string()];
        }
        children.into_iter().flat_map(|child| self.leaves_under(child)).collect()
    }

    /// The leaf reached by descending through initial children starting at
    /// `id`. Entering a composite state always activates its default leaf.
    fn initial_leaf(&self, id: &str) -> SimResult<String> {
        let children = self.children_of(id);
        if children.is_empty() {
            return Ok(id.to_string());
        }
        let initial_child = children
            .into_iter()
            .find(|child| self.states[child.as_str()].initial)
            .ok_or_else(|| SimError::MalformedNet(format!("composite state '{id}' has no initial child")))?;
        self.initial_leaf(initial_child.as_str())
    }

    /// Compile into a [`Statechart`]: a [`Net`] plus the event routing table
    /// needed to dispatch by event name in declaration order.
    pub fn compile(self) -> SimResult<Statechart> {
        let mut builder = NetBuilder::new();
        for (id, def) in &self.states {
            let initial = if def.initial { 1.0 } else { 0.0 };
            builder.add_place(id.clone(), vec![initial], vec![0.0], 0.0, 0.0, None)?;
        }

        let mut event_index: HashMap<String, Vec<String>> = HashMap::new();
        for (i, edge) in self.edges.iter().enumerate() {
            // A composite `from` may have any one of its descendant leaves
            // active at runtime, so it compiles to one transition variant
            // per leaf, each exiting the chain from that leaf up to the
            // common root. `to` always enters its deterministic default leaf.
            let enter_set = self.ancestors_inclusive(&self.initial_leaf(&edge.to)?)?;
            for active_leaf in self.leaves_under(&edge.from) {
                let exit_set = self.ancestors_inclusive(&active_leaf)?;
                let exit_only: Vec<&String> = exit_set.difference(&enter_set).collect();
                let enter_only: Vec<&String> = enter_set.difference(&exit_set).collect();

                let transition_id = format!("{}#{i}#{active_leaf}", edge.event);
                builder.add_transition(transition_id.clone(), Some(edge.event.clone()), 0.0, 0.0, None)?;

                for place in exit_only.iter().copied() {
                    builder.add_arc(place.clone(), transition_id.clone(), vec![1.0], false)?;
                }
                if let Some(guard) = &edge.guard {
                    // Read-arc: test without consuming, by restoring the token
                    // on the output side with the same weight.
                    builder.add_arc(guard.clone(), transition_id.clone(), vec![1.0], false)?;
                    builder.add_arc(transition_id.clone(), guard.clone(), vec![1.0], false)?;
                }
                for place in enter_only.iter().copied() {
                    builder.add_arc(transition_id.clone(), place.clone(), vec![1.0], false)?;
                }

                event_index.entry(edge.event.clone()).or_default().push(transition_id);
            }
        }

        Ok(Statechart { net: builder.build()?, event_index })
    }
}

/// A compiled hierarchical state machine: the underlying [`Net`] plus the
/// event name → ordered transition ids needed to route `dispatch_event`.
pub struct Statechart {
    pub net: Net,
    event_index: HashMap<String, Vec<String>>,
}

impl Statechart {
    /// Fire the first transition registered for `event` (in declaration
    /// order) that is currently enabled. Returns `None` if none are.
    pub fn dispatch_event(
        &self,
        marking: &crate::problem::Marking,
        event: &str,
    ) -> Option<crate::problem::Marking> {
        let candidates = self.event_index.get(event)?;
        for transition_id in candidates {
            if let Some(next) = crate::reach::fire(&self.net, marking, transition_id) {
                return Some(next);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_two_state_toggle() {
        let mut b = StatechartBuilder::new();
        b.add_state("off", None, true);
        b.add_state("on", None, false);
        b.add_transition("off", "on", "flip", None);
        b.add_transition("on", "off", "flip", None);
        let sc = b.compile().unwrap();

        let marking = sc.net.initial_marking();
        assert_eq!(marking["off"], 1.0);
        let next = sc.dispatch_event(&marking, "flip").unwrap();
        assert_eq!(next["on"], 1.0);
        assert_eq!(next["off"], 0.0);
    }

    #[test]
    fn nested_state_exits_and_enters_ancestor_chain() {
        let mut b = StatechartBuilder::new();
        b.add_state("running", None, true);
        b.add_state("running.idle", Some("running".into()), true);
        b.add_state("running.busy", Some("running".into()), false);
        b.add_state("stopped", None, false);
        b.add_transition("running.idle", "running.busy", "start_work", None);
        b.add_transition("running", "stopped", "halt", None);
        let sc = b.compile().unwrap();

        let marking = sc.net.initial_marking();
        assert_eq!(marking["running"], 1.0);
        assert_eq!(marking["running.idle"], 1.0);

        let busy = sc.dispatch_event(&marking, "start_work").unwrap();
        assert_eq!(busy["running"], 1.0, "ancestor shared by from/to stays untouched");
        assert_eq!(busy["running.idle"], 0.0);
        assert_eq!(busy["running.busy"], 1.0);

        let stopped = sc.dispatch_event(&busy, "halt").unwrap();
        assert_eq!(stopped["running"], 0.0);
        assert_eq!(stopped["running.busy"], 0.0);
        assert_eq!(stopped["stopped"], 1.0);
    }

    #[test]
    fn guard_blocks_transition_without_consuming_it() {
        let mut b = StatechartBuilder::new();
        b.add_state("idle", None, true);
        b.add_state("armed", None, false);
        b.add_state("permit", None, false);
        b.add_transition("idle", "armed", "arm", Some("permit".into()));
        let sc = b.compile().unwrap();

        let marking = sc.net.initial_marking();
        assert!(sc.dispatch_event(&marking, "arm").is_none());

        let mut with_permit = marking.clone();
        with_permit.insert("permit".into(), 1.0);
        let next = sc.dispatch_event(&with_permit, "arm").unwrap();
        assert_eq!(next["armed"], 1.0);
        assert_eq!(next["permit"], 1.0, "guard token is not consumed");
    }
}
