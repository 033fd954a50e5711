//! Discrete reachability exploration (§4.H): breadth-first search over the
//! marking graph, independent of the continuous ODE path. Enabledness and
//! firing use the scalar-collapsed arc weights, matching [`crate::ode`]'s
//! convention.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::cache::{fingerprint, Fingerprint};
use crate::net::Net;
use crate::problem::Marking;

#[derive(Debug, Clone, Copy)]
pub struct ReachabilityOptions {
    pub max_states: usize,
    pub max_tokens_per_place: f64,
}

impl Default for ReachabilityOptions {
    fn default() -> Self {
        Self { max_states: 100_000, max_tokens_per_place: 1e9 }
    }
}

#[derive(Debug, Clone)]
pub struct ReachabilityResult {
    pub state_count: usize,
    pub deadlocks: Vec<Marking>,
    /// `false` if exploration hit `max_states` or `max_tokens_per_place`
    /// before exhausting the graph; in that case the result is a sound
    /// under-approximation, never an over-approximation.
    pub bounded: bool,
    pub incomplete: bool,
    pub max_observed_tokens: HashMap<String, f64>,
}

fn is_enabled(net: &Net, marking: &Marking, transition_id: &str) -> bool {
    net.input_arcs(transition_id).all(|arc| {
        let level = marking.get(&arc.place_id).copied().unwrap_or(0.0);
        if arc.inhibitor {
            level < arc.scalar_weight()
        } else {
            level >= arc.scalar_weight()
        }
    })
}

fn would_overflow_capacity(net: &Net, marking: &Marking, transition_id: &str) -> bool {
    net.output_arcs(transition_id).any(|arc| {
        let capacity = net.capacity_of(&arc.place_id);
        if capacity <= 0.0 {
            return false;
        }
        let next = marking.get(&arc.place_id).copied().unwrap_or(0.0) + arc.scalar_weight();
        next > capacity
    })
}

/// Fire `transition_id` from `marking`, returning `None` if it is not
/// enabled or would overflow a place capacity.
pub fn fire(net: &Net, marking: &Marking, transition_id: &str) -> Option<Marking> {
    if !is_enabled(net, marking, transition_id) || would_overflow_capacity(net, marking, transition_id) {
        return None;
    }
    let mut next = marking.clone();
    for arc in net.input_arcs(transition_id) {
        if arc.inhibitor {
            continue;
        }
        let entry = next.entry(arc.place_id.clone()).or_insert(0.0);
        *entry -= arc.scalar_weight();
    }
    for arc in net.output_arcs(transition_id) {
        let entry = next.entry(arc.place_id.clone()).or_insert(0.0);
        *entry += arc.scalar_weight();
    }
    Some(next)
}

fn enabled_transitions(net: &Net, marking: &Marking) -> Vec<String> {
    net.transition_ids()
        .into_iter()
        .filter(|id| is_enabled(net, marking, id) && !would_overflow_capacity(net, marking, id))
        .collect()
}

/// BFS the full marking graph reachable from `initial`, subject to
/// `options`'s caps.
pub fn explore(net: &Net, initial: &Marking, options: &ReachabilityOptions) -> ReachabilityResult {
    let mut visited: HashSet<Fingerprint> = HashSet::new();
    let mut queue: VecDeque<Marking> = VecDeque::new();
    let mut deadlocks = Vec::new();
    let mut max_observed: HashMap<String, f64> = HashMap::new();
    let mut incomplete = false;

    visited.insert(fingerprint(initial));
    queue.push_back(initial.clone());

    while let Some(marking) = queue.pop_front() {
        for (place, &value) in &marking {
            let slot = max_observed.entry(place.clone()).or_insert(0.0);
            if value > *slot {
                *slot = value;
            }
        }

        if max_observed.values().any(|&v| v > options.max_tokens_per_place) {
            incomplete = true;
            break;
        }

        let enabled = enabled_transitions(net, &marking);
        if enabled.is_empty() {
            deadlocks.push(marking.clone());
            continue;
        }

        for transition_id in enabled {
            if let Some(next) = fire(net, &marking, &transition_id) {
                let fp = fingerprint(&next);
                if visited.insert(fp) {
                    if visited.len() > options.max_states {
                        incomplete = true;
                        break;
                    }
                    queue.push_back(next);
                }
            }
        }
        if incomplete {
            break;
        }
    }

    ReachabilityResult {
        state_count: visited.len(),
        deadlocks,
        bounded: !incomplete,
        incomplete,
        max_observed_tokens: max_observed,
    }
}

/// Whether `target` is reachable from `initial` within `options`'s caps.
/// A `false` result under an incomplete search is inconclusive, not proof
/// of unreachability; callers needing a sound negative must widen the caps.
pub fn is_reachable(net: &Net, initial: &Marking, target: &Marking, options: &ReachabilityOptions) -> bool {
    let target_fp = fingerprint(target);
    if fingerprint(initial) == target_fp {
        return true;
    }

    let mut visited: HashSet<Fingerprint> = HashSet::new();
    let mut queue: VecDeque<Marking> = VecDeque::new();
    visited.insert(fingerprint(initial));
    queue.push_back(initial.clone());

    while let Some(marking) = queue.pop_front() {
        if visited.len() > options.max_states {
            return false;
        }
        for transition_id in enabled_transitions(net, &marking) {
            if let Some(next) = fire(net, &marking, &transition_id) {
                let fp = fingerprint(&next);
                if fp == target_fp {
                    return true;
                }
                if visited.insert(fp) {
                    queue.push_back(next);
                }
            }
        }
    }
    false
}
