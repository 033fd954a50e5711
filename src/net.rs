//! Petri net data model (§3, §4.A): places, transitions, weighted and
//! inhibitor arcs, capacities and an optional token-color axis.
//!
//! A [`Net`] is built once via [`NetBuilder`] and then shared read-only by
//! every other component (ODE compiler, integrator, evaluator, reachability
//! explorer). There are no back-pointers: arcs are keyed by node id, not by
//! reference, so the net never forms a reference cycle.

use std::collections::HashMap;

use crate::error::{SimError, SimResult};

/// Direction of an arc relative to its transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// place → transition
    In,
    /// transition → place
    Out,
}

#[derive(Debug, Clone)]
pub struct Place {
    pub id: String,
    pub initial: Vec<f64>,
    pub capacity: Vec<f64>,
    pub x: f64,
    pub y: f64,
    pub label: Option<String>,
}

impl Place {
    /// Aggregate token count: sum over every color component.
    pub fn token_count(&self) -> f64 {
        self.initial.iter().sum()
    }
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub id: String,
    pub role: Option<String>,
    pub x: f64,
    pub y: f64,
    pub label: Option<String>,
}

/// A weighted arc between a place and a transition. Resolved at build time
/// so downstream components never need to re-derive which endpoint is which.
#[derive(Debug, Clone)]
pub struct Arc {
    pub place_id: String,
    pub transition_id: String,
    pub direction: Direction,
    pub weight: Vec<f64>,
    pub inhibitor: bool,
}

impl Arc {
    /// Sum of the arc's weight vector (§4.A "sum of an arc's weight vector").
    pub fn weight_sum(&self) -> f64 {
        self.weight.iter().sum()
    }

    /// Collapse a (possibly multi-color) weight to its scalar component,
    /// per the §9 design note: components not explicitly multi-color aware
    /// collapse to the first color.
    pub fn scalar_weight(&self) -> f64 {
        self.weight.first().copied().unwrap_or(0.0)
    }
}

/// A read-only, validated Petri net. Construct via [`NetBuilder`].
#[derive(Debug, Clone, Default)]
pub struct Net {
    places: HashMap<String, Place>,
    transitions: HashMap<String, Transition>,
    arcs: Vec<Arc>,
    pub colors: Option<Vec<String>>,
}

impl Net {
    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.places.values()
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values()
    }

    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }

    pub fn place(&self, id: &str) -> Option<&Place> {
        self.places.get(id)
    }

    pub fn transition(&self, id: &str) -> Option<&Transition> {
        self.transitions.get(id)
    }

    pub fn has_place(&self, id: &str) -> bool {
        self.places.contains_key(id)
    }

    pub fn has_transition(&self, id: &str) -> bool {
        self.transitions.contains_key(id)
    }

    pub fn place_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.places.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn transition_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.transitions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// All arcs feeding into `transition_id` (both ordinary and inhibitor).
    pub fn input_arcs<'a, 's>(&'a self, transition_id: &'s str) -> impl Iterator<Item = &'a Arc> + 's
    where
        'a: 's,
    {
        self.arcs
            .iter()
            .filter(move |a| a.direction == Direction::In && a.transition_id == transition_id)
    }

    /// All arcs leaving `transition_id` toward a place.
    pub fn output_arcs<'a, 's>(&'a self, transition_id: &'s str) -> impl Iterator<Item = &'a Arc> + 's
    where
        'a: 's,
    {
        self.arcs
            .iter()
            .filter(move |a| a.direction == Direction::Out && a.transition_id == transition_id)
    }

    /// The initial marking as a place-id → value map (first color only,
    /// matching the scalar collapse used by the default ODE/discrete path).
    pub fn initial_marking(&self) -> HashMap<String, f64> {
        self.places
            .values()
            .map(|p| (p.id.clone(), p.initial.first().copied().unwrap_or(0.0)))
            .collect()
    }

    /// Per-place capacity (first color only), 0.0 meaning unbounded.
    pub fn capacity_of(&self, place_id: &str) -> f64 {
        self.places
            .get(place_id)
            .and_then(|p| p.capacity.first().copied())
            .unwrap_or(0.0)
    }

    /// Summary used by the reachability analyzer and by §4.A's "aggregate
    /// token count" query, extended to the whole net.
    pub fn total_tokens(&self) -> f64 {
        self.places.values().map(Place::token_count).sum()
    }
}

/// Builder enforcing referential integrity. A net that leaves the builder
/// successfully is always a legal input to every downstream component;
/// failures never surface anywhere but here.
#[derive(Debug, Default)]
pub struct NetBuilder {
    places: HashMap<String, Place>,
    transitions: HashMap<String, Transition>,
    arcs: Vec<Arc>,
    colors: Option<Vec<String>>,
}

impl NetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_colors(mut self, colors: Vec<String>) -> Self {
        self.colors = Some(colors);
        self
    }

    fn color_count(&self) -> usize {
        self.colors.as_ref().map_or(1, |c| c.len().max(1))
    }

    pub fn add_place(
        &mut self,
        id: impl Into<String>,
        initial: Vec<f64>,
        capacity: Vec<f64>,
        x: f64,
        y: f64,
        label: Option<String>,
    ) -> SimResult<&mut Self> {
        let id = id.into();
        if self.places.contains_key(&id) || self.transitions.contains_key(&id) {
            return Err(SimError::MalformedNet(format!("duplicate id: {id}")));
        }
        let colors = self.color_count();
        if !(initial.len() == 1 || initial.len() == colors) {
            return Err(SimError::MalformedNet(format!(
                "place {id}: initial vector length {} does not match color count {colors}",
                initial.len()
            )));
        }
        if !(capacity.len() == 1 || capacity.len() == colors || capacity.is_empty()) {
            return Err(SimError::MalformedNet(format!(
                "place {id}: capacity vector length {} does not match color count {colors}",
                capacity.len()
            )));
        }
        for &v in initial.iter().chain(capacity.iter()) {
            if !v.is_finite() || v < 0.0 {
                return Err(SimError::MalformedNet(format!(
                    "place {id}: initial/capacity must be finite and non-negative, got {v}"
                )));
            }
        }
        for (i, &c) in capacity.iter().enumerate() {
            if c > 0.0 && i < initial.len() && c < initial[i] {
                return Err(SimError::MalformedNet(format!(
                    "place {id}: capacity {c} is less than initial {}",
                    initial[i]
                )));
            }
        }
        self.places.insert(
            id.clone(),
            Place { id, initial, capacity, x, y, label },
        );
        Ok(self)
    }

    pub fn add_transition(
        &mut self,
        id: impl Into<String>,
        role: Option<String>,
        x: f64,
        y: f64,
        label: Option<String>,
    ) -> SimResult<&mut Self> {
        let id = id.into();
        if self.places.contains_key(&id) || self.transitions.contains_key(&id) {
            return Err(SimError::MalformedNet(format!("duplicate id: {id}")));
        }
        self.transitions.insert(id.clone(), Transition { id, role, x, y, label });
        Ok(self)
    }

    pub fn add_arc(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        weight: Vec<f64>,
        inhibitor: bool,
    ) -> SimResult<&mut Self> {
        let source = source.into();
        let target = target.into();
        let colors = self.color_count();
        if !(weight.len() == 1 || weight.len() == colors) {
            return Err(SimError::MalformedNet(format!(
                "arc {source}->{target}: weight vector length {} does not match color count {colors}",
                weight.len()
            )));
        }
        if !inhibitor {
            for &w in &weight {
                if w < 0.0 {
                    return Err(SimError::MalformedNet(format!(
                        "arc {source}->{target}: ordinary arc weight must be non-negative, got {w}"
                    )));
                }
            }
        }

        let (place_id, transition_id, direction) =
            match (self.places.contains_key(&source), self.transitions.contains_key(&source)) {
                (true, false) => {
                    if !self.transitions.contains_key(&target) {
                        return Err(SimError::MalformedNet(format!(
                            "arc {source}->{target}: target is not a declared transition"
                        )));
                    }
                    (source.clone(), target.clone(), Direction::In)
                }
                (false, true) => {
                    if !self.places.contains_key(&target) {
                        return Err(SimError::MalformedNet(format!(
                            "arc {source}->{target}: target is not a declared place"
                        )));
                    }
                    (target.clone(), source.clone(), Direction::Out)
                }
                _ => {
                    return Err(SimError::MalformedNet(format!(
                        "arc {source}->{target}: endpoints must resolve to exactly one place and one transition"
                    )))
                }
            };

        if inhibitor && direction != Direction::In {
            return Err(SimError::MalformedNet(format!(
                "arc {source}->{target}: inhibitor arcs must be place -> transition"
            )));
        }

        self.arcs.push(Arc { place_id, transition_id, direction, weight, inhibitor });
        Ok(self)
    }

    pub fn build(self) -> SimResult<Net> {
        Ok(Net {
            places: self.places,
            transitions: self.transitions,
            arcs: self.arcs,
            colors: self.colors,
        })
    }
}
