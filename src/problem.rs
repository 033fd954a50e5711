//! Problem/Solution plumbing (§4.D). A [`Problem`] bundles a net reference,
//! an owned initial marking, a time span and a rate source; it is immutable
//! once constructed and every integrator call is a pure function of it.

use std::collections::HashMap;
use std::sync::Arc as StdArc;

use crate::error::{SimError, SimResult};
use crate::learn::rate_func::RateFunc;
use crate::net::Net;

/// A marking: place id → value. Used both as a symbolic (discrete) marking
/// and as a continuous ODE state vector.
pub type Marking = HashMap<String, f64>;

/// A transition's rate: either a fixed base rate or a learnable function of
/// the current marking and time (§4.G).
#[derive(Debug, Clone)]
pub enum Rate {
    Constant(f64),
    Learned(RateFunc),
}

impl Rate {
    pub fn eval(&self, marking: &Marking, t: f64) -> f64 {
        match self {
            Rate::Constant(v) => *v,
            Rate::Learned(f) => f.eval(marking, t),
        }
    }
}

/// transition id → [`Rate`].
pub type RateMap = HashMap<String, Rate>;

/// Overlay `updates` onto a clone of `base` (the "apply-update" hypothesis
/// semantics described in §3's Lifecycle paragraph).
pub fn apply_update(base: &Marking, updates: &Marking) -> Marking {
    let mut out = base.clone();
    for (k, v) in updates {
        out.insert(k.clone(), *v);
    }
    out
}

/// Immutable bundle of `(net, u0, tspan, rates)`. Cheap to clone: the net is
/// held behind an `Arc` and shared read-only across every simulation.
#[derive(Clone)]
pub struct Problem {
    pub net: StdArc<Net>,
    pub u0: Marking,
    pub t0: f64,
    pub tf: f64,
    pub rates: RateMap,
}

impl Problem {
    pub fn new(net: StdArc<Net>, u0: Marking, t0: f64, tf: f64, rates: RateMap) -> SimResult<Self> {
        for place_id in u0.keys() {
            if !net.has_place(place_id) {
                return Err(SimError::MalformedProblem(format!(
                    "initial marking references unknown place '{place_id}'"
                )));
            }
        }
        for transition_id in rates.keys() {
            if !net.has_transition(transition_id) {
                return Err(SimError::MalformedProblem(format!(
                    "rate map references unknown transition '{transition_id}'"
                )));
            }
        }
        if !(t0.is_finite() && tf.is_finite()) || tf <= t0 {
            return Err(SimError::MalformedProblem(format!(
                "time span [{t0}, {tf}] must be finite with tf > t0"
            )));
        }
        Ok(Self { net, u0, t0, tf, rates })
    }

    /// Build a new Problem with the same net/tspan/rates but a hypothesis
    /// marking overlaid on `self.u0`.
    pub fn with_hypothesis(&self, updates: &Marking) -> Self {
        Self {
            net: self.net.clone(),
            u0: apply_update(&self.u0, updates),
            t0: self.t0,
            tf: self.tf,
            rates: self.rates.clone(),
        }
    }
}

/// The result of a simulation: uniform (well, monotone — not necessarily
/// uniformly spaced) time samples with linear interpolation between them.
#[derive(Debug, Clone)]
pub struct Solution {
    pub t: Vec<f64>,
    pub u: Vec<Marking>,
}

impl Solution {
    pub fn get_final_state(&self) -> Marking {
        self.u.last().cloned().unwrap_or_default()
    }

    /// The time series for a single place, zero-filled where the place is
    /// absent from a given sample.
    pub fn get_variable(&self, place_id: &str) -> Vec<f64> {
        self.u.iter().map(|m| m.get(place_id).copied().unwrap_or(0.0)).collect()
    }

    /// Linear interpolation of `place_id` at an arbitrary `t` within
    /// `[t[0], t[-1]]`. Clamps to the endpoints outside that range.
    pub fn interpolate(&self, t: f64, place_id: &str) -> f64 {
        if self.t.is_empty() {
            return 0.0;
        }
        if t <= self.t[0] {
            return self.u[0].get(place_id).copied().unwrap_or(0.0);
        }
        let last = self.t.len() - 1;
        if t >= self.t[last] {
            return self.u[last].get(place_id).copied().unwrap_or(0.0);
        }
        // Binary search for the bracketing interval.
        let idx = match self.t.binary_search_by(|probe| probe.partial_cmp(&t).unwrap()) {
            Ok(i) => return self.u[i].get(place_id).copied().unwrap_or(0.0),
            Err(i) => i,
        };
        let (t0, t1) = (self.t[idx - 1], self.t[idx]);
        let (y0, y1) = (
            self.u[idx - 1].get(place_id).copied().unwrap_or(0.0),
            self.u[idx].get(place_id).copied().unwrap_or(0.0),
        );
        let frac = (t - t0) / (t1 - t0);
        y0 + frac * (y1 - y0)
    }
}
