//! Learnable rates and derivative-free fitting (§4.G).

pub mod fitter;
pub mod rate_func;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SimResult;
use crate::net::Net;
use crate::problem::{Marking, Problem, Rate, RateMap};
use rate_func::RateFunc;

/// A [`Problem`] whose rates may include [`RateFunc`]s, with a deterministic
/// flattened parameter vector a [`fitter::Fitter`] can optimize over.
///
/// Parameters are ordered by sorted transition id, then by each
/// [`RateFunc`]'s own `get_params` order; only transitions carrying
/// `Rate::Learned` contribute any parameters.
#[derive(Clone)]
pub struct LearnableProblem {
    net: Arc<Net>,
    u0: Marking,
    t0: f64,
    tf: f64,
    rates: RateMap,
}

impl LearnableProblem {
    pub fn new(net: Arc<Net>, u0: Marking, t0: f64, tf: f64, rates: RateMap) -> SimResult<Self> {
        // Validate eagerly by constructing (and discarding) a Problem.
        Problem::new(net.clone(), u0.clone(), t0, tf, rates.clone())?;
        Ok(Self { net, u0, t0, tf, rates })
    }

    fn learned_transition_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .rates
            .iter()
            .filter(|(_, r)| matches!(r, Rate::Learned(_)))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn get_all_params(&self) -> Vec<f64> {
        let mut out = Vec::new();
        for id in self.learned_transition_ids() {
            if let Some(Rate::Learned(f)) = self.rates.get(&id) {
                out.extend(f.get_params());
            }
        }
        out
    }

    pub fn set_all_params(&mut self, params: &[f64]) {
        let mut offset = 0;
        for id in self.learned_transition_ids() {
            if let Some(Rate::Learned(f)) = self.rates.get_mut(&id) {
                let n = f.num_params();
                f.set_params(&params[offset..offset + n]);
                offset += n;
            }
        }
    }

    pub fn to_problem(&self) -> SimResult<Problem> {
        Problem::new(self.net.clone(), self.u0.clone(), self.t0, self.tf, self.rates.clone())
    }
}

/// Zero-initialized `RateFunc::Linear` over `inputs`, a convenience used by
/// callers wiring up a new learnable transition from scratch.
pub fn linear_rate(inputs: Vec<String>, with_time: bool) -> RateFunc {
    let n = inputs.len();
    RateFunc::Linear {
        inputs,
        weights: vec![0.0; n],
        bias: 0.0,
        time_weight: if with_time { Some(0.0) } else { None },
        relu: false,
    }
}

/// Small-random-init `RateFunc::Mlp` with one hidden layer.
pub fn mlp_rate(inputs: Vec<String>, hidden: usize, seed_scale: f64) -> RateFunc {
    let n = inputs.len();
    RateFunc::Mlp {
        inputs,
        hidden,
        w1: vec![seed_scale; n * hidden],
        b1: vec![0.0; hidden],
        w2: vec![seed_scale; hidden],
        b2: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::NetBuilder;

    fn sample_net() -> Arc<Net> {
        let mut b = NetBuilder::new();
        b.add_place("A", vec![10.0], vec![0.0], 0.0, 0.0, None).unwrap();
        b.add_place("B", vec![0.0], vec![0.0], 0.0, 0.0, None).unwrap();
        b.add_transition("t1", None, 0.0, 0.0, None).unwrap();
        b.add_arc("A", "t1", vec![1.0], false).unwrap();
        b.add_arc("t1", "B", vec![1.0], false).unwrap();
        Arc::new(b.build().unwrap())
    }

    #[test]
    fn params_flatten_and_restore_in_sorted_transition_order() {
        let net = sample_net();
        let mut rates = RateMap::new();
        rates.insert("t1".into(), Rate::Learned(RateFunc::Constant(0.3)));
        let mut u0 = HashMap::new();
        u0.insert("A".to_string(), 10.0);
        u0.insert("B".to_string(), 0.0);

        let mut learnable = LearnableProblem::new(net, u0, 0.0, 10.0, rates).unwrap();
        assert_eq!(learnable.get_all_params(), vec![0.3]);
        learnable.set_all_params(&[0.7]);
        assert_eq!(learnable.get_all_params(), vec![0.7]);
    }
}
