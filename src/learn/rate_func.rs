//! Learnable rate functions (§4.G). Each variant is a small parametric
//! function of the current marking and time; `get_params`/`set_params` give
//! the fitter a flat view for derivative-free optimization.

use serde::{Deserialize, Serialize};

use crate::problem::Marking;

/// Polymorphic, fittable rate. `Eval` never panics on missing places: a
/// referenced place absent from the marking contributes zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RateFunc {
    Constant(f64),
    Linear {
        /// Places contributing to the weighted sum, in a fixed order.
        inputs: Vec<String>,
        weights: Vec<f64>,
        bias: f64,
        /// Include `t` as an extra feature with its own weight (appended
        /// after `weights`'s place weights if present).
        time_weight: Option<f64>,
        relu: bool,
    },
    Mlp {
        inputs: Vec<String>,
        hidden: usize,
        /// `inputs.len() x hidden`, row-major.
        w1: Vec<f64>,
        b1: Vec<f64>,
        /// `hidden`, one weight per hidden unit.
        w2: Vec<f64>,
        b2: f64,
    },
}

impl RateFunc {
    pub fn eval(&self, u: &Marking, t: f64) -> f64 {
        match self {
            RateFunc::Constant(c) => *c,
            RateFunc::Linear { inputs, weights, bias, time_weight, relu } => {
                let mut acc = *bias;
                for (name, w) in inputs.iter().zip(weights.iter()) {
                    acc += w * u.get(name).copied().unwrap_or(0.0);
                }
                if let Some(tw) = time_weight {
                    acc += tw * t;
                }
                if *relu && acc < 0.0 {
                    0.0
                } else {
                    acc
                }
            }
            RateFunc::Mlp { inputs, hidden, w1, b1, w2, b2 } => {
                let x: Vec<f64> = inputs.iter().map(|n| u.get(n).copied().unwrap_or(0.0)).collect();
                let mut out = *b2;
                for h in 0..*hidden {
                    let mut z = b1[h];
                    for (i, xi) in x.iter().enumerate() {
                        z += w1[i * hidden + h] * xi;
                    }
                    let a = z.max(0.0); // ReLU
                    out += w2[h] * a;
                }
                out
            }
        }
    }

    pub fn num_params(&self) -> usize {
        match self {
            RateFunc::Constant(_) => 1,
            RateFunc::Linear { inputs, time_weight, .. } => {
                inputs.len() + 1 + if time_weight.is_some() { 1 } else { 0 }
            }
            RateFunc::Mlp { inputs, hidden, .. } => inputs.len() * hidden + hidden + hidden + 1,
        }
    }

    pub fn get_params(&self) -> Vec<f64> {
        match self {
            RateFunc::Constant(c) => vec![*c],
            RateFunc::Linear { weights, bias, time_weight, .. } => {
                let mut p = weights.clone();
                p.push(*bias);
                if let Some(tw) = time_weight {
                    p.push(*tw);
                }
                p
            }
            RateFunc::Mlp { w1, b1, w2, b2, .. } => {
                let mut p = w1.clone();
                p.extend_from_slice(b1);
                p.extend_from_slice(w2);
                p.push(*b2);
                p
            }
        }
    }

    pub fn set_params(&mut self, params: &[f64]) {
        assert_eq!(params.len(), self.num_params(), "param count mismatch");
        match self {
            RateFunc::Constant(c) => *c = params[0],
            RateFunc::Linear { inputs, weights, bias, time_weight, .. } => {
                let n = inputs.len();
                weights.copy_from_slice(&params[..n]);
                *bias = params[n];
                if time_weight.is_some() {
                    *time_weight = Some(params[n + 1]);
                }
            }
            RateFunc::Mlp { inputs, hidden, w1, b1, w2, b2 } => {
                let n_in = inputs.len() * *hidden;
                w1.copy_from_slice(&params[..n_in]);
                b1.copy_from_slice(&params[n_in..n_in + *hidden]);
                w2.copy_from_slice(&params[n_in + *hidden..n_in + 2 * *hidden]);
                *b2 = params[n_in + 2 * *hidden];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_ignores_marking_and_time() {
        let f = RateFunc::Constant(3.0);
        let m = Marking::new();
        assert_eq!(f.eval(&m, 100.0), 3.0);
    }

    #[test]
    fn linear_applies_relu_floor() {
        let f = RateFunc::Linear {
            inputs: vec!["A".into()],
            weights: vec![-1.0],
            bias: 0.0,
            time_weight: None,
            relu: true,
        };
        let mut m = Marking::new();
        m.insert("A".into(), 5.0);
        assert_eq!(f.eval(&m, 0.0), 0.0);
    }

    #[test]
    fn params_round_trip() {
        let mut f = RateFunc::Linear {
            inputs: vec!["A".into(), "B".into()],
            weights: vec![1.0, 2.0],
            bias: 0.5,
            time_weight: Some(0.1),
            relu: false,
        };
        let p = f.get_params();
        assert_eq!(p.len(), f.num_params());
        let mut p2 = p.clone();
        p2[0] = 9.0;
        f.set_params(&p2);
        assert_eq!(f.get_params()[0], 9.0);
    }

    #[test]
    fn mlp_param_count_matches_layer_shapes() {
        let f = RateFunc::Mlp {
            inputs: vec!["A".into(), "B".into()],
            hidden: 3,
            w1: vec![0.0; 6],
            b1: vec![0.0; 3],
            w2: vec![0.0; 3],
            b2: 0.0,
        };
        assert_eq!(f.num_params(), 6 + 3 + 3 + 1);
        assert_eq!(f.get_params().len(), f.num_params());
    }
}
