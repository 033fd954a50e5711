//! Derivative-free fitting of [`RateFunc`] parameters against observed
//! trajectories (§4.G). The teacher's optimizer reached for `argmin`'s
//! gradient-based solvers, but our loss is only defined through the ODE
//! solve and isn't differentiated here, so we hand-roll coordinate descent
//! and Nelder-Mead instead (see DESIGN.md).

use std::collections::HashMap;

use crate::error::SimResult;
use crate::integrate::{solve, IntegratorOptions, Method};
use crate::problem::Problem;

use super::LearnableProblem;

/// Observed trajectory to fit against: aligned sample times and per-place
/// observed values. Places absent from a given index are simply not scored
/// at that index.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub times: Vec<f64>,
    pub observations: HashMap<String, Vec<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    Mse,
    Rmse,
    RelativeMse,
}

impl Loss {
    fn reduce(&self, sq_errs: &[f64]) -> f64 {
        if sq_errs.is_empty() {
            return 0.0;
        }
        let mse = sq_errs.iter().sum::<f64>() / sq_errs.len() as f64;
        match self {
            Loss::Mse | Loss::RelativeMse => mse,
            Loss::Rmse => mse.sqrt(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FitResult {
    pub params: Vec<f64>,
    pub initial_loss: f64,
    pub final_loss: f64,
    pub iterations: usize,
    pub converged: bool,
}

const CONVERGE_TOL: f64 = 1e-10;

fn loss_of(
    problem: &Problem,
    method: Method,
    opts: &IntegratorOptions,
    dataset: &Dataset,
    loss_kind: Loss,
) -> f64 {
    let sol = match solve(problem, method, opts) {
        Ok(s) => s,
        Err(_) => return f64::INFINITY,
    };

    let mut sq_errs = Vec::new();
    for (place, observed) in &dataset.observations {
        for (&t, &obs) in dataset.times.iter().zip(observed.iter()) {
            let predicted = sol.interpolate(t, place);
            let err = predicted - obs;
            let sq = if loss_kind == Loss::RelativeMse {
                let denom = obs.abs().max(1e-8);
                (err / denom).powi(2)
            } else {
                err * err
            };
            sq_errs.push(sq);
        }
    }
    loss_kind.reduce(&sq_errs)
}

/// Coordinate descent and Nelder-Mead fitters over a [`LearnableProblem`]'s
/// flattened parameter vector.
pub struct Fitter {
    pub method: Method,
    pub opts: IntegratorOptions,
    pub loss: Loss,
    pub max_iterations: usize,
}

impl Default for Fitter {
    fn default() -> Self {
        Self {
            method: Method::Tsit5,
            opts: IntegratorOptions::default(),
            loss: Loss::Mse,
            max_iterations: 200,
        }
    }
}

impl Fitter {
    fn eval_params(
        &self,
        learnable: &LearnableProblem,
        dataset: &Dataset,
        params: &[f64],
    ) -> SimResult<f64> {
        let mut trial = learnable.clone();
        trial.set_all_params(params);
        let problem = trial.to_problem()?;
        Ok(loss_of(&problem, self.method, &self.opts, dataset, self.loss))
    }

    /// Coordinate descent: sweep each parameter with a shrinking step size,
    /// greedily accepting any improving perturbation.
    pub fn fit_coordinate_descent(
        &self,
        learnable: &LearnableProblem,
        dataset: &Dataset,
    ) -> SimResult<FitResult> {
        let mut params = learnable.get_all_params();
        let initial_loss = self.eval_params(learnable, dataset, &params)?;
        let mut current_loss = initial_loss;
        let mut step = 1.0;
        let mut iterations = 0;

        while iterations < self.max_iterations && step > CONVERGE_TOL {
            let mut improved = false;
            for i in 0..params.len() {
                for &delta in &[step, -step] {
                    let mut candidate = params.clone();
                    candidate[i] += delta;
                    let candidate_loss = self.eval_params(learnable, dataset, &candidate)?;
                    if candidate_loss < current_loss {
                        params = candidate;
                        current_loss = candidate_loss;
                        improved = true;
                    }
                }
            }
            iterations += 1;
            tracing::trace!(iterations, loss = current_loss, step, "coordinate descent iteration");
            if !improved {
                step *= 0.5;
            }
        }

        Ok(FitResult {
            params,
            initial_loss,
            final_loss: current_loss,
            iterations,
            converged: current_loss.is_finite() && (initial_loss - current_loss).abs() > 0.0,
        })
    }

    /// Nelder-Mead simplex search, standard reflect/expand/contract/shrink.
    pub fn fit_nelder_mead(
        &self,
        learnable: &LearnableProblem,
        dataset: &Dataset,
    ) -> SimResult<FitResult> {
        let n = learnable.get_all_params().len();
        let x0 = learnable.get_all_params();
        let initial_loss = self.eval_params(learnable, dataset, &x0)?;

        let mut simplex: Vec<Vec<f64>> = vec![x0.clone()];
        for i in 0..n {
            let mut v = x0.clone();
            v[i] += if v[i].abs() > 1e-6 { 0.1 * v[i].abs() } else { 0.1 };
            simplex.push(v);
        }
        let mut values: Vec<f64> = simplex
            .iter()
            .map(|p| self.eval_params(learnable, dataset, p))
            .collect::<SimResult<Vec<_>>>()?;

        let (alpha, gamma, rho, sigma) = (1.0, 2.0, 0.5, 0.5);
        let mut iterations = 0;

        while iterations < self.max_iterations {
            let mut order: Vec<usize> = (0..simplex.len()).collect();
            order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap());
            simplex = order.iter().map(|&i| simplex[i].clone()).collect();
            values = order.iter().map(|&i| values[i]).collect();

            let best = values[0];
            let worst = *values.last().unwrap();
            if (worst - best).abs() < CONVERGE_TOL {
                break;
            }

            let centroid: Vec<f64> = (0..n)
                .map(|d| simplex[..simplex.len() - 1].iter().map(|p| p[d]).sum::<f64>() / (simplex.len() - 1) as f64)
                .collect();

            let reflect: Vec<f64> =
                centroid.iter().zip(simplex.last().unwrap()).map(|(c, w)| c + alpha * (c - w)).collect();
            let reflect_val = self.eval_params(learnable, dataset, &reflect)?;

            if reflect_val < values[0] {
                let expand: Vec<f64> =
                    centroid.iter().zip(&reflect).map(|(c, r)| c + gamma * (r - c)).collect();
                let expand_val = self.eval_params(learnable, dataset, &expand)?;
                if expand_val < reflect_val {
                    *simplex.last_mut().unwrap() = expand;
                    *values.last_mut().unwrap() = expand_val;
                } else {
                    *simplex.last_mut().unwrap() = reflect;
                    *values.last_mut().unwrap() = reflect_val;
                }
            } else if reflect_val < values[values.len() - 2] {
                *simplex.last_mut().unwrap() = reflect;
                *values.last_mut().unwrap() = reflect_val;
            } else {
                let worst_point = simplex.last().unwrap().clone();
                let contract: Vec<f64> =
                    centroid.iter().zip(&worst_point).map(|(c, w)| c + rho * (w - c)).collect();
                let contract_val = self.eval_params(learnable, dataset, &contract)?;
                if contract_val < *values.last().unwrap() {
                    *simplex.last_mut().unwrap() = contract;
                    *values.last_mut().unwrap() = contract_val;
                } else {
                    let best_point = simplex[0].clone();
                    for i in 1..simplex.len() {
                        for d in 0..n {
                            simplex[i][d] = best_point[d] + sigma * (simplex[i][d] - best_point[d]);
                        }
                        values[i] = self.eval_params(learnable, dataset, &simplex[i])?;
                    }
                }
            }
            iterations += 1;
            tracing::trace!(iterations, best = values[0], worst = *values.last().unwrap(), "nelder-mead iteration");
        }

        let best_idx = (0..values.len()).min_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap()).unwrap();
        let final_loss = values[best_idx];

        Ok(FitResult {
            params: simplex[best_idx].clone(),
            initial_loss,
            final_loss,
            iterations,
            converged: final_loss.is_finite() && final_loss < initial_loss,
        })
    }
}
