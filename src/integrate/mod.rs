//! Adaptive embedded Runge-Kutta integrator (§4.C) — the hardest numerical
//! subsystem in this crate. [`solve`] is the single entry point; everything
//! it touches lives on the call stack or in the returned [`Solution`], so
//! concurrent `solve` calls on independent [`Problem`]s never interact
//! (§5's reentrancy contract).

pub mod control;
pub mod euler;
pub mod rk4;
pub mod tsit5;
mod vecmath;

use crate::error::{SimError, SimResult};
use crate::ode::CompiledOde;
use crate::problem::{Problem, Solution};

/// Integration method requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Tsit5-equivalent embedded RK, adaptive unless `opts.adaptive == false`
    /// (in which case it silently falls back to fixed-step RK4, per the
    /// `Adaptive` option's documented effect).
    Tsit5,
    /// Classical fixed-step RK4.
    Rk4,
    /// Explicit Euler, diagnostic only.
    Euler,
}

/// Recognized integrator configuration (§4.C options table).
#[derive(Debug, Clone, Copy)]
pub struct IntegratorOptions {
    pub dt: f64,
    pub dtmin: f64,
    pub dtmax: f64,
    pub abstol: f64,
    pub reltol: f64,
    pub maxiters: usize,
    pub adaptive: bool,
}

impl Default for IntegratorOptions {
    fn default() -> Self {
        Self {
            dt: 0.01,
            dtmin: 1e-10,
            dtmax: 1.0,
            abstol: 1e-6,
            reltol: 1e-3,
            maxiters: 100_000,
            adaptive: true,
        }
    }
}

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

/// Run a simulation over `problem` with the given `method` and `opts`.
pub fn solve(problem: &Problem, method: Method, opts: &IntegratorOptions) -> SimResult<Solution> {
    let _span = tracing::info_span!("solve", method = ?method, t0 = problem.t0, tf = problem.tf).entered();
    let ode = CompiledOde::new(&problem.net, &problem.rates);
    let place_ids = problem.net.place_ids();

    match method {
        Method::Tsit5 if opts.adaptive => solve_adaptive(&ode, problem, opts, &place_ids),
        Method::Tsit5 | Method::Rk4 => {
            solve_fixed(&ode, problem, opts, &place_ids, StepFn::Rk4)
        }
        Method::Euler => solve_fixed(&ode, problem, opts, &place_ids, StepFn::Euler),
    }
}

enum StepFn {
    Rk4,
    Euler,
}

fn solve_fixed(
    ode: &CompiledOde,
    problem: &Problem,
    opts: &IntegratorOptions,
    place_ids: &[String],
    which: StepFn,
) -> SimResult<Solution> {
    let span = problem.tf - problem.t0;
    let n_steps = (span / opts.dt).ceil().max(1.0) as usize;
    if n_steps > opts.maxiters {
        return Err(SimError::StepBudgetExhausted { taken: n_steps, budget: opts.maxiters });
    }

    let mut t = problem.t0;
    let mut y = problem.u0.clone();
    let mut ts = vec![t];
    let mut us = vec![y.clone()];

    for i in 0..n_steps {
        let dt = if i == n_steps - 1 { problem.tf - t } else { opts.dt };
        y = match which {
            StepFn::Rk4 => rk4::step(ode, t, &y, dt, place_ids),
            StepFn::Euler => euler::step(ode, t, &y, dt, place_ids),
        };
        t += dt;
        if vecmath::any_non_finite(&y) {
            return Err(SimError::NonFiniteState { t, detail: "NaN/Inf after fixed step".into() });
        }
        ts.push(t);
        us.push(y.clone());
    }
    // Guarantee T[-1] == tf exactly, absorbing floating-point drift from dt accumulation.
    if let Some(last) = ts.last_mut() {
        *last = problem.tf;
    }

    Ok(Solution { t: ts, u: us })
}

fn solve_adaptive(
    ode: &CompiledOde,
    problem: &Problem,
    opts: &IntegratorOptions,
    place_ids: &[String],
) -> SimResult<Solution> {
    let mut t = problem.t0;
    let mut y = problem.u0.clone();
    let mut dt = opts.dt.clamp(opts.dtmin, opts.dtmax);

    let mut ts = vec![t];
    let mut us = vec![y.clone()];
    let mut steps_taken = 0usize;

    while t < problem.tf {
        dt = dt.min(problem.tf - t);

        loop {
            steps_taken += 1;
            if steps_taken > opts.maxiters {
                return Err(SimError::StepBudgetExhausted {
                    taken: steps_taken,
                    budget: opts.maxiters,
                });
            }

            let (y5, err) = tsit5::step(ode, t, &y, dt, place_ids);

            if vecmath::any_non_finite(&y5) {
                return Err(SimError::NonFiniteState {
                    t: t + dt,
                    detail: "NaN/Inf after Tsit5 step".into(),
                });
            }

            let norm = control::weighted_error_norm(&err, &y, &y5, place_ids, opts.abstol, opts.reltol);

            if norm <= 1.0 {
                t += dt;
                y = y5;
                let suggested = control::suggest_dt(dt, norm, SAFETY, MIN_FACTOR, MAX_FACTOR);
                dt = suggested.clamp(opts.dtmin, opts.dtmax);
                ts.push(t);
                us.push(y.clone());
                break;
            } else {
                let suggested = control::suggest_dt(dt, norm, SAFETY, MIN_FACTOR, MAX_FACTOR);
                tracing::trace!(t, dt, norm, suggested, "step rejected, shrinking dt");
                if suggested < opts.dtmin {
                    return Err(SimError::StepUnderflow { t, dtmin: opts.dtmin });
                }
                dt = suggested.clamp(opts.dtmin, opts.dtmax);
            }
        }
    }

    Ok(Solution { t: ts, u: us })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::NetBuilder;
    use crate::problem::{Problem, Rate, RateMap};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn decay_problem(u0_a: f64) -> Problem {
        let mut b = NetBuilder::new();
        b.add_place("A", vec![u0_a], vec![0.0], 0.0, 0.0, None).unwrap();
        b.add_place("B", vec![0.0], vec![0.0], 0.0, 0.0, None).unwrap();
        b.add_transition("convert", None, 0.0, 0.0, None).unwrap();
        b.add_arc("A", "convert", vec![1.0], false).unwrap();
        b.add_arc("convert", "B", vec![1.0], false).unwrap();
        let net = Arc::new(b.build().unwrap());

        let mut rates = RateMap::new();
        rates.insert("convert".into(), Rate::Constant(0.2));

        let mut u0 = HashMap::new();
        u0.insert("A".to_string(), u0_a);
        u0.insert("B".to_string(), 0.0);

        Problem::new(net, u0, 0.0, 20.0, rates).unwrap()
    }

    #[test]
    fn decay_matches_analytic_solution() {
        let problem = decay_problem(100.0);
        let sol = solve(&problem, Method::Tsit5, &IntegratorOptions::default()).unwrap();
        let a_final = sol.get_final_state()["A"];
        let b_final = sol.get_final_state()["B"];
        let expected_a = 100.0 * (-0.2_f64 * 20.0).exp();
        assert!((a_final - expected_a).abs() < 0.1, "a_final={a_final} expected={expected_a}");
        assert!((a_final + b_final - 100.0).abs() < 0.1);
    }

    #[test]
    fn time_samples_are_strictly_increasing_and_bracket_tspan() {
        let problem = decay_problem(100.0);
        let sol = solve(&problem, Method::Tsit5, &IntegratorOptions::default()).unwrap();
        assert_eq!(sol.t[0], problem.t0);
        assert_eq!(*sol.t.last().unwrap(), problem.tf);
        for w in sol.t.windows(2) {
            assert!(w[1] > w[0]);
        }
    }

    #[test]
    fn fixed_step_rk4_matches_adaptive_within_tolerance() {
        let problem = decay_problem(100.0);
        let mut opts = IntegratorOptions::default();
        opts.adaptive = false;
        opts.dt = 0.001;
        let sol = solve(&problem, Method::Tsit5, &opts).unwrap();
        let a_final = sol.get_final_state()["A"];
        let expected_a = 100.0 * (-0.2_f64 * 20.0).exp();
        assert!((a_final - expected_a).abs() < 0.01);
    }

    #[test]
    fn dtmin_underflow_is_reported() {
        let problem = decay_problem(100.0);
        let opts = IntegratorOptions {
            abstol: 1e-14,
            reltol: 1e-14,
            dtmin: 1e-3,
            maxiters: 100_000,
            ..IntegratorOptions::default()
        };
        let result = solve(&problem, Method::Tsit5, &opts);
        assert!(matches!(result, Err(SimError::StepUnderflow { .. })));
    }

    #[test]
    fn maxiters_budget_is_enforced() {
        let problem = decay_problem(100.0);
        let opts = IntegratorOptions { maxiters: 2, ..IntegratorOptions::default() };
        let result = solve(&problem, Method::Tsit5, &opts);
        assert!(matches!(result, Err(SimError::StepBudgetExhausted { .. })));
    }
}
