//! Fitter recovery scenario (§8 concrete scenario 6).

use std::collections::HashMap;
use std::sync::Arc;

use kinetics::integrate::{solve, IntegratorOptions, Method};
use kinetics::learn::fitter::{Dataset, Fitter};
use kinetics::learn::rate_func::RateFunc;
use kinetics::learn::LearnableProblem;
use kinetics::net::NetBuilder;
use kinetics::problem::{Rate, RateMap};

fn decay_learnable(rate_guess: f64) -> LearnableProblem {
    let mut b = NetBuilder::new();
    b.add_place("A", vec![100.0], vec![0.0], 0.0, 0.0, None).unwrap();
    b.add_place("B", vec![0.0], vec![0.0], 0.0, 0.0, None).unwrap();
    b.add_transition("convert", None, 0.0, 0.0, None).unwrap();
    b.add_arc("A", "convert", vec![1.0], false).unwrap();
    b.add_arc("convert", "B", vec![1.0], false).unwrap();
    let net = Arc::new(b.build().unwrap());

    let mut rates = RateMap::new();
    rates.insert("convert".into(), Rate::Learned(RateFunc::Constant(rate_guess)));

    let mut u0 = HashMap::new();
    u0.insert("A".to_string(), 100.0);
    u0.insert("B".to_string(), 0.0);

    LearnableProblem::new(net, u0, 0.0, 20.0, rates).unwrap()
}

#[test]
fn nelder_mead_recovers_true_rate_from_synthetic_trajectory() {
    let truth = decay_learnable(0.2);
    let truth_problem = truth.to_problem().unwrap();
    let truth_sol = solve(&truth_problem, Method::Tsit5, &IntegratorOptions::default()).unwrap();

    let times: Vec<f64> = (0..11).map(|i| i as f64 * 2.0).collect();
    let mut observations = HashMap::new();
    observations.insert("A".to_string(), times.iter().map(|&t| truth_sol.interpolate(t, "A")).collect());
    let dataset = Dataset { times, observations };

    let guess = decay_learnable(0.1);
    let fitter = Fitter { max_iterations: 300, ..Fitter::default() };
    let result = fitter.fit_nelder_mead(&guess, &dataset).unwrap();

    assert!(result.params[0] > 0.15 && result.params[0] < 0.25, "recovered k={}", result.params[0]);
    assert!(result.final_loss < 1.0, "final_loss={}", result.final_loss);
    assert!(result.final_loss < result.initial_loss);
}
