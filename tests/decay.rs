//! A→B decay scenario (§8 concrete scenario 1).

use std::collections::HashMap;
use std::sync::Arc;

use kinetics::integrate::{solve, IntegratorOptions, Method};
use kinetics::net::NetBuilder;
use kinetics::problem::{Problem, Rate, RateMap};

fn decay_problem() -> Problem {
    let mut b = NetBuilder::new();
    b.add_place("A", vec![100.0], vec![0.0], 0.0, 0.0, None).unwrap();
    b.add_place("B", vec![0.0], vec![0.0], 0.0, 0.0, None).unwrap();
    b.add_transition("convert", None, 0.0, 0.0, None).unwrap();
    b.add_arc("A", "convert", vec![1.0], false).unwrap();
    b.add_arc("convert", "B", vec![1.0], false).unwrap();
    let net = Arc::new(b.build().unwrap());

    let mut rates = RateMap::new();
    rates.insert("convert".into(), Rate::Constant(0.2));

    let mut u0 = HashMap::new();
    u0.insert("A".to_string(), 100.0);
    u0.insert("B".to_string(), 0.0);

    Problem::new(net, u0, 0.0, 20.0, rates).unwrap()
}

#[test]
fn decay_reaches_expected_endpoint() {
    let problem = decay_problem();
    let sol = solve(&problem, Method::Tsit5, &IntegratorOptions::default()).unwrap();
    let a_final = sol.get_final_state()["A"];
    let b_final = sol.get_final_state()["B"];

    assert!((a_final - 1.832).abs() < 0.05, "A(20)={a_final}");
    assert!((b_final - 98.168).abs() < 0.05, "B(20)={b_final}");
    assert!((a_final + b_final - 100.0).abs() < 0.1);
}

#[test]
fn solution_time_samples_are_monotone_and_bracket_tspan() {
    let problem = decay_problem();
    let sol = solve(&problem, Method::Tsit5, &IntegratorOptions::default()).unwrap();
    assert_eq!(sol.t[0], 0.0);
    assert_eq!(*sol.t.last().unwrap(), 20.0);
    assert!(sol.t.windows(2).all(|w| w[1] > w[0]));
}
