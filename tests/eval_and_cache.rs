//! Hypothesis evaluator scenarios (§8 concrete scenarios 3-5).

use std::collections::HashMap;
use std::sync::Arc;

use kinetics::cache::{fingerprint, CacheEntry, LruCache, UnboundedCache};
use kinetics::eval::{
    evaluate, evaluate_many, evaluate_many_parallel, find_best_parallel, EvaluatorConfig, Hypothesis,
};
use kinetics::integrate::{IntegratorOptions, Method};
use kinetics::net::NetBuilder;
use kinetics::problem::{Problem, Rate, RateMap, Solution};

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

fn final_b(_problem: &Problem, sol: &Solution) -> f64 {
    sol.get_final_state().get("B").copied().unwrap_or(0.0)
}

#[test]
fn three_identical_evaluations_hit_cache_twice() {
    let base = decay_problem();
    let cache = UnboundedCache::new();
    let config = EvaluatorConfig {
        cache: Some(&cache),
        ..EvaluatorConfig::new(Method::Tsit5, IntegratorOptions::default(), &final_b)
    };

    let hyp: Hypothesis = HashMap::new();
    for _ in 0..3 {
        evaluate(&base, &hyp, &config);
    }

    let stats = cache.stats();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.size, 1);
}

#[test]
fn lru_capacity_two_evicts_first_inserted() {
    let cache = LruCache::new(2);
    let f1 = fingerprint(&HashMap::from([("A".to_string(), 1.0)]));
    let f2 = fingerprint(&HashMap::from([("A".to_string(), 2.0)]));
    let f3 = fingerprint(&HashMap::from([("A".to_string(), 3.0)]));

    cache.put(f1, CacheEntry { score: 1.0, final_marking: None });
    cache.put(f2, CacheEntry { score: 2.0, final_marking: None });
    cache.put(f3, CacheEntry { score: 3.0, final_marking: None });

    assert_eq!(cache.stats().size, 2);
    assert!(cache.get(&f1).is_none());
}

#[test]
fn parallel_scores_are_monotone_and_best_is_last() {
    let base = decay_problem();
    let config = EvaluatorConfig::new(Method::Tsit5, IntegratorOptions::default(), &final_b);

    let hyps: Vec<Hypothesis> = [5.0, 10.0, 15.0, 20.0]
        .iter()
        .map(|&a| HashMap::from([("A".to_string(), a)]))
        .collect();

    let (best_idx, _) = find_best_parallel(&base, &hyps, &config).unwrap();
    assert_eq!(best_idx, 3);

    let outcomes = evaluate_many_parallel(&base, &hyps, &config);
    let scores: Vec<f64> = outcomes.iter().map(|o| o.score).collect();
    assert!(scores.windows(2).all(|w| w[1] >= w[0]), "scores={scores:?}");
}

#[test]
fn parallel_matches_sequential_element_wise() {
    let base = decay_problem();
    let config = EvaluatorConfig::new(Method::Tsit5, IntegratorOptions::default(), &final_b);

    let hyps: Vec<Hypothesis> = [5.0, 10.0, 15.0, 20.0]
        .iter()
        .map(|&a| HashMap::from([("A".to_string(), a)]))
        .collect();

    let sequential = evaluate_many(&base, &hyps, &config);
    let parallel = evaluate_many_parallel(&base, &hyps, &config);
    for (s, p) in sequential.iter().zip(parallel.iter()) {
        assert_eq!(s.score, p.score);
    }
}
