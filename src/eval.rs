//! Hypothesis evaluator (§4.F): scores marking-perturbation hypotheses
//! against a base [`Problem`] by running the integrator and applying a
//! caller-supplied scorer, with an optional result cache and an early
//! termination predicate checked before the cache lookup.

use rayon::prelude::*;

use crate::cache::{fingerprint, CacheEntry, UnboundedCache};
use crate::error::SimResult;
use crate::integrate::{solve, IntegratorOptions, Method};
use crate::problem::{Marking, Problem, Rate};
use crate::net::Net;

/// A hypothesis is a marking overlay applied to the base problem's `u0`.
pub type Hypothesis = Marking;

pub type Scorer = dyn Fn(&Problem, &crate::problem::Solution) -> f64 + Sync + Send;
pub type EarlyTerminator = dyn Fn(&Hypothesis) -> bool + Sync + Send;

pub struct EvaluatorConfig<'a> {
    pub method: Method,
    pub opts: IntegratorOptions,
    pub scorer: &'a Scorer,
    /// Checked before the cache lookup; `true` means "reject without
    /// simulating" (§4.F "rejected by early terminator").
    pub early_terminator: Option<&'a EarlyTerminator>,
    pub infeasible_score: f64,
    pub cache: Option<&'a UnboundedCache>,
}

impl<'a> EvaluatorConfig<'a> {
    pub fn new(method: Method, opts: IntegratorOptions, scorer: &'a Scorer) -> Self {
        Self {
            method,
            opts,
            scorer,
            early_terminator: None,
            infeasible_score: f64::NEG_INFINITY,
            cache: None,
        }
    }
}

/// A single hypothesis's outcome.
#[derive(Debug, Clone)]
pub struct EvalOutcome {
    pub score: f64,
    pub from_cache: bool,
    pub infeasible: bool,
}

fn evaluate_one(base: &Problem, hypothesis: &Hypothesis, config: &EvaluatorConfig) -> EvalOutcome {
    let problem = base.with_hypothesis(hypothesis);

    if let Some(terminator) = config.early_terminator {
        if terminator(&problem.u0) {
            return EvalOutcome { score: config.infeasible_score, from_cache: false, infeasible: true };
        }
    }

    let fp = fingerprint(&problem.u0);

    if let Some(cache) = config.cache {
        if let Some(entry) = cache.get(&fp) {
            return EvalOutcome { score: entry.score, from_cache: true, infeasible: false };
        }
    }

    let score = match solve(&problem, config.method, &config.opts) {
        Ok(sol) => (config.scorer)(&problem, &sol),
        Err(_) => config.infeasible_score,
    };

    if let Some(cache) = config.cache {
        cache.put(fp, CacheEntry { score, final_marking: None });
    }

    EvalOutcome { score, from_cache: false, infeasible: false }
}

/// Score a single hypothesis against `base`.
pub fn evaluate(base: &Problem, hypothesis: &Hypothesis, config: &EvaluatorConfig) -> EvalOutcome {
    evaluate_one(base, hypothesis, config)
}

/// Score every hypothesis in order, sequentially.
pub fn evaluate_many(base: &Problem, hypotheses: &[Hypothesis], config: &EvaluatorConfig) -> Vec<EvalOutcome> {
    let _span = tracing::info_span!("evaluate_many", count = hypotheses.len()).entered();
    hypotheses.iter().map(|h| evaluate_one(base, h, config)).collect()
}

/// Score every hypothesis concurrently via rayon; output order matches
/// input order regardless of completion order (§5 determinism contract).
pub fn evaluate_many_parallel(
    base: &Problem,
    hypotheses: &[Hypothesis],
    config: &EvaluatorConfig,
) -> Vec<EvalOutcome> {
    let _span = tracing::info_span!("evaluate_many_parallel", count = hypotheses.len()).entered();
    hypotheses.par_iter().map(|h| evaluate_one(base, h, config)).collect()
}

/// Index and outcome of the highest-scoring hypothesis. Ties break toward
/// the earliest index in `hypotheses`.
pub fn find_best(base: &Problem, hypotheses: &[Hypothesis], config: &EvaluatorConfig) -> Option<(usize, EvalOutcome)> {
    let outcomes = evaluate_many(base, hypotheses, config);
    best_of(outcomes)
}

pub fn find_best_parallel(
    base: &Problem,
    hypotheses: &[Hypothesis],
    config: &EvaluatorConfig,
) -> Option<(usize, EvalOutcome)> {
    let outcomes = evaluate_many_parallel(base, hypotheses, config);
    best_of(outcomes)
}

fn best_of(outcomes: Vec<EvalOutcome>) -> Option<(usize, EvalOutcome)> {
    let mut best: Option<(usize, EvalOutcome)> = None;
    for (i, outcome) in outcomes.into_iter().enumerate() {
        let replace = match &best {
            None => true,
            Some((_, b)) => outcome.score > b.score,
        };
        if replace {
            best = Some((i, outcome));
        }
    }
    best
}

/// Pairwise comparison of two hypotheses' scores.
pub fn compare(base: &Problem, a: &Hypothesis, b: &Hypothesis, config: &EvaluatorConfig) -> std::cmp::Ordering {
    let sa = evaluate_one(base, a, config).score;
    let sb = evaluate_one(base, b, config).score;
    sa.partial_cmp(&sb).unwrap_or(std::cmp::Ordering::Equal)
}

/// Per-transition sensitivity: re-score `base` (no marking hypothesis) with
/// each transition's rate zeroed in turn, never mutating the shared rate map.
/// Returns `{transition-id -> score with that transition disabled}` plus a
/// `"_baseline"` entry holding the unperturbed score.
pub fn sensitivity_analysis(base: &Problem, config: &EvaluatorConfig) -> SimResult<Vec<(String, f64)>> {
    let baseline = evaluate_one(base, &Marking::new(), config).score;
    let net: &Net = &base.net;

    let mut results = vec![("_baseline".to_string(), baseline)];
    for transition_id in net.transition_ids() {
        let mut rates = base.rates.clone();
        rates.insert(transition_id.clone(), Rate::Constant(0.0));
        let perturbed = Problem::new(base.net.clone(), base.u0.clone(), base.t0, base.tf, rates)?;
        let score = evaluate_one(&perturbed, &Marking::new(), config).score;
        results.push((transition_id, score));
    }
    Ok(results)
}
