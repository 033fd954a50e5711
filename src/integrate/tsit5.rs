//! Tsitouras' 5(4) explicit Runge-Kutta pair: 7 stages, first-same-as-last,
//! order 5 with an embedded order-4 error estimate (§4.C primary method).
//!
//! Coefficients are the standard Tsit5 tableau (Tsitouras, 2011), as used by
//! `OrdinaryDiffEq.jl` and ported into this crate's `Marking`-based stage
//! evaluation.

use super::vecmath::combine;
use crate::ode::CompiledOde;
use crate::problem::Marking;

const C: [f64; 7] = [0.0, 0.161, 0.327, 0.9, 0.980_025_540_904_509_7, 1.0, 1.0];

#[rustfmt::skip]
const A: [[f64; 6]; 7] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [0.161, 0.0, 0.0, 0.0, 0.0, 0.0],
    [-0.008_480_655_492_356_989, 0.335_480_655_492_357, 0.0, 0.0, 0.0, 0.0],
    [2.897_153_057_105_495, -6.359_448_489_975_075, 4.362_295_432_869_581_5, 0.0, 0.0, 0.0],
    [5.325_864_828_439_257, -11.748_883_564_062_828, 7.495_539_342_889_836_5, -0.092_495_066_361_755_25, 0.0, 0.0],
    [5.861_455_442_946_42, -12.920_969_317_847_11, 8.159_367_898_576_159, -0.071_584_973_281_401, -0.028_269_050_394_068_383, 0.0],
    [0.096_460_766_818_065_23, 0.01, 0.479_889_650_414_499_6, 1.379_008_574_103_742, -3.290_069_515_436_081, 2.324_710_524_099_774],
];

/// 5th-order weights; identical to row 7 of `A` by the FSAL property.
const B: [f64; 7] = [
    0.096_460_766_818_065_23,
    0.01,
    0.479_889_650_414_499_6,
    1.379_008_574_103_742,
    -3.290_069_515_436_081,
    2.324_710_524_099_774,
    0.0,
];

/// `b - bhat`: direct error-estimate weights (order 5 minus embedded order 4).
const BTILDE: [f64; 7] = [
    -0.001_780_011_052_225_777_1,
    -0.000_816_434_459_656_746_9,
    0.007_880_878_010_261_995_6,
    -0.144_711_007_173_262_97,
    0.582_357_165_452_555_2,
    -0.458_082_105_929_187,
    0.015_151_515_151_515_152,
];

/// Advance one Tsit5 step. Returns `(y5, error_estimate)` where
/// `error_estimate = y5 - y4 = dt * sum(btilde_j * k_j)`.
pub fn step(
    ode: &CompiledOde,
    t: f64,
    y: &Marking,
    dt: f64,
    place_ids: &[String],
) -> (Marking, Marking) {
    let mut k: Vec<Marking> = Vec::with_capacity(7);
    k.push(ode.rhs(t, y));

    for i in 1..7 {
        let terms: Vec<(f64, &Marking)> = (0..i)
            .filter(|&j| A[i][j] != 0.0)
            .map(|j| (dt * A[i][j], &k[j]))
            .collect();
        let y_stage = combine(place_ids, y, &terms);
        k.push(ode.rhs(t + dt * C[i], &y_stage));
    }

    let b_terms: Vec<(f64, &Marking)> =
        (0..7).filter(|&j| B[j] != 0.0).map(|j| (dt * B[j], &k[j])).collect();
    let y5 = combine(place_ids, y, &b_terms);

    let err_terms: Vec<(f64, &Marking)> = (0..7).map(|j| (dt * BTILDE[j], &k[j])).collect();
    let zero = super::vecmath::zeros(place_ids);
    let error = combine(place_ids, &zero, &err_terms);

    (y5, error)
}
