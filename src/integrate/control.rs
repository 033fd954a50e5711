//! PI step-size controller (§4.C).
//!
//! Pure functions over the embedded error estimate; no state is retained
//! between calls, matching the "each Solve call is independent" reentrancy
//! contract of §5.

use crate::problem::Marking;

/// `err = sqrt(mean((e_i / sc_i)^2))` with `sc_i = abstol + reltol * max(|y_i|, |y_next_i|)`.
pub fn weighted_error_norm(
    err: &Marking,
    y: &Marking,
    y_next: &Marking,
    place_ids: &[String],
    abstol: f64,
    reltol: f64,
) -> f64 {
    if place_ids.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = place_ids
        .iter()
        .map(|id| {
            let e_i = err.get(id).copied().unwrap_or(0.0);
            let y_i = y.get(id).copied().unwrap_or(0.0);
            let yn_i = y_next.get(id).copied().unwrap_or(0.0);
            let sc_i = abstol + reltol * y_i.abs().max(yn_i.abs());
            if sc_i <= 0.0 {
                0.0
            } else {
                (e_i / sc_i).powi(2)
            }
        })
        .sum();
    (sum_sq / place_ids.len() as f64).sqrt()
}

/// `dt_new = dt * clamp(safety * err^(-1/5), min_factor, max_factor)`.
pub fn suggest_dt(dt: f64, err: f64, safety: f64, min_factor: f64, max_factor: f64) -> f64 {
    let err = err.max(1e-12);
    let factor = (safety * err.powf(-0.2)).clamp(min_factor, max_factor);
    dt * factor
}
