//! Explicit Euler (§4.C diagnostic fallback). Not used by [`super::solve`]
//! directly — exposed for callers that explicitly want the cheapest,
//! least-accurate method for sanity-checking a right-hand side.

use super::vecmath::combine;
use crate::ode::CompiledOde;
use crate::problem::Marking;

pub fn step(ode: &CompiledOde, t: f64, y: &Marking, dt: f64, place_ids: &[String]) -> Marking {
    let k1 = ode.rhs(t, y);
    combine(place_ids, y, &[(dt, &k1)])
}
