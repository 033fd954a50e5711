//! Classical fixed-step RK4 (§4.C fallback, used when `Adaptive = false`).

use super::vecmath::combine;
use crate::ode::CompiledOde;
use crate::problem::Marking;

pub fn step(ode: &CompiledOde, t: f64, y: &Marking, dt: f64, place_ids: &[String]) -> Marking {
    let k1 = ode.rhs(t, y);
    let y2 = combine(place_ids, y, &[(dt / 2.0, &k1)]);
    let k2 = ode.rhs(t + dt / 2.0, &y2);
    let y3 = combine(place_ids, y, &[(dt / 2.0, &k2)]);
    let k3 = ode.rhs(t + dt / 2.0, &y3);
    let y4 = combine(place_ids, y, &[(dt, &k3)]);
    let k4 = ode.rhs(t + dt, &y4);

    combine(
        place_ids,
        y,
        &[
            (dt / 6.0, &k1),
            (dt / 3.0, &k2),
            (dt / 3.0, &k3),
            (dt / 6.0, &k4),
        ],
    )
}
