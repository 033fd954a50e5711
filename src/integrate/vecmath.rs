//! Small dense-vector helpers over [`Marking`], indexed by a canonical,
//! sorted `place_ids` slice (§9: "a dense vector indexed by compiled place
//! index for performance" — kept as a `Marking` for readability, but every
//! arithmetic op walks the fixed `place_ids` order so stages never silently
//! drop a place that a given transition didn't touch).

use crate::problem::Marking;

pub fn zeros(place_ids: &[String]) -> Marking {
    place_ids.iter().map(|id| (id.clone(), 0.0)).collect()
}

pub fn get(m: &Marking, id: &str) -> f64 {
    m.get(id).copied().unwrap_or(0.0)
}

/// `y + sum(coeff * term)` over every place in `place_ids`.
pub fn combine(place_ids: &[String], y: &Marking, terms: &[(f64, &Marking)]) -> Marking {
    place_ids
        .iter()
        .map(|id| {
            let mut v = get(y, id);
            for (coeff, term) in terms {
                v += coeff * get(term, id);
            }
            (id.clone(), v)
        })
        .collect()
}

pub fn any_non_finite(m: &Marking) -> bool {
    m.values().any(|v| !v.is_finite())
}
