//! JSON ingestion and export: net documents and observation datasets. Wire
//! format favors scalar widening — a bare number is accepted anywhere a
//! per-color vector is expected — over requiring callers to wrap
//! single-color values in arrays.

use std::collections::HashMap;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::learn::fitter::Dataset;
use crate::net::{Net, NetBuilder};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarOrVec {
    Scalar(f64),
    Vec(Vec<f64>),
}

impl ScalarOrVec {
    fn into_vec(self) -> Vec<f64> {
        match self {
            ScalarOrVec::Scalar(v) => vec![v],
            ScalarOrVec::Vec(v) => v,
        }
    }
}

fn vec_to_doc(values: &[f64]) -> ScalarOrVec {
    if values.len() == 1 {
        ScalarOrVec::Scalar(values[0])
    } else {
        ScalarOrVec::Vec(values.to_vec())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceDoc {
    pub id: String,
    pub initial: ScalarOrVec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<ScalarOrVec>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub x: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionDoc {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub x: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArcDoc {
    pub source: String,
    pub target: String,
    pub weight: ScalarOrVec,
    #[serde(default, skip_serializing_if = "is_false")]
    pub inhibitor: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    pub places: Vec<PlaceDoc>,
    pub transitions: Vec<TransitionDoc>,
    pub arcs: Vec<ArcDoc>,
}

fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

fn is_false(v: &bool) -> bool {
    !*v
}

pub fn net_from_json(json: &str) -> SimResult<Net> {
    let doc: NetDocument = serde_json::from_str(json)
        .map_err(|e| SimError::MalformedNet(format!("invalid net JSON: {e}")))?;

    let mut builder = NetBuilder::new();
    if let Some(colors) = doc.colors {
        builder = builder.with_colors(colors);
    }
    for p in doc.places {
        let capacity = p.capacity.map(ScalarOrVec::into_vec).unwrap_or_else(|| vec![0.0]);
        builder.add_place(p.id, p.initial.into_vec(), capacity, p.x, p.y, p.label)?;
    }
    for t in doc.transitions {
        builder.add_transition(t.id, t.role, t.x, t.y, t.label)?;
    }
    for a in doc.arcs {
        builder.add_arc(a.source, a.target, a.weight.into_vec(), a.inhibitor)?;
    }
    builder.build()
}

pub fn net_to_json(net: &Net) -> SimResult<String> {
    let mut places: Vec<PlaceDoc> = net
        .places()
        .map(|p| PlaceDoc {
            id: p.id.clone(),
            initial: vec_to_doc(&p.initial),
            capacity: if p.capacity.iter().all(|&c| c == 0.0) {
                None
            } else {
                Some(vec_to_doc(&p.capacity))
            },
            x: p.x,
            y: p.y,
            label: p.label.clone(),
        })
        .collect();
    places.sort_by(|a, b| a.id.cmp(&b.id));

    let mut transitions: Vec<TransitionDoc> = net
        .transitions()
        .map(|t| TransitionDoc {
            id: t.id.clone(),
            role: t.role.clone(),
            x: t.x,
            y: t.y,
            label: t.label.clone(),
        })
        .collect();
    transitions.sort_by(|a, b| a.id.cmp(&b.id));

    let arcs: Vec<ArcDoc> = net
        .arcs()
        .iter()
        .map(|a| {
            let (source, target) = match a.direction {
                crate::net::Direction::In => (a.place_id.clone(), a.transition_id.clone()),
                crate::net::Direction::Out => (a.transition_id.clone(), a.place_id.clone()),
            };
            ArcDoc { source, target, weight: vec_to_doc(&a.weight), inhibitor: a.inhibitor }
        })
        .collect();

    let doc = NetDocument { colors: net.colors.clone(), places, transitions, arcs };
    serde_json::to_string_pretty(&doc).map_err(|e| SimError::MalformedNet(format!("net serialization failed: {e}")))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimestampValue {
    Numeric(f64),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetDocument {
    pub times: Vec<TimestampValue>,
    pub observations: HashMap<String, Vec<f64>>,
}

/// Parse a possibly-mixed list of timestamps into seconds-since-first-sample.
/// Numeric values under `1e12` are treated as Unix seconds, otherwise Unix
/// milliseconds; strings are parsed as RFC 3339.
fn parse_timestamps(raw: &[TimestampValue]) -> SimResult<Vec<f64>> {
    let mut absolute = Vec::with_capacity(raw.len());
    for value in raw {
        let seconds = match value {
            TimestampValue::Numeric(n) if *n >= 1e12 => n / 1000.0,
            TimestampValue::Numeric(n) => *n,
            TimestampValue::Text(s) => {
                let parsed = DateTime::parse_from_rfc3339(s)
                    .map_err(|e| SimError::MalformedProblem(format!("invalid timestamp '{s}': {e}")))?;
                parsed.timestamp() as f64 + parsed.timestamp_subsec_nanos() as f64 / 1e9
            }
        };
        absolute.push(seconds);
    }
    let origin = absolute.first().copied().unwrap_or(0.0);
    Ok(absolute.into_iter().map(|t| t - origin).collect())
}

pub fn dataset_from_json(json: &str) -> SimResult<Dataset> {
    let doc: DatasetDocument = serde_json::from_str(json)
        .map_err(|e| SimError::MalformedProblem(format!("invalid dataset JSON: {e}")))?;
    let times = parse_timestamps(&doc.times)?;
    for values in doc.observations.values() {
        if values.len() != times.len() {
            return Err(SimError::MalformedProblem(
                "observation series length does not match number of timestamps".into(),
            ));
        }
    }
    Ok(Dataset { times, observations: doc.observations })
}
