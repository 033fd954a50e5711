//! Continuous-dynamics Petri net simulator with a pluggable
//! hypothesis-evaluation layer.
//!
//! A [`net::Net`] is compiled into a mass-action ODE right-hand side
//! ([`ode::CompiledOde`]) and advanced by an adaptive embedded Runge-Kutta
//! integrator ([`integrate`]). [`eval`] scores marking-perturbation
//! hypotheses against a base [`problem::Problem`], optionally caching
//! results ([`cache`]) and fanning out across a rayon pool. [`learn`] fits
//! parametric rate functions to observed trajectories. [`reach`] and
//! [`engine`] cover the discrete side of the same net, and [`statechart`]
//! compiles hierarchical state machines down to the same substrate.

pub mod cache;
pub mod engine;
pub mod error;
pub mod eval;
pub mod integrate;
pub mod io;
pub mod learn;
pub mod net;
pub mod ode;
pub mod problem;
pub mod reach;
pub mod statechart;

pub use error::{SimError, SimResult};
pub use net::{Net, NetBuilder};
pub use problem::{Marking, Problem, Rate, RateMap, Solution};

/// Initialize a `tracing` subscriber reading `RUST_LOG` (default `info`).
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}
