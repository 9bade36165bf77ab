//! # chorewheel
//!
//! Distribution engine for household chores.
//!
//! Four stateless components work over caller-supplied snapshots:
//!
//! - [`fairness::FairnessAlgorithm`] scores members for a task and assigns
//!   single tasks or whole batches, then reports on inequality.
//! - [`predictor::WorkloadPredictor`] finds cycles and trends in the
//!   household's load history and forecasts upcoming demand.
//! - [`burnout::BurnoutPrevention`] tiers each member's load, raises alerts,
//!   and moves tasks off overloaded members.
//! - [`delegation::DelegationEngine`] matches tasks to members by skill and
//!   availability and tracks delegation requests through their lifecycle.
//!
//! Nothing here persists state or reads the clock; time-dependent operations
//! take `now` explicitly.

pub mod burnout;
pub mod config;
pub mod delegation;
pub mod error;
pub mod fairness;
pub mod model;
pub mod predictor;
pub mod snapshot;
pub mod telemetry;
pub mod validate;
