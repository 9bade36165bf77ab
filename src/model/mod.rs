//! Core data model.
//!
//! Plain serde records supplied by the caller on every call. The engine
//! reads them, derives snapshots from them, and never persists anything.

pub mod delegation;
pub mod member;
pub mod workload;

pub use delegation::*;
pub use member::*;
pub use workload::*;
