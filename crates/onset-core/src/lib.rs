//! Streaming onset-of-price-surge detection: a per-symbol pipeline of five
//! components (feature engine, change-point gate, candidate detector, confirm
//! detector, refractory manager) over Korean equity tick streams.
//!
//! The crate has no I/O and no async runtime dependency; callers own
//! transport, persistence, and scheduling. See [`Pipeline`] for the public
//! entry point.

pub mod candidate;
pub mod config;
pub mod cpd;
pub mod confirm;
pub mod error;
pub mod features;
mod math;
pub mod pipeline;
pub mod refractory;
pub mod scorer;
pub mod types;

pub use config::Config;
pub use error::CoreError;
pub use pipeline::{Pipeline, PipelineStats};
pub use types::{Event, FeatureRecord, Tick};
