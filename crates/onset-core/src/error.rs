use thiserror::Error;

use crate::types::{SymbolId, Timestamp};

/// `BadInputTick` and `Config` are real failures; `FeatureUnavailable` and
/// `EmptyPreWindow` are modeled as control flow (`Option`/silent drop) rather
/// than variants here, since they are recovered locally and never escape a
/// single component.
#[derive(Debug, Error)]
pub enum CoreError {
	#[error("bad input tick for {symbol} at ts={ts}: {reason}")]
	BadInputTick { symbol: SymbolId, ts: Timestamp, reason: String },

	#[error("invalid configuration: {0}")]
	Config(String),
}
