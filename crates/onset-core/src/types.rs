use serde::{Deserialize, Serialize};

/// Epoch milliseconds in market timezone. Non-decreasing per symbol on input.
pub type Timestamp = i64;

/// Short ticker identifier, owner of its own pipeline state.
pub type SymbolId = String;

/// A single market event: price, volume, and top-of-book snapshot at `ts`.
/// Deserializable so an external collaborator (CSV/line-JSON reader) can
/// build one directly with `serde` rather than hand-rolling field mapping.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tick {
	pub ts: Timestamp,
	pub symbol: SymbolId,
	pub price: f64,
	pub volume: f64,
	pub bid1: f64,
	pub ask1: f64,
	pub bid_qty1: f64,
	pub ask_qty1: f64,
}

/// A tick augmented with derived streaming features, computed without look-ahead.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
	pub ts: Timestamp,
	pub symbol: SymbolId,
	pub price: f64,
	pub ret_1s: f64,
	pub accel_1s: f64,
	pub ticks_per_sec: u32,
	pub vol_1s: f64,
	pub z_vol_1s: f64,
	/// `(ask1 - bid1) / mid`, defined only when both sides are positive.
	pub spread: Option<f64>,
	/// Volume-weighted mid, defined when the qty denominator is positive.
	pub microprice: Option<f64>,
	/// First difference of `microprice`; `None` when either side is unavailable.
	pub microprice_slope: Option<f64>,
	/// Set when raw `ret_1s` fell outside +-0.1 and was clamped this tick.
	pub ret_clamped: bool,
}

/// Which absolute-threshold axis fired for a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateAxis {
	Speed,
	Participation,
	Friction,
}

/// Which delta-improvement axis held at confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmAxis {
	Price,
	Volume,
	Friction,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateEvidence {
	pub ret_1s: f64,
	pub z_vol_1s: f64,
	pub spread: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateEvent {
	pub ts: Timestamp,
	pub symbol: SymbolId,
	pub score: f64,
	pub trigger_axes: Vec<CandidateAxis>,
	pub evidence: CandidateEvidence,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmEvidence {
	pub delta_ret: f64,
	pub delta_zvol: f64,
	pub delta_spread: Option<f64>,
	pub pre_ret: f64,
	pub pre_zvol: f64,
	pub pre_spread: Option<f64>,
	pub post_ret_mean: f64,
	pub post_zvol_mean: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmedEvent {
	pub ts: Timestamp,
	pub symbol: SymbolId,
	pub confirmed_from_ts: Timestamp,
	pub satisfied_axes: Vec<ConfirmAxis>,
	pub onset_strength: f64,
	pub evidence: ConfirmEvidence,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefractoryRejectedEvent {
	pub ts: Timestamp,
	pub symbol: SymbolId,
	pub candidate_ts: Timestamp,
	pub blocked_until_ts: Timestamp,
}

/// Tagged union of the three event variants the pipeline can emit per tick.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type")]
pub enum Event {
	#[serde(rename = "onset_candidate")]
	Candidate(CandidateEvent),
	#[serde(rename = "onset_confirmed")]
	Confirmed(ConfirmedEvent),
	#[serde(rename = "onset_rejected_refractory")]
	RefractoryRejected(RefractoryRejectedEvent),
}

impl Event {
	#[must_use]
	pub fn ts(&self) -> Timestamp {
		match self {
			Self::Candidate(e) => e.ts,
			Self::Confirmed(e) => e.ts,
			Self::RefractoryRejected(e) => e.ts,
		}
	}

	#[must_use]
	pub fn symbol(&self) -> &str {
		match self {
			Self::Candidate(e) => &e.symbol,
			Self::Confirmed(e) => &e.symbol,
			Self::RefractoryRejected(e) => &e.symbol,
		}
	}
}
