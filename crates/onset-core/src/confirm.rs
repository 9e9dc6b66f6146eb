//! Confirm Detector — spec.md §4.4, the core hard part. Decides whether an
//! open candidate represents a real onset by comparing a pre-window baseline
//! against delta-improvement held over `persistent_n` consecutive
//! post-candidate records, earliest-hit wins.

use std::collections::{HashMap, VecDeque};

use crate::config::ConfirmConfig;
use crate::types::{CandidateEvent, ConfirmAxis, ConfirmEvidence, ConfirmedEvent, FeatureRecord, SymbolId, Timestamp};

/// Snapshot of the earliest record in the currently-running consecutive-hit
/// streak; this is what ends up as the confirmed event's `ts` and evidence
/// when the streak reaches `persistent_n`.
#[derive(Debug, Clone)]
struct HitSnapshot {
	ts: Timestamp,
	delta_ret: f64,
	delta_zvol: f64,
	delta_spread: Option<f64>,
	satisfied_axes: Vec<ConfirmAxis>,
	onset_strength: f64,
}

#[derive(Debug, Clone)]
struct OpenCandidate {
	event: CandidateEvent,
	pre_ret: f64,
	pre_zvol: f64,
	pre_spread: Option<f64>,
	pre_microprice_slope: Option<f64>,
	streak_count: usize,
	streak_start: Option<HitSnapshot>,
	streak_sum_ret: f64,
	streak_sum_zvol: f64,
}

#[derive(Debug, Default)]
struct ConfirmSymbolState {
	/// Feature records spanning at least `pre_window_s + window_s`.
	buffer: VecDeque<FeatureRecord>,
	open: Option<OpenCandidate>,
}

#[derive(Debug)]
pub struct ConfirmDetector {
	cfg: ConfirmConfig,
	symbols: HashMap<SymbolId, ConfirmSymbolState>,
}

impl ConfirmDetector {
	#[must_use]
	pub fn new(cfg: ConfirmConfig) -> Self {
		Self { cfg, symbols: HashMap::new() }
	}

	/// Attempts to open `candidate` as the symbol's awaiting-confirmation
	/// candidate (invariant iii: replaces the current one only if strictly
	/// higher-scoring, otherwise the new candidate is silently discarded).
	/// Returns `false` when the candidate was discarded or dropped (empty
	/// pre-window).
	pub fn accept_candidate(&mut self, candidate: &CandidateEvent) -> bool {
		let state = self.symbols.entry(candidate.symbol.clone()).or_default();

		if let Some(existing) = &state.open {
			if candidate.score <= existing.event.score {
				return false;
			}
		}

		let pre_cutoff = candidate.ts - self.cfg.pre_window_s as i64 * 1000;
		let pre: Vec<&FeatureRecord> = state.buffer.iter().filter(|r| r.ts >= pre_cutoff && r.ts < candidate.ts).collect();
		if pre.is_empty() {
			tracing::debug!(symbol = %candidate.symbol, ts = candidate.ts, "dropping candidate: empty pre-window");
			return false;
		}

		let pre_ret_values: Vec<f64> = pre.iter().map(|r| r.ret_1s).collect();
		let pre_zvol_values: Vec<f64> = pre.iter().map(|r| r.z_vol_1s).collect();
		let pre_spread_values: Vec<f64> = pre.iter().filter_map(|r| r.spread).collect();
		let pre_slope_values: Vec<f64> = pre.iter().filter_map(|r| r.microprice_slope).collect();

		let mut open = OpenCandidate {
			event: candidate.clone(),
			pre_ret: crate::math::median(&pre_ret_values),
			pre_zvol: crate::math::median(&pre_zvol_values),
			pre_spread: (!pre_spread_values.is_empty()).then(|| crate::math::median(&pre_spread_values)),
			pre_microprice_slope: (!pre_slope_values.is_empty()).then(|| crate::math::median(&pre_slope_values)),
			streak_count: 0,
			streak_start: None,
			streak_sum_ret: 0.0,
			streak_sum_zvol: 0.0,
		};

		if !self.cfg.exclude_cand_point {
			if let Some(at_candidate) = state.buffer.iter().find(|r| r.ts == candidate.ts).cloned() {
				apply_record_to_open(&self.cfg, &mut open, &at_candidate);
			}
		}

		state.open = Some(open);
		true
	}

	/// Feeds a new feature record through the symbol's open candidate (if
	/// any). Always buffers the record regardless of whether a candidate is
	/// open, since a future candidate's pre-window may need it.
	pub fn on_record(&mut self, record: &FeatureRecord) -> Option<ConfirmedEvent> {
		let state = self.symbols.entry(record.symbol.clone()).or_default();

		state.buffer.push_back(record.clone());
		let retain_from = record.ts - (self.cfg.pre_window_s + self.cfg.window_s) as i64 * 1000;
		while state.buffer.front().is_some_and(|r| r.ts < retain_from) {
			state.buffer.pop_front();
		}

		let open = state.open.as_mut()?;
		if record.ts <= open.event.ts {
			return None;
		}
		if record.ts > open.event.ts + self.cfg.window_s as i64 * 1000 {
			tracing::debug!(symbol = %record.symbol, candidate_ts = open.event.ts, "candidate aged out without confirmation");
			state.open = None;
			return None;
		}

		let confirmed = apply_record_to_open(&self.cfg, open, record);
		if let Some(evt) = &confirmed {
			tracing::debug!(symbol = %record.symbol, ts = evt.ts, strength = evt.onset_strength, "candidate confirmed");
			state.open = None;
		}
		confirmed
	}

	pub fn remove(&mut self, symbol: &str) {
		self.symbols.remove(symbol);
	}
}

/// Evaluates `record` as one post-candidate tick for `open`, updating its
/// consecutive-hit streak and returning a `ConfirmedEvent` the moment the
/// streak reaches `persistent_n`.
fn apply_record_to_open(cfg: &ConfirmConfig, open: &mut OpenCandidate, record: &FeatureRecord) -> Option<ConfirmedEvent> {
	let delta_ret = record.ret_1s - open.pre_ret;
	let delta_slope = match (record.microprice_slope, open.pre_microprice_slope) {
		(Some(s), Some(pre_s)) => Some(s - pre_s),
		_ => None,
	};
	let price_axis = delta_ret >= cfg.delta.ret_min || delta_slope.is_some_and(|d| d >= cfg.delta.ret_min);

	let delta_zvol = record.z_vol_1s - open.pre_zvol;
	let volume_axis = delta_zvol >= cfg.delta.zvol_min;

	let delta_spread = match (open.pre_spread, record.spread) {
		(Some(pre_s), Some(s)) => Some(pre_s - s),
		_ => None,
	};
	let friction_axis = delta_spread.is_some_and(|d| d >= cfg.delta.spread_drop);

	let mut satisfied_axes = Vec::with_capacity(3);
	if price_axis {
		satisfied_axes.push(ConfirmAxis::Price);
	}
	if volume_axis {
		satisfied_axes.push(ConfirmAxis::Volume);
	}
	if friction_axis {
		satisfied_axes.push(ConfirmAxis::Friction);
	}

	let onset_strength = satisfied_axes.len() as f64 / 3.0;
	let is_hit = (!cfg.require_price_axis || price_axis)
		&& satisfied_axes.len() >= cfg.min_axes
		&& onset_strength >= cfg.onset_strength_min;

	if !is_hit {
		open.streak_count = 0;
		open.streak_start = None;
		open.streak_sum_ret = 0.0;
		open.streak_sum_zvol = 0.0;
		return None;
	}

	if open.streak_count == 0 {
		open.streak_start =
			Some(HitSnapshot { ts: record.ts, delta_ret, delta_zvol, delta_spread, satisfied_axes, onset_strength });
	}
	open.streak_count += 1;
	open.streak_sum_ret += record.ret_1s;
	open.streak_sum_zvol += record.z_vol_1s;

	if open.streak_count < cfg.persistent_n {
		return None;
	}

	let start = open.streak_start.clone().expect("streak_start set when streak_count > 0");
	let n = cfg.persistent_n as f64;
	Some(ConfirmedEvent {
		ts: start.ts,
		symbol: open.event.symbol.clone(),
		confirmed_from_ts: open.event.ts,
		satisfied_axes: start.satisfied_axes,
		onset_strength: start.onset_strength,
		evidence: ConfirmEvidence {
			delta_ret: start.delta_ret,
			delta_zvol: start.delta_zvol,
			delta_spread: start.delta_spread,
			pre_ret: open.pre_ret,
			pre_zvol: open.pre_zvol,
			pre_spread: open.pre_spread,
			post_ret_mean: open.streak_sum_ret / n,
			post_zvol_mean: open.streak_sum_zvol / n,
		},
	})
}
