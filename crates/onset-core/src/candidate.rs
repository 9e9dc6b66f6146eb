//! Stateless-per-tick absolute threshold evaluation across three axes, plus
//! the one stateful coupling to refractory (spec.md §4.3).

use std::collections::{HashMap, VecDeque};

use crate::config::CandidateConfig;
use crate::math::median;
use crate::refractory::RefractoryManager;
use crate::types::{CandidateAxis, CandidateEvent, CandidateEvidence, FeatureRecord, SymbolId, Timestamp};

#[derive(Debug, Default)]
struct CandidateSymbolState {
	/// `(ts, spread)` samples trimmed to the trailing `baseline_window_s`.
	spread_history: VecDeque<(Timestamp, f64)>,
}

/// Outcome of evaluating one feature record against the candidate thresholds.
#[derive(Debug, Clone)]
pub enum CandidateOutcome {
	Candidate(CandidateEvent),
	RefractoryRejected { candidate_ts: Timestamp, blocked_until_ts: Timestamp },
	None,
}

#[derive(Debug)]
pub struct CandidateDetector {
	cfg: CandidateConfig,
	symbols: HashMap<SymbolId, CandidateSymbolState>,
}

impl CandidateDetector {
	#[must_use]
	pub fn new(cfg: CandidateConfig) -> Self {
		Self { cfg, symbols: HashMap::new() }
	}

	/// Evaluates `record` against the speed/participation/friction axes. A
	/// fired-axis count below `min_axes_required` never produces an event.
	/// When the count qualifies but the symbol is in refractory, a
	/// refractory-rejected diagnostic is returned instead of a candidate.
	pub fn evaluate(&mut self, record: &FeatureRecord, refractory: &RefractoryManager) -> CandidateOutcome {
		let state = self.symbols.entry(record.symbol.clone()).or_default();

		let baseline_cutoff = record.ts - self.cfg.friction_baseline_window_s as i64 * 1000;
		while state.spread_history.front().is_some_and(|(ts, _)| *ts < baseline_cutoff) {
			state.spread_history.pop_front();
		}
		let spread_baseline = if state.spread_history.is_empty() {
			None
		} else {
			let values: Vec<f64> = state.spread_history.iter().map(|(_, s)| *s).collect();
			Some(median(&values))
		};

		let mut trigger_axes = Vec::with_capacity(3);
		if record.ret_1s > self.cfg.speed_ret_1s_threshold {
			trigger_axes.push(CandidateAxis::Speed);
		}
		if record.z_vol_1s > self.cfg.participation_z_vol_threshold {
			trigger_axes.push(CandidateAxis::Participation);
		}
		if let (Some(spread), Some(baseline)) = (record.spread, spread_baseline) {
			if spread < baseline * self.cfg.friction_spread_narrowing_pct {
				trigger_axes.push(CandidateAxis::Friction);
			}
		}

		if let Some(spread) = record.spread {
			state.spread_history.push_back((record.ts, spread));
		}

		if trigger_axes.len() < self.cfg.min_axes_required {
			return CandidateOutcome::None;
		}

		if refractory.is_blocked(&record.symbol, record.ts) {
			let blocked_until_ts = refractory.blocked_until(&record.symbol).unwrap_or(record.ts);
			tracing::debug!(symbol = %record.symbol, ts = record.ts, blocked_until_ts, "candidate rejected by refractory");
			return CandidateOutcome::RefractoryRejected { candidate_ts: record.ts, blocked_until_ts };
		}

		tracing::debug!(symbol = %record.symbol, ts = record.ts, axes = ?trigger_axes, "candidate fired");
		CandidateOutcome::Candidate(CandidateEvent {
			ts: record.ts,
			symbol: record.symbol.clone(),
			score: trigger_axes.len() as f64,
			trigger_axes,
			evidence: CandidateEvidence { ret_1s: record.ret_1s, z_vol_1s: record.z_vol_1s, spread: record.spread },
		})
	}

	pub fn remove(&mut self, symbol: &str) {
		self.symbols.remove(symbol);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(ts: Timestamp, ret_1s: f64, z_vol_1s: f64, spread: Option<f64>) -> FeatureRecord {
		FeatureRecord {
			ts,
			symbol: "005930".to_string(),
			price: 100.0,
			ret_1s,
			accel_1s: 0.0,
			ticks_per_sec: 1,
			vol_1s: 1.0,
			z_vol_1s,
			spread,
			microprice: None,
			microprice_slope: None,
			ret_clamped: false,
		}
	}

	#[test]
	fn two_axes_fire_and_emit_candidate() {
		let mut det = CandidateDetector::new(CandidateConfig::default());
		let refractory = RefractoryManager::new(crate::config::RefractoryConfig::default());
		let outcome = det.evaluate(&record(0, 0.003, 3.0, None), &refractory);
		match outcome {
			CandidateOutcome::Candidate(c) => {
				assert_eq!(c.score, 2.0);
				assert!(c.trigger_axes.contains(&CandidateAxis::Speed));
				assert!(c.trigger_axes.contains(&CandidateAxis::Participation));
			}
			other => panic!("expected candidate, got {other:?}"),
		}
	}

	#[test]
	fn single_axis_below_threshold_never_fires() {
		let mut det = CandidateDetector::new(CandidateConfig::default());
		let refractory = RefractoryManager::new(crate::config::RefractoryConfig::default());
		let outcome = det.evaluate(&record(0, 0.003, 0.0, None), &refractory);
		assert!(matches!(outcome, CandidateOutcome::None));
	}

	#[test]
	fn missing_spread_never_fires_friction_axis() {
		let mut det = CandidateDetector::new(CandidateConfig::default());
		let refractory = RefractoryManager::new(crate::config::RefractoryConfig::default());
		// Seed a spread history then send a record without spread: friction
		// must stay silent even though a baseline exists.
		det.evaluate(&record(0, 0.0, 0.0, Some(0.001)), &refractory);
		let outcome = det.evaluate(&record(1000, 0.003, 3.0, None), &refractory);
		if let CandidateOutcome::Candidate(c) = outcome {
			assert!(!c.trigger_axes.contains(&CandidateAxis::Friction));
		}
	}
}
