//! Per-symbol orchestration of the five components, in the dependency order
//! spec.md §2 pins: Feature Engine -> CPD Gate -> Candidate Detector ->
//! Confirm Detector -> Refractory Manager. Shaped like a `SignalEngine`
//! owning a `HashMap<String, SymbolData>`.

use std::collections::HashMap;

use crate::candidate::{CandidateDetector, CandidateOutcome};
use crate::config::Config;
use crate::confirm::ConfirmDetector;
use crate::cpd::{ChangePointGate, CusumPageHinkleyGate, NullGate};
use crate::error::CoreError;
use crate::features::FeatureEngine;
use crate::refractory::RefractoryManager;
use crate::scorer::{IdentityScorer, StrengthScorer};
use crate::types::{Event, RefractoryRejectedEvent, SymbolId, Tick};

/// Per-symbol tick/event counters backing `--stats` in the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolStats {
	pub ticks: u64,
	pub candidates: u64,
	pub confirmations: u64,
	pub refractory_rejections: u64,
	pub clamped_returns: u64,
}

impl SymbolStats {
	fn merge(&mut self, other: &Self) {
		self.ticks += other.ticks;
		self.candidates += other.candidates;
		self.confirmations += other.confirmations;
		self.refractory_rejections += other.refractory_rejections;
		self.clamped_returns += other.clamped_returns;
	}
}

/// Aggregate and per-symbol counters accumulated over the lifetime of a
/// `Pipeline`, the direct analogue of an `EngineStats` summary.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
	pub per_symbol: HashMap<SymbolId, SymbolStats>,
}

impl PipelineStats {
	#[must_use]
	pub fn aggregate(&self) -> SymbolStats {
		let mut total = SymbolStats::default();
		for s in self.per_symbol.values() {
			total.merge(s);
		}
		total
	}
}

/// The per-symbol onset-detection pipeline. One instance owns all state for
/// every symbol it has seen; configuration is immutable for the instance's
/// lifetime (spec.md §5 shared-resource policy).
pub struct Pipeline {
	feature_engine: FeatureEngine,
	gate: Box<dyn ChangePointGate + Send>,
	candidate_detector: CandidateDetector,
	confirm_detector: ConfirmDetector,
	refractory: RefractoryManager,
	scorer: Box<dyn StrengthScorer + Send>,
	stats: PipelineStats,
}

impl Pipeline {
	/// Builds a pipeline from `config`, refusing construction on the first
	/// invalid field (spec.md §7 `ConfigError`, fatal at startup).
	pub fn new(config: Config) -> Result<Self, CoreError> {
		config.validate()?;
		let gate: Box<dyn ChangePointGate + Send> = if config.cpd.enabled {
			Box::new(CusumPageHinkleyGate::new(config.cpd.clone()))
		} else {
			Box::new(NullGate)
		};
		Ok(Self {
			feature_engine: FeatureEngine::new(&config.features),
			gate,
			candidate_detector: CandidateDetector::new(config.candidate.clone()),
			confirm_detector: ConfirmDetector::new(config.confirm.clone()),
			refractory: RefractoryManager::new(config.refractory.clone()),
			scorer: Box::new(IdentityScorer),
			stats: PipelineStats::default(),
		})
	}

	/// Builds a pipeline with a caller-supplied gate and scorer, bypassing
	/// the `cpd.use`-driven default and the identity post-filter. Used by
	/// embedders that supply their own `ChangePointGate`/`StrengthScorer`
	/// (spec.md §9 "Polymorphism").
	pub fn with_components(
		config: Config,
		gate: Box<dyn ChangePointGate + Send>,
		scorer: Box<dyn StrengthScorer + Send>,
	) -> Result<Self, CoreError> {
		config.validate()?;
		Ok(Self {
			feature_engine: FeatureEngine::new(&config.features),
			gate,
			candidate_detector: CandidateDetector::new(config.candidate.clone()),
			confirm_detector: ConfirmDetector::new(config.confirm.clone()),
			refractory: RefractoryManager::new(config.refractory.clone()),
			scorer,
			stats: PipelineStats::default(),
		})
	}

	/// Pushes one tick through all five components for its symbol, returning
	/// the ordered (possibly empty) list of events produced. At most one
	/// Candidate, one Confirmed, and one RefractoryRejected event per tick
	/// (spec.md §5 ordering guarantees); never a Candidate and a
	/// RefractoryRejected together.
	pub fn push(&mut self, tick: &Tick) -> Result<Vec<Event>, CoreError> {
		let symbol = tick.symbol.clone();
		let record = self.feature_engine.push(tick)?;

		let entry = self.stats.per_symbol.entry(symbol.clone()).or_default();
		entry.ticks += 1;
		if record.ret_clamped {
			entry.clamped_returns += 1;
		}

		if !self.gate.update_and_check(&record) {
			return Ok(Vec::new());
		}

		let mut events = Vec::with_capacity(1);

		if let Some(confirmed) = self.confirm_detector.on_record(&record) {
			if self.scorer.admit(&confirmed) {
				self.refractory.on_confirm(&confirmed.symbol, confirmed.ts);
				self.stats.per_symbol.entry(symbol.clone()).or_default().confirmations += 1;
				events.push(Event::Confirmed(confirmed));
			}
		}

		match self.candidate_detector.evaluate(&record, &self.refractory) {
			CandidateOutcome::Candidate(c) => {
				self.stats.per_symbol.entry(symbol.clone()).or_default().candidates += 1;
				if !self.confirm_detector.accept_candidate(&c) {
					tracing::debug!(symbol = %symbol, ts = c.ts, "candidate not accepted as the open candidate");
				}
				events.push(Event::Candidate(c));
			}
			CandidateOutcome::RefractoryRejected { candidate_ts, blocked_until_ts } => {
				self.refractory.on_reject(&symbol, candidate_ts, blocked_until_ts);
				self.stats.per_symbol.entry(symbol.clone()).or_default().refractory_rejections += 1;
				events.push(Event::RefractoryRejected(RefractoryRejectedEvent {
					ts: record.ts,
					symbol: symbol.clone(),
					candidate_ts,
					blocked_until_ts,
				}));
			}
			CandidateOutcome::None => {}
		}

		Ok(events)
	}

	#[must_use]
	pub fn stats(&self) -> &PipelineStats {
		&self.stats
	}

	/// Drops all per-symbol state at an inter-tick boundary (spec.md §5
	/// cancellation). Stats already accumulated for the symbol are retained.
	pub fn remove(&mut self, symbol: &str) {
		self.feature_engine.remove(symbol);
		self.gate.remove(symbol);
		self.candidate_detector.remove(symbol);
		self.confirm_detector.remove(symbol);
		self.refractory.remove(symbol);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{CandidateConfig, ConfirmConfig, FeatureConfig};

	fn tick(ts: i64, symbol: &str, price: f64, volume: f64, bid1: f64, ask1: f64) -> Tick {
		Tick { ts, symbol: symbol.to_string(), price, volume, bid1, ask1, bid_qty1: 100.0, ask_qty1: 100.0 }
	}

	fn fast_config() -> Config {
		Config {
			features: FeatureConfig { vol_window_s: 5 },
			candidate: CandidateConfig { friction_baseline_window_s: 5, ..CandidateConfig::default() },
			confirm: ConfirmConfig {
				window_s: 5,
				pre_window_s: 2,
				persistent_n: 3,
				onset_strength_min: 0.5,
				..ConfirmConfig::default()
			},
			..Config::default()
		}
	}

	#[test]
	fn baseline_ticks_never_emit_events() {
		let mut pipeline = Pipeline::new(fast_config()).unwrap();
		for s in 0..20 {
			let events = pipeline.push(&tick(s * 200, "005930", 100.0, 1.0, 99.95, 100.05)).unwrap();
			assert!(events.is_empty());
		}
	}

	#[test]
	fn bad_tick_propagates_as_error_without_crashing_pipeline() {
		let mut pipeline = Pipeline::new(fast_config()).unwrap();
		pipeline.push(&tick(0, "005930", 100.0, 1.0, 99.95, 100.05)).unwrap();
		let err = pipeline.push(&tick(-1, "005930", 100.0, 1.0, 99.95, 100.05));
		assert!(err.is_err());
		// Pipeline keeps working for subsequent valid ticks.
		let ok = pipeline.push(&tick(200, "005930", 100.0, 1.0, 99.95, 100.05));
		assert!(ok.is_ok());
	}

	#[test]
	fn invalid_config_refuses_construction() {
		let mut cfg = fast_config();
		cfg.confirm.persistent_n = 0;
		assert!(Pipeline::new(cfg).is_err());
	}

	#[test]
	fn two_symbols_keep_disjoint_stats() {
		let mut pipeline = Pipeline::new(fast_config()).unwrap();
		pipeline.push(&tick(0, "005930", 100.0, 1.0, 99.95, 100.05)).unwrap();
		pipeline.push(&tick(0, "000660", 50.0, 1.0, 49.95, 50.05)).unwrap();
		let stats = pipeline.stats();
		assert_eq!(stats.per_symbol.get("005930").unwrap().ticks, 1);
		assert_eq!(stats.per_symbol.get("000660").unwrap().ticks, 1);
	}
}
