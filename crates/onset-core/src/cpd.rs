//! Optional change-point pre-filter. `ChangePointGate` is a strategy capability
//! selected at pipeline construction, the same way an `Exchange` trait object
//! is selected once and boxed for the life of a connection.

use std::collections::HashMap;

use crate::config::CpdConfig;
use crate::types::{FeatureRecord, SymbolId, Timestamp};

/// A per-symbol online pre-filter. `update_and_check` returns whether the
/// current record should be visible to the candidate/confirm stages.
pub trait ChangePointGate {
	fn update_and_check(&mut self, record: &FeatureRecord) -> bool;
	fn remove(&mut self, symbol: &str);
}

/// No-op gate used when `cpd.use = false`: every record passes.
#[derive(Debug, Default)]
pub struct NullGate;

impl ChangePointGate for NullGate {
	fn update_and_check(&mut self, _record: &FeatureRecord) -> bool {
		true
	}

	fn remove(&mut self, _symbol: &str) {}
}

#[derive(Debug, Default)]
struct CpdSymbolState {
	first_ts: Option<Timestamp>,
	count: u64,
	mean_ret: f64,
	m2_ret: f64,
	s_pos: f64,
	ph_count: u64,
	ph_mean: f64,
	ph_m: f64,
	ph_big_m: f64,
	last_trigger_ts: Option<Timestamp>,
}

/// CUSUM on `ret_1s` (price axis) plus Page-Hinkley on `z_vol_1s` (volume
/// axis), sharing one per-symbol cooldown. See spec.md §4.2.
#[derive(Debug)]
pub struct CusumPageHinkleyGate {
	cfg: CpdConfig,
	symbols: HashMap<SymbolId, CpdSymbolState>,
}

impl CusumPageHinkleyGate {
	#[must_use]
	pub fn new(cfg: CpdConfig) -> Self {
		Self { cfg, symbols: HashMap::new() }
	}
}

impl ChangePointGate for CusumPageHinkleyGate {
	fn update_and_check(&mut self, record: &FeatureRecord) -> bool {
		let state = self.symbols.entry(record.symbol.clone()).or_default();
		let ts = record.ts;
		let first_ts = *state.first_ts.get_or_insert(ts);
		let warming_up = ts - first_ts < self.cfg.price.min_pre_s as i64 * 1000;

		// Baselines update unconditionally, including during warmup and cooldown.
		state.count += 1;
		let delta = record.ret_1s - state.mean_ret;
		state.mean_ret += delta / state.count as f64;
		let delta2 = record.ret_1s - state.mean_ret;
		state.m2_ret += delta * delta2;

		state.ph_count += 1;
		state.ph_mean += (record.z_vol_1s - state.ph_mean) / state.ph_count as f64;

		if warming_up {
			return false;
		}

		let in_cooldown = state.last_trigger_ts.is_some_and(|t| ts - t < (self.cfg.cooldown_s * 1000.0) as i64);
		if in_cooldown {
			return false;
		}

		let sigma = (state.m2_ret / state.count as f64).sqrt();
		let k = self.cfg.price.k_sigma * sigma;
		let price_trigger = if sigma > 0.0 {
			state.s_pos = (state.s_pos + (record.ret_1s - state.mean_ret) / sigma - k).max(0.0);
			let threshold = self.cfg.price.h_mult * k.max(1.0);
			let triggered = state.s_pos > threshold;
			if triggered {
				state.s_pos = 0.0;
			}
			triggered
		} else {
			false
		};

		state.ph_m += record.z_vol_1s - state.ph_mean - self.cfg.volume.delta;
		state.ph_big_m = state.ph_big_m.max(state.ph_m);
		let vol_trigger = state.ph_big_m - state.ph_m > self.cfg.volume.lambda;
		if vol_trigger {
			state.ph_m = 0.0;
			state.ph_big_m = 0.0;
		}

		let fired = price_trigger || vol_trigger;
		if fired {
			state.last_trigger_ts = Some(ts);
			tracing::debug!(
				symbol = %record.symbol, ts, price_trigger, vol_trigger, s_pos = state.s_pos,
				"cpd gate triggered"
			);
		}
		fired
	}

	fn remove(&mut self, symbol: &str) {
		self.symbols.remove(symbol);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(ts: Timestamp, ret_1s: f64, z_vol_1s: f64) -> FeatureRecord {
		FeatureRecord {
			ts,
			symbol: "005930".to_string(),
			price: 100.0,
			ret_1s,
			accel_1s: 0.0,
			ticks_per_sec: 1,
			vol_1s: 1.0,
			z_vol_1s,
			spread: None,
			microprice: None,
			microprice_slope: None,
			ret_clamped: false,
		}
	}

	#[test]
	fn null_gate_always_passes() {
		let mut gate = NullGate;
		assert!(gate.update_and_check(&record(0, 0.5, 5.0)));
	}

	#[test]
	fn warmup_never_triggers() {
		let mut gate = CusumPageHinkleyGate::new(CpdConfig { enabled: true, ..CpdConfig::default() });
		for s in 0..9 {
			assert!(!gate.update_and_check(&record(s * 1000, 0.05, 0.1)));
		}
	}

	#[test]
	fn large_sustained_return_triggers_after_warmup() {
		let mut cfg = CpdConfig { enabled: true, ..CpdConfig::default() };
		cfg.price.min_pre_s = 2;
		let mut gate = CusumPageHinkleyGate::new(cfg);
		for s in 0..2 {
			gate.update_and_check(&record(s * 1000, 0.0005, 0.0));
		}
		let mut fired = false;
		for s in 2..30 {
			if gate.update_and_check(&record(s * 1000, 0.05, 0.0)) {
				fired = true;
				break;
			}
		}
		assert!(fired);
	}
}
