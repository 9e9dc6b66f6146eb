//! Streaming feature computation, no look-ahead. Ring-buffer + bucket
//! bookkeeping in the same style as a rolling EMA accumulator, generalized to
//! the handful of derived fields the onset detector needs.

use std::collections::{HashMap, VecDeque};

use crate::config::FeatureConfig;
use crate::error::CoreError;
use crate::math::{mean, population_stdev};
use crate::types::{FeatureRecord, SymbolId, Tick, Timestamp};

const ONE_SECOND_MS: i64 = 1000;
const RET_CLAMP: f64 = 0.1;

#[derive(Debug, Default)]
struct SymbolFeatureState {
	last_ts: Option<Timestamp>,
	/// Trailing ~1s of `(ts, price)`, pruned to keep exactly one sample at or
	/// before the 1s cutoff plus everything inside the window.
	price_history: VecDeque<(Timestamp, f64)>,
	last_ret_1s: f64,
	current_bucket_second: Option<i64>,
	current_bucket_ticks: u32,
	current_bucket_volume: f64,
	/// Closed-second volume totals, capped to `vol_window_s` entries.
	vol_history: VecDeque<f64>,
	last_microprice: Option<f64>,
	clamped_returns: u64,
}

/// Converts raw ticks into [`FeatureRecord`]s using only information
/// available at or before the current tick's `ts` (spec: no-leakage).
#[derive(Debug)]
pub struct FeatureEngine {
	vol_window_s: u64,
	symbols: HashMap<SymbolId, SymbolFeatureState>,
}

impl FeatureEngine {
	#[must_use]
	pub fn new(cfg: &FeatureConfig) -> Self {
		Self { vol_window_s: cfg.vol_window_s, symbols: HashMap::new() }
	}

	/// Advances per-symbol state by one tick and returns the derived feature
	/// record. Rejects the tick (without mutating any state) when it violates
	/// the input contract: non-finite/non-positive price, non-finite/negative
	/// volume, non-finite book fields, or a `ts` regression for the symbol.
	pub fn push(&mut self, tick: &Tick) -> Result<FeatureRecord, CoreError> {
		let state = self.symbols.entry(tick.symbol.clone()).or_default();

		if let Some(reason) = validate(tick, state.last_ts) {
			tracing::warn!(symbol = %tick.symbol, ts = tick.ts, price = tick.price, reason = %reason, "rejecting bad input tick");
			return Err(CoreError::BadInputTick { symbol: tick.symbol.clone(), ts: tick.ts, reason });
		}

		let span = tracing::debug_span!("feature_engine", symbol = %tick.symbol, ts = tick.ts);
		let _enter = span.enter();

		let cutoff = tick.ts - ONE_SECOND_MS;
		while state.price_history.len() > 1 && state.price_history[1].0 <= cutoff {
			state.price_history.pop_front();
		}

		let prior_price = state
			.price_history
			.iter()
			.rev()
			.find(|(ts, _)| *ts <= cutoff)
			.or_else(|| state.price_history.front())
			.map(|(_, p)| *p);

		let mut ret_clamped = false;
		let raw_ret = match prior_price {
			Some(p) if p > 0.0 => (tick.price / p).ln(),
			_ => 0.0,
		};
		let ret_1s = if raw_ret > RET_CLAMP || raw_ret < -RET_CLAMP {
			ret_clamped = true;
			state.clamped_returns = state.clamped_returns.saturating_add(1);
			raw_ret.clamp(-RET_CLAMP, RET_CLAMP)
		} else {
			raw_ret
		};
		let accel_1s = ret_1s - state.last_ret_1s;
		state.last_ret_1s = ret_1s;
		state.price_history.push_back((tick.ts, tick.price));

		let bucket_key = tick.ts / ONE_SECOND_MS;
		match state.current_bucket_second {
			Some(cur) if cur == bucket_key => {
				state.current_bucket_ticks += 1;
				state.current_bucket_volume += tick.volume;
			}
			Some(_) => {
				close_bucket(state, self.vol_window_s);
				state.current_bucket_second = Some(bucket_key);
				state.current_bucket_ticks = 1;
				state.current_bucket_volume = tick.volume;
			}
			None => {
				state.current_bucket_second = Some(bucket_key);
				state.current_bucket_ticks = 1;
				state.current_bucket_volume = tick.volume;
			}
		}

		let ticks_per_sec = state.current_bucket_ticks;
		let vol_1s = state.current_bucket_volume;
		let z_vol_1s = if (state.vol_history.len() as u64) < self.vol_window_s {
			0.0
		} else {
			let samples: Vec<f64> = state.vol_history.iter().copied().collect();
			let m = mean(&samples);
			let sd = population_stdev(&samples);
			if sd == 0.0 { 0.0 } else { (vol_1s - m) / sd }
		};

		let spread = if tick.bid1 > 0.0 && tick.ask1 > 0.0 {
			let mid = (tick.ask1 + tick.bid1) / 2.0;
			Some((tick.ask1 - tick.bid1) / mid)
		} else {
			None
		};

		let qty_sum = tick.ask_qty1 + tick.bid_qty1;
		let microprice =
			if qty_sum > 0.0 { Some((tick.bid1 * tick.ask_qty1 + tick.ask1 * tick.bid_qty1) / qty_sum) } else { None };
		let microprice_slope = match (microprice, state.last_microprice) {
			(Some(cur), Some(prev)) => Some(cur - prev),
			_ => None,
		};
		state.last_microprice = microprice;
		state.last_ts = Some(tick.ts);

		if ret_clamped {
			tracing::debug!(symbol = %tick.symbol, ts = tick.ts, raw_ret, "clamped ret_1s");
		}

		Ok(FeatureRecord {
			ts: tick.ts,
			symbol: tick.symbol.clone(),
			price: tick.price,
			ret_1s,
			accel_1s,
			ticks_per_sec,
			vol_1s,
			z_vol_1s,
			spread,
			microprice,
			microprice_slope,
			ret_clamped,
		})
	}

	/// Count of `ret_1s` values clamped to +-0.1 for this symbol so far.
	#[must_use]
	pub fn clamped_returns(&self, symbol: &str) -> u64 {
		self.symbols.get(symbol).map_or(0, |s| s.clamped_returns)
	}

	pub fn remove(&mut self, symbol: &str) {
		self.symbols.remove(symbol);
	}
}

fn close_bucket(state: &mut SymbolFeatureState, vol_window_s: u64) {
	state.vol_history.push_back(state.current_bucket_volume);
	while (state.vol_history.len() as u64) > vol_window_s {
		state.vol_history.pop_front();
	}
}

fn validate(tick: &Tick, last_ts: Option<Timestamp>) -> Option<String> {
	if let Some(prev) = last_ts {
		if tick.ts < prev {
			return Some(format!("ts regression: {} < {prev}", tick.ts));
		}
	}
	if !tick.price.is_finite() || tick.price <= 0.0 {
		return Some(format!("non-positive or non-finite price: {}", tick.price));
	}
	if !tick.volume.is_finite() || tick.volume < 0.0 {
		return Some(format!("negative or non-finite volume: {}", tick.volume));
	}
	for (name, v) in [("bid1", tick.bid1), ("ask1", tick.ask1), ("bid_qty1", tick.bid_qty1), ("ask_qty1", tick.ask_qty1)]
	{
		if !v.is_finite() || v < 0.0 {
			return Some(format!("negative or non-finite {name}: {v}"));
		}
	}
	None
}
