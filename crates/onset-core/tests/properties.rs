//! Property-based checks against the universal invariants (SPEC_FULL.md §11 /
//! original spec.md §8): non-decreasing per-symbol event timestamps,
//! no-leakage under a random prefix cut, idempotent replay, and disjoint
//! per-symbol state under interleaving.

use proptest::prelude::*;

use onset_core::config::{CandidateConfig, Config, ConfirmConfig, FeatureConfig};
use onset_core::{Event, Pipeline, Tick};

fn fast_config() -> Config {
	Config {
		features: FeatureConfig { vol_window_s: 5 },
		candidate: CandidateConfig { friction_baseline_window_s: 5, ..CandidateConfig::default() },
		confirm: ConfirmConfig {
			window_s: 5,
			pre_window_s: 2,
			persistent_n: 6,
			onset_strength_min: 0.5,
			..ConfirmConfig::default()
		},
		..Config::default()
	}
}

/// A single symbol's random-walk tick path: strictly legal per-symbol input
/// (non-decreasing `ts`, positive price, non-negative volume/book fields).
fn tick_path(symbol: &'static str, start_ts: i64) -> impl Strategy<Value = Vec<Tick>> {
	proptest::collection::vec((1_i64..=400, -0.01_f64..0.01, 0.0_f64..10.0, 0.0_f64..50.0, 0.0_f64..50.0), 20..120).prop_map(
		move |steps| {
			let mut ts = start_ts;
			let mut price = 100.0_f64;
			let mut out = Vec::with_capacity(steps.len());
			for (dt, ret, volume, bid_qty1, ask_qty1) in steps {
				ts += dt;
				price = (price * (1.0 + ret)).max(0.01);
				let half_spread = 0.05;
				out.push(Tick {
					ts,
					symbol: symbol.to_string(),
					price,
					volume,
					bid1: price - half_spread,
					ask1: price + half_spread,
					bid_qty1,
					ask_qty1,
				});
			}
			out
		},
	)
}

fn run(ticks: &[Tick]) -> Vec<Event> {
	let mut pipeline = Pipeline::new(fast_config()).unwrap();
	let mut events = Vec::new();
	for t in ticks {
		events.extend(pipeline.push(t).unwrap());
	}
	events
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(64))]

	/// Invariant 1: emitted event `ts` values are non-decreasing per symbol.
	#[test]
	fn events_are_non_decreasing_per_symbol(ticks in tick_path("005930", 0)) {
		let events = run(&ticks);
		let mut last_ts = i64::MIN;
		for e in &events {
			prop_assert!(e.ts() >= last_ts, "event ts regressed: {} < {last_ts}", e.ts());
			last_ts = e.ts();
		}
	}

	/// Invariant 7: running the same input twice yields an identical event stream.
	#[test]
	fn replay_is_idempotent(ticks in tick_path("005930", 0)) {
		let a = run(&ticks);
		let b = run(&ticks);
		prop_assert_eq!(a.len(), b.len());
		for (x, y) in a.iter().zip(b.iter()) {
			prop_assert_eq!(serde_json::to_string(x).unwrap(), serde_json::to_string(y).unwrap());
		}
	}

	/// Invariant 6 (no-leakage): cutting the stream at any prefix length and
	/// restarting fresh on that prefix reproduces every event the full run
	/// emitted at or before the cut's last tick, unchanged.
	#[test]
	fn prefix_replay_matches_original_up_to_the_cut(
		ticks in tick_path("005930", 0),
		cut_frac in 0.0_f64..1.0,
	) {
		let full = run(&ticks);
		let cut_idx = ((ticks.len() as f64) * cut_frac) as usize;
		let cut_idx = cut_idx.clamp(1, ticks.len());
		let prefix = &ticks[..cut_idx];
		let cut_ts = prefix.last().unwrap().ts;

		let prefix_events = run(prefix);
		let full_events_up_to_cut: Vec<&Event> = full.iter().filter(|e| e.ts() <= cut_ts).collect();

		prop_assert_eq!(prefix_events.len(), full_events_up_to_cut.len());
		for (x, y) in prefix_events.iter().zip(full_events_up_to_cut.iter()) {
			prop_assert_eq!(serde_json::to_string(x).unwrap(), serde_json::to_string(*y).unwrap());
		}
	}

	/// Invariant 8 (disjoint per-symbol state): interleaving two symbols'
	/// legal tick sequences in any order yields the same per-symbol event
	/// sequence as processing each symbol in isolation.
	#[test]
	fn interleaving_two_symbols_preserves_each_symbols_event_sequence(
		a_ticks in tick_path("005930", 0),
		b_ticks in tick_path("000660", 0),
		seed in any::<u64>(),
	) {
		let isolated_a: Vec<Event> = run(&a_ticks).into_iter().filter(|e| e.symbol() == "005930").collect();
		let isolated_b: Vec<Event> = run(&b_ticks).into_iter().filter(|e| e.symbol() == "000660").collect();

		// Deterministic interleave driven by `seed`, preserving each symbol's
		// own relative order (only the two symbols' ticks are shuffled against
		// each other, never within themselves).
		let mut interleaved = Vec::with_capacity(a_ticks.len() + b_ticks.len());
		let (mut i, mut j) = (0usize, 0usize);
		let mut rng_state = seed.max(1);
		while i < a_ticks.len() || j < b_ticks.len() {
			rng_state ^= rng_state << 13;
			rng_state ^= rng_state >> 7;
			rng_state ^= rng_state << 17;
			let take_a = if i >= a_ticks.len() {
				false
			} else if j >= b_ticks.len() {
				true
			} else {
				rng_state % 2 == 0
			};
			if take_a {
				interleaved.push(a_ticks[i].clone());
				i += 1;
			} else {
				interleaved.push(b_ticks[j].clone());
				j += 1;
			}
		}

		let mut pipeline = Pipeline::new(fast_config()).unwrap();
		let mut events = Vec::new();
		for t in &interleaved {
			events.extend(pipeline.push(t).unwrap());
		}

		let combined_a: Vec<&Event> = events.iter().filter(|e| e.symbol() == "005930").collect();
		let combined_b: Vec<&Event> = events.iter().filter(|e| e.symbol() == "000660").collect();

		prop_assert_eq!(combined_a.len(), isolated_a.len());
		for (x, y) in combined_a.iter().zip(isolated_a.iter()) {
			prop_assert_eq!(serde_json::to_string(x).unwrap(), serde_json::to_string(y).unwrap());
		}
		prop_assert_eq!(combined_b.len(), isolated_b.len());
		for (x, y) in combined_b.iter().zip(isolated_b.iter()) {
			prop_assert_eq!(serde_json::to_string(x).unwrap(), serde_json::to_string(y).unwrap());
		}
	}
}
