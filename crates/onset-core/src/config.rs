use serde::Deserialize;

use crate::error::CoreError;

/// Top-level configuration tree, one immutable value injected at
/// `Pipeline::new` construction time — swapping configuration means tearing
/// down and rebuilding the pipeline (spec.md §5, no live reconfiguration).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
	pub features: FeatureConfig,
	pub cpd: CpdConfig,
	pub candidate: CandidateConfig,
	pub confirm: ConfirmConfig,
	pub refractory: RefractoryConfig,
}

/// `features.vol_window` — volume z-score baseline seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
	pub vol_window_s: u64,
}

impl Default for FeatureConfig {
	fn default() -> Self {
		Self { vol_window_s: 300 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CpdPriceConfig {
	pub k_sigma: f64,
	pub h_mult: f64,
	pub min_pre_s: u64,
}

impl Default for CpdPriceConfig {
	fn default() -> Self {
		Self { k_sigma: 0.7, h_mult: 6.0, min_pre_s: 10 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CpdVolumeConfig {
	pub delta: f64,
	pub lambda: f64,
}

impl Default for CpdVolumeConfig {
	fn default() -> Self {
		Self { delta: 0.05, lambda: 6.0 }
	}
}

/// `cpd.use`, `cpd.price.*`, `cpd.volume.*`, `cpd.cooldown_s`. Default off —
/// when `enabled` is false the gate is a no-op (`NullGate`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CpdConfig {
	#[serde(rename = "use")]
	pub enabled: bool,
	pub price: CpdPriceConfig,
	pub volume: CpdVolumeConfig,
	pub cooldown_s: f64,
}

impl Default for CpdConfig {
	fn default() -> Self {
		Self { enabled: false, price: CpdPriceConfig::default(), volume: CpdVolumeConfig::default(), cooldown_s: 3.0 }
	}
}

/// `detection.min_axes_required`, `onset.speed/participation/friction.*`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CandidateConfig {
	pub min_axes_required: usize,
	pub speed_ret_1s_threshold: f64,
	pub participation_z_vol_threshold: f64,
	pub friction_spread_narrowing_pct: f64,
	pub friction_baseline_window_s: u64,
}

impl Default for CandidateConfig {
	fn default() -> Self {
		Self {
			min_axes_required: 2,
			speed_ret_1s_threshold: 0.002,
			participation_z_vol_threshold: 2.5,
			friction_spread_narrowing_pct: 0.6,
			friction_baseline_window_s: 60,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfirmDeltaConfig {
	pub ret_min: f64,
	pub zvol_min: f64,
	pub spread_drop: f64,
}

impl Default for ConfirmDeltaConfig {
	fn default() -> Self {
		Self { ret_min: 0.0001, zvol_min: 0.1, spread_drop: 0.0001 }
	}
}

/// `confirm.*` — see spec.md §4.4 and §6 for the effect of each field.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfirmConfig {
	pub window_s: u64,
	pub pre_window_s: u64,
	pub persistent_n: usize,
	pub min_axes: usize,
	pub require_price_axis: bool,
	pub exclude_cand_point: bool,
	pub delta: ConfirmDeltaConfig,
	pub onset_strength_min: f64,
}

impl Default for ConfirmConfig {
	fn default() -> Self {
		Self {
			window_s: 12,
			pre_window_s: 5,
			persistent_n: 22,
			min_axes: 2,
			require_price_axis: true,
			exclude_cand_point: true,
			delta: ConfirmDeltaConfig::default(),
			onset_strength_min: 0.67,
		}
	}
}

/// `refractory.duration_s`, `refractory.extend_on_confirm`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefractoryConfig {
	pub duration_s: u64,
	pub extend_on_confirm: bool,
}

impl Default for RefractoryConfig {
	fn default() -> Self {
		Self { duration_s: 45, extend_on_confirm: true }
	}
}

impl Config {
	/// Validates the configuration, refusing to construct a pipeline on the
	/// first violated invariant (spec.md §7, `ConfigError` is fatal at
	/// construction time, never recovered from).
	pub fn validate(&self) -> Result<(), CoreError> {
		if self.features.vol_window_s == 0 {
			return Err(CoreError::Config("features.vol_window_s must be positive".into()));
		}

		if self.cpd.price.min_pre_s == 0 {
			return Err(CoreError::Config("cpd.price.min_pre_s must be positive".into()));
		}
		if self.cpd.cooldown_s < 0.0 {
			return Err(CoreError::Config("cpd.cooldown_s must be non-negative".into()));
		}

		if self.candidate.min_axes_required == 0 || self.candidate.min_axes_required > 3 {
			return Err(CoreError::Config("detection.min_axes_required must be in 1..=3".into()));
		}
		if self.candidate.friction_baseline_window_s == 0 {
			return Err(CoreError::Config("onset.friction.baseline_window_s must be positive".into()));
		}

		if self.confirm.window_s == 0 {
			return Err(CoreError::Config("confirm.window_s must be positive".into()));
		}
		if self.confirm.pre_window_s == 0 {
			return Err(CoreError::Config("confirm.pre_window_s must be positive".into()));
		}
		if self.confirm.persistent_n == 0 {
			return Err(CoreError::Config("confirm.persistent_n must be positive".into()));
		}
		if self.confirm.min_axes == 0 || self.confirm.min_axes > 3 {
			return Err(CoreError::Config("confirm.min_axes must be in 1..=3".into()));
		}
		if !(0.0..=1.0).contains(&self.confirm.onset_strength_min) {
			return Err(CoreError::Config("confirm.onset_strength_min must be in 0.0..=1.0".into()));
		}

		if self.refractory.duration_s == 0 {
			return Err(CoreError::Config("refractory.duration_s must be positive".into()));
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_valid() {
		assert!(Config::default().validate().is_ok());
	}

	#[test]
	fn zero_persistent_n_is_rejected() {
		let mut cfg = Config::default();
		cfg.confirm.persistent_n = 0;
		assert!(cfg.validate().is_err());
	}

	#[test]
	fn out_of_range_onset_strength_min_is_rejected() {
		let mut cfg = Config::default();
		cfg.confirm.onset_strength_min = 1.5;
		assert!(cfg.validate().is_err());
	}

	#[test]
	fn deserializes_from_json_with_partial_overrides() {
		// onset-cli's loader feeds this same Deserialize impl from TOML; the
		// shape (missing fields fall back to Default) is what matters here.
		let json_src = serde_json::json!({ "confirm": { "persistent_n": 10 } });
		let cfg: Config = serde_json::from_value(json_src).unwrap();
		assert_eq!(cfg.confirm.persistent_n, 10);
		assert_eq!(cfg.confirm.window_s, 12);
	}
}
