//! TOML configuration loading: read the file, parse, then validate — any
//! failure is fatal and surfaces as a configuration error (spec.md §7).

use std::path::Path;

use onset_core::Config;

use crate::error::CliError;

pub fn load(path: Option<&Path>) -> Result<Config, CliError> {
	let Some(path) = path else {
		return Ok(Config::default());
	};

	let content = std::fs::read_to_string(path)
		.map_err(|e| CliError::Config(format!("failed to read {}: {e}", path.display())))?;

	let config: Config =
		toml::from_str(&content).map_err(|e| CliError::Config(format!("failed to parse {}: {e}", path.display())))?;

	config.validate()?;
	Ok(config)
}
