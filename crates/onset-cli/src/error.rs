//! Exit-code taxonomy for the batch entry point (spec.md §6/§7): 0 clean, 2
//! configuration error, 3 malformed input.

use std::process::ExitCode;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("configuration error: {0}")]
	Config(String),

	#[error("malformed input at line {line}: {reason}")]
	MalformedInput { line: usize, reason: String },

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl From<onset_core::CoreError> for CliError {
	fn from(err: onset_core::CoreError) -> Self {
		match err {
			onset_core::CoreError::Config(reason) => Self::Config(reason),
			// BadInputTick is recovered inside the pipeline and never surfaces
			// as a CLI-level error; this arm only exists for exhaustiveness
			// against crate-internal callers that don't already filter it.
			other @ onset_core::CoreError::BadInputTick { .. } => Self::Other(anyhow::anyhow!(other)),
		}
	}
}

impl CliError {
	#[must_use]
	pub fn exit_code(&self) -> ExitCode {
		match self {
			Self::Config(_) => ExitCode::from(2),
			Self::MalformedInput { .. } => ExitCode::from(3),
			Self::Other(_) => ExitCode::FAILURE,
		}
	}
}
