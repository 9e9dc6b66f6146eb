//! Argument surface for the batch/stream entry point (spec.md §6 "CLI surface").

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Detects the onset of a price surge in a Korean equity tick stream.
///
/// Reads a tick sequence (CSV or line-JSON) in batch, or tick-by-tick from
/// stdin with `--stream`, and writes confirmed-onset events as line-JSON to
/// stdout. Replaying the same tick sequence in either mode produces an
/// identical event stream.
#[derive(Parser, Debug)]
#[command(name = "onset-cli", author, version, about)]
pub struct Args {
	/// Path to the tick input (CSV or line-JSON). Use "-" for stdin. Ignored
	/// when `--stream` is set, where ticks always come from stdin.
	pub input: Option<String>,

	/// Path to a TOML configuration file. Omit to run with tuned defaults.
	#[arg(long)]
	pub config: Option<PathBuf>,

	/// Switch to tick-by-tick stdin mode instead of reading a batch input.
	#[arg(long)]
	pub stream: bool,

	/// Emit a summary of event counts by type to stderr on completion.
	#[arg(long)]
	pub stats: bool,

	/// Input format. Required for stdin; inferred from the input path's
	/// extension otherwise (`.csv` vs `.json`/`.jsonl`/`.ndjson`).
	#[arg(long, value_enum)]
	pub format: Option<Format>,

	/// Also emit `onset_candidate` and `onset_rejected_refractory` events, not
	/// just `onset_confirmed`.
	#[arg(short, long)]
	pub verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
	Csv,
	Jsonl,
}

impl Format {
	/// Infers a format from a path's extension. Returns `None` for stdin
	/// (`-`) or an unrecognized extension — the caller must fall back to
	/// `--format` in that case.
	#[must_use]
	pub fn infer(path: &str) -> Option<Self> {
		if path == "-" {
			return None;
		}
		let ext = std::path::Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
		match ext.as_str() {
			"csv" => Some(Self::Csv),
			"json" | "jsonl" | "ndjson" => Some(Self::Jsonl),
			_ => None,
		}
	}
}
