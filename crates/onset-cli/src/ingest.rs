//! Tick ingestion from CSV or line-JSON (spec.md §6: "the core is agnostic to
//! transport"). Both formats decode directly into [`onset_core::Tick`] via
//! `serde`; unrecognized extra columns/fields are ignored, matching spec.md
//! §3's "Additional columns may be present but the core reads only these."

use std::io::{BufRead, Read};

use onset_core::Tick;

use crate::cli::Format;
use crate::error::CliError;

/// Reads every tick from `reader` in `format`, calling `on_tick` for each one
/// in file order. Stops at the first malformed line/record, returning a
/// `CliError::MalformedInput` carrying its 1-based line number.
pub fn for_each_tick(
	reader: impl Read,
	format: Format,
	mut on_tick: impl FnMut(Tick) -> Result<(), CliError>,
) -> Result<(), CliError> {
	match format {
		Format::Csv => for_each_csv_tick(reader, on_tick),
		Format::Jsonl => {
			let buffered = std::io::BufReader::new(reader);
			for (idx, line) in buffered.lines().enumerate() {
				let line = line.map_err(|e| CliError::MalformedInput { line: idx + 1, reason: e.to_string() })?;
				if line.trim().is_empty() {
					continue;
				}
				let tick: Tick = serde_json::from_str(&line)
					.map_err(|e| CliError::MalformedInput { line: idx + 1, reason: e.to_string() })?;
				on_tick(tick)?;
			}
			Ok(())
		}
	}
}

fn for_each_csv_tick(reader: impl Read, mut on_tick: impl FnMut(Tick) -> Result<(), CliError>) -> Result<(), CliError> {
	let mut csv_reader = csv::ReaderBuilder::new().has_headers(true).flexible(true).from_reader(reader);
	for record in csv_reader.deserialize::<Tick>() {
		let tick = record.map_err(|e| CliError::MalformedInput {
			line: e.position().map_or(0, |p| p.line() as usize),
			reason: e.to_string(),
		})?;
		on_tick(tick)?;
	}
	Ok(())
}

/// Reads a single tick from one line of stdin in `--stream` mode. Returns
/// `Ok(None)` on a blank line (never a legal tick) or EOF.
pub fn parse_stream_line(line: &str, format: Format) -> Result<Option<Tick>, String> {
	if line.trim().is_empty() {
		return Ok(None);
	}
	match format {
		Format::Jsonl => serde_json::from_str(line).map(Some).map_err(|e| e.to_string()),
		Format::Csv => {
			let mut csv_reader = csv::ReaderBuilder::new().has_headers(false).from_reader(line.as_bytes());
			let mut iter = csv_reader.deserialize::<Tick>();
			match iter.next() {
				Some(Ok(tick)) => Ok(Some(tick)),
				Some(Err(e)) => Err(e.to_string()),
				None => Ok(None),
			}
		}
	}
}
