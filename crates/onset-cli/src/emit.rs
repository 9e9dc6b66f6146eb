//! Event emission as line-JSON to stdout (spec.md §6). One JSON object per
//! line, tagged by `event_type`.

use onset_core::Event;

/// Writes `event` to `out` as one JSON line, unless it's a non-`Confirmed`
/// event and `verbose` is false — batch consumers usually only want the
/// confirmed onsets; `--verbose` surfaces the intermediate candidate/
/// refractory-rejected diagnostics too.
pub fn write_event(out: &mut impl std::io::Write, event: &Event, verbose: bool) -> std::io::Result<()> {
	if !verbose && !matches!(event, Event::Confirmed(_)) {
		return Ok(());
	}
	let line = serde_json::to_string(event).unwrap_or_else(|e| format!(r#"{{"event_type":"serialize_error","reason":"{e}"}}"#));
	writeln!(out, "{line}")
}
