//! Batch/stream entry point for the onset-detection pipeline (spec.md §6).
//! A thin external collaborator: config loading, tick ingestion, event
//! emission. All detection semantics live in `onset-core`.

mod cli;
mod config_loader;
mod emit;
mod error;
mod ingest;

use std::io::{self, Read, Write};
use std::process::ExitCode;

use clap::Parser;
use onset_core::Pipeline;
use tokio::io::AsyncBufReadExt;
use tracing::{info, warn};

use cli::{Args, Format};
use error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.init();

	match run(Args::parse()).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			eprintln!("{e}");
			e.exit_code()
		}
	}
}

async fn run(args: Args) -> Result<(), CliError> {
	let config = config_loader::load(args.config.as_deref())?;
	let mut pipeline = Pipeline::new(config)?;
	info!("onset-cli starting, stream={} verbose={}", args.stream, args.verbose);

	let stdout = io::stdout();
	let mut out = stdout.lock();

	if args.stream {
		run_stream(&mut pipeline, &mut out, &args).await?;
	} else {
		run_batch(&mut pipeline, &mut out, &args)?;
	}

	if args.stats {
		print_stats(&pipeline);
	}

	Ok(())
}

fn run_batch(pipeline: &mut Pipeline, out: &mut impl Write, args: &Args) -> Result<(), CliError> {
	let input = args.input.as_deref().unwrap_or("-");
	let format = args
		.format
		.or_else(|| Format::infer(input))
		.ok_or_else(|| CliError::Other(anyhow::anyhow!("cannot infer input format for {input:?}; pass --format")))?;

	let reader: Box<dyn Read> =
		if input == "-" { Box::new(io::stdin()) } else { Box::new(std::fs::File::open(input).map_err(anyhow::Error::from)?) };

	ingest::for_each_tick(reader, format, |tick| {
		handle_tick(pipeline, &tick, out, args.verbose);
		Ok(())
	})
}

async fn run_stream(pipeline: &mut Pipeline, out: &mut impl Write, args: &Args) -> Result<(), CliError> {
	let format = args.format.unwrap_or(Format::Jsonl);
	let stdin = tokio::io::stdin();
	let mut lines = tokio::io::BufReader::new(stdin).lines();

	while let Some(line) = lines.next_line().await.map_err(anyhow::Error::from)? {
		match ingest::parse_stream_line(&line, format) {
			Ok(Some(tick)) => handle_tick(pipeline, &tick, out, args.verbose),
			Ok(None) => {}
			Err(reason) => warn!(reason, "skipping unparseable stream line"),
		}
	}
	Ok(())
}

/// Pushes one tick through the pipeline and writes every event it produces.
/// A `BadInputTick` is a recoverable per-tick condition (spec.md §7): log and
/// move on, never abort the run.
fn handle_tick(pipeline: &mut Pipeline, tick: &onset_core::Tick, out: &mut impl Write, verbose: bool) {
	match pipeline.push(tick) {
		Ok(events) => {
			for event in &events {
				if let Err(e) = emit::write_event(out, event, verbose) {
					warn!(error = %e, "failed to write event to stdout");
				}
			}
		}
		Err(e) => warn!(symbol = %tick.symbol, ts = tick.ts, error = %e, "rejecting bad input tick"),
	}
}

fn print_stats(pipeline: &Pipeline) {
	let stats = pipeline.stats();
	let total = stats.aggregate();
	eprintln!("=== onset-cli summary ===");
	eprintln!("symbols tracked:      {}", stats.per_symbol.len());
	eprintln!("ticks processed:      {}", total.ticks);
	eprintln!("candidates emitted:   {}", total.candidates);
	eprintln!("confirmations:        {}", total.confirmations);
	eprintln!("refractory rejections:{}", total.refractory_rejections);
	eprintln!("clamped returns:      {}", total.clamped_returns);
}
