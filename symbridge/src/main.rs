//! # symbridge - Main Entry Point
//!
//! Resolves addresses given on the command line, streamed on stdin, or taken
//! from a function-trace dump, and prints one record per address (or one line
//! per trace event) as text or JSON.

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use std::io::{self, BufRead, BufWriter, Write};

use symbridge::cli::{Args, OutputFormat};
use symbridge::domain::ResolverError;
use symbridge::preflight::run_preflight_checks;
use symbridge::resolver::{parse_address, ResolverHandle, ResultRecord};
use symbridge::trace::{read_trace_file, TraceEvent};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if matches!(err.downcast_ref::<ResolverError>(), Some(ResolverError::InvalidAddress(_))) {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

/// Lookups that produced output vs. those that did not
#[derive(Default)]
struct Tally {
    resolved: usize,
    failed: usize,
}

impl Tally {
    fn record(&mut self, ok: bool) {
        if ok {
            self.resolved += 1;
        } else {
            self.failed += 1;
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    // Validate everything up front so a typo does not leave half the output printed
    let addresses = args
        .addresses
        .iter()
        .map(|text| parse_address(text))
        .collect::<Result<Vec<_>, _>>()?;
    let events = match args.trace {
        Some(ref dump) => Some(
            read_trace_file(dump)
                .with_context(|| format!("Failed to decode trace dump {}", dump.display()))?,
        ),
        None => None,
    };

    let resolver = run_preflight_checks(&args.resolver, &args.target, args.quiet)?;
    let config = args.resolver_config(resolver);
    let handle = ResolverHandle::spawn(args.library_name(), &config).with_context(|| {
        format!("Failed to start resolver for {}", config.target_path.display())
    })?;

    let format = args.output_format();
    let mut out = BufWriter::new(io::stdout().lock());
    let mut tally = Tally::default();

    if let Some(events) = events {
        for event in &events {
            tally.record(resolve_event(&handle, event, &mut out, format)?);
        }
    } else if addresses.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = line.context("Failed to read address from stdin")?;
            if line.trim().is_empty() {
                continue;
            }
            let ok = match parse_address(&line) {
                Ok(addr) => resolve_one(&handle, addr, &mut out, format)?,
                Err(e) => {
                    eprintln!("warning: {e}");
                    false
                }
            };
            tally.record(ok);
            // Keep pace with a producer on the other end of the pipe
            out.flush()?;
        }
    } else {
        for addr in addresses {
            tally.record(resolve_one(&handle, addr, &mut out, format)?);
        }
    }
    out.flush()?;

    handle.stop();
    info!("Resolved {} addresses, {} failed", tally.resolved, tally.failed);
    if tally.resolved == 0 && tally.failed > 0 {
        bail!("No address could be resolved ({} failed)", tally.failed);
    }
    Ok(())
}

fn resolve_one<W: Write>(
    handle: &ResolverHandle,
    addr: u64,
    out: &mut W,
    format: OutputFormat,
) -> Result<bool> {
    let Some(record) = handle.query(addr) else {
        eprintln!("warning: no answer for 0x{addr:x}");
        return Ok(false);
    };
    write_record(out, addr, &record, format)?;
    Ok(true)
}

fn resolve_event<W: Write>(
    handle: &ResolverHandle,
    event: &TraceEvent,
    out: &mut W,
    format: OutputFormat,
) -> Result<bool> {
    let resolved = event.resolve(handle);
    if resolved.function.is_none() {
        eprintln!("warning: no answer for pc 0x{:x} in trace slot {}", event.pc, event.slot);
    }
    match format {
        OutputFormat::Text => writeln!(out, "{}", resolved.format())?,
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, &resolved)?;
            writeln!(out)?;
        }
    }
    Ok(resolved.function.is_some())
}

fn write_record<W: Write>(
    out: &mut W,
    addr: u64,
    record: &ResultRecord,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "0x{addr:x}\n{}\n", record.format())?;
        }
        OutputFormat::Json => {
            let mut value = serde_json::to_value(record)?;
            value["address"] = serde_json::Value::String(format!("0x{addr:x}"));
            serde_json::to_writer(&mut *out, &value)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
