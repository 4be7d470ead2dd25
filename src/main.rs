//! Codex7 CLI
//!
//! Usage:
//!   codex7 --check sequence.json            # Canon adjacency check (exit 1 on FAIL)
//!   echo "⚫⚪🟡" | codex7 --stdin            # Check a sequence from stdin
//!   codex7 --text "your text here"          # Verify one text
//!   codex7 --file notes.txt                 # Verify a file
//!   codex7 --batch texts.txt                # One text per line, independent sessions
//!   codex7 --interactive                    # Shared session, one text per line
//!   codex7 --serve                          # HTTP API server
//!   codex7 --text "text" --json             # JSON output

use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use codex7::core::{parse_tokens, run_server, Verifier, CANON};
use codex7::types::{
    BatchReport, CheckReport, CodexError, GrayEvent, Phase, Severity, VerificationResult,
    VerifyConfig,
};
use codex7::VERSION;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "codex7",
    version = VERSION,
    about = "Codex7 - Canon adjacency validation and thermodynamic phase classification",
    long_about = "Codex7 checks token sequences against the 7-color canon cycle and\n\
                  classifies text into one of nine phases from entropy and\n\
                  compressibility, tracking a per-session thermodynamic kernel.\n\n\
                  Canon: ⚫ Black → ⚪ White → 🟡 Yellow → 🟤 Brown → 🔴 Red → 🟢 Green → 🔵 Blue → ⚫\n\
                  Legal steps move one position forward or backward on the cycle.\n\n\
                  Phases, most ordered first:\n  \
                  CRYSTAL_WHITE, WHITE_LATTICE, YELLOW_IGNITION, GREEN_ACCUMULATION,\n  \
                  RED_COMBUSTION, ORANGE_HARVEST, BLUE_DISPERSION, VIOLET_DISSOLUTION,\n  \
                  BLACK_COLLAPSE"
)]
struct Args {
    /// Check a token sequence file against the canon
    #[arg(long, value_name = "FILE")]
    check: Option<PathBuf>,

    /// Read a token sequence from stdin and check it
    #[arg(long)]
    stdin: bool,

    /// Text to verify
    #[arg(short, long)]
    text: Option<String>,

    /// File to verify as one text
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Verify each line of a file independently
    #[arg(short, long, value_name = "FILE")]
    batch: Option<PathBuf>,

    /// Interactive mode - read lines from stdin through one session
    #[arg(short, long)]
    interactive: bool,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address (default: 127.0.0.1:3000)
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Show kernel state and step trace
    #[arg(long)]
    verbose: bool,

    /// Least ordered phase that still verifies (default: WHITE_LATTICE)
    #[arg(long, value_name = "PHASE")]
    threshold: Option<String>,

    /// JSON config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log output format (logs go to stderr)
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_format);
    if args.no_color {
        colored::control::set_override(false);
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            return ExitCode::from(2);
        }
    };

    if args.serve {
        return match run_server(&args.addr, config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                ExitCode::from(2)
            }
        };
    }

    match run(&args, Verifier::new(config)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

/// Initialize the tracing subscriber with pretty or JSON format
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "codex7=info".into());

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(io::stderr))
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .flatten_event(true)
                    .with_writer(io::stderr),
            )
            .init(),
    }
}

fn load_config(args: &Args) -> Result<VerifyConfig, CodexError> {
    let config = match &args.config {
        Some(path) => VerifyConfig::from_json_file(path)?,
        None => VerifyConfig::default(),
    };
    match &args.threshold {
        Some(name) => Ok(config.with_threshold(Phase::from_name(name)?)),
        None => Ok(config),
    }
}

/// Dispatch the selected mode; `Ok(false)` means FAIL
fn run(args: &Args, verifier: Verifier) -> Result<bool, CodexError> {
    if let Some(path) = &args.check {
        let content = std::fs::read_to_string(path)?;
        return run_check(&content, &verifier, args);
    }
    if args.stdin {
        let mut content = String::new();
        io::stdin().read_to_string(&mut content)?;
        return run_check(&content, &verifier, args);
    }
    if let Some(path) = &args.batch {
        return run_batch(path, &verifier, args);
    }
    if let Some(text) = &args.text {
        let result = verifier.verify(text);
        print_result(&result, args)?;
        return Ok(result.verified);
    }
    if let Some(path) = &args.file {
        let bytes = std::fs::read(path)?;
        let result = verifier.verify_bytes(&bytes)?;
        print_result(&result, args)?;
        return Ok(result.verified);
    }
    // Default to interactive if no mode specified
    run_interactive(&verifier, args)
}

/// Check a token sequence (Canon Law); content without tokens is a FAIL
fn run_check(content: &str, verifier: &Verifier, args: &Args) -> Result<bool, CodexError> {
    let parsed = parse_tokens(content, &CANON)?;
    if parsed.is_empty() {
        eprintln!("{}  no valid tokens found", verdict(false));
        return Ok(false);
    }
    let report = verifier.check_sequence(&parsed);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_check(&report, args.verbose);
    }
    Ok(report.is_valid)
}

/// Verify each non-empty line of a file in its own session
fn run_batch(path: &Path, verifier: &Verifier, args: &Args) -> Result<bool, CodexError> {
    let content = std::fs::read_to_string(path)?;
    let texts: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    let report = verifier.batch(&texts);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_batch(&report, args)?;
    }
    Ok(report.failed == 0)
}

/// Interactive mode: every line advances the same session
fn run_interactive(verifier: &Verifier, args: &Args) -> Result<bool, CodexError> {
    let mut session = verifier.new_session();

    print_header("Interactive", verifier.config().threshold);
    println!("Type text and press Enter to verify. Type 'quit' to exit.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("[{}] > ", session.verifications());
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let line = line.trim();
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            println!("\nSession ended. Verifications: {}", session.verifications());
            break;
        }
        if line.is_empty() {
            continue;
        }

        let result = verifier.verify_in(&mut session, line);
        if args.json {
            println!("{}", serde_json::to_string(&result)?);
        } else {
            print_result(&result, args)?;
        }
    }
    Ok(true)
}

fn print_header(mode: &str, threshold: Phase) {
    println!("{}", format!("Codex7 v{} - {}", VERSION, mode).bold());
    println!("Threshold: {}", threshold);
    println!();
}

fn verdict(passed: bool) -> colored::ColoredString {
    if passed {
        "PASS".green().bold()
    } else {
        "FAIL".red().bold()
    }
}

fn print_event(event: &GrayEvent) {
    let severity = match event.severity {
        Severity::Error => "ERROR".red(),
        Severity::Warning => "WARNING".yellow(),
    };
    let position = event.position.map(|p| format!(" @{}", p)).unwrap_or_default();
    println!("  [{}] {}{}: {}", severity, event.kind.code(), position, event.reason);
}

fn print_check(report: &CheckReport, verbose: bool) {
    println!(
        "{}  {} tokens, {} gray events",
        verdict(report.is_valid),
        report.sequence_length,
        report.gray_events.len()
    );
    for event in &report.gray_events {
        print_event(event);
    }

    if !verbose {
        return;
    }
    if let Some(trace) = &report.trace {
        println!();
        println!(
            "Trace: {} steps ({} legal, {} illegal)",
            trace.total_steps(),
            trace.legal_steps,
            trace.illegal_steps
        );
        for step in &trace.steps {
            let from = CANON.symbol_at(step.from as usize);
            let to = CANON.symbol_at(step.to as usize);
            let mark = if step.legal { "ok".green() } else { "illegal".red() };
            println!(
                "  {:>4}  {} {:<6} → {} {:<6}  delta {}  {:?}  {}",
                step.step, from.symbol, from.name, to.symbol, to.name, step.delta, step.direction, mark
            );
        }
    }
    if let Some(degeneracy) = &report.degeneracy {
        println!();
        println!(
            "Degeneracy: {} (H={:.3}, ratio={:.3}, {} windows)",
            degeneracy.trigger_reason,
            degeneracy.entropy_bits,
            degeneracy.compression_ratio,
            degeneracy.num_windows
        );
    }
}

fn print_result(result: &VerificationResult, args: &Args) -> Result<(), CodexError> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    if args.no_color {
        println!("{}", result.to_parseable_string());
        for event in &result.gray_events {
            println!("  {}", event);
        }
        return Ok(());
    }

    let phase = result.detected_phase;
    println!(
        "{}  {}{}\x1b[0m (rank {}, confidence {:.2}) threshold {}",
        verdict(result.verified),
        phase.color_code(),
        phase,
        result.phase_rank,
        result.confidence,
        result.threshold_phase
    );
    println!(
        "  H={:.3} bits  ratio={:.3}  coherence={:.2}  stability={:.2}  op={}  regime={}",
        result.metrics.entropy_bits,
        result.metrics.compression_ratio,
        result.metrics.coherence,
        result.metrics.stability,
        result.dominant_operator,
        result.regime
    );
    for event in &result.gray_events {
        print_event(event);
    }

    if args.verbose {
        let s = &result.thermodynamic_state;
        println!(
            "  kernel: F={:.2}  T={:.2}K  P={:+.3}  potential={:.3}  lawfulness={:.3}",
            s.free_energy, s.temperature_k, s.pressure, s.accumulated_potential, result.lawfulness
        );
        println!("  fingerprint: {}", result.fingerprint.dimmed());
    }
    Ok(())
}

fn print_batch(report: &BatchReport, args: &Args) -> Result<(), CodexError> {
    for entry in &report.entries {
        match (&entry.result, &entry.error) {
            (Some(result), _) if args.verbose => {
                println!("#{}", entry.index);
                print_result(result, args)?;
            }
            (Some(result), _) => println!(
                "#{:<4} {}  {}",
                entry.index,
                verdict(result.verified),
                result.detected_phase
            ),
            (None, Some(error)) => println!("#{:<4} {}  {}", entry.index, "ERROR".red(), error),
            (None, None) => {}
        }
    }
    println!();
    println!(
        "{} texts: {} verified, {} failed | mean H={:.3} ratio={:.3}",
        report.total,
        report.verified,
        report.failed,
        report.mean_entropy_bits,
        report.mean_compression_ratio
    );
    for (phase, count) in &report.phase_histogram {
        println!("  {:<20} {}", phase, count);
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("codex7").chain(extra.iter().copied())).unwrap()
    }

    #[test]
    fn test_check_without_tokens_fails() {
        let args = args(&["--json"]);
        let verifier = Verifier::default();
        assert!(!run_check("", &verifier, &args).unwrap());
        assert!(!run_check("  \n\t ", &verifier, &args).unwrap());
        assert!(!run_check("[]", &verifier, &args).unwrap());
    }

    #[test]
    fn test_check_verdicts() {
        let args = args(&["--json"]);
        let verifier = Verifier::default();
        assert!(run_check("⚫⚪🟡", &verifier, &args).unwrap());
        assert!(!run_check("⚫🟡", &verifier, &args).unwrap());
        assert!(run_check("[0", &verifier, &args).is_err());
    }

    #[test]
    fn test_batch_output_propagates() {
        let args = args(&["--verbose", "--no-color"]);
        let report = Verifier::default().batch(&["one plain line", "another plain line"]);
        assert!(print_batch(&report, &args).is_ok());
    }
}
