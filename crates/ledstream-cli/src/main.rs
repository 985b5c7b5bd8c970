use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use glob::glob;
use ledstream_core::{
    DEFAULT_PORT, EffectState, MemoryStrip, RealtimeEffect, ReceiverConfig, ReplayConfig,
    UdpDatagramSource, replay_capture,
};
use log::info;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("LEDSTREAM_BUILD_COMMIT"),
    " ",
    env!("LEDSTREAM_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "ledstream")]
#[command(version = VERSION)]
#[command(
    about = "Realtime LED-control receiver for WLED-style UDP streams.",
    long_about = None,
    after_help = "Examples:\n  ledstream listen --leds 30\n  ledstream listen --port 19446 --leds 60 --json\n  ledstream replay capture.pcapng --leds 30 -o report.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bind the UDP port and drive an in-memory strip from live traffic.
    #[command(
        after_help = "Examples:\n  ledstream listen --leds 30\n  ledstream listen --leds 30 --ticks 600 --json"
    )]
    Listen {
        /// UDP port to listen on (19446 enables Hyperion aliasing)
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Number of LEDs in the strip
        #[arg(short, long)]
        leds: usize,

        /// Tick interval in milliseconds
        #[arg(long, default_value_t = 16)]
        tick_ms: u64,

        /// Stop after this many ticks (runs until interrupted when omitted)
        #[arg(long)]
        ticks: Option<u64>,

        /// Print a JSON session summary on exit
        #[arg(long)]
        json: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,
    },

    /// Replay a PCAP/PCAPNG capture through the receiver and write a report.
    #[command(
        after_help = "Examples:\n  ledstream replay capture.pcapng --leds 30 -o report.json\n  ledstream replay capture.pcap --leds 30 --stdout --pretty"
    )]
    Replay {
        /// Path to a .pcap or .pcapng file
        input: PathBuf,

        /// UDP destination port to extract from the capture
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Number of LEDs in the strip
        #[arg(short, long)]
        leds: usize,

        /// Output report path (JSON)
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        report: Option<PathBuf>,

        /// Write JSON report to stdout
        #[arg(long, conflicts_with = "report")]
        stdout: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Listen {
            port,
            leds,
            tick_ms,
            ticks,
            json,
            quiet,
        } => cmd_listen(port, leds, tick_ms, ticks, json, quiet),
        Commands::Replay {
            input,
            port,
            leds,
            report,
            stdout,
            pretty,
            compact,
            quiet,
        } => cmd_replay(input, port, leds, report, stdout, pretty, compact, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(err.to_string(), None)
    }
}

fn cmd_listen(
    port: u16,
    leds: usize,
    tick_ms: u64,
    ticks: Option<u64>,
    json: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let mut strip = MemoryStrip::new(leds);
    let mut effect = RealtimeEffect::<UdpDatagramSource>::new(ReceiverConfig { port });
    info!("listen: port {port}, {leds} LEDs, tick {tick_ms} ms");
    effect.start();

    let interval = Duration::from_millis(tick_ms);
    let mut remaining = ticks;
    loop {
        if let Some(left) = remaining.as_mut() {
            if *left == 0 {
                break;
            }
            *left -= 1;
        }
        effect.tick(&mut strip);
        if effect.state() == EffectState::Failed {
            return Err(CliError::new(
                format!("could not bind UDP port {port}"),
                Some("is another receiver using the port?".to_string()),
            ));
        }
        thread::sleep(interval);
    }
    effect.stop();

    if json {
        let summary = serde_json::to_string(effect.stats())
            .context("JSON serialization failed")
            .map_err(CliError::from)?;
        println!("{}", summary);
    } else if !quiet {
        let stats = effect.stats();
        eprintln!(
            "OK: {} frames accepted, {} rejected, {} blanks over {} ticks",
            stats.accepted, stats.rejected, stats.blanks, stats.ticks
        );
    }
    Ok(())
}

fn cmd_replay(
    input: PathBuf,
    port: u16,
    leds: usize,
    report: Option<PathBuf>,
    stdout: bool,
    pretty: bool,
    compact: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&input)?;
    validate_input_file(&resolved_input)?;

    let meta = fs::metadata(&resolved_input)
        .with_context(|| format!("Failed to read input file: {}", resolved_input.display()))?;
    if !meta.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }

    let report = if stdout {
        None
    } else {
        Some(report.ok_or_else(|| {
            CliError::new(
                "missing output path",
                Some("use -o/--report or --stdout".to_string()),
            )
        })?)
    };

    if let Some(report_path) = report.as_ref() {
        let input_abs = fs::canonicalize(&resolved_input).with_context(|| {
            format!("Failed to resolve input path: {}", resolved_input.display())
        })?;
        if fs::canonicalize(report_path).is_ok_and(|abs| abs == input_abs) {
            return Err(CliError::new(
                format!(
                    "report path must differ from input: {}",
                    report_path.display()
                ),
                Some("choose a different output path".to_string()),
            ));
        }
    }

    let rep = replay_capture(&resolved_input, &ReplayConfig { port, leds })
        .context("capture replay failed")?;
    let json = serialize_report(&rep, pretty, compact)?;

    match report {
        None => {
            print!("{}", json);
        }
        Some(report) => {
            if let Some(parent) = report.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create output directory: {}", parent.display())
                    })?;
                }
            }
            fs::write(&report, json)
                .with_context(|| format!("Failed to write report: {}", report.display()))?;
            if !quiet {
                eprintln!("OK: report written -> {}", report.display());
            }
        }
    }
    Ok(())
}

fn serialize_report(
    rep: &ledstream_core::ReplayReport,
    pretty: bool,
    compact: bool,
) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if pretty {
        serde_json::to_string_pretty(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn validate_input_file(input: &PathBuf) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "pcap" && ext != "pcapng" {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .pcap or .pcapng file".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &PathBuf) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.clone());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern; expected .pcap or .pcapng".to_string()),
        ));
    }
    if matches.len() > 1 {
        return Err(CliError::new(
            format!(
                "multiple files match pattern '{}' ({} matches)",
                pattern,
                matches.len()
            ),
            Some("pass a single capture file, or run once per file".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
