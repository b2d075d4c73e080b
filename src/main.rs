//! KI-Browser Evasion - Main Entry Point
//!
//! Reads one JSON command per line and writes one JSON response per line.
//! Logs go to stderr so stdout carries nothing but responses.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ki_browser_evasion::{
    api::{CommandResponse, EvasionCommandHandler},
    config::{CliArgs, EvasionSettings},
    FULL_VERSION, NAME, VERSION,
};

/// Build the CLI command parser
fn build_cli() -> Command {
    Command::new(NAME)
        .version(VERSION)
        .author("KI-Browser Team")
        .about("Detection-evasion engine: fingerprints, human input plans, honeypots, rate limits")
        .long_about(
            "KI-Browser Evasion processes JSON commands, one per line:\n\
             - Fingerprint profiles and injection scripts\n\
             - Human-like mouse paths and typing plans\n\
             - Honeypot form field detection\n\
             - Adaptive per-domain rate limiting",
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to configuration file (TOML or JSON)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("N")
                .help("Seed all random sources for reproducible output")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Read commands from FILE instead of stdin")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("pretty")
                .long("pretty")
                .help("Pretty-print responses")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dump-config")
                .long("dump-config")
                .value_name("FILE")
                .help("Write the effective configuration to FILE and exit")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("target-width")
                .long("target-width")
                .value_name("PIXELS")
                .help("Default mouse target width")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("overshoot-probability")
                .long("overshoot-probability")
                .value_name("P")
                .help("Probability that a mouse path overshoots its target")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("honeypot-threshold")
                .long("honeypot-threshold")
                .value_name("SCORE")
                .help("Score at which a form field is treated as a honeypot")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress output except errors")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
}

/// Parse CLI arguments into CliArgs struct
fn parse_cli_args(matches: &clap::ArgMatches) -> CliArgs {
    CliArgs {
        seed: matches.get_one::<u64>("seed").copied(),
        target_width: matches.get_one::<f64>("target-width").copied(),
        overshoot_probability: matches.get_one::<f64>("overshoot-probability").copied(),
        honeypot_threshold: matches.get_one::<f64>("honeypot-threshold").copied(),
        config_file: matches.get_one::<PathBuf>("config").cloned(),
    }
}

/// Initialize the tracing/logging subsystem
fn init_tracing(verbosity: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbosity {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_thread_ids(false),
        )
        .with(filter)
        .init();
}

/// Serialize a response as one output record
fn render_response(response: &CommandResponse, pretty: bool) -> Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(response)
    } else {
        serde_json::to_string(response)
    };
    rendered.context("Failed to serialize response")
}

/// Feed every non-blank line of `input` to the handler
fn process_commands<R: BufRead, W: Write>(
    handler: &mut EvasionCommandHandler,
    input: R,
    output: &mut W,
    pretty: bool,
) -> Result<usize> {
    let mut processed = 0;

    for line in input.lines() {
        let line = line.context("Failed to read command")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = handler.handle_json(line);
        writeln!(output, "{}", render_response(&response, pretty)?)
            .context("Failed to write response")?;
        output.flush().context("Failed to flush output")?;
        processed += 1;
    }

    Ok(processed)
}

fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let verbosity = matches.get_count("verbose");
    let quiet = matches.get_flag("quiet");
    init_tracing(verbosity, quiet);

    let cli_args = parse_cli_args(&matches);
    let settings: EvasionSettings = cli_args
        .load_settings()
        .context("Failed to load configuration")?;

    if let Some(path) = matches.get_one::<PathBuf>("dump-config") {
        settings
            .to_file(path)
            .with_context(|| format!("Failed to write configuration to {}", path.display()))?;
        info!("Configuration written to {}", path.display());
        return Ok(());
    }

    info!("{} ready", FULL_VERSION);
    if let Some(seed) = settings.seed {
        debug!("Using fixed seed {}", seed);
    }

    let mut handler = EvasionCommandHandler::from_settings(&settings);
    let pretty = matches.get_flag("pretty");
    let stdout = io::stdout();
    let mut output = stdout.lock();

    let processed = match matches.get_one::<PathBuf>("input") {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input file {}", path.display()))?;
            process_commands(&mut handler, BufReader::new(file), &mut output, pretty)?
        }
        None => process_commands(&mut handler, io::stdin().lock(), &mut output, pretty)?,
    };

    info!("Processed {} commands", processed);
    Ok(())
}
