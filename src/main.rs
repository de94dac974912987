//! picosay main entry point
//!
//! Synthesizes the given text and writes the playback-ready raw audio to a
//! file or stdout, going through the same cache as the call integration.

use log::{debug, error, info};
use picosay::config::{Config, SharedConfig};
use picosay::playback::{ExportTarget, FileExportSession, PlaybackOutcome};
use picosay::request::{InterruptSpec, SynthesisRequest};
use picosay::{PicoError, Result, SynthesisOrchestrator};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

const USAGE: &str = "Usage: picosay [-d|--debug] [-c|--config PATH] [-o|--output PATH] \
                     [-l|--language TAG] [-i|--interrupt any|DIGITS] TEXT...";

/// Parsed command line
#[derive(Debug, Default)]
struct Options {
    debug: bool,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    language: Option<String>,
    interrupt: Option<String>,
    text: Vec<String>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Options> {
    let mut options = Options::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .ok_or_else(|| PicoError::Validation(format!("{} requires a value", name)))
        };
        match arg.as_str() {
            "-d" | "--debug" => options.debug = true,
            "-c" | "--config" => options.config = Some(PathBuf::from(value(&arg)?)),
            "-o" | "--output" => options.output = Some(PathBuf::from(value(&arg)?)),
            "-l" | "--language" => options.language = Some(value(&arg)?),
            "-i" | "--interrupt" => options.interrupt = Some(value(&arg)?),
            "-h" | "--help" => {
                println!("{}", USAGE);
                process::exit(0);
            }
            "--" => {
                options.text.extend(args.by_ref());
            }
            _ => options.text.push(arg),
        }
    }

    Ok(options)
}

fn init_logging(debug_mode: bool) {
    if debug_mode {
        // Debug mode: write to picosay.log file
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("picosay.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Warning: Failed to open picosay.log for debug logging: {}", e);
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .init();
            }
        }
        info!("picosay version {} starting (debug mode)", picosay::VERSION);
    } else {
        // Normal mode: warnings and errors to stderr, RUST_LOG may override
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Warn)
            .parse_default_env()
            .init();
    }
}

fn main() {
    let options = match parse_args(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", USAGE);
            process::exit(2);
        }
    };

    init_logging(options.debug);

    if let Err(e) = run(options) {
        error!("Fatal error: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(options: Options) -> Result<()> {
    let config_path = options.config.clone().unwrap_or_else(Config::default_path);
    let shared = Arc::new(SharedConfig::new(Config::load_or_default(&config_path)));
    let config = shared.current();
    debug!("Active configuration: {:?}", config);

    let interrupt = match options.interrupt.as_deref() {
        Some(raw) => InterruptSpec::parse(raw)?,
        None => InterruptSpec::None,
    };

    let text = options.text.join(" ");
    let request = SynthesisRequest::new(&text, options.language.as_deref(), &config)?;

    let target = match options.output {
        Some(path) => ExportTarget::File(path),
        None => ExportTarget::Stdout,
    };
    let mut session = FileExportSession::new(target);

    let orchestrator = SynthesisOrchestrator::new(shared);
    match orchestrator.say(&mut session, &request, &interrupt)? {
        PlaybackOutcome::Interrupted(key) => info!("Playback interrupted by {}", key),
        outcome => debug!("Playback finished: {:?}", outcome),
    }

    Ok(())
}
