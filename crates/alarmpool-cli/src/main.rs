//! Interactive prompt for the alarmpool scheduler.
//!
//! Reads one request per line from stdin, parses it, and hands it to the
//! running pipeline. Trace events come out on stdout; diagnostics go to
//! stderr. EOF shuts the runtime down and exits 0.

use std::io::{BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use alarmpool_core::{Clock, Event, EventSink, Supervisor, SystemClock};

mod parse;

#[derive(Parser)]
#[command(name = "alarmpool", version, about = "Interactive periodic alarm scheduler")]
struct Cli {
    /// Emit events as newline-delimited JSON instead of human trace lines
    #[arg(long)]
    json: bool,
    /// Suppress the interactive prompt (useful with piped input)
    #[arg(long)]
    no_prompt: bool,
}

/// Renders events to stdout, line-buffered, one event per line.
struct StdoutSink {
    json: bool,
}

impl EventSink for StdoutSink {
    fn emit(&self, event: Event) {
        if self.json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(error) => warn!(%error, "event not serializable"),
            }
        } else {
            println!("{event}");
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let clock = Arc::new(SystemClock::new());
    let sink = Arc::new(StdoutSink { json: cli.json });

    let supervisor = match Supervisor::start(clock.clone(), sink) {
        Ok(supervisor) => supervisor,
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    };

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        if !cli.no_prompt {
            print!("alarm> ");
            let _ = std::io::stdout().flush();
        }
        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(error) => {
                warn!(%error, "stdin read failed");
                break;
            }
        }
        if line.trim().is_empty() {
            continue;
        }
        match parse::parse_line(&line, clock.now()) {
            Ok(request) => {
                if !supervisor.submit(request) {
                    break;
                }
            }
            Err(error) => warn!(%error, "bad command"),
        }
    }

    supervisor.shutdown();
}
