//! Entry point for `ipkcpc`.
//!
//! Parses CLI arguments, connects, and hands stdin/stdout to the request
//! loop.  `main.rs` owns only process setup (logging, signal handling,
//! argument parsing) and the exit status.

use std::io;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use ipkcpc::{driver, ClientConfig, Interrupt, Mode, Outcome, Session};

/// Client for the IPKCP remote calculator protocol.
#[derive(Parser)]
#[command(author, version, about, disable_help_flag = true)]
struct Cli {
    /// Server hostname or IP address.
    #[arg(short = 'h', long, env = "IPKCPC_HOST")]
    host: String,

    /// Server port.
    #[arg(short, long, env = "IPKCPC_PORT", value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Transport mode.
    #[arg(short, long, env = "IPKCPC_MODE", value_enum, ignore_case = true)]
    mode: Mode,

    /// Print help.
    #[arg(long, action = clap::ArgAction::Help)]
    help: Option<bool>,
}

fn main() -> ExitCode {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();
    let config = ClientConfig::new(cli.host, cli.port, cli.mode);

    match run(&config) {
        Ok(Outcome::Clean) => ExitCode::SUCCESS,
        Ok(Outcome::Failed(msg)) => {
            eprintln!("!ERR! {msg}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("!ERR! {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &ClientConfig) -> anyhow::Result<Outcome> {
    config.validate()?;
    let interrupt = Interrupt::install().context("failed to install Ctrl-C handler")?;

    log::info!("connecting to {}:{} over {}", config.host, config.port, config.mode);
    let mut session = Session::new(&config.host, config.port, config.transport_kind());
    if !session.connect() {
        return Ok(failed(&session));
    }

    // The loop reads stdin on its own thread, so it needs an owned handle.
    let stdin = io::BufReader::new(io::stdin());
    let mut stdout = io::stdout();
    let outcome = driver::run(&mut session, stdin, &mut stdout, &interrupt)
        .context("console I/O failed")?;
    Ok(outcome)
}

fn failed(session: &Session) -> Outcome {
    Outcome::Failed(
        session
            .error_message()
            .unwrap_or("could not connect")
            .to_string(),
    )
}
