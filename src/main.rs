//! `ws` - interactive websocket client.
//!
//! Relays terminal lines to a websocket and prints every received frame.

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

use wsrelay::relay::{ConsoleInput, RelayConfig, SessionSupervisor};

#[derive(Parser, Debug)]
#[command(name = "ws")]
#[command(about = "websocket tool")]
#[command(disable_version_flag = true)]
struct Cli {
    /// Url to websocket (ws://example.org:1234/path)
    url: Option<String>,

    /// Websocket origin; derived from the URL when omitted
    #[arg(short, long)]
    origin: Option<String>,

    /// Print the version and exit
    #[arg(short, long)]
    version: bool,

    /// Skip ssl certificate verification
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Only print received frames, never send
    #[arg(short, long)]
    readonly: bool,

    /// Number of connections per target
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    number: u32,

    /// Comma separated values substituted for %s in the URL
    #[arg(short, long, value_delimiter = ',')]
    params: Vec<String>,
}

/// Process status for a command-line error: 0 for help, 1 for anything else.
fn exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = exit_code(&err);
            let _ = err.print();
            if code != 0 {
                eprintln!();
                let _ = Cli::command().print_help();
            }
            std::process::exit(code);
        }
    };

    if cli.version {
        println!("ws v{}", env!("CARGO_PKG_VERSION"));
        return;
    }

    // stdout carries relayed frames; logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(url) = cli.url else {
        let _ = Cli::command().print_help();
        std::process::exit(1);
    };

    let config = match RelayConfig::builder(url)
        .origin(cli.origin)
        .insecure(cli.insecure)
        .read_only(cli.readonly)
        .concurrency(cli.number as usize)
        .params(cli.params)
        .color(std::io::stdout().is_terminal())
        .build()
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ws: {}", e);
            std::process::exit(1);
        }
    };

    let input = ConsoleInput::stdin();
    let report = SessionSupervisor::new(config)
        .run(move |_| (input.clone(), tokio::io::stdout()))
        .await;
    tracing::debug!(
        "{} session(s) ended, {} with errors",
        report.sessions,
        report.failures.len()
    );

    // A pending stdin read holds a blocking thread that would stall runtime shutdown.
    std::process::exit(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extra_positional_exits_one() {
        let err = Cli::try_parse_from(["ws", "a", "b"]).unwrap_err();
        assert_eq!(exit_code(&err), 1);
    }

    #[test]
    fn test_bad_value_exits_one() {
        let err = Cli::try_parse_from(["ws", "-n", "abc", "ws://a/"]).unwrap_err();
        assert_eq!(exit_code(&err), 1);

        let err = Cli::try_parse_from(["ws", "-n", "0", "ws://a/"]).unwrap_err();
        assert_eq!(exit_code(&err), 1);
    }

    #[test]
    fn test_help_exits_zero() {
        let err = Cli::try_parse_from(["ws", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        assert_eq!(exit_code(&err), 0);
    }

    #[test]
    fn test_flags_parse() {
        let cli = Cli::try_parse_from(["ws", "-k", "-r", "-n", "3", "-p", "a,b", "ws://a/%s"])
            .unwrap();
        assert_eq!(cli.url.as_deref(), Some("ws://a/%s"));
        assert!(cli.insecure && cli.readonly);
        assert_eq!(cli.number, 3);
        assert_eq!(cli.params, vec!["a", "b"]);
    }
}
