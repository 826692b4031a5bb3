mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "sockframe", version, about = "Typed packets over TCP and UDP")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "sockframe",
            "send",
            "127.0.0.1:25565",
            "--kind",
            "1",
            "--data",
            "21",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.kind, 1);
                assert_eq!(args.address.port(), 25565);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "sockframe",
            "send",
            "127.0.0.1:25565",
            "--file",
            "/tmp/payload",
            "--data",
            "hello",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_reserved_kind() {
        let err = Cli::try_parse_from(["sockframe", "send", "127.0.0.1:1", "--kind", "65535"])
            .expect_err("empty-packet kind is reserved");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_serve_with_filters() {
        let cli = Cli::try_parse_from([
            "sockframe",
            "serve",
            "127.0.0.1:0",
            "--kinds",
            "0,1",
            "--count",
            "2",
        ])
        .expect("serve args should parse");

        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.kinds, Some(vec![0, 1]));
                assert_eq!(args.count, Some(2));
                assert_eq!(args.backlog, 10);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
