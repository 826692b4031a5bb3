use std::path::PathBuf;

use clap::{Args, Subcommand};
use sockframe_frame::EMPTY_PACKET_KIND;
use sockframe_transport::{Address, Listener};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Accept TCP clients and print every packet they send.
    Serve(ServeArgs),
    /// Send a single packet.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (host:port).
    #[arg(value_parser = Address::resolve)]
    pub address: Address,
    /// Pending connection queue length.
    #[arg(long, default_value_t = Listener::DEFAULT_BACKLOG)]
    pub backlog: i32,
    /// How long each selector poll waits (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub poll_interval: String,
    /// Only print packets of these kinds (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub kinds: Option<Vec<u16>>,
    /// Send every printed packet back to its sender.
    #[arg(long)]
    pub echo: bool,
    /// Exit after printing N packets.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Address to send to (host:port).
    #[arg(value_parser = Address::resolve)]
    pub address: Address,
    /// Packet kind.
    #[arg(
        long,
        short = 'k',
        default_value = "0",
        value_parser = clap::value_parser!(u16).range(..i64::from(EMPTY_PACKET_KIND))
    )]
    pub kind: u16,
    /// Raw string payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Send as UDP datagrams instead of over a TCP connection.
    #[arg(long)]
    pub udp: bool,
    /// Wait for one packet in reply and print it.
    #[arg(long)]
    pub wait: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
