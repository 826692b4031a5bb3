use std::collections::HashMap;
use std::io;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sockframe_frame::{Packet, PacketBuffer};
use sockframe_select::{PollOutcome, ReadySets, SelectError, Selector};
use sockframe_transport::{
    Address, Endpoint, Listener, PacketTransport, TransportError, DONT_WAIT,
};

use crate::cmd::ServeArgs;
use crate::exit::{select_error, transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_packet, OutputFormat};

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let poll_interval = parse_duration(&args.poll_interval)?;
    let mut server = Server::bind(args.address, args.backlog, poll_interval)?;
    server.echo = args.echo;
    if let Some(local) = server.local_address() {
        tracing::info!(address = %local, "serving");
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let received = server.poll_once()?;

        for (packet, peer) in received {
            if let Some(kinds) = &args.kinds {
                if !kinds.contains(&packet.kind()) {
                    continue;
                }
            }

            print_packet(&packet, &peer, format);
            printed = printed.saturating_add(1);

            if let Some(count) = args.count {
                if printed >= count {
                    return Ok(SUCCESS);
                }
            }
        }
    }

    Ok(SUCCESS)
}

/// A listener plus every client it accepted, all tracked by one selector.
struct Server {
    listener: Listener,
    selector: Selector,
    ready: ReadySets,
    buffers: HashMap<RawFd, PacketBuffer>,
    echo: bool,
}

impl Server {
    fn bind(address: Address, backlog: i32, poll_interval: Duration) -> CliResult<Self> {
        let listener =
            Listener::bind(address, backlog).map_err(|err| transport_error("bind failed", err))?;
        let mut selector = Selector::new().with_timeout(Some(poll_interval));
        selector
            .add(&listener)
            .map_err(|err| select_error("cannot watch listener", err))?;

        Ok(Self {
            listener,
            selector,
            ready: ReadySets::readable_only(),
            buffers: HashMap::new(),
            echo: false,
        })
    }

    fn local_address(&self) -> Option<Address> {
        self.listener.local_address().ok()
    }

    fn clients(&self) -> usize {
        self.selector.len() - 1
    }

    /// Wait up to one poll interval and return every packet that arrived.
    fn poll_once(&mut self) -> CliResult<Vec<(Packet, Address)>> {
        match self.selector.poll(&mut self.ready) {
            Ok(PollOutcome::Ready(_)) => {}
            Ok(PollOutcome::Timeout) => return Ok(Vec::new()),
            Err(SelectError::Os(err)) if err.kind() == io::ErrorKind::Interrupted => {
                return Ok(Vec::new());
            }
            Err(err) => return Err(select_error("poll failed", err)),
        }

        let readable: Vec<Endpoint> = self.ready.readable().to_vec();
        let mut received = Vec::new();
        for endpoint in readable {
            if endpoint == self.listener {
                self.accept()?;
            } else {
                self.drain(&endpoint, &mut received);
            }
        }
        Ok(received)
    }

    fn accept(&mut self) -> CliResult<()> {
        let client = self
            .listener
            .accept()
            .map_err(|err| transport_error("accept failed", err))?;
        tracing::info!(peer = %client.peer_address(), fd = client.raw_fd(), "client connected");

        if let Err(err) = self.selector.add(client) {
            // Dropping the endpoint closes it.
            tracing::warn!(error = %err, "client rejected");
        }
        Ok(())
    }

    fn drain(&mut self, endpoint: &Endpoint, received: &mut Vec<(Packet, Address)>) {
        let fd = endpoint.raw_fd();
        let buffer = self.buffers.entry(fd).or_default();

        // Select only promises that some bytes are waiting, not a whole packet.
        let peer = match endpoint.receive_with(buffer, Some(DONT_WAIT)) {
            Ok(peer) => peer,
            Err(TransportError::Receive(err)) if err.kind() == io::ErrorKind::WouldBlock => {
                tracing::trace!(fd, retained = buffer.filled_bytes(), "partial packet");
                return;
            }
            Err(err) => {
                if matches!(err, TransportError::PeerHangup) {
                    tracing::info!(fd, "client disconnected");
                } else {
                    tracing::warn!(fd, error = %err, "dropping client");
                }
                self.selector.remove(endpoint);
                self.buffers.remove(&fd);
                return;
            }
        };

        for packet in buffer.drain_packets() {
            if self.echo {
                if let Err(err) = endpoint.send(&packet) {
                    tracing::warn!(fd, error = %err, "echo failed");
                }
            }
            received.push((packet, peer));
        }
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
