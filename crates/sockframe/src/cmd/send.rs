use std::fs;

use sockframe_frame::{Packet, PacketBuffer, DEFAULT_MAX_WIRE_SIZE};
use sockframe_transport::{DatagramEndpoint, Endpoint, PacketTransport, StreamEndpoint};

use crate::cmd::SendArgs;
use crate::exit::{frame_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_packet, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    let packet = Packet::try_new(args.kind, &payload, DEFAULT_MAX_WIRE_SIZE)
        .map_err(|err| frame_error("invalid packet", err))?;

    let endpoint: Endpoint = if args.udp {
        DatagramEndpoint::new(args.address)
            .map_err(|err| transport_error("socket setup failed", err))?
            .into()
    } else {
        StreamEndpoint::connect(args.address)
            .map_err(|err| transport_error("connect failed", err))?
            .into()
    };

    endpoint
        .send(&packet)
        .map_err(|err| transport_error("send failed", err))?;
    tracing::debug!(kind = packet.kind(), size = payload.len(), to = %args.address, "packet sent");

    if args.wait {
        let mut buffer = PacketBuffer::new();
        let from = endpoint
            .receive_from(&mut buffer)
            .map_err(|err| transport_error("receive failed", err))?;
        let reply = buffer
            .pop_packet()
            .ok_or_else(|| CliError::new(INTERNAL, "receive returned without a packet"))?;
        print_packet(&reply, &from, format);
    }

    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path).map_err(|err| {
            crate::exit::io_error(&format!("failed reading {}", path.display()), err)
        });
    }
    Ok(Vec::new())
}
