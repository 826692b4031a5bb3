use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use sockframe_frame::Packet;
use sockframe_transport::Address;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PacketOutput {
    kind: u16,
    wire_len: u16,
    payload_size: usize,
    payload: String,
    peer: String,
    timestamp: String,
}

impl PacketOutput {
    fn new(packet: &Packet, peer: &Address) -> Self {
        Self {
            kind: packet.kind(),
            wire_len: packet.wire_len(),
            payload_size: packet.payload().len(),
            payload: payload_preview(packet.payload()),
            peer: peer.to_string(),
            timestamp: now_unix_seconds(),
        }
    }
}

pub fn print_packet(packet: &Packet, peer: &Address, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", render_json(packet, peer));
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "SIZE", "PEER", "PAYLOAD"])
                .add_row(vec![
                    packet.kind().to_string(),
                    packet.payload().len().to_string(),
                    peer.to_string(),
                    payload_preview(packet.payload()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} - {} ({} bytes from {})",
                packet.kind(),
                payload_preview(packet.payload()),
                packet.payload().len(),
                peer
            );
        }
        OutputFormat::Raw => {
            print_raw(packet.payload());
        }
    }
}

fn render_json(packet: &Packet, peer: &Address) -> String {
    serde_json::to_string(&PacketOutput::new(packet, peer)).unwrap_or_else(|_| "{}".to_string())
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
