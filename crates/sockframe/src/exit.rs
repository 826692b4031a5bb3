use std::fmt;
use std::io;

use sockframe_frame::FrameError;
use sockframe_select::SelectError;
use sockframe_transport::TransportError;

// Exit codes follow the sysexits/timeout conventions used across our CLIs.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrInUse => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Listen { source, .. }
        | TransportError::Accept(source) => io_error(context, source),
        TransportError::Frame(err) => frame_error(context, err),
        TransportError::InvalidAddress(_) => CliError::new(USAGE, format!("{context}: {err}")),
        TransportError::PeerHangup => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn select_error(context: &str, err: SelectError) -> CliError {
    match err {
        SelectError::Os(source) => io_error(context, source),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use sockframe_transport::Address;

    use super::*;

    #[test]
    fn refused_connect_maps_to_failure() {
        let err = TransportError::Connect {
            address: Address::new("127.0.0.1", 1).unwrap(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert_eq!(transport_error("connect failed", err).code, FAILURE);
    }

    #[test]
    fn oversized_payload_is_data_invalid() {
        let err = TransportError::Frame(FrameError::PayloadTooLarge {
            size: 70_000,
            max: 65_531,
        });
        let cli = transport_error("send failed", err);
        assert_eq!(cli.code, DATA_INVALID);
        assert!(cli.message.starts_with("send failed: payload too large"));
    }

    #[test]
    fn bad_address_is_usage() {
        let err = TransportError::InvalidAddress("nowhere".into());
        assert_eq!(transport_error("connect failed", err).code, USAGE);
    }
}
