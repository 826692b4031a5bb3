//! Typed packet framing and select-driven multiplexing over TCP and UDP.
//!
//! sockframe sends small typed packets (a 16-bit kind plus up to 65531 bytes
//! of payload) over stream and datagram sockets, reassembles them from
//! arbitrary chunks, and multiplexes many sockets on one thread.
//!
//! # Crate Structure
//!
//! - [`frame`]: packets, the wire header, and the reassembly buffer
//! - [`transport`]: addresses, stream/datagram endpoints, listeners
//! - [`select`]: readiness multiplexing (behind the `select` feature)

/// Re-export frame types.
pub mod frame {
    pub use sockframe_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use sockframe_transport::*;
}

/// Re-export selector types (requires `select` feature).
#[cfg(feature = "select")]
pub mod select {
    pub use sockframe_select::*;
}
