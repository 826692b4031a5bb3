//! Readiness multiplexing for sockframe endpoints.
//!
//! A [`Selector`] tracks stream, datagram and listening endpoints and, on each
//! [`Selector::poll`], partitions them into caller-owned readable, writable and
//! faulty collections. It is built on `select(2)`, so descriptors must be
//! below `FD_SETSIZE`.

pub mod error;
#[cfg(unix)]
pub mod selector;
#[cfg(unix)]
mod sys;

pub use error::{Result, SelectError};

#[cfg(unix)]
pub use selector::{PollOutcome, ReadySets, Selector};
