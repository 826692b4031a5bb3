//! Error reporting channel.
//!
//! Every failure in sockframe is returned to the caller *and* announced on a
//! [`Reporter`]. A reporter is a cheap cloneable handle around an
//! [`ErrorSink`]; components take one by injection (`with_reporter`,
//! `with_config`, ...) and fall back to the process-wide reporter otherwise.
//!
//! The process-wide reporter starts out as [`StderrSink`]. Replace it once at
//! startup with [`init`], or restore the default with [`reset`]:
//!
//! ```
//! use std::sync::Arc;
//! use sockframe_frame::report::{self, CollectingSink, Reporter};
//!
//! let sink = Arc::new(CollectingSink::default());
//! report::init(Reporter::from_arc(sink.clone()));
//! // ... run code that may fail ...
//! report::reset();
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// What went wrong. The numeric [`code`](ErrorKind::code) is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SocketCreate,
    Bind,
    Connect,
    Listen,
    Accept,
    SetOption,
    GetOption,
    Send,
    Receive,
    /// Orderly shutdown by the remote end of a stream.
    PeerHangup,
    OversizedPayload,
    UndersizedBuffer,
    MalformedFrame,
    SelectorFailure,
    /// `poll` was called with every readiness class disabled.
    SelectorNoTarget,
}

impl ErrorKind {
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::SocketCreate => 100,
            ErrorKind::Bind => 110,
            ErrorKind::Connect => 111,
            ErrorKind::Listen => 112,
            ErrorKind::Accept => 113,
            ErrorKind::SetOption => 114,
            ErrorKind::GetOption => 115,
            ErrorKind::Send => 116,
            ErrorKind::Receive => 117,
            ErrorKind::PeerHangup => 118,
            ErrorKind::OversizedPayload => 200,
            ErrorKind::UndersizedBuffer => 250,
            ErrorKind::MalformedFrame => 251,
            ErrorKind::SelectorFailure => 300,
            ErrorKind::SelectorNoTarget => 302,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::SocketCreate => "socket-create",
            ErrorKind::Bind => "bind",
            ErrorKind::Connect => "connect",
            ErrorKind::Listen => "listen",
            ErrorKind::Accept => "accept",
            ErrorKind::SetOption => "set-option",
            ErrorKind::GetOption => "get-option",
            ErrorKind::Send => "send",
            ErrorKind::Receive => "receive",
            ErrorKind::PeerHangup => "peer-hangup",
            ErrorKind::OversizedPayload => "oversized-payload",
            ErrorKind::UndersizedBuffer => "undersized-buffer",
            ErrorKind::MalformedFrame => "malformed-frame",
            ErrorKind::SelectorFailure => "selector-failure",
            ErrorKind::SelectorNoTarget => "selector-no-target",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    /// Socket descriptor involved, if any.
    pub descriptor: Option<i32>,
    pub kind: ErrorKind,
    /// Raw OS errno, if the failure came from a system call.
    pub os_error: Option<i32>,
}

impl ErrorEvent {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            descriptor: None,
            kind,
            os_error: None,
        }
    }

    pub fn on_descriptor(mut self, descriptor: i32) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    /// Attach the errno carried by an I/O error, if it has one.
    pub fn with_io(mut self, err: &std::io::Error) -> Self {
        self.os_error = err.raw_os_error();
        self
    }
}

impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.kind, self.kind.code())?;
        if let Some(fd) = self.descriptor {
            write!(f, " on socket {fd}")?;
        }
        if let Some(errno) = self.os_error {
            write!(f, ": {}", std::io::Error::from_raw_os_error(errno))?;
        }
        Ok(())
    }
}

/// Receives reported failures. Implementations must not panic.
pub trait ErrorSink: Send + Sync {
    fn report(&self, event: &ErrorEvent);
}

/// Writes one line per event to standard error. The process-wide default.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl ErrorSink for StderrSink {
    fn report(&self, event: &ErrorEvent) {
        eprintln!("sockframe error: {event}");
    }
}

/// Forwards events to `tracing` at WARN level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, event: &ErrorEvent) {
        tracing::warn!(
            kind = event.kind.as_str(),
            code = event.kind.code(),
            descriptor = event.descriptor,
            os_error = event.os_error,
            "sockframe error"
        );
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ErrorEvent>>,
}

impl CollectingSink {
    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<ErrorEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of recorded events of one kind.
    pub fn count_of(&self, kind: ErrorKind) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|event| event.kind == kind)
            .count()
    }

    pub fn take(&self) -> Vec<ErrorEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, event: &ErrorEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Cloneable handle to an [`ErrorSink`].
#[derive(Clone)]
pub struct Reporter {
    sink: Arc<dyn ErrorSink>,
}

static GLOBAL: RwLock<Option<Reporter>> = RwLock::new(None);

impl Reporter {
    pub fn new(sink: impl ErrorSink + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Wrap a shared sink, keeping a handle to it on the caller's side.
    pub fn from_arc(sink: Arc<dyn ErrorSink>) -> Self {
        Self { sink }
    }

    /// The process-wide reporter ([`StderrSink`] unless replaced by [`init`]).
    pub fn global() -> Self {
        GLOBAL
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| Reporter::new(StderrSink))
    }

    pub fn report(&self, event: ErrorEvent) {
        self.sink.report(&event);
    }

    /// Report an OS failure on a descriptor.
    pub fn report_io(&self, kind: ErrorKind, descriptor: Option<i32>, err: &std::io::Error) {
        let mut event = ErrorEvent::new(kind).with_io(err);
        event.descriptor = descriptor;
        self.report(event);
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::global()
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter").finish_non_exhaustive()
    }
}

/// Install the process-wide reporter.
pub fn init(reporter: Reporter) {
    *GLOBAL.write().unwrap_or_else(PoisonError::into_inner) = Some(reporter);
}

/// Restore the default process-wide reporter ([`StderrSink`]).
pub fn reset() {
    *GLOBAL.write().unwrap_or_else(PoisonError::into_inner) = None;
}
