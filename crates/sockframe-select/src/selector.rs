use std::os::fd::{AsRawFd, RawFd};
use std::time::Duration;

use sockframe_frame::{ErrorEvent, ErrorKind, Reporter};
use sockframe_transport::Endpoint;
use tracing::{debug, trace, warn};

use crate::error::{Result, SelectError};
use crate::sys::{self, FdSet, FD_LIMIT};

/// Caller-owned result collections for [`Selector::poll`].
///
/// A `None` field disables that readiness class: it is neither asked of the
/// OS nor touched by `poll`.
#[derive(Debug, Default)]
pub struct ReadySets {
    pub readable: Option<Vec<Endpoint>>,
    pub writable: Option<Vec<Endpoint>>,
    pub faulty: Option<Vec<Endpoint>>,
}

impl ReadySets {
    /// Every class enabled.
    pub fn all() -> Self {
        Self {
            readable: Some(Vec::new()),
            writable: Some(Vec::new()),
            faulty: Some(Vec::new()),
        }
    }

    pub fn readable_only() -> Self {
        Self {
            readable: Some(Vec::new()),
            ..Self::default()
        }
    }

    /// Ready-to-read endpoints from the last poll; empty when disabled.
    pub fn readable(&self) -> &[Endpoint] {
        self.readable.as_deref().unwrap_or_default()
    }

    pub fn writable(&self) -> &[Endpoint] {
        self.writable.as_deref().unwrap_or_default()
    }

    pub fn faulty(&self) -> &[Endpoint] {
        self.faulty.as_deref().unwrap_or_default()
    }

    fn is_disabled(&self) -> bool {
        self.readable.is_none() && self.writable.is_none() && self.faulty.is_none()
    }

    fn clear(&mut self) {
        for set in [&mut self.readable, &mut self.writable, &mut self.faulty] {
            if let Some(set) = set {
                set.clear();
            }
        }
    }
}

/// Result of a successful poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing became ready before the timeout.
    Timeout,
    /// Number of (descriptor, class) pairs that are ready.
    Ready(usize),
}

/// Tracks endpoints and asks the OS which of them are ready.
///
/// Each tracked endpoint is a clone that shares the caller's descriptor, so
/// removing it only closes the socket if nothing else holds it.
#[derive(Debug)]
pub struct Selector {
    tracked: Vec<Endpoint>,
    highest: RawFd,
    timeout: Option<Duration>,
    reporter: Reporter,
}

impl Selector {
    /// Empty selector with a zero (non-blocking) timeout.
    pub fn new() -> Self {
        Self {
            tracked: Vec::new(),
            highest: 0,
            timeout: Some(Duration::ZERO),
            reporter: Reporter::global(),
        }
    }

    /// Override the poll timeout. `None` blocks until something is ready.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Track an endpoint. Adding a descriptor that is already tracked does nothing.
    pub fn add(&mut self, endpoint: impl Into<Endpoint>) -> Result<()> {
        let endpoint = endpoint.into();
        let fd = endpoint.raw_fd();

        if !(0..FD_LIMIT).contains(&fd) {
            let event = ErrorEvent::new(ErrorKind::SelectorFailure).on_descriptor(fd);
            self.reporter.report(event);
            return Err(SelectError::DescriptorOutOfRange {
                descriptor: fd,
                max: FD_LIMIT - 1,
            });
        }
        if self.contains(&endpoint) {
            return Ok(());
        }

        self.highest = self.highest.max(fd);
        self.tracked.push(endpoint);
        debug!(fd, tracked = self.tracked.len(), "selector add");
        Ok(())
    }

    /// Stop tracking the endpoint with the same descriptor as `endpoint`.
    ///
    /// Returns whether anything was removed.
    pub fn remove<S: AsRawFd + ?Sized>(&mut self, endpoint: &S) -> bool {
        let fd = endpoint.as_raw_fd();
        let Some(index) = self.tracked.iter().position(|e| e.raw_fd() == fd) else {
            return false;
        };
        self.tracked.remove(index);

        if fd == self.highest {
            self.highest = self.tracked.iter().map(Endpoint::raw_fd).max().unwrap_or(0);
        }
        debug!(fd, tracked = self.tracked.len(), "selector remove");
        true
    }

    pub fn remove_all(&mut self) {
        self.tracked.clear();
        self.highest = 0;
    }

    pub fn contains<S: AsRawFd + ?Sized>(&self, endpoint: &S) -> bool {
        let fd = endpoint.as_raw_fd();
        self.tracked.iter().any(|e| e.raw_fd() == fd)
    }

    /// Snapshot of the tracked endpoints in insertion order.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.tracked.clone()
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Largest tracked descriptor, or 0 when nothing is tracked.
    pub fn highest_descriptor(&self) -> RawFd {
        self.highest
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Wait for readiness and partition the tracked endpoints into `sets`.
    ///
    /// Every enabled set is cleared first, so stale entries never survive a
    /// poll. On `Ready`, each enabled set holds its ready endpoints in
    /// insertion order.
    pub fn poll(&mut self, sets: &mut ReadySets) -> Result<PollOutcome> {
        if sets.is_disabled() {
            self.reporter.report(ErrorEvent::new(ErrorKind::SelectorNoTarget));
            return Err(SelectError::NothingToReport);
        }

        let mut read = sets.readable.as_ref().map(|_| self.fd_set());
        let mut write = sets.writable.as_ref().map(|_| self.fd_set());
        let mut except = sets.faulty.as_ref().map(|_| self.fd_set());

        let result = sys::select(
            self.highest + 1,
            read.as_mut(),
            write.as_mut(),
            except.as_mut(),
            self.timeout,
        );
        sets.clear();

        match result {
            Err(err) => {
                warn!(error = %err, "select failed");
                self.reporter.report_io(ErrorKind::SelectorFailure, None, &err);
                Err(SelectError::Os(err))
            }
            Ok(0) => {
                trace!("selector timeout");
                Ok(PollOutcome::Timeout)
            }
            Ok(ready) => {
                self.collect(&mut sets.readable, read.as_ref());
                self.collect(&mut sets.writable, write.as_ref());
                self.collect(&mut sets.faulty, except.as_ref());
                trace!(ready, "selector ready");
                Ok(PollOutcome::Ready(ready))
            }
        }
    }

    fn fd_set(&self) -> FdSet {
        let mut set = FdSet::new();
        for endpoint in &self.tracked {
            set.insert(endpoint.raw_fd());
        }
        set
    }

    fn collect(&self, out: &mut Option<Vec<Endpoint>>, ready: Option<&FdSet>) {
        if let (Some(out), Some(ready)) = (out.as_mut(), ready) {
            out.extend(
                self.tracked
                    .iter()
                    .filter(|endpoint| ready.contains(endpoint.raw_fd()))
                    .cloned(),
            );
        }
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sockframe_frame::report::CollectingSink;
    use sockframe_frame::{Packet, PacketBuffer};
    use sockframe_transport::{Address, DatagramEndpoint, Listener, PacketTransport, StreamEndpoint};

    use super::*;

    fn loopback() -> Address {
        Address::new("127.0.0.1", 0).unwrap()
    }

    fn listener() -> Listener {
        Listener::bind(loopback(), Listener::DEFAULT_BACKLOG).unwrap()
    }

    fn datagram() -> Endpoint {
        DatagramEndpoint::bound(loopback()).unwrap().into()
    }

    fn fds(endpoints: &[Endpoint]) -> Vec<RawFd> {
        endpoints.iter().map(Endpoint::raw_fd).collect()
    }

    #[test]
    fn readiness_is_partitioned_by_class() {
        let pending = listener();
        let client: Endpoint = StreamEndpoint::connect(pending.local_address().unwrap())
            .unwrap()
            .into();
        let idle = listener();

        let mut selector = Selector::new().with_timeout(Some(Duration::from_millis(20)));
        selector.add(&pending).unwrap();
        selector.add(&client).unwrap();
        selector.add(&idle).unwrap();

        let mut sets = ReadySets::all();
        for _ in 0..50 {
            selector.poll(&mut sets).unwrap();
            if !sets.readable().is_empty() {
                break;
            }
        }

        assert_eq!(fds(sets.readable()), [pending.raw_fd()]);
        assert_eq!(fds(sets.writable()), [client.raw_fd()]);
        assert!(sets.faulty().is_empty());
    }

    #[test]
    fn timeout_clears_stale_results() {
        let idle = listener();
        let stale = datagram();

        let mut selector = Selector::new().with_timeout(Some(Duration::from_millis(10)));
        selector.add(&idle).unwrap();

        let mut sets = ReadySets::readable_only();
        sets.readable.as_mut().unwrap().push(stale);

        assert_eq!(selector.poll(&mut sets).unwrap(), PollOutcome::Timeout);
        assert!(sets.readable().is_empty());
    }

    #[test]
    fn disabled_classes_are_left_alone() {
        let rx = datagram();
        let tx = DatagramEndpoint::new(rx.socket().local_address().unwrap()).unwrap();
        tx.send(&Packet::new(1, b"ping")).unwrap();

        let mut selector = Selector::new().with_timeout(Some(Duration::from_secs(1)));
        selector.add(&rx).unwrap();

        let mut sets = ReadySets::readable_only();
        let outcome = selector.poll(&mut sets).unwrap();

        assert_eq!(outcome, PollOutcome::Ready(1));
        assert_eq!(sets.readable(), [rx.clone()]);
        assert!(sets.writable.is_none());
        assert!(sets.faulty.is_none());

        let mut buffer = PacketBuffer::new();
        sets.readable()[0].receive(&mut buffer).unwrap();
        assert_eq!(buffer.pop_packet().unwrap().payload(), b"ping");
    }

    #[test]
    fn nothing_to_report_skips_the_os() {
        let sink = Arc::new(CollectingSink::default());
        let mut selector = Selector::new()
            .with_timeout(None)
            .with_reporter(Reporter::from_arc(sink.clone()));
        selector.add(datagram()).unwrap();

        let err = selector.poll(&mut ReadySets::default()).unwrap_err();

        assert!(matches!(err, SelectError::NothingToReport));
        assert_eq!(sink.count_of(ErrorKind::SelectorNoTarget), 1);
    }

    #[test]
    fn os_failure_is_reported_and_clears_sets() {
        let sink = Arc::new(CollectingSink::default());
        let mut selector = Selector::new()
            .with_timeout(Some(Duration::from_millis(10)))
            .with_reporter(Reporter::from_arc(sink.clone()));
        selector.add(datagram()).unwrap();
        // A negative nfds makes select(2) fail with EINVAL.
        selector.highest = -2;

        let mut sets = ReadySets::readable_only();
        sets.readable.as_mut().unwrap().push(datagram());

        let err = selector.poll(&mut sets).unwrap_err();

        assert!(matches!(err, SelectError::Os(ref e) if e.raw_os_error() == Some(libc::EINVAL)));
        assert!(sets.readable().is_empty());
        assert_eq!(sink.count_of(ErrorKind::SelectorFailure), 1);
        assert_eq!(sink.events()[0].os_error, Some(libc::EINVAL));
    }

    #[test]
    fn highest_descriptor_tracks_removal_and_reuse() {
        let mut sockets: Vec<Endpoint> = (0..3).map(|_| datagram()).collect();
        sockets.sort_by_key(Endpoint::raw_fd);
        let (a, b, c) = (&sockets[0], &sockets[1], &sockets[2]);

        let mut selector = Selector::new();
        assert_eq!(selector.highest_descriptor(), 0);

        selector.add(a).unwrap();
        selector.add(c).unwrap();
        assert_eq!(selector.highest_descriptor(), c.raw_fd());

        assert!(selector.remove(c));
        assert_eq!(selector.highest_descriptor(), a.raw_fd());

        selector.add(b).unwrap();
        assert_eq!(selector.highest_descriptor(), b.raw_fd());

        selector.remove_all();
        assert_eq!(selector.highest_descriptor(), 0);
        assert!(selector.is_empty());
    }

    #[test]
    fn add_and_remove_share_the_descriptor() {
        let endpoint = datagram();
        assert_eq!(endpoint.handle_count(), 1);

        let mut selector = Selector::new();
        selector.add(&endpoint).unwrap();
        assert_eq!(endpoint.handle_count(), 2);

        assert!(selector.remove(&endpoint));
        assert_eq!(endpoint.handle_count(), 1);
        assert!(!selector.remove(&endpoint));
    }

    #[test]
    fn duplicate_add_is_ignored() {
        let endpoint = datagram();
        let mut selector = Selector::new();

        selector.add(&endpoint).unwrap();
        selector.add(endpoint.clone()).unwrap();

        assert_eq!(selector.len(), 1);
        assert!(selector.contains(&endpoint));
        assert_eq!(selector.endpoints(), [endpoint]);
    }

    #[test]
    fn endpoints_snapshot_keeps_insertion_order() {
        let first = datagram();
        let second = datagram();
        let mut selector = Selector::new();
        selector.add(&second).unwrap();
        selector.add(&first).unwrap();

        assert_eq!(fds(&selector.endpoints()), [second.raw_fd(), first.raw_fd()]);
    }

    #[test]
    fn removing_unknown_descriptor_is_a_no_op() {
        let tracked = datagram();
        let other = datagram();
        let mut selector = Selector::new();
        selector.add(&tracked).unwrap();

        assert!(!selector.remove(&other));
        assert_eq!(selector.len(), 1);
        assert_eq!(selector.highest_descriptor(), tracked.raw_fd());
    }
}
