use std::io;
use std::mem::MaybeUninit;
use std::os::fd::RawFd;
use std::ptr;
use std::time::Duration;

/// First descriptor number an `fd_set` cannot hold.
pub(crate) const FD_LIMIT: RawFd = libc::FD_SETSIZE as RawFd;

/// Owned `fd_set`.
pub(crate) struct FdSet(libc::fd_set);

impl FdSet {
    pub(crate) fn new() -> Self {
        let mut raw = MaybeUninit::<libc::fd_set>::uninit();
        // SAFETY: FD_ZERO initialises every bit of the set.
        unsafe {
            libc::FD_ZERO(raw.as_mut_ptr());
            Self(raw.assume_init())
        }
    }

    /// `fd` must be in `0..FD_LIMIT`.
    pub(crate) fn insert(&mut self, fd: RawFd) {
        debug_assert!((0..FD_LIMIT).contains(&fd));
        // SAFETY: `fd` is within the set's range and the set is initialised.
        unsafe { libc::FD_SET(fd, &mut self.0) };
    }

    pub(crate) fn contains(&self, fd: RawFd) -> bool {
        if !(0..FD_LIMIT).contains(&fd) {
            return false;
        }
        // SAFETY: `fd` is within the set's range and the set is initialised.
        unsafe { libc::FD_ISSET(fd, &self.0) }
    }

    fn as_mut_ptr(&mut self) -> *mut libc::fd_set {
        &mut self.0
    }
}

fn timeval(timeout: Duration) -> libc::timeval {
    libc::timeval {
        tv_sec: libc::time_t::try_from(timeout.as_secs()).unwrap_or(libc::time_t::MAX),
        tv_usec: timeout.subsec_micros() as libc::suseconds_t,
    }
}

/// Wait until a descriptor in one of the sets is ready or `timeout` passes.
///
/// `None` blocks indefinitely. Returns the number of ready descriptors; the
/// sets are overwritten with the ready subset.
pub(crate) fn select(
    nfds: RawFd,
    read: Option<&mut FdSet>,
    write: Option<&mut FdSet>,
    except: Option<&mut FdSet>,
    timeout: Option<Duration>,
) -> io::Result<usize> {
    let mut tv = timeout.map(timeval);
    let tv_ptr = tv
        .as_mut()
        .map_or(ptr::null_mut(), |tv| tv as *mut libc::timeval);
    let read = read.map_or(ptr::null_mut(), FdSet::as_mut_ptr);
    let write = write.map_or(ptr::null_mut(), FdSet::as_mut_ptr);
    let except = except.map_or(ptr::null_mut(), FdSet::as_mut_ptr);

    // SAFETY: every pointer is either null or points at a live, initialised
    // value owned by the caller for the duration of the call.
    let rc = unsafe { libc::select(nfds, read, write, except, tv_ptr) };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fd_set_membership() {
        let mut set = FdSet::new();
        assert!(!set.contains(3));
        set.insert(3);
        assert!(set.contains(3));
        assert!(!set.contains(4));
        assert!(!set.contains(-1));
        assert!(!set.contains(FD_LIMIT));
    }

    #[test]
    fn empty_select_times_out() {
        let start = std::time::Instant::now();
        let ready = select(0, None, None, None, Some(Duration::from_millis(5))).unwrap();
        assert_eq!(ready, 0);
        assert!(start.elapsed() >= Duration::from_millis(4));
    }

    #[test]
    fn timeval_splits_seconds_and_micros() {
        let tv = timeval(Duration::from_micros(2_500_001));
        assert_eq!(tv.tv_sec, 2);
        assert_eq!(tv.tv_usec, 500_001);
    }
}
