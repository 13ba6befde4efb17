//! PIPE-mode transport: hands ordering, blocking, and handoff atomicity to
//! the kernel's pipe implementation.
//!
//! One `write`/`read` of exactly `size_of::<usize>()` bytes carries one
//! element: the payload is boxed and its raw pointer, cast to `usize`, is
//! the word transmitted. POSIX guarantees writes up to `PIPE_BUF` are
//! atomic; `init` confirms via `fpathconf(_PC_PIPE_BUF)` that the pipe can
//! carry at least one pointer-sized word atomically.
//!
//! Deadlines are absolute `Instant`s. Unlike the historical C source this
//! is grounded on — which derived a poll timeout from only the
//! nanosecond field of a `timespec`, silently truncating any deadline more
//! than a second out — every poll call here recomputes the relative
//! timeout from the full remaining duration at the moment it's needed.

use std::io;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Instant;

use crate::error::{PushError, QueueError, ShiftError};

const CLOSED: i32 = -1;
const WORD_BYTES: usize = std::mem::size_of::<usize>();

pub(crate) struct PipeTransport<T> {
    read_fd: AtomicI32,
    write_fd: AtomicI32,
    _marker: std::marker::PhantomData<T>,
}

// SAFETY: the fds are plain kernel handles; `T` only ever crosses this
// boundary boxed and moved by value, never aliased.
unsafe impl<T: Send> Send for PipeTransport<T> {}
unsafe impl<T: Send> Sync for PipeTransport<T> {}

impl<T> PipeTransport<T> {
    pub(crate) fn new() -> Result<Self, QueueError> {
        let mut fds = [0i32; 2];
        // SAFETY: `fds` points at two valid `c_int`s for `pipe` to fill in.
        if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
            return Err(QueueError::Os(io::Error::last_os_error()));
        }
        let (read_fd, write_fd) = (fds[0], fds[1]);

        if let Err(e) = set_nonblocking(read_fd).and_then(|()| set_nonblocking(write_fd)) {
            close_both(read_fd, write_fd);
            return Err(QueueError::Os(e));
        }

        // SAFETY: `write_fd` is open and was just created above.
        let pipe_buf = unsafe { libc::fpathconf(write_fd, libc::_PC_PIPE_BUF) };
        if pipe_buf < 0 {
            close_both(read_fd, write_fd);
            return Err(QueueError::Os(io::Error::last_os_error()));
        }
        if (pipe_buf as usize) < WORD_BYTES {
            close_both(read_fd, write_fd);
            return Err(QueueError::config(
                "pipe atomic-write capacity is smaller than one pointer-sized word",
            ));
        }

        Ok(Self {
            read_fd: AtomicI32::new(read_fd),
            write_fd: AtomicI32::new(write_fd),
            _marker: std::marker::PhantomData,
        })
    }

    pub(crate) fn push(&self, payload: T, deadline: Option<Instant>) -> Result<(), PushError<T>> {
        let write_fd = self.write_fd.load(Ordering::Acquire);
        if write_fd < 0 {
            return Err(PushError::Poisoned(payload));
        }

        // SAFETY: recovered by exactly one of the paths below, each of
        // which either hands the word to the kernel exactly once or
        // reconstructs the box to return `payload` to the caller.
        let word = Box::into_raw(Box::new(payload)) as usize;
        let bytes = word.to_ne_bytes();

        match write_word(write_fd, &bytes) {
            Ok(true) => {
                crate::insights::record_push_ok();
                Ok(())
            }
            Ok(false) => {
                self.poison_write(write_fd);
                // SAFETY: the kernel never received a complete copy of `word`;
                // it is still solely owned by this box.
                drop(unsafe { Box::from_raw(word as *mut T) });
                Err(PushError::Corrupted)
            }
            Err(e) if is_would_block(&e) => {
                let Some(deadline) = deadline else {
                    return Err(PushError::Again(reclaim(word)));
                };
                match wait_for(write_fd, libc::POLLOUT, deadline) {
                    PollOutcome::Ready => match write_word(write_fd, &bytes) {
                        Ok(true) => {
                            crate::insights::record_push_ok();
                            Ok(())
                        }
                        Ok(false) => {
                            self.poison_write(write_fd);
                            drop(unsafe { Box::from_raw(word as *mut T) });
                            Err(PushError::Corrupted)
                        }
                        Err(e) if is_would_block(&e) => Err(PushError::Again(reclaim(word))),
                        Err(e) => Err(PushError::Os(reclaim(word), e)),
                    },
                    PollOutcome::TimedOut => {
                        crate::insights::record_timeout();
                        Err(PushError::TimedOut(reclaim(word)))
                    }
                    PollOutcome::Error(e) => Err(PushError::Os(reclaim(word), e)),
                }
            }
            Err(e) => Err(PushError::Os(reclaim(word), e)),
        }
    }

    pub(crate) fn shift(&self, deadline: Option<Instant>) -> Result<T, ShiftError> {
        let read_fd = self.read_fd.load(Ordering::Acquire);
        if read_fd < 0 {
            return Err(ShiftError::Poisoned);
        }

        match read_word(read_fd) {
            Ok(Some(word)) => {
                crate::insights::record_shift_ok();
                // SAFETY: `word` was produced by a matching push's
                // `Box::into_raw::<T>`, transmitted as a single intact word.
                Ok(*unsafe { Box::from_raw(word as *mut T) })
            }
            Ok(None) => {
                self.poison_read(read_fd);
                Err(ShiftError::Corrupted)
            }
            Err(e) if is_would_block(&e) => {
                // A pipe conflates "no data yet" with "would block"; the
                // queue therefore reports AGAIN here rather than EMPTY —
                // preserved from the reference transport, not a MUTEX-mode
                // equivalence.
                let Some(deadline) = deadline else {
                    return Err(ShiftError::Again);
                };
                match wait_for(read_fd, libc::POLLIN, deadline) {
                    PollOutcome::Ready => match read_word(read_fd) {
                        Ok(Some(word)) => {
                            crate::insights::record_shift_ok();
                            Ok(*unsafe { Box::from_raw(word as *mut T) })
                        }
                        Ok(None) => {
                            self.poison_read(read_fd);
                            Err(ShiftError::Corrupted)
                        }
                        Err(e) if is_would_block(&e) => Err(ShiftError::Again),
                        Err(e) => Err(ShiftError::Os(e)),
                    },
                    PollOutcome::TimedOut => {
                        crate::insights::record_timeout();
                        Err(ShiftError::TimedOut)
                    }
                    PollOutcome::Error(e) => Err(ShiftError::Os(e)),
                }
            }
            Err(e) => Err(ShiftError::Os(e)),
        }
    }

    /// Drains the read end with repeated non-blocking reads until `EAGAIN`,
    /// handing each recovered payload to `callback`. A no-op if the read
    /// end is already poisoned.
    pub(crate) fn flush(&self, mut callback: impl FnMut(T)) -> Result<(), ShiftError> {
        let read_fd = self.read_fd.load(Ordering::Acquire);
        if read_fd < 0 {
            return Ok(());
        }
        loop {
            match read_word(read_fd) {
                Ok(Some(word)) => {
                    // SAFETY: see `shift`.
                    callback(*unsafe { Box::from_raw(word as *mut T) });
                }
                Ok(None) => {
                    self.poison_read(read_fd);
                    return Err(ShiftError::Corrupted);
                }
                Err(e) if is_would_block(&e) => return Ok(()),
                Err(e) => return Err(ShiftError::Os(e)),
            }
        }
    }

    fn poison_write(&self, observed: i32) {
        if self
            .write_fd
            .compare_exchange(observed, CLOSED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            crate::insights::record_poisoned("pipe write end: partial transfer");
            // SAFETY: this call exclusively won the transition to CLOSED.
            unsafe { libc::close(observed) };
        }
    }

    fn poison_read(&self, observed: i32) {
        if self
            .read_fd
            .compare_exchange(observed, CLOSED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            crate::insights::record_poisoned("pipe read end: partial transfer");
            // SAFETY: this call exclusively won the transition to CLOSED.
            unsafe { libc::close(observed) };
        }
    }
}

impl<T> Drop for PipeTransport<T> {
    fn drop(&mut self) {
        let read_fd = self.read_fd.swap(CLOSED, Ordering::AcqRel);
        let write_fd = self.write_fd.swap(CLOSED, Ordering::AcqRel);
        // SAFETY: each fd is closed at most once — the swap above hands
        // this call exclusive ownership of whatever value was observed.
        unsafe {
            if read_fd >= 0 {
                libc::close(read_fd);
            }
            if write_fd >= 0 {
                libc::close(write_fd);
            }
        }
    }
}

/// Reconstructs the box from a word that the kernel never received (or
/// only partially), handing ownership of `T` back to the caller.
fn reclaim<T>(word: usize) -> T {
    // SAFETY: `word` is a pointer this call produced via `Box::into_raw`
    // moments earlier and which was never transmitted to a reader.
    *unsafe { Box::from_raw(word as *mut T) }
}

enum PollOutcome {
    Ready,
    TimedOut,
    Error(io::Error),
}

fn wait_for(fd: i32, events: libc::c_short, deadline: Instant) -> PollOutcome {
    let now = Instant::now();
    if deadline <= now {
        return PollOutcome::TimedOut;
    }
    let remaining_ms = (deadline - now).as_millis().min(i32::MAX as u128) as i32;

    let mut pfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };
    // SAFETY: `pfd` is a single, exclusively-owned pollfd valid for the
    // duration of this call.
    let ready = unsafe { libc::poll(&mut pfd, 1, remaining_ms) };
    match ready {
        n if n < 0 => PollOutcome::Error(io::Error::last_os_error()),
        0 => PollOutcome::TimedOut,
        _ => PollOutcome::Ready,
    }
}

fn write_word(fd: i32, bytes: &[u8; WORD_BYTES]) -> io::Result<bool> {
    // SAFETY: `bytes` is a valid buffer of its own length; `fd` was
    // checked non-negative by every caller before reaching here.
    let n = unsafe { libc::write(fd, bytes.as_ptr() as *const libc::c_void, bytes.len()) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(n as usize == bytes.len())
}

fn read_word(fd: i32) -> io::Result<Option<usize>> {
    let mut bytes = [0u8; WORD_BYTES];
    // SAFETY: `bytes` is a valid, correctly sized buffer; `fd` was checked
    // non-negative by every caller before reaching here.
    let n = unsafe { libc::read(fd, bytes.as_mut_ptr() as *mut libc::c_void, bytes.len()) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    if n as usize != bytes.len() {
        return Ok(None);
    }
    Ok(Some(usize::from_ne_bytes(bytes)))
}

fn is_would_block(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock || e.raw_os_error() == Some(libc::EAGAIN)
}

fn set_nonblocking(fd: i32) -> io::Result<()> {
    // SAFETY: `fd` is a valid, just-created pipe endpoint.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: as above.
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn close_both(read_fd: i32, write_fd: i32) {
    // SAFETY: both fds were returned by the `pipe()` call this function's
    // only caller just made, and are closed exactly once here.
    unsafe {
        libc::close(read_fd);
        libc::close(write_fd);
    }
}
