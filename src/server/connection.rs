//! Per-connection state machine for the event loop.
//!
//! ```text
//!   accept
//!     │
//!     ▼
//! ┌─────────────────┐ readable: read one chunk,
//! │ AwaitingRequest │ quiesce, schedule timer
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐ no interest at all; the
//! │  AwaitingDelay  │ loop never sees this socket
//! └────────┬────────┘
//!          │ timer fired: attach response, arm writable
//!          ▼
//! ┌─────────────────┐ writable: one write attempt
//! │  ReadyToWrite   │──────────────┐
//! └────────┬────────┘              │
//!          │ short write           │ cursor at end
//!          ▼                       │
//! ┌─────────────────┐ writable     │
//! │     Writing     │──────────────┤
//! └─────────────────┘              ▼
//!                            ┌──────────┐
//!                            │  Closed  │
//!                            └──────────┘
//! ```
//!
//! [`step`] and [`on_timer`] are pure: they only decide. [`Connection`]
//! carries out what they decide against any `Read + Write` stream, which
//! keeps the I/O testable without a socket or a poller.

use std::io::{self, ErrorKind, Read, Write};

use bytes::Bytes;
use mio::Interest;
use tracing::{debug, trace};

use crate::http::response::ResponseProvider;
use crate::http::writer::{Progress, ResponseWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingRequest,
    AwaitingDelay,
    ReadyToWrite,
    Writing,
    Closed,
}

impl Phase {
    /// Readiness the poller must report for this phase. `None` means the
    /// socket is deregistered.
    pub fn interest(self) -> Option<Interest> {
        match self {
            Phase::AwaitingRequest => Some(Interest::READABLE),
            Phase::ReadyToWrite | Phase::Writing => Some(Interest::WRITABLE),
            Phase::AwaitingDelay | Phase::Closed => None,
        }
    }
}

/// Which operations a readiness event reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ready {
    pub readable: bool,
    pub writable: bool,
}

impl Ready {
    pub const READABLE: Ready = Ready {
        readable: true,
        writable: false,
    };
    pub const WRITABLE: Ready = Ready {
        readable: false,
        writable: true,
    };
}

impl From<&mio::event::Event> for Ready {
    // Hang-ups and socket errors surface through the next read or write.
    fn from(event: &mio::event::Event) -> Self {
        Ready {
            readable: event.is_readable() || event.is_read_closed() || event.is_error(),
            writable: event.is_writable() || event.is_write_closed() || event.is_error(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Event does not concern the current phase.
    None,
    /// Read one chunk, drop interest, start the delay.
    ReadAndQuiesce,
    /// One write attempt from the cursor.
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub next: Phase,
    pub action: Action,
}

/// Decides what a readiness event means for a connection in `phase`.
///
/// For [`Action::Write`], `next` is the phase while bytes remain; reaching
/// the end of the response moves to [`Phase::Closed`] instead.
pub fn step(phase: Phase, ready: Ready) -> Step {
    match phase {
        Phase::AwaitingRequest if ready.readable => Step {
            next: Phase::AwaitingDelay,
            action: Action::ReadAndQuiesce,
        },
        Phase::ReadyToWrite | Phase::Writing if ready.writable => Step {
            next: Phase::Writing,
            action: Action::Write,
        },
        _ => Step {
            next: phase,
            action: Action::None,
        },
    }
}

/// Phase to enter when the delay for a connection in `phase` expires.
/// `None` for anything but [`Phase::AwaitingDelay`]: the timer is stale.
pub fn on_timer(phase: Phase) -> Option<Phase> {
    match phase {
        Phase::AwaitingDelay => Some(Phase::ReadyToWrite),
        _ => None,
    }
}

/// What the event loop has to do with the registration afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Leave the registration alone.
    Idle,
    /// Deregister and schedule the delayed wake-up.
    Quiesce,
    /// Bytes remain; keep (re-arm) writable interest.
    Rearm,
    /// Response flushed; deregister and drop the socket.
    Close,
}

#[derive(Debug)]
pub struct Connection<S> {
    stream: S,
    phase: Phase,
    writer: Option<ResponseWriter>,
}

impl<S> Connection<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            phase: Phase::AwaitingRequest,
            writer: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Bytes of the response flushed so far.
    pub fn written(&self) -> usize {
        self.writer.as_ref().map_or(0, ResponseWriter::written)
    }

    pub fn has_response(&self) -> bool {
        self.writer.is_some()
    }

    /// Applies an expired delay: attaches `payload` with a fresh cursor and
    /// moves to [`Phase::ReadyToWrite`]. Returns `false`, changing nothing,
    /// if the connection is no longer waiting on a timer.
    pub fn on_timer(&mut self, payload: Bytes) -> bool {
        match on_timer(self.phase) {
            Some(next) => {
                self.writer = Some(ResponseWriter::new(payload));
                self.phase = next;
                true
            }
            None => false,
        }
    }

    pub fn close(&mut self) {
        self.phase = Phase::Closed;
    }
}

impl<S: Read + Write> Connection<S> {
    /// Runs the I/O for one readiness event.
    ///
    /// An `Err` leaves the connection [`Phase::Closed`]; the caller drops it.
    pub fn handle(
        &mut self,
        ready: Ready,
        read_buffer: usize,
        provider: &ResponseProvider,
    ) -> io::Result<Directive> {
        let Step { next, action } = step(self.phase, ready);

        let result = match action {
            Action::None => return Ok(Directive::Idle),
            Action::ReadAndQuiesce => self.read_request(read_buffer).map(|n| {
                trace!(read = n, "request chunk discarded");
                self.phase = next;
                Directive::Quiesce
            }),
            Action::Write => self.write_response(next, provider),
        };

        if result.is_err() {
            self.phase = Phase::Closed;
        }
        result
    }

    /// One non-blocking read. How much arrives does not matter; nothing is
    /// parsed, so an empty or spurious read still counts.
    fn read_request(&mut self, read_buffer: usize) -> io::Result<usize> {
        let mut buf = vec![0u8; read_buffer.max(1)];
        match self.stream.read(&mut buf) {
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn write_response(
        &mut self,
        partial: Phase,
        provider: &ResponseProvider,
    ) -> io::Result<Directive> {
        // The timer always attaches the response before arming writable, so
        // this only guards against a state that should not occur.
        let writer = self.writer.get_or_insert_with(|| {
            debug!("no response attached at write time, attaching a fresh one");
            ResponseWriter::new(provider.get())
        });

        match writer.write_some(&mut self.stream)? {
            Progress::Done => {
                self.phase = Phase::Closed;
                Ok(Directive::Close)
            }
            Progress::Partial(n) => {
                trace!(wrote = n, total = writer.written(), "short write");
                self.phase = partial;
                Ok(Directive::Rearm)
            }
        }
    }
}
