use std::io::{self, ErrorKind, Write};

use bytes::Bytes;

/// Outcome of a single best-effort write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Bytes remain; the value is how many this attempt flushed (may be 0).
    Partial(usize),
    /// The cursor reached the end of the payload.
    Done,
}

/// An encoded response plus how far into it the peer has been written.
#[derive(Debug, Clone)]
pub struct ResponseWriter {
    buffer: Bytes,
    written: usize,
}

impl ResponseWriter {
    pub fn new(buffer: Bytes) -> Self {
        Self { buffer, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn remaining(&self) -> &[u8] {
        &self.buffer[self.written..]
    }

    pub fn is_complete(&self) -> bool {
        self.written >= self.buffer.len()
    }

    /// Performs exactly one write of the remaining bytes.
    ///
    /// Short writes, `WouldBlock` and `Interrupted` are progress, not errors.
    /// A zero-length write with bytes still pending means the peer is gone.
    pub fn write_some<W: Write>(&mut self, stream: &mut W) -> io::Result<Progress> {
        if self.is_complete() {
            return Ok(Progress::Done);
        }

        match stream.write(self.remaining()) {
            Ok(0) => Err(io::Error::new(
                ErrorKind::WriteZero,
                "connection closed while writing",
            )),
            Ok(n) => {
                self.written += n;
                if self.is_complete() {
                    Ok(Progress::Done)
                } else {
                    Ok(Progress::Partial(n))
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                Ok(Progress::Partial(0))
            }
            Err(e) => Err(e),
        }
    }
}
