use std::io::{self, ErrorKind, Write};

use bytes::Bytes;
use hellobench::http::writer::{Progress, ResponseWriter};

/// Accepts at most `limit` bytes per call and every other call pretends the
/// send buffer is full.
struct ThrottledSink {
    data: Vec<u8>,
    limit: usize,
    calls: usize,
}

impl ThrottledSink {
    fn new(limit: usize) -> Self {
        Self {
            data: Vec::new(),
            limit,
            calls: 0,
        }
    }
}

impl Write for ThrottledSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.calls += 1;
        if self.calls % 2 == 0 {
            return Err(ErrorKind::WouldBlock.into());
        }
        let n = buf.len().min(self.limit);
        self.data.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct ClosedSink;

impl Write for ClosedSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Ok(0)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct ResetSink;

impl Write for ResetSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(ErrorKind::ConnectionReset.into())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_single_write_completes() {
    let mut writer = ResponseWriter::new(Bytes::from_static(b"hello"));
    let mut out = Vec::new();

    assert_eq!(writer.write_some(&mut out).unwrap(), Progress::Done);
    assert_eq!(out, b"hello");
    assert_eq!(writer.written(), 5);
    assert!(writer.is_complete());
}

#[test]
fn test_short_writes_resume_from_cursor() {
    let payload = Bytes::from_static(b"HTTP/1.1 200 OK\r\nContent-Length: 13\r\n\r\nHello, World!");
    let mut writer = ResponseWriter::new(payload.clone());
    let mut sink = ThrottledSink::new(7);

    let mut attempts = 0;
    loop {
        attempts += 1;
        match writer.write_some(&mut sink).unwrap() {
            Progress::Done => break,
            Progress::Partial(n) => assert!(n <= 7),
        }
        assert!(attempts < 100, "writer made no progress");
    }

    assert_eq!(sink.data, &payload[..]);
    assert_eq!(writer.written(), payload.len());
    assert!(writer.remaining().is_empty());
}

#[test]
fn test_would_block_is_progress_not_error() {
    let mut writer = ResponseWriter::new(Bytes::from_static(b"abcdef"));
    let mut sink = ThrottledSink::new(2);

    assert_eq!(writer.write_some(&mut sink).unwrap(), Progress::Partial(2));
    assert_eq!(writer.write_some(&mut sink).unwrap(), Progress::Partial(0));
    assert_eq!(writer.written(), 2);
    assert_eq!(writer.remaining(), b"cdef");
}

#[test]
fn test_zero_length_write_is_an_error() {
    let mut writer = ResponseWriter::new(Bytes::from_static(b"abc"));

    let err = writer.write_some(&mut ClosedSink).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WriteZero);
    assert_eq!(writer.written(), 0);
}

#[test]
fn test_reset_is_propagated() {
    let mut writer = ResponseWriter::new(Bytes::from_static(b"abc"));

    let err = writer.write_some(&mut ResetSink).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionReset);
}

#[test]
fn test_complete_writer_does_not_write_again() {
    let mut writer = ResponseWriter::new(Bytes::from_static(b"x"));
    let mut out = Vec::new();

    writer.write_some(&mut out).unwrap();
    // A sink that would fail proves no further write is attempted.
    assert_eq!(writer.write_some(&mut ResetSink).unwrap(), Progress::Done);
    assert_eq!(out, b"x");
}
