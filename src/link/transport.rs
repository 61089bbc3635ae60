//! Transport abstraction: any byte-oriented channel.
//!
//! Concrete implementations:
//! - UART serial (the production control channel)
//! - [`LoopbackTransport`] (host simulation and tests)
//!
//! The command loop is generic over `Transport`, so a new channel needs
//! no changes to the loop.

use std::collections::VecDeque;

/// Byte-oriented transport channel.
pub trait Transport {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` bytes into `buf`.
    /// Returns the number of bytes actually read.
    /// Returns 0 if no data is available (non-blocking).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write `data` to the transport.
    /// Returns the number of bytes actually written.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Check if data is available for reading.
    fn available(&self) -> bool;

    /// Write all of `data`.  A channel that stops accepting bytes drops the
    /// remainder.
    fn write_all(&mut self, mut data: &[u8]) -> Result<(), Self::Error> {
        while !data.is_empty() {
            let n = self.write(data)?;
            if n == 0 {
                break;
            }
            data = &data[n.min(data.len())..];
        }
        Ok(())
    }
}

/// A null transport that discards all writes and never reads.
pub struct NullTransport;

impl Transport for NullTransport {
    type Error = ();

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> {
        Ok(0)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn available(&self) -> bool {
        false
    }
}

/// In-memory channel: bytes pushed with [`push_rx`](Self::push_rx) are
/// read back by the loop, everything written is kept for inspection.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    flushes: usize,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes as if received from the host.
    pub fn push_rx(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Everything written so far.
    pub fn tx(&self) -> &[u8] {
        &self.tx
    }

    /// Drain written output as CRLF-terminated lines.
    pub fn take_lines(&mut self) -> Vec<String> {
        let text = String::from_utf8_lossy(&self.tx).into_owned();
        self.tx.clear();
        text.split_terminator("\r\n").map(str::to_owned).collect()
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    pub fn pending_rx(&self) -> usize {
        self.rx.len()
    }
}

impl Transport for LoopbackTransport {
    type Error = core::convert::Infallible;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut n = 0;
        for slot in buf.iter_mut() {
            match self.rx.pop_front() {
                Some(b) => {
                    *slot = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        self.tx.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.flushes += 1;
        Ok(())
    }

    fn available(&self) -> bool {
        !self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_reads_in_order() {
        let mut t = LoopbackTransport::new();
        t.push_rx(b"12");
        assert!(t.available());
        let mut b = [0u8; 1];
        assert_eq!(t.read(&mut b).unwrap(), 1);
        assert_eq!(b[0], b'1');
        assert_eq!(t.read(&mut b).unwrap(), 1);
        assert_eq!(b[0], b'2');
        assert!(!t.available());
        assert_eq!(t.read(&mut b).unwrap(), 0);
    }

    #[test]
    fn take_lines_splits_on_crlf() {
        let mut t = LoopbackTransport::new();
        t.write_all(b"a\r\nbc\r\n").unwrap();
        assert_eq!(t.take_lines(), vec!["a".to_owned(), "bc".to_owned()]);
        assert!(t.tx().is_empty());
    }

    #[test]
    fn null_transport_swallows_writes() {
        let mut t = NullTransport;
        assert!(!t.available());
        assert_eq!(t.write(b"xyz"), Ok(3));
    }

    struct Trickle {
        out: Vec<u8>,
        budget: usize,
    }

    impl Transport for Trickle {
        type Error = ();
        fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> {
            Ok(0)
        }
        fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
            let n = data.len().min(2).min(self.budget);
            self.budget -= n;
            self.out.extend_from_slice(&data[..n]);
            Ok(n)
        }
        fn flush(&mut self) -> Result<(), ()> {
            Ok(())
        }
        fn available(&self) -> bool {
            false
        }
    }

    #[test]
    fn write_all_handles_partial_writes() {
        let mut t = Trickle {
            out: Vec::new(),
            budget: 100,
        };
        t.write_all(b"hello").unwrap();
        assert_eq!(t.out, b"hello");
    }

    #[test]
    fn write_all_stops_on_stalled_channel() {
        let mut t = Trickle {
            out: Vec::new(),
            budget: 3,
        };
        t.write_all(b"hello").unwrap();
        assert_eq!(t.out, b"hel");
    }
}
