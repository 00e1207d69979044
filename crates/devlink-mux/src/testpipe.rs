//! In-memory duplex pipe for exercising the mux without a real transport.
//!
//! Chunks written to one endpoint arrive at the other exactly as written, so
//! tests can control how the byte stream is split across reads. Dropping an
//! endpoint's writer produces EOF on the peer's reader.

use std::io::{Read, Write};
use std::sync::mpsc::{channel, Receiver, Sender};

pub(crate) struct PipeReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
}

pub(crate) struct PipeWriter {
    tx: Sender<Vec<u8>>,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos >= self.pending.len() {
            match self.rx.recv() {
                Ok(data) => {
                    self.pending = data;
                    self.pos = 0;
                }
                Err(_) => return Ok(0), // all writers gone: EOF
            }
        }
        let n = (self.pending.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .send(buf.to_vec())
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub(crate) fn pipe() -> (PipeWriter, PipeReader) {
    let (tx, rx) = channel();
    (
        PipeWriter { tx },
        PipeReader {
            rx,
            pending: Vec::new(),
            pos: 0,
        },
    )
}

/// Two connected endpoints; what one writes, the other reads.
pub(crate) fn duplex() -> ((PipeReader, PipeWriter), (PipeReader, PipeWriter)) {
    let (a_writer, a_reader) = pipe();
    let (b_writer, b_reader) = pipe();
    ((a_reader, b_writer), (b_reader, a_writer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_and_eof() {
        let ((mut left_reader, mut left_writer), (mut right_reader, mut right_writer)) = duplex();

        left_writer.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        right_reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        right_writer.write_all(b"pong").unwrap();
        left_reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"pong");

        drop(right_writer);
        assert_eq!(left_reader.read(&mut buf).unwrap(), 0);
    }
}
