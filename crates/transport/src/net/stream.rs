//! Full-length reads and writes over a byte stream.
//!
//! Both loops keep issuing syscalls until the whole buffer has moved, and stop
//! early on an orderly close, a timeout or a hard error. The caller always gets
//! back how far the transfer got.

use std::io::{self, Read, Write};

#[derive(Debug)]
pub enum Interruption {
    /// The peer shut the stream down before the buffer was filled.
    PeerClosed,
    /// The socket receive or send timeout expired.
    TimedOut,
    Failed(io::Error),
}

#[derive(Debug)]
pub struct Transfer {
    pub requested: usize,
    pub transferred: usize,
    pub interruption: Option<Interruption>,
}

impl Transfer {
    fn new(requested: usize) -> Self {
        Self {
            requested,
            transferred: 0,
            interruption: None,
        }
    }

    /// Bytes that were requested but never moved.
    pub fn shortfall(&self) -> usize {
        self.requested - self.transferred
    }

    pub fn is_complete(&self) -> bool {
        self.transferred == self.requested
    }

    pub fn error(&self) -> Option<&io::Error> {
        match &self.interruption {
            Some(Interruption::Failed(e)) => Some(e),
            _ => None,
        }
    }
}

pub fn read_full<R: Read>(mut reader: R, buf: &mut [u8]) -> Transfer {
    let mut transfer = Transfer::new(buf.len());

    while transfer.transferred < buf.len() {
        match reader.read(&mut buf[transfer.transferred..]) {
            Ok(0) => {
                transfer.interruption = Some(Interruption::PeerClosed);
                break;
            }
            Ok(n) => transfer.transferred += n,
            Err(e) => match classify(e) {
                Some(interruption) => {
                    transfer.interruption = Some(interruption);
                    break;
                }
                None => continue,
            },
        }
    }

    transfer
}

pub fn write_full<W: Write>(mut writer: W, buf: &[u8]) -> Transfer {
    let mut transfer = Transfer::new(buf.len());

    while transfer.transferred < buf.len() {
        match writer.write(&buf[transfer.transferred..]) {
            Ok(0) => {
                transfer.interruption = Some(Interruption::Failed(io::Error::from(
                    io::ErrorKind::WriteZero,
                )));
                break;
            }
            Ok(n) => transfer.transferred += n,
            Err(e) => match classify(e) {
                Some(interruption) => {
                    transfer.interruption = Some(interruption);
                    break;
                }
                None => continue,
            },
        }
    }

    transfer
}

// None means the call was interrupted by a signal and should be retried.
fn classify(e: io::Error) -> Option<Interruption> {
    match e.kind() {
        io::ErrorKind::Interrupted => None,
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Some(Interruption::TimedOut),
        _ => Some(Interruption::Failed(e)),
    }
}
