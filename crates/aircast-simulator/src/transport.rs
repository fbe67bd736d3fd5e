//! `std::net` implementations of the core's listener and connection traits.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::time::{Duration, Instant};

use log::{debug, warn};

use aircast_core::http::Connection;
use aircast_core::server::Acceptor;

/// A silent client is dropped after this long.
const READ_TIMEOUT: Duration = Duration::from_secs(10);
/// How long to wait for the client to finish sending after we are done.
const LINGER: Duration = Duration::from_millis(250);
/// Hard limit on draining, however the client keeps trickling data.
const DRAIN_DEADLINE: Duration = Duration::from_secs(1);

pub struct StdAcceptor {
    listener: TcpListener,
}

impl StdAcceptor {
    /// Listen on all local addresses.
    pub fn bind(port: u16) -> io::Result<Self> {
        Ok(Self {
            listener: TcpListener::bind(("0.0.0.0", port))?,
        })
    }
}

impl Acceptor for StdAcceptor {
    type Connection<'a> = StdConnection;
    type Error = io::Error;

    async fn accept(&mut self) -> io::Result<StdConnection> {
        let (stream, peer) = self.listener.accept()?;
        debug!("HTTP: client {}", peer);
        stream.set_read_timeout(Some(READ_TIMEOUT))?;
        Ok(StdConnection { stream })
    }
}

pub struct StdConnection {
    stream: TcpStream,
}

impl Connection for StdConnection {
    type Error = io::Error;

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.stream.write_all(buf)
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }

    /// Half-close, then drain whatever the client still sends so the kernel
    /// does not answer unread data with a reset. Draining stops after
    /// [`LINGER`] of silence or at [`DRAIN_DEADLINE`].
    async fn close(mut self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Write) {
            warn!("HTTP: shutdown failed: {}", e);
            return;
        }

        let deadline = Instant::now() + DRAIN_DEADLINE;
        let mut sink = [0u8; 256];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!("HTTP: client still sending at close, dropping it");
                return;
            }
            if self.stream.set_read_timeout(Some(remaining.min(LINGER))).is_err() {
                return;
            }
            if !matches!(self.stream.read(&mut sink), Ok(n) if n > 0) {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use embassy_futures::block_on;

    use super::*;

    #[test]
    fn test_close_gives_up_on_a_trickling_client() {
        let mut acceptor = StdAcceptor::bind(0).unwrap();
        let addr = acceptor.listener.local_addr().unwrap();

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(("127.0.0.1", addr.port())).unwrap();
            // One byte every 50 ms for 3 s, well past the drain deadline
            for _ in 0..60 {
                if stream.write_all(&[b'x']).is_err() {
                    break;
                }
                thread::sleep(Duration::from_millis(50));
            }
        });

        let conn = block_on(acceptor.accept()).unwrap();
        let started = Instant::now();
        block_on(conn.close());
        let elapsed = started.elapsed();

        assert!(elapsed >= DRAIN_DEADLINE - LINGER, "returned after {elapsed:?}");
        assert!(elapsed < DRAIN_DEADLINE * 2, "returned after {elapsed:?}");
        client.join().unwrap();
    }

    #[test]
    fn test_close_returns_once_client_is_quiet() {
        let mut acceptor = StdAcceptor::bind(0).unwrap();
        let addr = acceptor.listener.local_addr().unwrap();

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(("127.0.0.1", addr.port())).unwrap();
            stream.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();
            let mut rest = Vec::new();
            // Sees our half-close as EOF, then closes its side
            stream.read_to_end(&mut rest).unwrap();
        });

        let conn = block_on(acceptor.accept()).unwrap();
        let started = Instant::now();
        block_on(conn.close());

        assert!(started.elapsed() < DRAIN_DEADLINE);
        client.join().unwrap();
    }
}
