//! The listening side of the page server.
//!
//! A [`Server`] owns the single listening endpoint for the life of the device
//! and handles one connection at a time. Failures never stop it: a failed
//! accept is logged and retried after a short pause, a failed connection is
//! logged and dropped.

use core::fmt::Debug;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;
use log::{debug, info, warn};

use crate::http::{Connection, Served, handle_connection};
use crate::slot::SharedSampleSlot;

/// Pause after a failed accept before listening again.
pub const ACCEPT_BACKOFF_MS: u32 = 200;

/// Source of inbound connections on the listening port.
pub trait Acceptor {
    type Connection<'a>: Connection
    where
        Self: 'a;
    type Error: Debug;

    /// Wait for the next client.
    fn accept(&mut self) -> impl Future<Output = Result<Self::Connection<'_>, Self::Error>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    Served(Served),
    HandlerFailed,
    AcceptFailed,
}

pub struct Server<'a, A, D, M>
where
    M: RawMutex,
{
    acceptor: A,
    delay: D,
    slot: &'a SharedSampleSlot<M>,
}

impl<'a, A, D, M> Server<'a, A, D, M>
where
    A: Acceptor,
    D: DelayNs,
    M: RawMutex,
{
    pub fn new(acceptor: A, delay: D, slot: &'a SharedSampleSlot<M>) -> Self {
        Self {
            acceptor,
            delay,
            slot,
        }
    }

    /// Accept one client and serve it.
    pub async fn serve_one(&mut self) -> ServeOutcome {
        let conn = match self.acceptor.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("HTTP: accept failed: {:?}", e);
                self.delay.delay_ms(ACCEPT_BACKOFF_MS).await;
                return ServeOutcome::AcceptFailed;
            }
        };

        match handle_connection(conn, self.slot).await {
            Ok(served) => {
                debug!("HTTP: {:?}", served);
                ServeOutcome::Served(served)
            }
            Err(e) => {
                warn!("HTTP: connection failed: {:?}", e);
                ServeOutcome::HandlerFailed
            }
        }
    }

    /// Serve clients forever.
    pub async fn run(mut self) -> ! {
        info!("HTTP: listening");
        loop {
            self.serve_one().await;
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::collections::VecDeque;
    use std::vec::Vec;

    use super::*;
    use crate::reading::SensorReading;
    use crate::test_support::{RecordingDelay, StubConnection, StubIoError, Transcript};
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[derive(Default)]
    struct StubAcceptor {
        pending: VecDeque<Result<Transcript, StubIoError>>,
        accepted: Vec<Transcript>,
    }

    impl Acceptor for StubAcceptor {
        type Connection<'a> = StubConnection<'a>;
        type Error = StubIoError;

        async fn accept(&mut self) -> Result<StubConnection<'_>, StubIoError> {
            let transcript = self.pending.pop_front().expect("no more clients")?;
            self.accepted.push(transcript);
            Ok(StubConnection::new(self.accepted.last_mut().unwrap()))
        }
    }

    #[test]
    fn test_server_survives_failures() {
        let slot = SharedSampleSlot::<NoopRawMutex>::new();
        slot.publish(SensorReading::new(650.0, 22.0, 47.0));

        let mut failing_write = Transcript::with_request(b"GET /");
        failing_write.fail_writes = true;
        let acceptor = StubAcceptor {
            pending: [
                Err(StubIoError),
                Ok(Transcript::with_request(b"GET / HTTP/1.1\r\n\r\n")),
                Ok(Transcript::with_request(b"")),
                Ok(failing_write),
                Ok(Transcript::with_request(b"GET /again")),
            ]
            .into_iter()
            .collect(),
            ..StubAcceptor::default()
        };
        let mut server = Server::new(acceptor, RecordingDelay::default(), &slot);

        let outcomes: Vec<_> = (0..5).map(|_| block_on(server.serve_one())).collect();

        assert!(matches!(outcomes[0], ServeOutcome::AcceptFailed));
        assert!(matches!(
            outcomes[1],
            ServeOutcome::Served(Served::Page { .. })
        ));
        assert_eq!(outcomes[2], ServeOutcome::Served(Served::PeerClosed));
        assert_eq!(outcomes[3], ServeOutcome::HandlerFailed);
        assert!(matches!(
            outcomes[4],
            ServeOutcome::Served(Served::Page { .. })
        ));

        assert_eq!(server.delay.delays_ms(), [ACCEPT_BACKOFF_MS]);
        assert_eq!(server.acceptor.accepted.len(), 4);
        assert!(server.acceptor.accepted.iter().all(|t| t.closes == 1));
        assert!(server.acceptor.accepted[3].response().contains(">650.00 ppm<"));
    }
}
