//! embassy-net transport for the page server
//!
//! One TCP socket is reused for every client, so the device talks to exactly
//! one client at a time; anyone else is refused until it is free again.

use aircast_core::app_state::SampleSlot;
use aircast_core::http::Connection;
use aircast_core::server::{Acceptor, Server};
use embassy_net::Stack;
use embassy_net::tcp::{AcceptError, Error as TcpError, TcpSocket};
use embassy_time::{Duration, with_timeout};
use embedded_io_async::{Read, Write};
use log::{debug, info};

const RX_BUF_LEN: usize = 1024;
const TX_BUF_LEN: usize = 2048;
/// A silent client is dropped after this long.
const RECEIVE_TIMEOUT: Duration = Duration::from_secs(10);
/// Bound on waiting for the client to acknowledge our FIN.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

pub struct TcpAcceptor {
    stack: Stack<'static>,
    port: u16,
    rx_buffer: [u8; RX_BUF_LEN],
    tx_buffer: [u8; TX_BUF_LEN],
}

impl TcpAcceptor {
    pub fn new(stack: Stack<'static>, port: u16) -> Self {
        Self {
            stack,
            port,
            rx_buffer: [0; RX_BUF_LEN],
            tx_buffer: [0; TX_BUF_LEN],
        }
    }
}

impl Acceptor for TcpAcceptor {
    type Connection<'a> = TcpConnection<'a>;
    type Error = AcceptError;

    async fn accept(&mut self) -> Result<TcpConnection<'_>, AcceptError> {
        let mut socket = TcpSocket::new(self.stack, &mut self.rx_buffer, &mut self.tx_buffer);
        socket.set_timeout(Some(RECEIVE_TIMEOUT));
        socket.accept(self.port).await?;
        debug!("HTTP: client {:?}", socket.remote_endpoint());
        Ok(TcpConnection { socket })
    }
}

pub struct TcpConnection<'a> {
    socket: TcpSocket<'a>,
}

impl Connection for TcpConnection<'_> {
    type Error = TcpError;

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, TcpError> {
        Read::read(&mut self.socket, buf).await
    }

    async fn write_all(&mut self, buf: &[u8]) -> Result<(), TcpError> {
        Write::write_all(&mut self.socket, buf).await
    }

    async fn flush(&mut self) -> Result<(), TcpError> {
        Write::flush(&mut self.socket).await
    }

    async fn close(mut self) {
        self.socket.close();
        match with_timeout(CLOSE_TIMEOUT, self.socket.flush()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("HTTP: close failed: {:?}", e),
            Err(_) => {
                debug!("HTTP: client did not acknowledge close, aborting");
                self.socket.abort();
                let _ = with_timeout(CLOSE_TIMEOUT, self.socket.flush()).await;
            }
        }
    }
}

/// Serves the latest reading on `port` forever.
#[embassy_executor::task]
pub async fn http_task(stack: Stack<'static>, port: u16, slot: &'static SampleSlot) {
    stack.wait_config_up().await;
    info!("HTTP: listening on port {}", port);

    let acceptor = TcpAcceptor::new(stack, port);
    Server::new(acceptor, embassy_time::Delay, slot).run().await
}
