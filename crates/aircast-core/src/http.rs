//! Per-connection request handling.
//!
//! One invocation serves exactly one client: read whatever the client sent,
//! answer with the status page built from the current slot contents, close.
//! The request itself is never parsed; every method and path gets the same
//! page.

use core::fmt::Debug;

use embassy_sync::blocking_mutex::raw::RawMutex;
use log::debug;
use thiserror_no_std::Error;

use crate::page::{HTTP_HEADER, render_body};
use crate::slot::SharedSampleSlot;

/// Bytes read from the client before answering. The content is discarded.
pub const REQUEST_BUF_LEN: usize = 1024;

/// An accepted client connection.
///
/// `close` takes the connection by value: once it has been called nothing
/// else can be sent on it.
pub trait Connection {
    type Error: Debug;

    /// Read some bytes. `Ok(0)` means the peer closed its side.
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize, Self::Error>>;

    fn write_all(&mut self, buf: &[u8]) -> impl Future<Output = Result<(), Self::Error>>;

    fn flush(&mut self) -> impl Future<Output = Result<(), Self::Error>>;

    /// Gracefully close the connection. Never fails; transports log their
    /// own teardown problems.
    fn close(self) -> impl Future<Output = ()>;
}

/// How a connection ended when nothing went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    /// The page was sent; `bytes` counts header and body
    Page { bytes: usize },
    /// The peer closed before sending anything, so there was no one to answer
    PeerClosed,
}

#[derive(Error, Debug)]
pub enum HandlerError<E> {
    #[error("reading request failed: {0:?}")]
    Read(E),
    #[error("writing response failed: {0:?}")]
    Write(E),
    #[error("page did not fit the response buffer")]
    Render,
}

/// Serve one connection and close it, whatever the outcome.
pub async fn handle_connection<C, M>(
    mut conn: C,
    slot: &SharedSampleSlot<M>,
) -> Result<Served, HandlerError<C::Error>>
where
    C: Connection,
    M: RawMutex,
{
    let result = respond(&mut conn, slot).await;
    conn.close().await;
    result
}

async fn respond<C, M>(
    conn: &mut C,
    slot: &SharedSampleSlot<M>,
) -> Result<Served, HandlerError<C::Error>>
where
    C: Connection,
    M: RawMutex,
{
    let mut request = [0u8; REQUEST_BUF_LEN];
    let received = conn.read(&mut request).await.map_err(HandlerError::Read)?;
    if received == 0 {
        return Ok(Served::PeerClosed);
    }
    debug!("HTTP: {} request bytes received", received);

    let reading = slot.reading_or_default();
    let body = render_body(&reading).map_err(|_| HandlerError::Render)?;

    conn.write_all(HTTP_HEADER.as_bytes())
        .await
        .map_err(HandlerError::Write)?;
    conn.write_all(body.as_bytes())
        .await
        .map_err(HandlerError::Write)?;
    conn.flush().await.map_err(HandlerError::Write)?;

    Ok(Served::Page {
        bytes: HTTP_HEADER.len() + body.len(),
    })
}
