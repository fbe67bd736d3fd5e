//! Captive DNS
//!
//! Every name a client looks up resolves to the device itself, so whatever
//! host is typed into a browser on the access point lands on the status page.

use core::net::{Ipv4Addr, SocketAddr};
use core::time::Duration;

use edge_nal::{UdpReceive, UdpSend};
use embedded_hal_async::delay::DelayNs;
use log::{debug, info, warn};

pub const DNS_PORT: u16 = 53;
/// Plain DNS over UDP never exceeds this.
pub const DNS_BUF_LEN: usize = 512;
/// Clients may cache the forged answers only briefly.
pub const ANSWER_TTL: Duration = Duration::from_secs(60);
/// Pause after a socket error before listening again.
const ERROR_BACKOFF_MS: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Answered(SocketAddr),
    /// Not a query we can answer; nothing was sent back
    Ignored(SocketAddr),
}

/// Write the answer to `request` into `reply`, pointing at `gateway`.
///
/// Returns the reply length, or `None` for datagrams that are not a
/// well-formed query.
pub fn answer_query(request: &[u8], gateway: Ipv4Addr, reply: &mut [u8]) -> Option<usize> {
    match edge_captive::reply(request, &gateway.octets(), ANSWER_TTL, reply) {
        Ok(len) => Some(len),
        Err(e) => {
            debug!("DNS: unanswerable datagram: {:?}", e);
            None
        }
    }
}

/// Receive one datagram and answer it.
pub async fn serve_query<S>(
    socket: &mut S,
    gateway: Ipv4Addr,
    rx_buf: &mut [u8],
    tx_buf: &mut [u8],
) -> Result<QueryOutcome, S::Error>
where
    S: UdpReceive + UdpSend,
{
    let (len, remote) = socket.receive(rx_buf).await?;

    let Some(reply_len) = answer_query(&rx_buf[..len], gateway, tx_buf) else {
        return Ok(QueryOutcome::Ignored(remote));
    };
    socket.send(remote, &tx_buf[..reply_len]).await?;
    debug!("DNS: answered {}", remote);
    Ok(QueryOutcome::Answered(remote))
}

/// Answer queries on an already bound socket forever.
pub async fn run<S, D>(mut socket: S, mut delay: D, gateway: Ipv4Addr) -> !
where
    S: UdpReceive + UdpSend,
    D: DelayNs,
{
    let mut rx_buf = [0u8; DNS_BUF_LEN];
    let mut tx_buf = [0u8; DNS_BUF_LEN];
    info!("DNS: resolving every name to {}", gateway);

    loop {
        if let Err(e) = serve_query(&mut socket, gateway, &mut rx_buf, &mut tx_buf).await {
            warn!("DNS: socket error: {:?}", e);
            delay.delay_ms(ERROR_BACKOFF_MS).await;
        }
    }
}
