use std::time::Duration;

use log::debug;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::error::QueryError;
use crate::packet::{RequestPacket, ResponsePacket, RECV_BUF_LEN};
use crate::registry::HostPort;

/// Used when a caller has no timeout of its own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Send one out-of-band request to `address` and wait for a single reply.
///
/// `timeout_dur` bounds the whole exchange, name lookup included. There is
/// exactly one receive attempt; a silent server yields [QueryError::Timeout].
pub(crate) async fn round_trip(
    address: &HostPort,
    request: RequestPacket,
    timeout_dur: Duration,
) -> Result<ResponsePacket, QueryError> {
    timeout(timeout_dur, exchange(address, request)).await?
}

async fn exchange(address: &HostPort, request: RequestPacket) -> Result<ResponsePacket, QueryError> {
    // any local port will do
    let sock: UdpSocket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(QueryError::BindFailed)?;

    sock.connect((address.host.as_str(), address.port))
        .await
        .map_err(QueryError::ConnectionFailed)?;

    debug!("-> {}: {} bytes", address, request.body().len());
    sock.send(&request.pack())
        .await
        .map_err(QueryError::SendFailed)?;

    let mut resp_buf = vec![0u8; RECV_BUF_LEN];
    let len = sock
        .recv(&mut resp_buf)
        .await
        .map_err(QueryError::ReceiveFailed)?;
    debug!("<- {}: {} bytes", address, len);

    ResponsePacket::unpack(&resp_buf[..len])
}

/// Query `address` with an out-of-band `command` (usually `getstatus`) and
/// return the reply payload with the marker stripped, ready for
/// [crate::status::parse_status].
///
/// Example usage:
/// ```no_run
/// # async fn run() -> Result<(), rq3query::error::QueryError> {
/// use rq3query::query::{query_status, DEFAULT_TIMEOUT};
/// use rq3query::registry::HostPort;
///
/// let addr = HostPort::new("127.0.0.1", 27960);
/// let payload = query_status(&addr, "getstatus", DEFAULT_TIMEOUT).await?;
/// # Ok(())
/// # }
/// ```
pub async fn query_status(
    address: &HostPort,
    command: &str,
    timeout_dur: Duration,
) -> Result<Vec<u8>, QueryError> {
    let packet = round_trip(address, RequestPacket::new(command), timeout_dur).await?;
    Ok(packet.into_body())
}
