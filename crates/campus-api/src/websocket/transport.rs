// ── Socket transport seam ──
//
// The reconnect loop only needs "open a channel" and "read the next text
// frame". Keeping that behind two traits lets tests script closures and
// refusals without a live server.

use std::future::Future;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;

/// Opens realtime channels.
pub trait Transport: Send + Sync + 'static {
    type Conn: Connection;

    /// Open a channel to `url`. An error counts as an unexpected closure.
    fn open(&self, url: &Url) -> impl Future<Output = Result<Self::Conn, Error>> + Send;
}

/// One open realtime channel.
pub trait Connection: Send + 'static {
    /// Next text payload.
    ///
    /// `None` once the channel is gone. `Some(Err(..))` for a transport
    /// failure or a close frame from the peer.
    fn next_text(&mut self) -> impl Future<Output = Option<Result<String, Error>>> + Send;

    /// Close the channel from our side.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Build the channel address: `base` with the viewer identity appended as
/// an `email` query parameter. The scheme must be `ws` or `wss`.
pub fn endpoint_url(base: &str, identity: &str) -> Result<Url, Error> {
    let mut url = Url::parse(base)?;
    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(Error::UnsupportedScheme {
                scheme: other.to_owned(),
                expected: "ws or wss",
            });
        }
    }
    if !identity.is_empty() {
        url.query_pairs_mut().append_pair("email", identity);
    }
    Ok(url)
}

// ── tokio-tungstenite implementation ─────────────────────────────────

/// [`Transport`] over `tokio-tungstenite` with rustls.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteTransport;

impl Transport for TungsteniteTransport {
    type Conn = TungsteniteConnection;

    async fn open(&self, url: &Url) -> Result<Self::Conn, Error> {
        debug!(url = %url, "opening notification socket");
        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
        Ok(TungsteniteConnection { stream })
    }
}

/// An open `tokio-tungstenite` stream.
pub struct TungsteniteConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Connection for TungsteniteConnection {
    async fn next_text(&mut self) -> Option<Result<String, Error>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    let (code, reason) = frame.map_or((1005, String::new()), |f| {
                        (u16::from(f.code), f.reason.as_str().to_owned())
                    });
                    debug!(code, reason = %reason, "notification socket closed by peer");
                    return Some(Err(Error::WebSocketClosed { code, reason }));
                }
                Ok(Message::Binary(data)) => {
                    debug!(len = data.len(), "ignoring binary frame");
                }
                Ok(_) => {
                    trace!("control frame");
                }
                Err(e) => return Some(Err(Error::WebSocketConnect(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "close handshake failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn appends_identity_as_email_parameter() {
        let url = endpoint_url("wss://ws.example.edu/dev", "ana@uni.edu").unwrap();
        assert_eq!(url.as_str(), "wss://ws.example.edu/dev?email=ana%40uni.edu");
    }

    #[test]
    fn empty_identity_adds_no_parameter() {
        let url = endpoint_url("ws://localhost:3001", "").unwrap();
        assert_eq!(url.query(), None);
    }

    #[test]
    fn rejects_http_scheme() {
        let err = endpoint_url("https://api.example.edu", "ana@uni.edu").unwrap_err();
        assert!(matches!(err, Error::UnsupportedScheme { ref scheme, .. } if scheme == "https"));
    }

    #[test]
    fn rejects_unparseable_address() {
        let err = endpoint_url("not a url", "ana@uni.edu").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
