//! WebSocket plumbing over `tokio-tungstenite`.
//!
//! The push channel is receive-only, so the writer half only answers pings
//! and closes. [`connect`] builds the handshake request with extra headers
//! and returns split halves for use in `tokio::select!` loops.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Received WebSocket message.
#[derive(Debug)]
pub enum WsMessage {
    /// UTF-8 text frame.
    Text(String),
    /// Ping frame with payload.
    Ping(Vec<u8>),
    /// Close frame with status code and reason.
    Close {
        /// WebSocket close code (1005 = no code).
        code: u16,
        /// Close reason.
        reason: String,
    },
    /// Binary or pong frame; not used by the push channel.
    Other,
}

/// Write half of a WebSocket connection.
#[derive(Debug)]
pub struct WsWriter {
    sink: futures_util::stream::SplitSink<WsStream, tungstenite::Message>,
}

impl WsWriter {
    /// Answer a ping.
    pub async fn send_pong(&mut self, data: Vec<u8>) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Pong(data))
            .await
            .context("WebSocket send_pong failed")
    }

    /// Flush pending writes and close the sink.
    pub async fn close(&mut self) -> Result<()> {
        self.sink.close().await.context("WebSocket close failed")
    }
}

/// Read half of a WebSocket connection.
#[derive(Debug)]
pub struct WsReader {
    stream: futures_util::stream::SplitStream<WsStream>,
}

impl WsReader {
    /// Receive the next message, returning `None` when the stream ends.
    pub async fn recv(&mut self) -> Option<Result<WsMessage>> {
        let message = match self.stream.next().await? {
            Ok(message) => message,
            Err(e) => return Some(Err(anyhow::anyhow!("WebSocket read error: {e}"))),
        };

        Some(Ok(match message {
            tungstenite::Message::Text(text) => WsMessage::Text(text.to_string()),
            tungstenite::Message::Ping(data) => WsMessage::Ping(data.to_vec()),
            tungstenite::Message::Close(frame) => {
                let (code, reason) = frame
                    .map(|cf| (cf.code.into(), cf.reason.to_string()))
                    .unwrap_or((1005, String::new()));
                WsMessage::Close { code, reason }
            }
            tungstenite::Message::Binary(_)
            | tungstenite::Message::Pong(_)
            | tungstenite::Message::Frame(_) => WsMessage::Other,
        }))
    }
}

/// Connect to a WebSocket URL with extra handshake headers.
///
/// # Errors
///
/// Returns an error if the URL is invalid, a header is malformed, or the
/// handshake fails.
pub async fn connect(url: &str, headers: &[(String, String)]) -> Result<(WsWriter, WsReader)> {
    use tungstenite::client::IntoClientRequest;

    let mut request = url
        .into_client_request()
        .with_context(|| format!("invalid WebSocket URL: {url}"))?;

    for (name, value) in headers {
        let header_name = tungstenite::http::HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("invalid header name: {name}"))?;
        let header_value = tungstenite::http::HeaderValue::from_str(value)
            .with_context(|| format!("invalid header value for {name}"))?;
        request.headers_mut().insert(header_name, header_value);
    }

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .context("WebSocket connect failed")?;

    let (sink, stream) = ws_stream.split();

    Ok((WsWriter { sink }, WsReader { stream }))
}

/// Convert an HTTP(S) URL to the WS(S) scheme.
///
/// `ws://` and `wss://` pass through unchanged.
#[must_use]
pub fn http_to_ws_scheme(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        url.to_string()
    }
}

/// Push channel URL for a server URL and channel path.
#[must_use]
pub fn push_url(server_url: &str, path: &str) -> String {
    format!(
        "{}{}",
        http_to_ws_scheme(server_url.trim_end_matches('/')),
        path
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_to_ws_scheme() {
        assert_eq!(http_to_ws_scheme("https://example.com"), "wss://example.com");
        assert_eq!(
            http_to_ws_scheme("http://localhost:8000"),
            "ws://localhost:8000"
        );
        assert_eq!(
            http_to_ws_scheme("wss://example.com/ws/"),
            "wss://example.com/ws/"
        );
    }

    #[test]
    fn test_http_to_ws_scheme_only_rewrites_prefix() {
        assert_eq!(
            http_to_ws_scheme("http://example.com/?next=http://x"),
            "ws://example.com/?next=http://x"
        );
    }

    #[test]
    fn test_push_url() {
        assert_eq!(
            push_url("https://dquora.example/", "/ws/notifications/"),
            "wss://dquora.example/ws/notifications/"
        );
        assert_eq!(
            push_url("http://localhost:8000", "/ws/notifications/"),
            "ws://localhost:8000/ws/notifications/"
        );
    }

    #[tokio::test]
    async fn test_connect_invalid_url_returns_error() {
        assert!(connect("not-a-url", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_connect_invalid_header_returns_error() {
        let headers = vec![("bad header".to_string(), "v".to_string())];
        assert!(connect("ws://127.0.0.1:1/ws/", &headers).await.is_err());
    }

    #[tokio::test]
    async fn test_connect_unreachable_host_returns_error() {
        assert!(connect("ws://127.0.0.1:1/ws/notifications/", &[])
            .await
            .is_err());
    }
}
