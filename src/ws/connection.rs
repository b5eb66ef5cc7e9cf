//! WebSocket connection with tokio-tungstenite.
//!
//! The transport comes from [`ConnectJob`]; tungstenite only performs the
//! RFC 6455 upgrade and framing on top of it.

use super::message::{CloseCode, CloseFrame, Message};
use crate::base::neterror::NetError;
use crate::socket::client::SocketType;
use crate::socket::connectjob::ConnectJob;
use crate::socket::proxy::ProxySettings;
use crate::socket::tls::{TlsConfig, TrustPolicy};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{client_async, tungstenite, WebSocketStream};
use url::Url;

/// Type alias for the WebSocket stream.
type WsStream = WebSocketStream<SocketType>;

/// WebSocket connection.
///
/// Cloning yields another handle to the same connection. The sending and
/// receiving halves are locked independently, so one task can block in
/// [`recv`](Self::recv) while another calls [`send`](Self::send).
#[derive(Clone)]
pub struct WebSocket {
    sink: Arc<Mutex<SplitSink<WsStream, tungstenite::Message>>>,
    stream: Arc<Mutex<SplitStream<WsStream>>>,
    url: Url,
    local_addr: SocketAddr,
}

impl std::fmt::Debug for WebSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocket")
            .field("url", &self.url.as_str())
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

impl WebSocket {
    /// Local address of the transport socket.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Send a message.
    pub async fn send(&self, msg: Message) -> Result<(), NetError> {
        let tung_msg = message_to_tungstenite(msg);
        let mut sink = self.sink.lock().await;
        sink.send(tung_msg).await.map_err(|e| {
            tracing::debug!("WebSocket send error: {:?}", e);
            net_error_from_ws(&e)
        })
    }

    /// Send a text message.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), NetError> {
        self.send(Message::Text(text.into())).await
    }

    /// Receive a message.
    ///
    /// Returns `None` once the peer has closed the stream.
    pub async fn recv(&self) -> Result<Option<Message>, NetError> {
        let mut stream = self.stream.lock().await;
        match stream.next().await {
            Some(Ok(msg)) => Ok(Some(tungstenite_to_message(msg))),
            Some(Err(e)) => {
                tracing::debug!("WebSocket recv error: {:?}", e);
                Err(net_error_from_ws(&e))
            }
            None => Ok(None),
        }
    }

    /// Start the closing handshake with a normal close code.
    pub async fn close(&self) -> Result<(), NetError> {
        let frame = CloseFrame::new(CloseCode::NORMAL, "");
        self.send(Message::Close(Some(frame))).await
    }
}

/// WebSocket connection builder.
///
/// This is the connector: it resolves the transport (proxy, TLS trust) and
/// performs a single upgrade attempt carrying the Origin header.
#[derive(Debug, Clone)]
pub struct WebSocketBuilder {
    url: Option<Url>,
    origin: Option<String>,
    tls: TlsConfig,
    proxy: ProxyChoice,
}

#[derive(Debug, Clone)]
enum ProxyChoice {
    /// Resolve from `HTTP(S)_PROXY` / `NO_PROXY` at connect time.
    Environment,
    Direct,
    Explicit(ProxySettings),
}

impl Default for WebSocketBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSocketBuilder {
    pub fn new() -> Self {
        Self {
            url: None,
            origin: None,
            tls: TlsConfig::default(),
            proxy: ProxyChoice::Environment,
        }
    }

    /// Set the URL to connect to.
    pub fn url(mut self, url: &str) -> Result<Self, NetError> {
        let url = Url::parse(url).map_err(|_| NetError::InvalidUrl)?;

        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(NetError::DisallowedUrlScheme);
        }

        self.url = Some(url);
        Ok(self)
    }

    /// Set the Origin header. Without one, the origin is derived from the URL.
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Set the certificate trust policy for `wss://`.
    pub fn trust(mut self, trust: TrustPolicy) -> Self {
        self.tls.trust = trust;
        self
    }

    /// Use an explicit proxy instead of the environment.
    pub fn proxy(mut self, proxy: ProxySettings) -> Self {
        self.proxy = ProxyChoice::Explicit(proxy);
        self
    }

    /// Connect directly, ignoring any proxy environment.
    pub fn no_proxy(mut self) -> Self {
        self.proxy = ProxyChoice::Direct;
        self
    }

    /// Connect to the server.
    pub async fn connect(self) -> Result<WebSocket, NetError> {
        let url = self.url.ok_or(NetError::InvalidUrl)?;
        let origin = match self.origin {
            Some(origin) => origin,
            None => derive_origin(&url)?,
        };

        let proxy = match self.proxy {
            ProxyChoice::Environment => ProxySettings::for_target(&url),
            ProxyChoice::Direct => None,
            ProxyChoice::Explicit(p) => (!p.should_bypass(&url)).then_some(p),
        };
        if let Some(p) = &proxy {
            tracing::debug!("connecting to {} via proxy {}", url, p.url);
        }

        let socket = ConnectJob::connect(&url, proxy.as_ref(), &self.tls).await?;
        let local_addr = socket.local_addr().map_err(|e| NetError::from_io(&e))?;

        let mut request = url.as_str().into_client_request().map_err(|e| {
            tracing::debug!("WebSocket request error: {:?}", e);
            NetError::InvalidUrl
        })?;
        let origin_value =
            http::HeaderValue::from_str(&origin).map_err(|_| NetError::InvalidUrl)?;
        request.headers_mut().insert(http::header::ORIGIN, origin_value);

        let (ws_stream, response) = client_async(request, socket).await.map_err(|e| {
            tracing::debug!("WebSocket handshake error: {:?}", e);
            handshake_error(&e)
        })?;
        tracing::debug!("connected to {} ({})", url, response.status());

        let (sink, stream) = ws_stream.split();

        Ok(WebSocket {
            sink: Arc::new(Mutex::new(sink)),
            stream: Arc::new(Mutex::new(stream)),
            url,
            local_addr,
        })
    }
}

/// Derive the Origin for a WebSocket URL: `ws` becomes `http`, `wss`
/// becomes `https`; host, port, path and query are kept.
pub fn derive_origin(url: &Url) -> Result<String, NetError> {
    let scheme = match url.scheme() {
        "wss" => "https",
        "ws" => "http",
        _ => return Err(NetError::DisallowedUrlScheme),
    };
    let mut origin = url.clone();
    origin
        .set_scheme(scheme)
        .map_err(|_| NetError::DisallowedUrlScheme)?;
    Ok(origin.to_string())
}

fn handshake_error(err: &tungstenite::Error) -> NetError {
    match err {
        tungstenite::Error::Http(response) => {
            tracing::debug!("upgrade rejected with status {}", response.status());
            NetError::WsUpgrade
        }
        tungstenite::Error::HttpFormat(_) => NetError::InvalidResponse,
        tungstenite::Error::Url(_) => NetError::InvalidUrl,
        other => net_error_from_ws(other),
    }
}

/// Map a tungstenite failure on an established connection.
fn net_error_from_ws(err: &tungstenite::Error) -> NetError {
    use tungstenite::error::ProtocolError;
    match err {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            NetError::ConnectionClosed
        }
        tungstenite::Error::Io(e) => NetError::from_io(e),
        tungstenite::Error::Capacity(_) => NetError::MsgTooBig,
        tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
            NetError::ConnectionReset
        }
        tungstenite::Error::Protocol(_) => NetError::WsProtocolError,
        _ => NetError::ConnectionFailed,
    }
}

/// Convert our Message to tungstenite Message.
fn message_to_tungstenite(msg: Message) -> tungstenite::Message {
    match msg {
        Message::Text(s) => tungstenite::Message::Text(s),
        Message::Binary(b) => tungstenite::Message::Binary(b.to_vec()),
        Message::Ping(d) => tungstenite::Message::Ping(d),
        Message::Pong(d) => tungstenite::Message::Pong(d),
        Message::Close(frame) => {
            let tung_frame = frame.map(|f| tungstenite::protocol::CloseFrame {
                code: tungstenite::protocol::frame::coding::CloseCode::from(f.code.0),
                reason: f.reason.into(),
            });
            tungstenite::Message::Close(tung_frame)
        }
    }
}

/// Convert tungstenite Message to our Message.
fn tungstenite_to_message(msg: tungstenite::Message) -> Message {
    match msg {
        tungstenite::Message::Text(s) => Message::Text(s.to_string()),
        tungstenite::Message::Binary(b) => Message::Binary(Bytes::from(b.to_vec())),
        tungstenite::Message::Ping(d) => Message::Ping(d.to_vec()),
        tungstenite::Message::Pong(d) => Message::Pong(d.to_vec()),
        tungstenite::Message::Close(frame) => {
            let our_frame = frame.map(|f| CloseFrame {
                code: CloseCode(f.code.into()),
                reason: f.reason.to_string(),
            });
            Message::Close(our_frame)
        }
        // Raw frames are never yielded by a reader; keep the payload if one shows up.
        tungstenite::Message::Frame(f) => Message::Binary(Bytes::from(f.payload().to_vec())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_url() {
        let builder = WebSocketBuilder::new().url("ws://example.com/ws").unwrap();
        assert_eq!(builder.url.unwrap().scheme(), "ws");
    }

    #[test]
    fn test_builder_secure() {
        let builder = WebSocketBuilder::new().url("wss://example.com/ws").unwrap();
        assert_eq!(builder.url.unwrap().scheme(), "wss");
    }

    #[test]
    fn test_builder_invalid_scheme() {
        let result = WebSocketBuilder::new().url("http://example.com");
        assert_eq!(result.unwrap_err(), NetError::DisallowedUrlScheme);
    }

    #[test]
    fn test_builder_trust() {
        let builder = WebSocketBuilder::new().trust(TrustPolicy::Insecure);
        assert!(builder.tls.trust.is_insecure());
    }

    #[test]
    fn test_derive_origin_keeps_everything_but_scheme() {
        let url = Url::parse("wss://host:1234/path?q=1").unwrap();
        assert_eq!(derive_origin(&url).unwrap(), "https://host:1234/path?q=1");

        let url = Url::parse("ws://example.test/socket").unwrap();
        assert_eq!(derive_origin(&url).unwrap(), "http://example.test/socket");
    }

    #[test]
    fn test_message_conversion() {
        let back = tungstenite_to_message(message_to_tungstenite(Message::Text("hello".into())));
        assert!(matches!(back, Message::Text(s) if s == "hello"));

        let msg = Message::Binary(Bytes::from_static(b"data"));
        let back = tungstenite_to_message(message_to_tungstenite(msg));
        assert!(matches!(back, Message::Binary(b) if b == Bytes::from_static(b"data")));
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            net_error_from_ws(&tungstenite::Error::ConnectionClosed),
            NetError::ConnectionClosed
        );
        let io = std::io::Error::from(std::io::ErrorKind::ConnectionReset);
        assert_eq!(
            net_error_from_ws(&tungstenite::Error::Io(io)),
            NetError::ConnectionReset
        );
    }
}
