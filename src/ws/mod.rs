//! WebSocket client support.
//!
//! Provides WebSocket connections using tokio-tungstenite over the crate's
//! own transport (proxy tunnel and BoringSSL), plus console rendering of
//! received frames.
//!
//! # Example
//! ```ignore
//! use wsrelay::ws::{WebSocketBuilder, Message};
//!
//! let ws = WebSocketBuilder::new()
//!     .url("wss://echo.websocket.org")?
//!     .origin("https://echo.websocket.org")
//!     .connect()
//!     .await?;
//! ws.send(Message::Text("Hello".into())).await?;
//! let msg = ws.recv().await?;
//! ```

mod connection;
mod message;
pub mod render;

pub use connection::{derive_origin, WebSocket, WebSocketBuilder};
pub use message::{CloseCode, CloseFrame, FrameKind, Message};
