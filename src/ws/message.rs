//! WebSocket message types.

use bytes::Bytes;
use std::fmt;

/// WebSocket message type.
#[derive(Debug, Clone)]
pub enum Message {
    /// Text message (UTF-8)
    Text(String),
    /// Binary message
    Binary(Bytes),
    /// Ping frame
    Ping(Vec<u8>),
    /// Pong frame
    Pong(Vec<u8>),
    /// Close frame with optional code and reason
    Close(Option<CloseFrame>),
}

/// How an inbound frame is rendered on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Text,
    Binary,
    /// Control frames; never rendered.
    Other(&'static str),
}

/// Close frame data.
#[derive(Debug, Clone)]
pub struct CloseFrame {
    /// Close code (RFC 6455)
    pub code: CloseCode,
    /// Close reason (optional UTF-8 string)
    pub reason: String,
}

impl CloseFrame {
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// WebSocket close codes (RFC 6455).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseCode(pub u16);

impl CloseCode {
    /// Normal closure
    pub const NORMAL: Self = Self(1000);
    /// No status received; stands in for a close frame without a body.
    pub const NO_STATUS: Self = Self(1005);

    /// Short name of a registered code, if any.
    pub fn name(&self) -> Option<&'static str> {
        Some(match self.0 {
            1000 => "normal",
            1001 => "going away",
            1002 => "protocol error",
            1003 => "unsupported data",
            1005 => "no status",
            1006 => "abnormal closure",
            1007 => "invalid payload data",
            1008 => "policy violation",
            1009 => "message too big",
            1010 => "mandatory extension missing",
            1011 => "internal server error",
            1012 => "service restart",
            1013 => "try again later",
            1015 => "TLS handshake",
            _ => return None,
        })
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", self.0, name),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Renders as `close 1000 (normal): reason`.
impl fmt::Display for CloseFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "close {}", self.code)?;
        if !self.reason.is_empty() {
            write!(f, ": {}", self.reason)?;
        }
        Ok(())
    }
}

impl Message {
    /// Classify this message for rendering.
    pub fn kind(&self) -> FrameKind {
        match self {
            Message::Text(_) => FrameKind::Text,
            Message::Binary(_) => FrameKind::Binary,
            Message::Ping(_) => FrameKind::Other("ping"),
            Message::Pong(_) => FrameKind::Other("pong"),
            Message::Close(_) => FrameKind::Other("close"),
        }
    }

    /// Raw payload bytes (text as UTF-8).
    pub fn payload(&self) -> &[u8] {
        match self {
            Message::Text(s) => s.as_bytes(),
            Message::Binary(b) => b,
            Message::Ping(d) | Message::Pong(d) => d,
            Message::Close(_) => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kinds() {
        let text = Message::Text("hello".into());
        assert_eq!(text.kind(), FrameKind::Text);
        assert_eq!(text.payload(), b"hello");

        let binary = Message::Binary(Bytes::from_static(&[0xab, 0xcd]));
        assert_eq!(binary.kind(), FrameKind::Binary);
        assert_eq!(binary.payload(), &[0xab, 0xcd]);

        assert_eq!(Message::Ping(vec![1]).kind(), FrameKind::Other("ping"));
        assert_eq!(Message::Pong(vec![]).kind(), FrameKind::Other("pong"));
        assert_eq!(Message::Close(None).kind(), FrameKind::Other("close"));
        assert!(Message::Close(None).payload().is_empty());
    }

    #[test]
    fn test_close_frame() {
        let frame = CloseFrame::new(CloseCode::NORMAL, "bye");
        assert_eq!(frame.code, CloseCode::NORMAL);
        assert_eq!(frame.code.0, 1000);
        assert_eq!(frame.reason, "bye");
    }

    #[test]
    fn test_close_frame_display() {
        let frame = CloseFrame::new(CloseCode::NORMAL, "bye");
        assert_eq!(frame.to_string(), "close 1000 (normal): bye");

        let frame = CloseFrame::new(CloseCode::NO_STATUS, "");
        assert_eq!(frame.to_string(), "close 1005 (no status)");

        let frame = CloseFrame::new(CloseCode(4001), "kicked");
        assert_eq!(frame.to_string(), "close 4001: kicked");
    }
}
