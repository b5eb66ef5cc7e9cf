//! Socket and connection management.
//!
//! Transport setup beneath the WebSocket handshake, mirroring Chromium's `net/socket/`:
//! - [`connectjob`]: DNS → TCP → proxy tunnel → TLS connection flow
//! - [`proxy`]: ambient HTTP/SOCKS5 proxy resolution
//! - [`matcher`]: `NO_PROXY` bypass rules
//! - [`tls`]: TLS configuration and trust policy with BoringSSL

pub mod client;
pub mod connectjob;
pub mod matcher;
pub mod proxy;
pub mod tls;
