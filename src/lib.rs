//! # wsrelay
//!
//! An interactive WebSocket client library.
//!
//! `wsrelay` connects to `ws://` or `wss://` endpoints through the ambient
//! proxy configuration, sends each console line as one text frame, and prints
//! every received frame as a timestamped line tagged with the local socket
//! address.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wsrelay::relay::{ConsoleInput, RelayConfig, SessionSupervisor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig::builder("wss://echo.example/ws").build()?;
//!     let input = ConsoleInput::stdin();
//!     let report = SessionSupervisor::new(config)
//!         .run(move |_| (input.clone(), tokio::io::stdout()))
//!         .await;
//!     println!("{} session(s) ended", report.sessions);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Network error codes
//! - [`socket`] - TCP, proxy tunnels and TLS beneath the handshake
//! - [`ws`] - WebSocket connections and frame rendering
//! - [`relay`] - Sessions, their supervisor and configuration

pub mod base;
pub mod relay;
pub mod socket;
pub mod ws;
