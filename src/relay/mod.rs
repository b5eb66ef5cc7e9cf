//! Interactive relay between the console and WebSocket sessions.
//!
//! A [`RelayConfig`] resolves every [`ConnectionTarget`] up front. The
//! [`SessionSupervisor`] runs one [`RelaySession`] per target; each session
//! pumps console lines to the socket and received frames to the console
//! until either direction fails.

pub mod config;
pub mod input;
pub mod session;
pub mod supervisor;
pub mod target;

pub use config::{ConfigError, RelayConfig, RelayConfigBuilder};
pub use input::{ConsoleInput, InputError, LineSource};
pub use session::{open_session, RelaySession, SessionError, SessionState};
pub use supervisor::{SessionSupervisor, SupervisorReport};
pub use target::{expand_template, ConnectionTarget, PLACEHOLDER};
