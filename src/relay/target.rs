use super::config::ConfigError;
use crate::base::neterror::NetError;
use crate::socket::tls::TrustPolicy;
use crate::ws::{derive_origin, WebSocket, WebSocketBuilder};
use url::Url;

/// Placeholder replaced by each `--params` value.
pub const PLACEHOLDER: &str = "%s";

/// Substitute the first placeholder in a URL template.
pub fn expand_template(template: &str, param: &str) -> String {
    template.replacen(PLACEHOLDER, param, 1)
}

/// A resolved destination for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    /// Position among all sessions of this process.
    pub index: usize,
    pub url: Url,
    /// Origin header sent with the handshake.
    pub origin: String,
    pub trust: TrustPolicy,
    pub read_only: bool,
}

impl ConnectionTarget {
    pub fn new(
        index: usize,
        url: Url,
        origin_override: Option<&str>,
        trust: TrustPolicy,
        read_only: bool,
    ) -> Result<Self, ConfigError> {
        let origin = match origin_override {
            Some(origin) => origin.to_string(),
            None => derive_origin(&url)
                .map_err(|_| ConfigError::UnsupportedScheme(url.scheme().to_string()))?,
        };
        if http::HeaderValue::from_str(&origin).is_err() {
            return Err(ConfigError::InvalidOrigin(origin));
        }

        Ok(Self {
            index,
            url,
            origin,
            trust,
            read_only,
        })
    }

    /// A connector configured for this target.
    pub fn builder(&self) -> WebSocketBuilder {
        WebSocketBuilder::default()
            .origin(self.origin.clone())
            .trust(self.trust)
    }

    /// Perform the single connection attempt for this target.
    pub async fn connect(&self) -> Result<WebSocket, NetError> {
        self.builder().url(self.url.as_str())?.connect().await
    }
}
