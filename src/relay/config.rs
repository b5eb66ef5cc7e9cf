//! Immutable relay configuration.
//!
//! Built once from command-line arguments; every [`ConnectionTarget`] is
//! resolved and validated up front so argument errors surface before any
//! session starts.

use super::target::{expand_template, ConnectionTarget, PLACEHOLDER};
use crate::socket::tls::TrustPolicy;
use thiserror::Error;
use url::Url;

/// Invalid command-line input. Fatal to the process.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing target URL")]
    MissingUrl,
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported URL scheme {0:?} (expected ws or wss)")]
    UnsupportedScheme(String),
    #[error("parameters given but the URL has no %s placeholder")]
    MissingPlaceholder,
    #[error("invalid origin {0:?}")]
    InvalidOrigin(String),
    #[error("number of sessions must be at least 1")]
    NoSessions,
}

/// Relay configuration shared by every session.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    color: bool,
    targets: Vec<ConnectionTarget>,
}

impl RelayConfig {
    /// Start building a configuration for a target URL (or URL template).
    pub fn builder(url: impl Into<String>) -> RelayConfigBuilder {
        RelayConfigBuilder::new(url)
    }

    /// Whether received lines are highlighted.
    pub fn color(&self) -> bool {
        self.color
    }

    /// Every target, `concurrency` outer and parameters inner.
    pub fn targets(&self) -> &[ConnectionTarget] {
        &self.targets
    }
}

/// Builder for [`RelayConfig`].
#[must_use]
#[derive(Debug, Clone)]
pub struct RelayConfigBuilder {
    url_template: String,
    origin: Option<String>,
    insecure: bool,
    read_only: bool,
    concurrency: usize,
    params: Vec<String>,
    color: bool,
}

impl RelayConfigBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url_template: url.into(),
            origin: None,
            insecure: false,
            read_only: false,
            concurrency: 1,
            params: Vec::new(),
            color: false,
        }
    }

    /// Override the derived Origin header. An empty string keeps the derived one.
    pub fn origin(mut self, origin: Option<String>) -> Self {
        self.origin = origin.filter(|o| !o.is_empty());
        self
    }

    /// Skip certificate and hostname verification.
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Only receive; never send console lines.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Sessions per target.
    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    /// Values substituted for the `%s` placeholder, one target each.
    pub fn params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Highlight received lines.
    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Validate and resolve all targets.
    pub fn build(self) -> Result<RelayConfig, ConfigError> {
        if self.url_template.trim().is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        if self.concurrency == 0 {
            return Err(ConfigError::NoSessions);
        }
        if !self.params.is_empty() && !self.url_template.contains(PLACEHOLDER) {
            return Err(ConfigError::MissingPlaceholder);
        }

        // No parameters means a single empty substitution.
        let substitutions: Vec<&str> = if self.params.is_empty() {
            vec![""]
        } else {
            self.params.iter().map(String::as_str).collect()
        };

        let trust = TrustPolicy::from_insecure_flag(self.insecure);
        let mut resolved = Vec::with_capacity(substitutions.len());
        for param in &substitutions {
            let raw = expand_template(&self.url_template, param);
            let url = Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl {
                url: raw.clone(),
                source,
            })?;
            if url.scheme() != "ws" && url.scheme() != "wss" {
                return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
            }
            resolved.push(url);
        }

        let mut targets = Vec::with_capacity(self.concurrency * resolved.len());
        for _ in 0..self.concurrency {
            for url in &resolved {
                let target = ConnectionTarget::new(
                    targets.len(),
                    url.clone(),
                    self.origin.as_deref(),
                    trust,
                    self.read_only,
                )?;
                targets.push(target);
            }
        }

        Ok(RelayConfig {
            color: self.color,
            targets,
        })
    }
}
