use super::matcher::ProxyMatcher;
use url::Url;
use zeroize::Zeroizing;

/// Proxy protocol type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyType {
    /// HTTP proxy, tunnelled with CONNECT
    Http,
    /// HTTPS proxy (TLS to proxy); not supported for tunnelling
    Https,
    /// SOCKS5 proxy
    Socks5,
}

/// Proxy configuration with bypass rules.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    /// Proxy URL (e.g., `http://proxy.com:8080`)
    pub url: Url,
    /// Proxy username for authentication
    pub username: Option<String>,
    /// Proxy password (zeroized on drop)
    pub password: Option<Zeroizing<String>>,
    /// NO_PROXY bypass matcher
    bypass: ProxyMatcher,
}

impl ProxySettings {
    /// Create proxy settings from a URL string.
    ///
    /// A value without a scheme (`proxy.local:3128`) is read as `http://`.
    /// Credentials embedded in the URL become the proxy credentials.
    pub fn new(url_str: &str) -> Option<Self> {
        let url = match Url::parse(url_str) {
            Ok(url) if url.host_str().is_some() => url,
            _ => Url::parse(&format!("http://{}", url_str)).ok()?,
        };

        let username = (!url.username().is_empty()).then(|| url.username().to_string());
        let password = url.password().map(|p| Zeroizing::new(p.to_string()));

        Some(Self {
            url,
            username,
            password,
            bypass: ProxyMatcher::default(),
        })
    }

    /// Resolve the ambient proxy for a WebSocket target.
    ///
    /// `wss://` targets use `HTTPS_PROXY`/`https_proxy`, `ws://` targets use
    /// `HTTP_PROXY`/`http_proxy`. Returns `None` when no proxy is configured
    /// or the target is bypassed by `NO_PROXY` or is a loopback host.
    pub fn for_target(target: &Url) -> Option<Self> {
        let vars: [&str; 2] = if target.scheme() == "wss" {
            ["HTTPS_PROXY", "https_proxy"]
        } else {
            ["HTTP_PROXY", "http_proxy"]
        };

        let url_str = vars
            .iter()
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))?;

        let mut settings = Self::new(&url_str)?;
        settings.bypass = ProxyMatcher::from_env();
        if settings.should_bypass(target) {
            tracing::debug!("proxy bypassed for {}", target);
            return None;
        }
        Some(settings)
    }

    /// Add authentication credentials.
    pub fn with_auth(mut self, user: &str, pass: &str) -> Self {
        self.username = Some(user.to_string());
        self.password = Some(Zeroizing::new(pass.to_string()));
        self
    }

    /// Add bypass rules from a NO_PROXY string.
    pub fn with_bypass(mut self, no_proxy: &str) -> Self {
        self.bypass = ProxyMatcher::from_string(no_proxy);
        self
    }

    /// Get proxy type from URL scheme.
    pub fn proxy_type(&self) -> ProxyType {
        match self.url.scheme() {
            "https" => ProxyType::Https,
            "socks5" | "socks5h" => ProxyType::Socks5,
            _ => ProxyType::Http,
        }
    }

    /// Check if URL should bypass this proxy.
    pub fn should_bypass(&self, target: &Url) -> bool {
        self.bypass.should_bypass_url(target)
    }

    /// Get `Proxy-Authorization` header value for HTTP proxies.
    pub fn get_auth_header(&self) -> Option<String> {
        if let (Some(u), Some(p)) = (&self.username, &self.password) {
            use base64::{engine::general_purpose, Engine as _};
            let creds = format!("{}:{}", u, p.as_str());
            let encoded = general_purpose::STANDARD.encode(creds);
            Some(format!("Basic {}", encoded))
        } else {
            None
        }
    }

    /// Get SOCKS5 username/password for authentication.
    pub fn get_socks5_auth(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
            _ => None,
        }
    }

    /// Get proxy host and port.
    pub fn host_port(&self) -> Option<(&str, u16)> {
        let host = self.url.host_str()?;
        let port = self.url.port().unwrap_or(match self.proxy_type() {
            ProxyType::Http => 80,
            ProxyType::Https => 443,
            ProxyType::Socks5 => 1080,
        });
        Some((host, port))
    }
}
