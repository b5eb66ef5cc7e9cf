use crate::base::neterror::NetError;
use boring::ssl::{
    ConnectConfiguration, SslConnector, SslConnectorBuilder, SslMethod, SslVerifyMode, SslVersion,
};

/// Certificate trust policy for `wss://` connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrustPolicy {
    /// Verify the peer chain against the system roots and check the hostname.
    #[default]
    Verify,
    /// Accept any certificate for any hostname. Opt-in only (`--insecure`).
    Insecure,
}

impl TrustPolicy {
    pub fn from_insecure_flag(insecure: bool) -> Self {
        if insecure {
            TrustPolicy::Insecure
        } else {
            TrustPolicy::Verify
        }
    }

    pub fn is_insecure(&self) -> bool {
        matches!(self, TrustPolicy::Insecure)
    }
}

/// TLS client configuration for WebSocket handshakes.
///
/// Only `http/1.1` is offered over ALPN: the WebSocket upgrade is an
/// HTTP/1.1 mechanism and a server picking `h2` would break it.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub min_version: Option<SslVersion>,
    pub max_version: Option<SslVersion>,
    pub alpn_protos: Vec<String>,
    pub curves: Vec<String>,
    pub trust: TrustPolicy,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self::with_trust(TrustPolicy::Verify)
    }
}

impl TlsConfig {
    pub fn with_trust(trust: TrustPolicy) -> Self {
        Self {
            min_version: Some(SslVersion::TLS1_2),
            max_version: Some(SslVersion::TLS1_3),
            alpn_protos: vec!["http/1.1".to_string()],
            curves: vec![
                "X25519".to_string(),
                "P-256".to_string(),
                "P-384".to_string(),
            ],
            trust,
        }
    }

    /// Apply this configuration to an SSL connector builder.
    pub fn apply_to_builder(&self, builder: &mut SslConnectorBuilder) -> Result<(), NetError> {
        if let Some(min) = self.min_version {
            builder
                .set_min_proto_version(Some(min))
                .map_err(|_| NetError::SslProtocolError)?;
        }
        if let Some(max) = self.max_version {
            builder
                .set_max_proto_version(Some(max))
                .map_err(|_| NetError::SslProtocolError)?;
        }

        if !self.alpn_protos.is_empty() {
            let mut alpn_wire = Vec::new();
            for proto in &self.alpn_protos {
                if proto.len() > 255 {
                    return Err(NetError::SslProtocolError);
                }
                alpn_wire.push(proto.len() as u8);
                alpn_wire.extend_from_slice(proto.as_bytes());
            }
            builder
                .set_alpn_protos(&alpn_wire)
                .map_err(|_| NetError::SslProtocolError)?;
        }

        if !self.curves.is_empty() {
            builder
                .set_curves_list(&self.curves.join(":"))
                .map_err(|_| NetError::SslProtocolError)?;
        }

        match self.trust {
            TrustPolicy::Verify => builder.set_verify(SslVerifyMode::PEER),
            TrustPolicy::Insecure => builder.set_verify(SslVerifyMode::NONE),
        }

        Ok(())
    }

    /// Build a per-connection configuration for `host`.
    pub fn configure(&self, host: &str) -> Result<ConnectConfiguration, NetError> {
        let mut builder =
            SslConnector::builder(SslMethod::tls()).map_err(|_| NetError::SslProtocolError)?;
        self.apply_to_builder(&mut builder)?;

        let mut config = builder
            .build()
            .configure()
            .map_err(|_| NetError::SslProtocolError)?;
        config.set_use_server_name_indication(Self::should_set_sni(host));
        if self.trust.is_insecure() {
            config.set_verify_hostname(false);
        }
        Ok(config)
    }

    /// Check if SNI should be set for this host.
    /// Per RFC 6066, SNI MUST NOT be set for raw IP addresses.
    pub fn should_set_sni(host: &str) -> bool {
        host.trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<std::net::IpAddr>()
            .is_err()
    }
}
