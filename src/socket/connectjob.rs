use crate::base::neterror::NetError;
use crate::socket::client::SocketType;
use crate::socket::proxy::{ProxySettings, ProxyType};
use crate::socket::tls::TlsConfig;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use url::Url;

/// Upper bound on a proxy's CONNECT response head.
const MAX_TUNNEL_RESPONSE: usize = 8 * 1024;

const SOCKS_VERSION: u8 = 0x05;
const SOCKS_AUTH_NONE: u8 = 0x00;
const SOCKS_AUTH_PASSWORD: u8 = 0x02;
const SOCKS_CMD_CONNECT: u8 = 0x01;
const SOCKS_ATYP_V4: u8 = 0x01;
const SOCKS_ATYP_DOMAIN: u8 = 0x03;
const SOCKS_ATYP_V6: u8 = 0x04;

/// Manages the connection process: DNS -> TCP -> (proxy tunnel) -> SSL.
/// Roughly equivalent to net::ConnectJob.
pub struct ConnectJob;

impl ConnectJob {
    /// Open a transport to the host of a `ws://` or `wss://` URL.
    ///
    /// A single attempt is made; the first failing step is reported.
    pub async fn connect(
        url: &Url,
        proxy: Option<&ProxySettings>,
        tls: &TlsConfig,
    ) -> Result<SocketType, NetError> {
        let target_host = url.host_str().ok_or(NetError::InvalidUrl)?;
        let target_port = url.port_or_known_default().ok_or(NetError::InvalidUrl)?;

        let stream = match proxy {
            Some(p) => {
                let (phost, pport) = p.host_port().ok_or(NetError::InvalidUrl)?;
                let mut stream = Self::connect_tcp(phost, pport).await.map_err(|e| {
                    tracing::debug!("proxy {}:{} unreachable: {}", phost, pport, e);
                    NetError::ProxyConnectionFailed
                })?;
                match p.proxy_type() {
                    ProxyType::Http => {
                        Self::http_tunnel(&mut stream, p, target_host, target_port).await?
                    }
                    ProxyType::Socks5 => {
                        Self::socks5_tunnel(&mut stream, p, target_host, target_port).await?
                    }
                    ProxyType::Https => {
                        tracing::debug!("unsupported proxy scheme: {}", p.url.scheme());
                        return Err(NetError::NoSupportedProxies);
                    }
                }
                stream
            }
            None => Self::connect_tcp(target_host, target_port).await?,
        };

        match url.scheme() {
            "wss" => {
                let domain = target_host.trim_start_matches('[').trim_end_matches(']');
                let config = tls.configure(domain)?;
                let tls_stream = tokio_boring::connect(config, domain, stream)
                    .await
                    .map_err(|e| {
                        tracing::debug!("TLS handshake with {} failed: {:?}", domain, e);
                        NetError::SslProtocolError
                    })?;
                Ok(SocketType::Ssl(tls_stream))
            }
            "ws" => Ok(SocketType::Tcp(stream)),
            _ => Err(NetError::DisallowedUrlScheme),
        }
    }

    async fn connect_tcp(host: &str, port: u16) -> Result<TcpStream, NetError> {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let addrs = tokio::net::lookup_host((host, port)).await.map_err(|e| {
            tracing::debug!("resolving {} failed: {}", host, e);
            NetError::NameNotResolved
        })?;

        let mut last_err = NetError::NameNotResolved;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(s) => {
                    let _ = s.set_nodelay(true);
                    return Ok(s);
                }
                Err(e) => {
                    tracing::debug!("connect to {} failed: {}", addr, e);
                    last_err = NetError::from_io(&e);
                }
            }
        }
        Err(last_err)
    }

    /// HTTP CONNECT tunnel through `stream`.
    async fn http_tunnel<S>(
        stream: &mut S,
        proxy: &ProxySettings,
        host: &str,
        port: u16,
    ) -> Result<(), NetError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let target = format!("{}:{}", host, port);
        let mut connect_req = format!("CONNECT {} HTTP/1.1\r\nHost: {}\r\n", target, target);
        if let Some(auth) = proxy.get_auth_header() {
            connect_req.push_str(&format!("Proxy-Authorization: {}\r\n", auth));
        }
        connect_req.push_str("\r\n");

        stream
            .write_all(connect_req.as_bytes())
            .await
            .map_err(|_| NetError::TunnelConnectionFailed)?;

        // Read byte-wise so nothing past the response head is consumed.
        let mut head = Vec::with_capacity(256);
        let mut byte = [0u8; 1];
        while !head.ends_with(b"\r\n\r\n") {
            if head.len() >= MAX_TUNNEL_RESPONSE {
                return Err(NetError::InvalidResponse);
            }
            let n = stream
                .read(&mut byte)
                .await
                .map_err(|_| NetError::TunnelConnectionFailed)?;
            if n == 0 {
                return Err(NetError::TunnelConnectionFailed);
            }
            head.push(byte[0]);
        }

        let head = String::from_utf8_lossy(&head);
        let status = head
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or(NetError::InvalidResponse)?;

        match status {
            200..=299 => Ok(()),
            407 => Err(NetError::ProxyAuthRequested),
            _ => {
                tracing::debug!("proxy refused tunnel to {}: {}", target, status);
                Err(NetError::TunnelConnectionFailed)
            }
        }
    }

    /// SOCKS5 CONNECT (RFC 1928) with optional username/password (RFC 1929).
    async fn socks5_tunnel<S>(
        stream: &mut S,
        proxy: &ProxySettings,
        host: &str,
        port: u16,
    ) -> Result<(), NetError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let io_err = |_: std::io::Error| NetError::SocksConnectionFailed;
        let auth = proxy.get_socks5_auth();

        let greeting: &[u8] = if auth.is_some() {
            &[SOCKS_VERSION, 2, SOCKS_AUTH_NONE, SOCKS_AUTH_PASSWORD]
        } else {
            &[SOCKS_VERSION, 1, SOCKS_AUTH_NONE]
        };
        stream.write_all(greeting).await.map_err(io_err)?;

        let mut choice = [0u8; 2];
        stream.read_exact(&mut choice).await.map_err(io_err)?;
        if choice[0] != SOCKS_VERSION {
            return Err(NetError::SocksConnectionFailed);
        }

        match (choice[1], auth) {
            (SOCKS_AUTH_NONE, _) => {}
            (SOCKS_AUTH_PASSWORD, Some((user, pass))) => {
                if user.len() > 255 || pass.len() > 255 {
                    return Err(NetError::SocksConnectionFailed);
                }
                let mut req = vec![0x01, user.len() as u8];
                req.extend_from_slice(user.as_bytes());
                req.push(pass.len() as u8);
                req.extend_from_slice(pass.as_bytes());
                stream.write_all(&req).await.map_err(io_err)?;

                let mut status = [0u8; 2];
                stream.read_exact(&mut status).await.map_err(io_err)?;
                if status[1] != 0x00 {
                    return Err(NetError::ProxyAuthRequested);
                }
            }
            _ => return Err(NetError::SocksConnectionFailed),
        }

        let mut req = vec![SOCKS_VERSION, SOCKS_CMD_CONNECT, 0x00];
        let bare = host.trim_start_matches('[').trim_end_matches(']');
        match bare.parse::<std::net::IpAddr>() {
            Ok(std::net::IpAddr::V4(ip)) => {
                req.push(SOCKS_ATYP_V4);
                req.extend_from_slice(&ip.octets());
            }
            Ok(std::net::IpAddr::V6(ip)) => {
                req.push(SOCKS_ATYP_V6);
                req.extend_from_slice(&ip.octets());
            }
            Err(_) => {
                if host.len() > 255 {
                    return Err(NetError::InvalidUrl);
                }
                req.push(SOCKS_ATYP_DOMAIN);
                req.push(host.len() as u8);
                req.extend_from_slice(host.as_bytes());
            }
        }
        req.extend_from_slice(&port.to_be_bytes());
        stream.write_all(&req).await.map_err(io_err)?;

        let mut reply = [0u8; 4];
        stream.read_exact(&mut reply).await.map_err(io_err)?;
        match reply[1] {
            0x00 => {}
            0x03 | 0x04 => return Err(NetError::SocksConnectionHostUnreachable),
            code => {
                tracing::debug!("SOCKS5 proxy replied {:#04x}", code);
                return Err(NetError::SocksConnectionFailed);
            }
        }

        // Skip the bound address the proxy reports.
        let addr_len = match reply[3] {
            SOCKS_ATYP_V4 => 4,
            SOCKS_ATYP_V6 => 16,
            SOCKS_ATYP_DOMAIN => {
                let mut len = [0u8; 1];
                stream.read_exact(&mut len).await.map_err(io_err)?;
                len[0] as usize
            }
            _ => return Err(NetError::SocksConnectionFailed),
        };
        let mut bound = vec![0u8; addr_len + 2];
        stream.read_exact(&mut bound).await.map_err(io_err)?;

        Ok(())
    }
}
