use boring::asn1::Asn1Time;
use boring::bn::BigNum;
use boring::hash::MessageDigest;
use boring::pkey::{PKey, Private};
use boring::rsa::Rsa;
use boring::ssl::{SslAcceptor, SslConnector, SslMethod};
use boring::x509::{X509NameBuilder, X509};
use futures::SinkExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use wsrelay::base::neterror::NetError;
use wsrelay::socket::tls::{TlsConfig, TrustPolicy};
use wsrelay::ws::{Message, WebSocketBuilder};

fn self_signed() -> (PKey<Private>, X509) {
    let pkey = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "localhost").unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&pkey).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(1).unwrap())
        .unwrap();
    let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.sign(&pkey, MessageDigest::sha256()).unwrap();

    (pkey, builder.build())
}

/// A `wss://` server with a self-signed certificate that greets each client.
async fn tls_server() -> SocketAddr {
    let (pkey, cert) = self_signed();
    let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
    acceptor.set_private_key(&pkey).unwrap();
    acceptor.set_certificate(&cert).unwrap();
    let acceptor = Arc::new(acceptor.build());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let acceptor = Arc::clone(&acceptor);
            tokio::spawn(async move {
                let Ok(tls) = tokio_boring::accept(&acceptor, stream).await else {
                    return;
                };
                if let Ok(mut ws) = tokio_tungstenite::accept_async(tls).await {
                    let _ = ws.send(WsMessage::Text("secure".into())).await;
                    let _ = ws.close(None).await;
                }
            });
        }
    });

    addr
}

#[test]
fn test_default_config() {
    let config = TlsConfig::default();
    assert_eq!(config.alpn_protos, vec!["http/1.1".to_string()]);
    assert_eq!(config.trust, TrustPolicy::Verify);

    let mut builder = SslConnector::builder(SslMethod::tls()).unwrap();
    assert!(config.apply_to_builder(&mut builder).is_ok());
}

#[test]
fn test_insecure_config_applies() {
    let config = TlsConfig::with_trust(TrustPolicy::Insecure);
    let mut builder = SslConnector::builder(SslMethod::tls()).unwrap();
    assert!(config.apply_to_builder(&mut builder).is_ok());
    assert!(config.configure("example.com").is_ok());
}

#[test]
fn test_oversized_alpn_rejected() {
    let mut config = TlsConfig::default();
    config.alpn_protos = vec!["x".repeat(256)];
    let mut builder = SslConnector::builder(SslMethod::tls()).unwrap();
    assert_eq!(
        config.apply_to_builder(&mut builder).unwrap_err(),
        NetError::SslProtocolError
    );
}

#[test]
fn test_sni_skipped_for_ip_literals() {
    assert!(TlsConfig::should_set_sni("example.com"));
    assert!(!TlsConfig::should_set_sni("127.0.0.1"));
    assert!(!TlsConfig::should_set_sni("[::1]"));
}

#[tokio::test]
async fn test_insecure_accepts_self_signed() {
    let addr = tls_server().await;

    let ws = WebSocketBuilder::new()
        .url(&format!("wss://{}/", addr))
        .unwrap()
        .trust(TrustPolicy::Insecure)
        .no_proxy()
        .connect()
        .await
        .unwrap();

    let msg = ws.recv().await.unwrap().unwrap();
    assert!(matches!(msg, Message::Text(ref t) if t == "secure"));
}

#[tokio::test]
async fn test_verify_rejects_self_signed() {
    let addr = tls_server().await;

    let err = WebSocketBuilder::new()
        .url(&format!("wss://{}/", addr))
        .unwrap()
        .no_proxy()
        .connect()
        .await
        .unwrap_err();

    assert_eq!(err, NetError::SslProtocolError);
}
