use crate::base::neterror::NetError;
use std::io;

#[test]
fn test_net_error_roundtrip() {
    let original = NetError::ConnectionRefused;
    let code = original.as_i32();
    assert_eq!(code, -102);
    let converted = NetError::from(code);
    assert!(matches!(converted, NetError::ConnectionRefused));

    let ws = NetError::WsUpgrade;
    assert_eq!(ws.as_i32(), -173);
    assert!(matches!(NetError::from(-173), NetError::WsUpgrade));
}

#[test]
fn test_unknown_error() {
    let err = NetError::from(-9999);
    assert!(matches!(err, NetError::Unknown(-9999)));
    assert_eq!(err.as_i32(), -9999);
}

#[test]
fn test_io_error_mapping() {
    let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
    assert_eq!(NetError::from_io(&refused), NetError::ConnectionRefused);

    let eof = io::Error::from(io::ErrorKind::UnexpectedEof);
    assert_eq!(NetError::from(eof), NetError::ConnectionClosed);

    let other = io::Error::new(io::ErrorKind::Other, "boom");
    assert_eq!(NetError::from_io(&other), NetError::ConnectionFailed);
}
