//! Startup and authentication against a scripted server.

mod common;

use common::{Script, opts, tagged_frames};
use pgwire_session::Error;
use pgwire_session::protocol::frontend::md5_password;
use pgwire_session::sync::{CancelToken, Session, SessionPhase};
use pgwire_session::TransactionStatus;

/// Frames written after the untagged StartupMessage.
fn after_startup(bytes: &[u8]) -> Vec<(u8, Vec<u8>)> {
    let len = i32::from_be_bytes(bytes[0..4].try_into().unwrap()) as usize;
    tagged_frames(&bytes[len..])
}

#[test]
fn test_startup_message_parameters() {
    let (stream, written) = Script::new().startup().into_stream();
    let session = Session::connect(stream, opts()).unwrap();

    let bytes = written.bytes();
    assert_eq!(&bytes[4..8], &196608_i32.to_be_bytes());
    let body = String::from_utf8_lossy(&bytes[8..]);
    assert!(body.contains("user\0alice\0"));
    assert!(body.contains("client_encoding\0UTF8\0"));
    assert!(body.contains("database\0app\0"));
    assert!(bytes.ends_with(b"\0\0"));

    assert_eq!(session.phase(), SessionPhase::Ready);
    assert_eq!(session.server_param("server_version"), Some("16.2"));
    assert_eq!(session.backend_pid(), Some(42));
    assert_eq!(session.cancel_token(), Some(CancelToken::new(42, 7)));
    assert_eq!(session.transaction_status(), TransactionStatus::Idle);
    assert!(session.id().starts_with("pg"));
}

#[test]
fn test_cleartext_password() {
    let (stream, written) = Script::new()
        .auth(3, &[])
        .startup()
        .into_stream();
    Session::connect(stream, opts()).unwrap();

    let frames = after_startup(&written.bytes());
    assert_eq!(frames, vec![(b'p', b"secret\0".to_vec())]);
}

#[test]
fn test_md5_password() {
    let salt = [0x01, 0x02, 0x03, 0x04];
    let (stream, written) = Script::new()
        .auth(5, &salt)
        .startup()
        .into_stream();
    Session::connect(stream, opts()).unwrap();

    let mut expected = md5_password("alice", "secret", &salt).into_bytes();
    expected.push(0);
    let frames = after_startup(&written.bytes());
    assert_eq!(frames, vec![(b'p', expected)]);
    assert!(frames[0].1.starts_with(b"md5"));
}

#[test]
fn test_password_rejected() {
    let (stream, _written) = Script::new()
        .auth(3, &[])
        .error(&[
            (b'S', "FATAL"),
            (b'V', "FATAL"),
            (b'C', "28P01"),
            (b'M', "password authentication failed for user \"alice\""),
        ])
        .into_stream();
    let err = Session::connect(stream, opts()).err().unwrap();
    assert_eq!(err.sqlstate(), Some("28P01"));
    assert!(err.is_connection_broken());
}

#[test]
fn test_missing_password() {
    let (stream, _written) = Script::new().auth(3, &[]).into_stream();
    let mut options = opts();
    options.password = None;
    let err = Session::connect(stream, options).err().unwrap();
    assert!(matches!(err, Error::Auth(_)));
}

#[test]
fn test_unsupported_auth_method() {
    let (stream, _written) = Script::new().auth(2, &[]).into_stream();
    let err = Session::connect(stream, opts()).err().unwrap();
    assert!(matches!(err, Error::Unsupported(_)));
}

#[test]
fn test_negotiate_protocol_version() {
    let (stream, _written) = Script::new()
        .negotiate_protocol_version(0, &["_pq_.compression"])
        .startup()
        .into_stream();
    let session = Session::connect(stream, opts()).unwrap();
    let (minor, options) = session.negotiated_protocol().unwrap();
    assert_eq!(minor, 0);
    assert_eq!(options, ["_pq_.compression".to_string()]);
}

#[test]
fn test_notice_during_startup() {
    let (stream, _written) = Script::new()
        .auth_ok()
        .notice(&[(b'S', "WARNING"), (b'C', "01000"), (b'M', "low disk")])
        .parameter_status("TimeZone", "UTC")
        .backend_key(9, 10)
        .ready(b'I')
        .into_stream();
    let session = Session::connect(stream, opts()).unwrap();
    assert_eq!(session.server_param("TimeZone"), Some("UTC"));
    assert_eq!(session.backend_pid(), Some(9));
}

#[test]
fn test_truncated_handshake() {
    let (stream, _written) = Script::new().auth_ok().into_stream();
    let err = Session::connect(stream, opts()).err().unwrap();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_connect_from_url() {
    let (stream, written) = Script::new().startup().into_stream();
    let options = pgwire_session::Opts::try_from(
        "postgres://bob:pw@db.example:6543/shop?application_name=billing",
    )
    .unwrap();
    Session::connect(stream, options).unwrap();

    let body = String::from_utf8_lossy(&written.bytes()).into_owned();
    assert!(body.contains("user\0bob\0"));
    assert!(body.contains("database\0shop\0"));
    assert!(body.contains("application_name\0billing\0"));
}
