//! Startup, cancellation and termination messages.
//!
//! Startup, SSLRequest and CancelRequest precede protocol negotiation and
//! carry no tag byte.

use crate::error::Result;
use crate::protocol::codec::MessageBuilder;

/// Protocol version 3.0 (0x00030000)
pub const PROTOCOL_VERSION_3_0: i32 = 196608;

/// SSL request code
pub const SSL_REQUEST_CODE: i32 = 80877103;

/// Cancel request code
pub const CANCEL_REQUEST_CODE: i32 = 80877102;

/// Write an SSLRequest message.
///
/// Server responds with single byte: 'S' (accepted) or 'N' (rejected).
/// The TLS handshake itself belongs to the transport.
pub fn write_ssl_request(buf: &mut Vec<u8>) -> Result<()> {
    let mut msg = MessageBuilder::new_untagged(buf);
    msg.write_i32(SSL_REQUEST_CODE);
    msg.finish()
}

/// Write a StartupMessage.
///
/// Parameters is a list of (name, value) pairs.
/// Required: "user" - database username
/// Optional: "database", "options", "replication", "client_encoding", etc.
pub fn write_startup(buf: &mut Vec<u8>, version: i32, params: &[(&str, &str)]) -> Result<()> {
    let mut msg = MessageBuilder::new_untagged(buf);
    msg.write_i32(version);

    for (name, value) in params {
        msg.write_cstr(name)?;
        msg.write_cstr(value)?;
    }

    // Terminator
    msg.write_u8(0);
    msg.finish()
}

/// Write a CancelRequest message.
///
/// This is sent on a NEW connection to cancel a query running on another connection.
/// The server closes the connection immediately with no response.
pub fn write_cancel_request(buf: &mut Vec<u8>, pid: u32, secret_key: u32) -> Result<()> {
    let mut msg = MessageBuilder::new_untagged(buf);
    msg.write_i32(CANCEL_REQUEST_CODE);
    msg.write_u32(pid);
    msg.write_u32(secret_key);
    msg.finish()
}

/// Write a Terminate message.
pub fn write_terminate(buf: &mut Vec<u8>) -> Result<()> {
    MessageBuilder::new(buf, super::msg_type::TERMINATE).finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssl_request() {
        let mut buf = Vec::new();
        write_ssl_request(&mut buf).unwrap();

        assert_eq!(buf.len(), 8);
        assert_eq!(&buf[0..4], &8_i32.to_be_bytes());
        assert_eq!(&buf[4..8], &SSL_REQUEST_CODE.to_be_bytes());
    }

    #[test]
    fn test_startup() {
        let mut buf = Vec::new();
        write_startup(
            &mut buf,
            PROTOCOL_VERSION_3_0,
            &[("user", "postgres"), ("database", "test")],
        )
        .unwrap();

        let len = i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        assert_eq!(len as usize, buf.len());
        assert_eq!(&buf[4..8], &PROTOCOL_VERSION_3_0.to_be_bytes());
        assert_eq!(&buf[8..], b"user\0postgres\0database\0test\0\0");
    }

    #[test]
    fn test_cancel_request_is_16_bytes() {
        let mut buf = Vec::new();
        write_cancel_request(&mut buf, 123, 456).unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(&16_i32.to_be_bytes());
        expected.extend_from_slice(&80877102_i32.to_be_bytes());
        expected.extend_from_slice(&123_i32.to_be_bytes());
        expected.extend_from_slice(&456_i32.to_be_bytes());
        assert_eq!(buf, expected);
    }

    #[test]
    fn test_terminate() {
        let mut buf = Vec::new();
        write_terminate(&mut buf).unwrap();
        assert_eq!(buf, [b'X', 0, 0, 0, 4]);
    }
}
