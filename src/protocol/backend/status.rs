//! Session status messages: key data, parameters, readiness and notifications.

use zerocopy::byteorder::big_endian::U32 as U32BE;
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::error::{Error, Result};
use crate::protocol::codec::{read_cstr, read_i32, read_u32};
use crate::protocol::types::TransactionStatus;

/// BackendKeyData message - process ID and secret key for cancellation.
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
pub struct BackendKeyData {
    /// Process ID of the backend
    pub pid: U32BE,
    /// Secret key for cancellation
    pub secret_key: U32BE,
}

impl BackendKeyData {
    /// Parse a BackendKeyData message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<&Self> {
        Self::ref_from_bytes(payload).map_err(|_| {
            Error::Protocol(format!(
                "BackendKeyData: expected 8 bytes, got {}",
                payload.len()
            ))
        })
    }

    /// Get the process ID.
    pub fn process_id(&self) -> u32 {
        self.pid.get()
    }

    /// Get the secret key.
    pub fn secret(&self) -> u32 {
        self.secret_key.get()
    }
}

/// ParameterStatus message - server parameter name and value.
#[derive(Debug, Clone, Copy)]
pub struct ParameterStatus<'a> {
    /// Parameter name
    pub name: &'a str,
    /// Parameter value
    pub value: &'a str,
}

impl<'a> ParameterStatus<'a> {
    /// Parse a ParameterStatus message from payload bytes.
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (name, rest) = read_cstr(payload)?;
        let (value, rest) = read_cstr(rest)?;
        super::expect_empty("ParameterStatus", rest)?;
        Ok(Self { name, value })
    }
}

/// ReadyForQuery message - server is ready for a new query.
#[derive(Debug, Clone, Copy)]
pub struct ReadyForQuery {
    /// Transaction status
    pub status: TransactionStatus,
}

impl ReadyForQuery {
    /// Parse a ReadyForQuery message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        match payload {
            [byte] => Ok(Self {
                status: TransactionStatus::from_byte(*byte)?,
            }),
            _ => Err(Error::Protocol(format!(
                "ReadyForQuery: expected 1 byte, got {}",
                payload.len()
            ))),
        }
    }
}

/// NotificationResponse message - asynchronous LISTEN/NOTIFY delivery.
#[derive(Debug, Clone, Copy)]
pub struct NotificationResponse<'a> {
    /// PID of the notifying backend
    pub pid: u32,
    /// Channel name
    pub channel: &'a str,
    /// Notification payload
    pub payload: &'a str,
}

impl<'a> NotificationResponse<'a> {
    /// Parse a NotificationResponse message from payload bytes.
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (pid, rest) = read_u32(payload)?;
        let (channel, rest) = read_cstr(rest)?;
        let (payload_str, rest) = read_cstr(rest)?;
        super::expect_empty("NotificationResponse", rest)?;
        Ok(Self {
            pid,
            channel,
            payload: payload_str,
        })
    }
}

/// NegotiateProtocolVersion message - the server supports an older minor
/// version or does not recognize some `_pq_.` startup options.
#[derive(Debug, Clone)]
pub struct NegotiateProtocolVersion<'a> {
    /// Newest minor protocol version supported
    pub newest_minor_version: i32,
    /// Unrecognized protocol options
    pub unrecognized_options: Vec<&'a str>,
}

impl<'a> NegotiateProtocolVersion<'a> {
    /// Parse a NegotiateProtocolVersion message from payload bytes.
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (newest_minor_version, rest) = read_i32(payload)?;
        let (num_options, mut rest) = read_i32(rest)?;
        let num_options = usize::try_from(num_options).map_err(|_| {
            Error::Protocol(format!(
                "NegotiateProtocolVersion: negative option count {}",
                num_options
            ))
        })?;

        let mut unrecognized_options = Vec::new();
        for _ in 0..num_options {
            let (option, remaining) = read_cstr(rest)?;
            unrecognized_options.push(option);
            rest = remaining;
        }
        super::expect_empty("NegotiateProtocolVersion", rest)?;

        Ok(Self {
            newest_minor_version,
            unrecognized_options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_key_data() {
        let key = BackendKeyData::parse(&[0, 0, 0, 123, 0, 0, 1, 200]).unwrap();
        assert_eq!(key.process_id(), 123);
        assert_eq!(key.secret(), 456);
        assert!(BackendKeyData::parse(&[0, 0, 0, 123]).is_err());
    }

    #[test]
    fn test_ready_for_query() {
        assert_eq!(
            ReadyForQuery::parse(b"T").unwrap().status,
            TransactionStatus::InTransaction
        );
        assert!(ReadyForQuery::parse(b"X").is_err());
        assert!(ReadyForQuery::parse(b"").is_err());
    }

    #[test]
    fn test_negotiate_protocol_version() {
        let mut payload = 0_i32.to_be_bytes().to_vec();
        payload.extend_from_slice(&2_i32.to_be_bytes());
        payload.extend_from_slice(b"_pq_.a\0_pq_.b\0");
        let msg = NegotiateProtocolVersion::parse(&payload).unwrap();
        assert_eq!(msg.newest_minor_version, 0);
        assert_eq!(msg.unrecognized_options, vec!["_pq_.a", "_pq_.b"]);

        assert!(NegotiateProtocolVersion::parse(&payload[..payload.len() - 1]).is_err());
    }

    #[test]
    fn test_notification() {
        let payload = b"\0\0\0\x07chan\0hello\0";
        let n = NotificationResponse::parse(payload).unwrap();
        assert_eq!((n.pid, n.channel, n.payload), (7, "chan", "hello"));
    }
}
