//! Extended query protocol messages.

use crate::error::{Error, Result};
use crate::protocol::codec::MessageBuilder;
use crate::protocol::types::{FormatCode, Oid};
use crate::types::ToParams;

/// Largest row limit an Execute message can carry.
pub const EXECUTE_MAX_ROWS: u64 = u32::MAX as u64;

/// Statement or portal selector for Describe and Close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Prepared statement ('S')
    Statement,
    /// Portal ('P')
    Portal,
}

impl Target {
    fn as_byte(self) -> u8 {
        match self {
            Target::Statement => b'S',
            Target::Portal => b'P',
        }
    }
}

/// Write a Parse message to create a prepared statement.
///
/// - `name`: Statement name (empty string for unnamed statement)
/// - `query`: SQL query with $1, $2, ... placeholders
/// - `param_oids`: Parameter type OIDs (0 = let server infer)
pub fn write_parse(buf: &mut Vec<u8>, name: &str, query: &str, param_oids: &[Oid]) -> Result<()> {
    let mut msg = MessageBuilder::new(buf, super::msg_type::PARSE);
    msg.write_cstr(name)?;
    msg.write_cstr(query)?;
    msg.write_count(param_oids.len())?;
    for &oid in param_oids {
        msg.write_u32(oid);
    }
    msg.finish()
}

/// Write a Bind message to create a portal from a prepared statement.
///
/// - `portal`: Portal name (empty string for unnamed portal)
/// - `statement`: Statement name
/// - `params`: Parameter values
/// - `param_oids`: Statement parameter types, as described by the server
/// - `binary_params`: Send parameters in binary where a codec exists
/// - `result_formats`: Format codes for results
pub fn write_bind<P: ToParams + ?Sized>(
    buf: &mut Vec<u8>,
    portal: &str,
    statement: &str,
    params: &P,
    param_oids: &[Oid],
    binary_params: bool,
    result_formats: &[FormatCode],
) -> Result<()> {
    let mut msg = MessageBuilder::new(buf, super::msg_type::BIND);
    msg.write_cstr(portal)?;
    msg.write_cstr(statement)?;
    params.encode(param_oids, binary_params, msg.buf())?;

    msg.write_count(result_formats.len())?;
    for &fmt in result_formats {
        msg.write_u16(fmt.as_u16());
    }
    msg.finish()
}

/// Write an Execute message to run a portal.
///
/// - `portal`: Portal name
/// - `max_rows`: Maximum number of rows to return (0 = unlimited)
///
/// Fails without writing anything if `max_rows` exceeds [`EXECUTE_MAX_ROWS`].
pub fn write_execute(buf: &mut Vec<u8>, portal: &str, max_rows: u64) -> Result<()> {
    let max_rows = u32::try_from(max_rows).map_err(|_| {
        Error::Encode(format!(
            "too many rows: {} (at most {})",
            max_rows, EXECUTE_MAX_ROWS
        ))
    })?;
    let mut msg = MessageBuilder::new(buf, super::msg_type::EXECUTE);
    msg.write_cstr(portal)?;
    msg.write_u32(max_rows);
    msg.finish()
}

/// Write a Describe message to get metadata.
pub fn write_describe(buf: &mut Vec<u8>, target: Target, name: &str) -> Result<()> {
    let mut msg = MessageBuilder::new(buf, super::msg_type::DESCRIBE);
    msg.write_u8(target.as_byte());
    msg.write_cstr(name)?;
    msg.finish()
}

/// Write a Close message to release a statement or portal.
pub fn write_close(buf: &mut Vec<u8>, target: Target, name: &str) -> Result<()> {
    let mut msg = MessageBuilder::new(buf, super::msg_type::CLOSE);
    msg.write_u8(target.as_byte());
    msg.write_cstr(name)?;
    msg.finish()
}

/// Write a Sync message.
///
/// This ends an extended query sequence and causes:
/// - Implicit COMMIT if successful and not in explicit transaction
/// - Implicit ROLLBACK if failed and not in explicit transaction
/// - Server responds with ReadyForQuery
pub fn write_sync(buf: &mut Vec<u8>) -> Result<()> {
    MessageBuilder::new(buf, super::msg_type::SYNC).finish()
}

/// Write a Flush message.
///
/// Forces the server to send all pending responses without waiting for Sync.
pub fn write_flush(buf: &mut Vec<u8>) -> Result<()> {
    MessageBuilder::new(buf, super::msg_type::FLUSH).finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::oid;

    #[test]
    fn test_parse() {
        let mut buf = Vec::new();
        write_parse(&mut buf, "s1", "SELECT $1", &[oid::INT4]).unwrap();

        assert_eq!(buf[0], b'P');
        let len = i32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
        assert_eq!(len as usize, buf.len() - 1);
        assert_eq!(&buf[5..], b"s1\0SELECT $1\0\x00\x01\x00\x00\x00\x17");
    }

    #[test]
    fn test_bind() {
        let mut buf = Vec::new();
        write_bind(
            &mut buf,
            "p1",
            "s1",
            &(5_i32,),
            &[oid::INT4],
            false,
            &[FormatCode::Binary],
        )
        .unwrap();

        assert_eq!(buf[0], b'B');
        let len = i32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
        assert_eq!(len as usize, buf.len() - 1);
        assert_eq!(
            &buf[5..],
            b"p1\0s1\0\x00\x01\x00\x00\x00\x01\x00\x00\x00\x015\x00\x01\x00\x01"
        );
    }

    #[test]
    fn test_bind_encode_error_writes_nothing() {
        let mut buf = Vec::new();
        let err = write_bind(&mut buf, "", "", &(true,), &[oid::INT4], true, &[]);
        assert!(matches!(err, Err(Error::Encode(_))));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_sync_and_flush() {
        let mut buf = Vec::new();
        write_sync(&mut buf).unwrap();
        write_flush(&mut buf).unwrap();
        assert_eq!(buf, [b'S', 0, 0, 0, 4, b'H', 0, 0, 0, 4]);
    }

    #[test]
    fn test_execute() {
        let mut buf = Vec::new();
        write_execute(&mut buf, "", 0).unwrap();
        assert_eq!(buf, [b'E', 0, 0, 0, 9, 0, 0, 0, 0, 0]);

        buf.clear();
        write_execute(&mut buf, "", EXECUTE_MAX_ROWS).unwrap();
        assert_eq!(&buf[6..], &[0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_execute_too_many_rows() {
        let mut buf = Vec::new();
        let err = write_execute(&mut buf, "", EXECUTE_MAX_ROWS + 1);
        assert!(matches!(err, Err(Error::Encode(_))));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_describe_and_close() {
        let mut buf = Vec::new();
        write_describe(&mut buf, Target::Portal, "p").unwrap();
        write_close(&mut buf, Target::Statement, "s").unwrap();
        assert_eq!(
            buf,
            [b'D', 0, 0, 0, 7, b'P', b'p', 0, b'C', 0, 0, 0, 7, b'S', b's', 0]
        );
    }
}
