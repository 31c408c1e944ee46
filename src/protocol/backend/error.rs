//! Error and notice response messages.

use crate::error::{Error, ErrorFields, Result};
use crate::protocol::codec::{read_cstr, read_u8};

/// Error field type codes from PostgreSQL protocol.
pub mod field_type {
    /// Severity (localized)
    pub const SEVERITY: u8 = b'S';
    /// Severity (non-localized, PostgreSQL 9.6+)
    pub const VERBOSITY: u8 = b'V';
    /// SQLSTATE code
    pub const CODE: u8 = b'C';
    /// Message
    pub const MESSAGE: u8 = b'M';
    /// Detail
    pub const DETAIL: u8 = b'D';
    /// Hint
    pub const HINT: u8 = b'H';
    /// Position in query
    pub const POSITION: u8 = b'P';
    /// Internal position
    pub const INTERNAL_POSITION: u8 = b'p';
    /// Internal query
    pub const INTERNAL_QUERY: u8 = b'q';
    /// Where (context)
    pub const WHERE: u8 = b'W';
    /// Schema name
    pub const SCHEMA: u8 = b's';
    /// Table name
    pub const TABLE: u8 = b't';
    /// Column name
    pub const COLUMN: u8 = b'c';
    /// Data type name
    pub const DATA_TYPE: u8 = b'd';
    /// Constraint name
    pub const CONSTRAINT: u8 = b'n';
    /// File name
    pub const FILE: u8 = b'F';
    /// Line number
    pub const LINE: u8 = b'L';
    /// Routine name
    pub const ROUTINE: u8 = b'R';
}

/// Parse error/notice fields from payload.
///
/// Unknown field tags and a missing terminator are protocol errors.
pub fn parse_fields(payload: &[u8]) -> Result<ErrorFields> {
    let mut fields = ErrorFields::default();
    let mut data = payload;

    loop {
        let (tag, rest) = read_u8(data)
            .map_err(|_| Error::Protocol("error fields: missing terminator".into()))?;
        if tag == 0 {
            break;
        }
        let (value, rest) = read_cstr(rest)?;
        data = rest;

        let slot = match tag {
            field_type::SEVERITY => &mut fields.severity,
            field_type::VERBOSITY => &mut fields.verbosity,
            field_type::CODE => &mut fields.code,
            field_type::MESSAGE => &mut fields.message,
            field_type::DETAIL => &mut fields.detail,
            field_type::HINT => &mut fields.hint,
            field_type::POSITION => &mut fields.position,
            field_type::INTERNAL_POSITION => &mut fields.internal_position,
            field_type::INTERNAL_QUERY => &mut fields.internal_query,
            field_type::WHERE => &mut fields.where_,
            field_type::SCHEMA => &mut fields.schema,
            field_type::TABLE => &mut fields.table,
            field_type::COLUMN => &mut fields.column,
            field_type::DATA_TYPE => &mut fields.datatype,
            field_type::CONSTRAINT => &mut fields.constraint,
            field_type::FILE => &mut fields.source_file,
            field_type::LINE => &mut fields.source_line,
            field_type::ROUTINE => &mut fields.source_function,
            other => {
                return Err(Error::Protocol(format!(
                    "unknown error field tag: 0x{:02x}",
                    other
                )));
            }
        };
        *slot = Some(value.to_string());
    }

    Ok(fields)
}

/// ErrorResponse message - error from server.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    /// Parsed error fields
    pub fields: ErrorFields,
}

impl ErrorResponse {
    /// Parse an ErrorResponse message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        Ok(Self {
            fields: parse_fields(payload)?,
        })
    }

    /// Convert to an Error.
    pub fn into_error(self) -> Error {
        Error::Server(self.fields)
    }
}

/// NoticeResponse message - non-fatal warning/info from server.
#[derive(Debug, Clone)]
pub struct NoticeResponse {
    /// Parsed notice fields
    pub fields: ErrorFields,
}

impl NoticeResponse {
    /// Parse a NoticeResponse message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        Ok(Self {
            fields: parse_fields(payload)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_fields() {
        let payload = b"SERROR\0C42601\0Msyntax error\0\0";
        let err = ErrorResponse::parse(payload).unwrap();
        assert_eq!(
            err.fields.fields(),
            vec![
                ("severity", "ERROR"),
                ("code", "42601"),
                ("message", "syntax error")
            ]
        );
        assert_eq!(err.into_error().sqlstate(), Some("42601"));
    }

    #[test]
    fn test_all_known_tags() {
        let mut payload = Vec::new();
        for tag in b"SVCMDHPpqWstcdnFLR" {
            payload.push(*tag);
            payload.extend_from_slice(b"v\0");
        }
        payload.push(0);
        assert_eq!(parse_fields(&payload).unwrap().fields().len(), 18);
    }

    #[test]
    fn test_unknown_tag_is_protocol_error() {
        let err = parse_fields(b"SERROR\0Zboom\0\0").unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn test_missing_terminator() {
        assert!(matches!(
            parse_fields(b"SERROR\0"),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(parse_fields(b"SERR"), Err(Error::Protocol(_))));
    }
}
