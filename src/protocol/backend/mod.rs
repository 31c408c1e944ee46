//! PostgreSQL backend (server → client) messages.
//!
//! [`BackendMessage::parse`] turns one frame (tag byte plus body) into a
//! typed message. Unknown tags and truncated or oversized bodies are
//! protocol errors.

pub mod auth;
pub mod copy;
pub mod error;
pub mod extended;
pub mod query;
pub mod status;

pub use auth::AuthenticationMessage;
pub use copy::CopyResponse;
pub use error::{ErrorResponse, NoticeResponse, parse_fields};
pub use extended::ParameterDescription;
pub use query::{CommandComplete, DataRow, DataRowIter, FieldDescription, RowDescription};
pub use status::{
    BackendKeyData, NegotiateProtocolVersion, NotificationResponse, ParameterStatus,
    ReadyForQuery,
};

use crate::error::{Error, ErrorFields, Result};

/// Backend message type bytes.
pub mod msg_type {
    /// Authentication message
    pub const AUTHENTICATION: u8 = b'R';
    /// BackendKeyData
    pub const BACKEND_KEY_DATA: u8 = b'K';
    /// ParameterStatus
    pub const PARAMETER_STATUS: u8 = b'S';
    /// ReadyForQuery
    pub const READY_FOR_QUERY: u8 = b'Z';
    /// RowDescription
    pub const ROW_DESCRIPTION: u8 = b'T';
    /// DataRow
    pub const DATA_ROW: u8 = b'D';
    /// CommandComplete
    pub const COMMAND_COMPLETE: u8 = b'C';
    /// EmptyQueryResponse
    pub const EMPTY_QUERY_RESPONSE: u8 = b'I';
    /// ErrorResponse
    pub const ERROR_RESPONSE: u8 = b'E';
    /// NoticeResponse
    pub const NOTICE_RESPONSE: u8 = b'N';
    /// NotificationResponse
    pub const NOTIFICATION_RESPONSE: u8 = b'A';
    /// ParseComplete
    pub const PARSE_COMPLETE: u8 = b'1';
    /// BindComplete
    pub const BIND_COMPLETE: u8 = b'2';
    /// CloseComplete
    pub const CLOSE_COMPLETE: u8 = b'3';
    /// ParameterDescription
    pub const PARAMETER_DESCRIPTION: u8 = b't';
    /// NoData
    pub const NO_DATA: u8 = b'n';
    /// PortalSuspended
    pub const PORTAL_SUSPENDED: u8 = b's';
    /// CopyInResponse
    pub const COPY_IN_RESPONSE: u8 = b'G';
    /// CopyOutResponse
    pub const COPY_OUT_RESPONSE: u8 = b'H';
    /// CopyBothResponse
    pub const COPY_BOTH_RESPONSE: u8 = b'W';
    /// CopyData
    pub const COPY_DATA: u8 = b'd';
    /// CopyDone
    pub const COPY_DONE: u8 = b'c';
    /// NegotiateProtocolVersion
    pub const NEGOTIATE_PROTOCOL_VERSION: u8 = b'v';
}

/// A parsed backend message.
#[derive(Debug, Clone)]
pub enum BackendMessage<'a> {
    /// Authentication request
    Authentication(AuthenticationMessage<'a>),
    /// Cancellation key for this session
    BackendKeyData {
        /// Backend process id
        pid: u32,
        /// Secret key
        secret_key: u32,
    },
    /// Server parameter report
    ParameterStatus(ParameterStatus<'a>),
    /// End of a request cycle
    ReadyForQuery(ReadyForQuery),
    /// Column descriptions of the following rows
    RowDescription(RowDescription<'a>),
    /// One row of column values
    DataRow(DataRow<'a>),
    /// Statement finished
    CommandComplete(CommandComplete<'a>),
    /// Empty query string
    EmptyQueryResponse,
    /// Error report
    ErrorResponse(ErrorFields),
    /// Notice report
    NoticeResponse(ErrorFields),
    /// LISTEN/NOTIFY delivery
    NotificationResponse(NotificationResponse<'a>),
    /// Parse done
    ParseComplete,
    /// Bind done
    BindComplete,
    /// Close done
    CloseComplete,
    /// Statement or portal returns no rows
    NoData,
    /// Execute stopped at its row limit
    PortalSuspended,
    /// Statement parameter types
    ParameterDescription(ParameterDescription),
    /// Server waits for COPY data
    CopyInResponse(CopyResponse),
    /// Server is about to send COPY data
    CopyOutResponse(CopyResponse),
    /// Bidirectional COPY (replication)
    CopyBothResponse(CopyResponse),
    /// COPY payload
    CopyData(&'a [u8]),
    /// End of COPY data
    CopyDone,
    /// Protocol version or option downgrade
    NegotiateProtocolVersion(NegotiateProtocolVersion<'a>),
}

impl<'a> BackendMessage<'a> {
    /// Parse one message from its tag byte and body.
    pub fn parse(type_byte: u8, payload: &'a [u8]) -> Result<Self> {
        let message = match type_byte {
            msg_type::AUTHENTICATION => {
                BackendMessage::Authentication(AuthenticationMessage::parse(payload)?)
            }
            msg_type::BACKEND_KEY_DATA => {
                let key = BackendKeyData::parse(payload)?;
                BackendMessage::BackendKeyData {
                    pid: key.process_id(),
                    secret_key: key.secret(),
                }
            }
            msg_type::PARAMETER_STATUS => {
                BackendMessage::ParameterStatus(ParameterStatus::parse(payload)?)
            }
            msg_type::READY_FOR_QUERY => {
                BackendMessage::ReadyForQuery(ReadyForQuery::parse(payload)?)
            }
            msg_type::ROW_DESCRIPTION => {
                BackendMessage::RowDescription(RowDescription::parse(payload)?)
            }
            msg_type::DATA_ROW => BackendMessage::DataRow(DataRow::parse(payload)?),
            msg_type::COMMAND_COMPLETE => {
                BackendMessage::CommandComplete(CommandComplete::parse(payload)?)
            }
            msg_type::EMPTY_QUERY_RESPONSE => {
                expect_empty("EmptyQueryResponse", payload)?;
                BackendMessage::EmptyQueryResponse
            }
            msg_type::ERROR_RESPONSE => BackendMessage::ErrorResponse(parse_fields(payload)?),
            msg_type::NOTICE_RESPONSE => BackendMessage::NoticeResponse(parse_fields(payload)?),
            msg_type::NOTIFICATION_RESPONSE => {
                BackendMessage::NotificationResponse(NotificationResponse::parse(payload)?)
            }
            msg_type::PARSE_COMPLETE => {
                expect_empty("ParseComplete", payload)?;
                BackendMessage::ParseComplete
            }
            msg_type::BIND_COMPLETE => {
                expect_empty("BindComplete", payload)?;
                BackendMessage::BindComplete
            }
            msg_type::CLOSE_COMPLETE => {
                expect_empty("CloseComplete", payload)?;
                BackendMessage::CloseComplete
            }
            msg_type::NO_DATA => {
                expect_empty("NoData", payload)?;
                BackendMessage::NoData
            }
            msg_type::PORTAL_SUSPENDED => {
                expect_empty("PortalSuspended", payload)?;
                BackendMessage::PortalSuspended
            }
            msg_type::PARAMETER_DESCRIPTION => {
                BackendMessage::ParameterDescription(ParameterDescription::parse(payload)?)
            }
            msg_type::COPY_IN_RESPONSE => {
                BackendMessage::CopyInResponse(CopyResponse::parse(payload)?)
            }
            msg_type::COPY_OUT_RESPONSE => {
                BackendMessage::CopyOutResponse(CopyResponse::parse(payload)?)
            }
            msg_type::COPY_BOTH_RESPONSE => {
                BackendMessage::CopyBothResponse(CopyResponse::parse(payload)?)
            }
            msg_type::COPY_DATA => BackendMessage::CopyData(payload),
            msg_type::COPY_DONE => {
                expect_empty("CopyDone", payload)?;
                BackendMessage::CopyDone
            }
            msg_type::NEGOTIATE_PROTOCOL_VERSION => {
                BackendMessage::NegotiateProtocolVersion(NegotiateProtocolVersion::parse(payload)?)
            }
            other => {
                return Err(Error::Protocol(format!(
                    "unknown backend message tag: 0x{:02x}",
                    other
                )));
            }
        };
        Ok(message)
    }

    /// Message name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            BackendMessage::Authentication(_) => "Authentication",
            BackendMessage::BackendKeyData { .. } => "BackendKeyData",
            BackendMessage::ParameterStatus(_) => "ParameterStatus",
            BackendMessage::ReadyForQuery(_) => "ReadyForQuery",
            BackendMessage::RowDescription(_) => "RowDescription",
            BackendMessage::DataRow(_) => "DataRow",
            BackendMessage::CommandComplete(_) => "CommandComplete",
            BackendMessage::EmptyQueryResponse => "EmptyQueryResponse",
            BackendMessage::ErrorResponse(_) => "ErrorResponse",
            BackendMessage::NoticeResponse(_) => "NoticeResponse",
            BackendMessage::NotificationResponse(_) => "NotificationResponse",
            BackendMessage::ParseComplete => "ParseComplete",
            BackendMessage::BindComplete => "BindComplete",
            BackendMessage::CloseComplete => "CloseComplete",
            BackendMessage::NoData => "NoData",
            BackendMessage::PortalSuspended => "PortalSuspended",
            BackendMessage::ParameterDescription(_) => "ParameterDescription",
            BackendMessage::CopyInResponse(_) => "CopyInResponse",
            BackendMessage::CopyOutResponse(_) => "CopyOutResponse",
            BackendMessage::CopyBothResponse(_) => "CopyBothResponse",
            BackendMessage::CopyData(_) => "CopyData",
            BackendMessage::CopyDone => "CopyDone",
            BackendMessage::NegotiateProtocolVersion(_) => "NegotiateProtocolVersion",
        }
    }
}

/// Reject a body that carries bytes the message layout does not define.
pub(crate) fn expect_empty(name: &str, rest: &[u8]) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(Error::Protocol(format!(
            "{}: {} unexpected trailing bytes",
            name,
            rest.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::TransactionStatus;

    #[test]
    fn test_parse_dispatch() {
        assert!(matches!(
            BackendMessage::parse(b'Z', b"I").unwrap(),
            BackendMessage::ReadyForQuery(ReadyForQuery {
                status: TransactionStatus::Idle
            })
        ));
        assert!(matches!(
            BackendMessage::parse(b'K', &[0, 0, 0, 1, 0, 0, 0, 2]).unwrap(),
            BackendMessage::BackendKeyData {
                pid: 1,
                secret_key: 2
            }
        ));
        assert!(matches!(
            BackendMessage::parse(b'd', b"1\t2\n").unwrap(),
            BackendMessage::CopyData(b"1\t2\n")
        ));
    }

    #[test]
    fn test_unknown_tag_is_protocol_error() {
        let err = BackendMessage::parse(b'@', &[]).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(err.is_connection_broken());
    }

    #[test]
    fn test_empty_messages_reject_body() {
        assert!(BackendMessage::parse(b'1', &[]).is_ok());
        assert!(BackendMessage::parse(b'1', &[0]).is_err());
        assert!(BackendMessage::parse(b'Z', &[]).is_err());
    }

    #[test]
    fn test_error_response_fields() {
        match BackendMessage::parse(b'E', b"SERROR\0C42601\0Msyntax error\0\0").unwrap() {
            BackendMessage::ErrorResponse(fields) => {
                assert_eq!(fields.severity.as_deref(), Some("ERROR"));
                assert_eq!(fields.code.as_deref(), Some("42601"));
                assert_eq!(fields.message.as_deref(), Some("syntax error"));
            }
            other => panic!("unexpected {}", other.name()),
        }
    }
}
