//! PostgreSQL frontend (client → server) messages.
//!
//! Each message has a `write_*` function appending one complete frame to a
//! buffer. A write that fails leaves the buffer unchanged.

pub mod auth;
pub mod copy;
pub mod extended;
pub mod simple;
pub mod startup;

pub use auth::{
    ScramClient, md5_password, write_password, write_sasl_initial_response, write_sasl_response,
};
pub use copy::{write_copy_data, write_copy_done, write_copy_fail};
pub use extended::{
    EXECUTE_MAX_ROWS, Target, write_bind, write_close, write_describe, write_execute, write_flush,
    write_parse, write_sync,
};
pub use simple::write_query;
pub use startup::{
    CANCEL_REQUEST_CODE, PROTOCOL_VERSION_3_0, SSL_REQUEST_CODE, write_cancel_request,
    write_ssl_request, write_startup, write_terminate,
};

use crate::error::Result;
use crate::protocol::types::{FormatCode, Oid};
use crate::types::ToParams;

/// Frontend message type bytes.
pub mod msg_type {
    /// Password/SASL response (all auth response types use 'p')
    pub const PASSWORD: u8 = b'p';
    /// Query (simple query protocol)
    pub const QUERY: u8 = b'Q';
    /// Parse (extended query protocol)
    pub const PARSE: u8 = b'P';
    /// Bind (extended query protocol)
    pub const BIND: u8 = b'B';
    /// Execute (extended query protocol)
    pub const EXECUTE: u8 = b'E';
    /// Describe (extended query protocol)
    pub const DESCRIBE: u8 = b'D';
    /// Close (extended query protocol)
    pub const CLOSE: u8 = b'C';
    /// Sync (extended query protocol)
    pub const SYNC: u8 = b'S';
    /// Flush (extended query protocol)
    pub const FLUSH: u8 = b'H';
    /// CopyData
    pub const COPY_DATA: u8 = b'd';
    /// CopyDone
    pub const COPY_DONE: u8 = b'c';
    /// CopyFail
    pub const COPY_FAIL: u8 = b'f';
    /// Terminate
    pub const TERMINATE: u8 = b'X';
}

/// A frontend message ready to be written.
pub enum FrontendMessage<'a> {
    /// StartupMessage (untagged)
    Startup {
        /// Protocol version, normally [`PROTOCOL_VERSION_3_0`]
        version: i32,
        /// (name, value) startup parameters
        params: &'a [(&'a str, &'a str)],
    },
    /// SSLRequest (untagged)
    SslRequest,
    /// CancelRequest (untagged, 16 bytes)
    CancelRequest {
        /// Backend process id
        pid: u32,
        /// Backend secret key
        secret_key: u32,
    },
    /// PasswordMessage
    Password(&'a str),
    /// SASLInitialResponse
    SaslInitialResponse {
        /// Chosen mechanism
        mechanism: &'a str,
        /// Client-first-message
        data: &'a [u8],
    },
    /// SASLResponse
    SaslResponse(&'a [u8]),
    /// Query
    Query(&'a str),
    /// Parse
    Parse {
        /// Statement name
        name: &'a str,
        /// SQL text
        query: &'a str,
        /// Parameter type OIDs
        param_oids: &'a [Oid],
    },
    /// Bind
    Bind {
        /// Portal name
        portal: &'a str,
        /// Statement name
        statement: &'a str,
        /// Parameter values
        params: &'a dyn ToParams,
        /// Statement parameter types
        param_oids: &'a [Oid],
        /// Send parameters in binary where possible
        binary_params: bool,
        /// Result column formats
        result_formats: &'a [FormatCode],
    },
    /// Describe
    Describe(Target, &'a str),
    /// Execute
    Execute {
        /// Portal name
        portal: &'a str,
        /// Row limit, 0 for all rows
        max_rows: u64,
    },
    /// Close
    Close(Target, &'a str),
    /// Sync
    Sync,
    /// Flush
    Flush,
    /// CopyData
    CopyData(&'a [u8]),
    /// CopyDone
    CopyDone,
    /// CopyFail
    CopyFail(&'a str),
    /// Terminate
    Terminate,
}

impl FrontendMessage<'_> {
    /// Append this message's frame to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        match *self {
            FrontendMessage::Startup { version, params } => write_startup(buf, version, params),
            FrontendMessage::SslRequest => write_ssl_request(buf),
            FrontendMessage::CancelRequest { pid, secret_key } => {
                write_cancel_request(buf, pid, secret_key)
            }
            FrontendMessage::Password(password) => write_password(buf, password),
            FrontendMessage::SaslInitialResponse { mechanism, data } => {
                write_sasl_initial_response(buf, mechanism, data)
            }
            FrontendMessage::SaslResponse(data) => write_sasl_response(buf, data),
            FrontendMessage::Query(sql) => write_query(buf, sql),
            FrontendMessage::Parse {
                name,
                query,
                param_oids,
            } => write_parse(buf, name, query, param_oids),
            FrontendMessage::Bind {
                portal,
                statement,
                params,
                param_oids,
                binary_params,
                result_formats,
            } => write_bind(
                buf,
                portal,
                statement,
                params,
                param_oids,
                binary_params,
                result_formats,
            ),
            FrontendMessage::Describe(target, name) => write_describe(buf, target, name),
            FrontendMessage::Execute { portal, max_rows } => write_execute(buf, portal, max_rows),
            FrontendMessage::Close(target, name) => write_close(buf, target, name),
            FrontendMessage::Sync => write_sync(buf),
            FrontendMessage::Flush => write_flush(buf),
            FrontendMessage::CopyData(data) => write_copy_data(buf, data),
            FrontendMessage::CopyDone => write_copy_done(buf),
            FrontendMessage::CopyFail(reason) => write_copy_fail(buf, reason),
            FrontendMessage::Terminate => write_terminate(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_len(buf: &[u8], tagged: bool) -> usize {
        let at = usize::from(tagged);
        i32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]) as usize
    }

    #[test]
    fn test_every_frame_length_covers_body() {
        let params = (1_i32, "x");
        let messages: Vec<(FrontendMessage<'_>, bool)> = vec![
            (
                FrontendMessage::Startup {
                    version: PROTOCOL_VERSION_3_0,
                    params: &[("user", "u")],
                },
                false,
            ),
            (FrontendMessage::SslRequest, false),
            (
                FrontendMessage::CancelRequest {
                    pid: 1,
                    secret_key: 2,
                },
                false,
            ),
            (FrontendMessage::Password("pw"), true),
            (
                FrontendMessage::SaslInitialResponse {
                    mechanism: "SCRAM-SHA-256",
                    data: b"abc",
                },
                true,
            ),
            (FrontendMessage::SaslResponse(b"abc"), true),
            (FrontendMessage::Query("SELECT 1"), true),
            (
                FrontendMessage::Parse {
                    name: "s",
                    query: "SELECT $1, $2",
                    param_oids: &[0, 0],
                },
                true,
            ),
            (
                FrontendMessage::Bind {
                    portal: "",
                    statement: "s",
                    params: &params,
                    param_oids: &[],
                    binary_params: true,
                    result_formats: &[FormatCode::Text],
                },
                true,
            ),
            (FrontendMessage::Describe(Target::Statement, "s"), true),
            (
                FrontendMessage::Execute {
                    portal: "",
                    max_rows: 10,
                },
                true,
            ),
            (FrontendMessage::Close(Target::Portal, ""), true),
            (FrontendMessage::Sync, true),
            (FrontendMessage::Flush, true),
            (FrontendMessage::CopyData(b"1\t2\n"), true),
            (FrontendMessage::CopyDone, true),
            (FrontendMessage::CopyFail("stop"), true),
            (FrontendMessage::Terminate, true),
        ];

        for (message, tagged) in messages {
            let mut buf = Vec::new();
            message.encode(&mut buf).unwrap();
            let header = usize::from(tagged);
            assert_eq!(frame_len(&buf, tagged), buf.len() - header);
        }
    }
}
