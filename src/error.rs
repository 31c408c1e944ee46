//! Error types for pgwire-session.

use thiserror::Error;

use crate::protocol::types::Oid;

/// Result type for pgwire-session operations.
pub type Result<T> = core::result::Result<T, Error>;

/// PostgreSQL error/notice fields.
///
/// Every field is kept as the server sent it. Numeric fields (`position`,
/// `line`, ...) have typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorFields {
    /// Severity: ERROR, FATAL, PANIC, WARNING, NOTICE, DEBUG, INFO, LOG (localized)
    pub severity: Option<String>,
    /// Non-localized severity (PostgreSQL 9.6+)
    pub verbosity: Option<String>,
    /// SQLSTATE error code (5 characters)
    pub code: Option<String>,
    /// Primary error message
    pub message: Option<String>,
    /// Detailed error explanation
    pub detail: Option<String>,
    /// Suggestion for fixing the error
    pub hint: Option<String>,
    /// Cursor position in query string (1-based)
    pub position: Option<String>,
    /// Position in internal query
    pub internal_position: Option<String>,
    /// Failed internal command text
    pub internal_query: Option<String>,
    /// Context/stack trace
    pub where_: Option<String>,
    /// Schema name
    pub schema: Option<String>,
    /// Table name
    pub table: Option<String>,
    /// Column name
    pub column: Option<String>,
    /// Data type name
    pub datatype: Option<String>,
    /// Constraint name
    pub constraint: Option<String>,
    /// Source file name
    pub source_file: Option<String>,
    /// Source line number
    pub source_line: Option<String>,
    /// Source routine name
    pub source_function: Option<String>,
}

impl ErrorFields {
    /// Cursor position as a number.
    pub fn position(&self) -> Option<u32> {
        self.position.as_deref().and_then(|p| p.parse().ok())
    }

    /// Internal query position as a number.
    pub fn internal_position(&self) -> Option<u32> {
        self.internal_position.as_deref().and_then(|p| p.parse().ok())
    }

    /// Source line as a number.
    pub fn source_line(&self) -> Option<u32> {
        self.source_line.as_deref().and_then(|p| p.parse().ok())
    }

    /// Severity, preferring the non-localized variant.
    pub fn effective_severity(&self) -> Option<&str> {
        self.verbosity.as_deref().or(self.severity.as_deref())
    }

    /// Present fields as `(name, value)` pairs, in protocol order.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        let all = [
            ("severity", &self.severity),
            ("verbosity", &self.verbosity),
            ("code", &self.code),
            ("message", &self.message),
            ("detail", &self.detail),
            ("hint", &self.hint),
            ("position", &self.position),
            ("internal-position", &self.internal_position),
            ("internal-query", &self.internal_query),
            ("where", &self.where_),
            ("schema", &self.schema),
            ("table", &self.table),
            ("column", &self.column),
            ("datatype", &self.datatype),
            ("constraint", &self.constraint),
            ("source-file", &self.source_file),
            ("source-line", &self.source_line),
            ("source-function", &self.source_function),
        ];
        all.into_iter()
            .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
            .collect()
    }
}

impl std::fmt::Display for ErrorFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(severity) = &self.severity {
            write!(f, "{}: ", severity)?;
        }
        if let Some(message) = &self.message {
            write!(f, "{}", message)?;
        }
        if let Some(code) = &self.code {
            write!(f, " (SQLSTATE {})", code)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, "\nDETAIL: {}", detail)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\nHINT: {}", hint)?;
        }
        Ok(())
    }
}

/// Error type for pgwire-session.
#[derive(Debug, Error)]
pub enum Error {
    /// Well-formed ErrorResponse from the server
    #[error("PostgreSQL error: {0}")]
    Server(ErrorFields),

    /// Protocol error (malformed frame, unknown tag, unexpected message)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Transport failure on the underlying byte stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value cannot be represented for the requested OID/format,
    /// or an outbound message violates a configured bound
    #[error("Encoding error: {0}")]
    Encode(String),

    /// Backend bytes do not parse per the column's type grammar
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Session is failed or closed and cannot be reused
    #[error("Connection is broken")]
    ConnectionBroken,

    /// Invalid usage (e.g., bad connection options)
    #[error("Invalid usage: {0}")]
    InvalidUsage(String),

    /// Unsupported feature
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    /// Returns true if the error leaves the session unusable.
    pub fn is_connection_broken(&self) -> bool {
        match self {
            Error::Io(_) | Error::Protocol(_) | Error::Decode(_) | Error::ConnectionBroken => {
                true
            }
            // FATAL and PANIC errors end the backend process
            Error::Server(fields) => matches!(
                fields.effective_severity(),
                Some("FATAL") | Some("PANIC")
            ),
            _ => false,
        }
    }

    /// Get the SQLSTATE code if this is a server error.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Error::Server(fields) => fields.code.as_deref(),
            _ => None,
        }
    }

    /// Encoding error for a value that has no codec for `oid`.
    pub(crate) fn encode_mismatch(value: &dyn std::fmt::Debug, oid: Oid) -> Self {
        Error::Encode(format!(
            "cannot encode {:?} as oid {} ({})",
            value,
            oid,
            crate::types::PgType::name_of(oid)
        ))
    }

    /// Decoding error naming the column OID.
    pub(crate) fn decode(oid: Oid, reason: impl std::fmt::Display) -> Self {
        Error::Decode(format!(
            "oid {} ({}): {}",
            oid,
            crate::types::PgType::name_of(oid),
            reason
        ))
    }
}

impl<Src: std::fmt::Debug, Dst: std::fmt::Debug + ?Sized>
    From<zerocopy::error::CastError<Src, Dst>> for Error
{
    fn from(err: zerocopy::error::CastError<Src, Dst>) -> Self {
        Error::Protocol(format!("zerocopy cast error: {err:?}"))
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_in_protocol_order() {
        let fields = ErrorFields {
            severity: Some("ERROR".into()),
            code: Some("42601".into()),
            message: Some("syntax error".into()),
            ..Default::default()
        };
        assert_eq!(
            fields.fields(),
            vec![
                ("severity", "ERROR"),
                ("code", "42601"),
                ("message", "syntax error")
            ]
        );
    }

    #[test]
    fn test_display() {
        let fields = ErrorFields {
            severity: Some("ERROR".into()),
            code: Some("42P01".into()),
            message: Some("relation \"foo\" does not exist".into()),
            hint: Some("check the name".into()),
            ..Default::default()
        };
        assert_eq!(
            fields.to_string(),
            "ERROR: relation \"foo\" does not exist (SQLSTATE 42P01)\nHINT: check the name"
        );
    }

    #[test]
    fn test_fatal_breaks_connection() {
        let fatal = Error::Server(ErrorFields {
            severity: Some("FATAL".into()),
            ..Default::default()
        });
        assert!(fatal.is_connection_broken());

        let plain = Error::Server(ErrorFields {
            severity: Some("ERROR".into()),
            code: Some("23505".into()),
            ..Default::default()
        });
        assert!(!plain.is_connection_broken());
        assert_eq!(plain.sqlstate(), Some("23505"));
        assert!(!Error::Encode("x".into()).is_connection_broken());
    }
}
