//! Prepared statements and statement references.

use std::sync::Arc;

use crate::protocol::types::{FormatCode, Oid};
use crate::row::Column;
use crate::types::PgType;

/// A statement prepared on the server.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    /// Statement name (empty for the unnamed statement)
    pub name: String,
    /// Parameter type OIDs reported by the server
    pub param_oids: Vec<Oid>,
    /// Result columns, `None` if the statement returns no rows
    pub columns: Option<Arc<[Column]>>,
}

impl PreparedStatement {
    /// Result format codes for Bind: binary for every column with a codec
    /// when `prefer_binary`, text otherwise.
    pub fn result_formats(&self, prefer_binary: bool) -> Vec<FormatCode> {
        if !prefer_binary {
            return Vec::new();
        }
        self.columns
            .iter()
            .flat_map(|cols| cols.iter())
            .map(|col| FormatCode::from_binary_flag(PgType::from_oid(col.type_oid).is_some()))
            .collect()
    }
}

/// A named portal fetched in batches.
///
/// Opened by [`Session::bind_portal`](crate::sync::Session::bind_portal)
/// inside a transaction block. The server drops it when it is closed or
/// the transaction ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Portal {
    name: String,
    complete: bool,
}

impl Portal {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            complete: false,
        }
    }

    /// Portal name, e.g. `p3`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the last fetch reached the end of the rows.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub(crate) fn set_complete(&mut self, complete: bool) {
        self.complete = complete;
    }
}

/// Something that names a statement for execution: SQL text (prepared as
/// the unnamed statement first) or a [`PreparedStatement`].
///
/// This trait is sealed and cannot be implemented outside this crate.
pub trait IntoStatement: private::Sealed {
    /// Get the SQL string if this is raw SQL.
    fn as_sql(&self) -> Option<&str>;

    /// Get the prepared statement if this is a prepared statement reference.
    fn as_prepared(&self) -> Option<&PreparedStatement>;
}

mod private {
    use super::PreparedStatement;

    pub trait Sealed {}

    impl Sealed for &PreparedStatement {}
    impl Sealed for PreparedStatement {}
    impl Sealed for &str {}
    impl Sealed for String {}
}

impl IntoStatement for &PreparedStatement {
    fn as_sql(&self) -> Option<&str> {
        None
    }

    fn as_prepared(&self) -> Option<&PreparedStatement> {
        Some(self)
    }
}

impl IntoStatement for PreparedStatement {
    fn as_sql(&self) -> Option<&str> {
        None
    }

    fn as_prepared(&self) -> Option<&PreparedStatement> {
        Some(self)
    }
}

impl IntoStatement for &str {
    fn as_sql(&self) -> Option<&str> {
        Some(self)
    }

    fn as_prepared(&self) -> Option<&PreparedStatement> {
        None
    }
}

impl IntoStatement for String {
    fn as_sql(&self) -> Option<&str> {
        Some(self)
    }

    fn as_prepared(&self) -> Option<&PreparedStatement> {
        None
    }
}
