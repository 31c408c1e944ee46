//! Decoded rows and their column metadata.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::protocol::backend::{DataRow, FieldDescription, RowDescription};
use crate::protocol::types::{FormatCode, Oid};
use crate::types::{self, FromValue, PgType, Value};

/// One column of a RowDescription, detached from the read buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Table OID (0 if not a table column)
    pub table_oid: Oid,
    /// Column attribute number (0 if not a table column)
    pub column_id: i16,
    /// Data type OID
    pub type_oid: Oid,
    /// Type size (-1 for variable, -2 for null-terminated)
    pub type_size: i16,
    /// Type modifier
    pub type_modifier: i32,
    /// Wire format of this column's values
    pub format: FormatCode,
}

impl Column {
    /// Copy a field description out of the message.
    pub fn from_field(field: &FieldDescription<'_>) -> Self {
        Self {
            name: field.name.to_string(),
            table_oid: field.table_oid(),
            column_id: field.column_id(),
            type_oid: field.type_oid(),
            type_size: field.type_size(),
            type_modifier: field.type_modifier(),
            format: field.format(),
        }
    }

    /// SQL type name, or `"unknown"` for types without a codec.
    pub fn type_name(&self) -> &'static str {
        PgType::name_of(self.type_oid)
    }
}

/// Detach all columns of a RowDescription.
pub fn columns_of(desc: &RowDescription<'_>) -> Arc<[Column]> {
    desc.iter().map(Column::from_field).collect()
}

/// A decoded row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[Column]>,
    values: Vec<Value>,
}

impl Row {
    /// Decode a DataRow against its RowDescription.
    ///
    /// A column count that disagrees with the description is a protocol
    /// error; bytes that do not parse for a column's type are a decode error.
    pub fn decode(columns: &Arc<[Column]>, data: DataRow<'_>) -> Result<Self> {
        if data.len() != columns.len() {
            return Err(Error::Protocol(format!(
                "DataRow has {} columns, RowDescription has {}",
                data.len(),
                columns.len()
            )));
        }
        let values = columns
            .iter()
            .zip(data.iter())
            .map(|(col, bytes)| types::decode(col.type_oid, col.format, bytes))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            columns: columns.clone(),
            values,
        })
    }

    /// Build a row from parts. `values` must match `columns` in length.
    pub fn new(columns: Arc<[Column]>, values: Vec<Value>) -> Result<Self> {
        if columns.len() != values.len() {
            return Err(Error::InvalidUsage(format!(
                "{} values for {} columns",
                values.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, values })
    }

    /// Column metadata shared by all rows of the sub-result.
    pub fn columns(&self) -> &Arc<[Column]> {
        &self.columns
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Take the values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Value at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value of the first column called `name`.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c.name == name)?;
        self.values.get(index)
    }

    /// Typed value at `index`.
    pub fn try_get<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self.get(index).ok_or_else(|| {
            Error::InvalidUsage(format!(
                "column index {} out of range ({} columns)",
                index,
                self.len()
            ))
        })?;
        T::from_value(value)
    }

    /// Typed value of the column called `name`.
    pub fn try_get_by_name<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self
            .get_by_name(name)
            .ok_or_else(|| Error::InvalidUsage(format!("no column named {:?}", name)))?;
        T::from_value(value)
    }
}
