//! Decoded PostgreSQL values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

use super::Numeric;
use super::pg_type::oid;
use crate::error::{Error, Result};
use crate::protocol::types::Oid;

/// A value as exchanged with the server.
///
/// `Null` is SQL NULL and is never conflated with an empty string or zero.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// BOOL
    Bool(bool),
    /// INT2
    Int2(i16),
    /// INT4
    Int4(i32),
    /// INT8, also OID columns
    Int8(i64),
    /// FLOAT4
    Float4(f32),
    /// FLOAT8
    Float8(f64),
    /// NUMERIC
    Numeric(Numeric),
    /// TEXT, VARCHAR, BPCHAR, NAME, CHAR, and text-format values of types
    /// without a dedicated codec
    Text(String),
    /// BYTEA
    Bytea(Vec<u8>),
    /// JSON, JSONB
    Json(serde_json::Value),
    /// UUID
    Uuid(Uuid),
    /// DATE
    Date(NaiveDate),
    /// TIME
    Time(NaiveTime),
    /// TIMESTAMP
    Timestamp(NaiveDateTime),
    /// TIMESTAMPTZ
    Timestamptz(DateTime<Utc>),
}

impl Value {
    /// True for SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The OID this value encodes to when the server does not dictate one.
    /// NULL has no type and reports 0 (unspecified).
    pub fn natural_oid(&self) -> Oid {
        match self {
            Value::Null => 0,
            Value::Bool(_) => oid::BOOL,
            Value::Int2(_) => oid::INT2,
            Value::Int4(_) => oid::INT4,
            Value::Int8(_) => oid::INT8,
            Value::Float4(_) => oid::FLOAT4,
            Value::Float8(_) => oid::FLOAT8,
            Value::Numeric(_) => oid::NUMERIC,
            Value::Text(_) => oid::TEXT,
            Value::Bytea(_) => oid::BYTEA,
            Value::Json(_) => oid::JSONB,
            Value::Uuid(_) => oid::UUID,
            Value::Date(_) => oid::DATE,
            Value::Time(_) => oid::TIME,
            Value::Timestamp(_) => oid::TIMESTAMP,
            Value::Timestamptz(_) => oid::TIMESTAMPTZ,
        }
    }

    /// Name of the value kind for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int2(_) => "int2",
            Value::Int4(_) => "int4",
            Value::Int8(_) => "int8",
            Value::Float4(_) => "float4",
            Value::Float8(_) => "float8",
            Value::Numeric(_) => "numeric",
            Value::Text(_) => "text",
            Value::Bytea(_) => "bytea",
            Value::Json(_) => "json",
            Value::Uuid(_) => "uuid",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "timestamp",
            Value::Timestamptz(_) => "timestamptz",
        }
    }

    /// Borrow as a string if this is `Text`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Any integer variant widened to i64.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int2(v) => Some(i64::from(v)),
            Value::Int4(v) => Some(i64::from(v)),
            Value::Int8(v) => Some(v),
            _ => None,
        }
    }

    /// Convert to a host type.
    pub fn get<T: FromValue>(&self) -> Result<T> {
        T::from_value(self)
    }
}

/// Conversion from a decoded [`Value`] into a host type.
pub trait FromValue: Sized {
    /// Convert, failing if the value kind does not fit `Self`.
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch<T>(value: &Value, target: &str) -> Result<T> {
    Err(Error::Decode(format!(
        "cannot convert {} value to {}",
        value.kind(),
        target
    )))
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            v => T::from_value(v).map(Some),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            v => mismatch(v, "bool"),
        }
    }
}

macro_rules! impl_from_value_int {
    ($($t:ty),+) => {
        $(
            impl FromValue for $t {
                fn from_value(value: &Value) -> Result<Self> {
                    let Some(wide) = value.as_i64() else {
                        return mismatch(value, stringify!($t));
                    };
                    <$t>::try_from(wide).map_err(|_| {
                        Error::Decode(format!("{} does not fit in {}", wide, stringify!($t)))
                    })
                }
            }
        )+
    };
}

impl_from_value_int!(i16, i32, i64, u32);

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Float4(v) => Ok(*v),
            v => mismatch(v, "f32"),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Float4(v) => Ok(f64::from(*v)),
            Value::Float8(v) => Ok(*v),
            v => mismatch(v, "f64"),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            v => mismatch(v, "String"),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bytea(b) => Ok(b.clone()),
            v => mismatch(v, "Vec<u8>"),
        }
    }
}

impl FromValue for Numeric {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Numeric(n) => Ok(n.clone()),
            v => match v.as_i64() {
                Some(i) => Ok(Numeric::from(i)),
                None => mismatch(v, "Numeric"),
            },
        }
    }
}

#[cfg(feature = "with-rust-decimal")]
impl FromValue for rust_decimal::Decimal {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Numeric(n) => rust_decimal::Decimal::try_from(n),
            v => match v.as_i64() {
                Some(i) => Ok(rust_decimal::Decimal::from(i)),
                None => mismatch(v, "Decimal"),
            },
        }
    }
}

macro_rules! impl_from_value_variant {
    ($($t:ty => $variant:ident),+) => {
        $(
            impl FromValue for $t {
                fn from_value(value: &Value) -> Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v.clone()),
                        v => mismatch(v, stringify!($t)),
                    }
                }
            }
        )+
    };
}

impl_from_value_variant!(
    Uuid => Uuid,
    serde_json::Value => Json,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => Timestamptz
);
