//! Value codec for the PostgreSQL wire protocol.
//!
//! Encoding is a two-level dispatch. The target OID selects a [`PgType`],
//! then the host [`Value`] is coerced to the variant that type stores.
//! Widening conversions are free; narrowing ones are checked and fail with
//! [`Error::Encode`] instead of truncating. Any pair without a rule is an
//! encoding error naming the value and the OID.
//!
//! Decoding takes the column's OID and format from its RowDescription.
//! SQL NULL is always [`Value::Null`].

mod binary;
mod datetime;
mod numeric;
mod params;
mod pg_type;
mod text;
mod value;

use std::borrow::Cow;

pub use numeric::Numeric;
pub use params::{ToParams, ToWireValue};
pub use pg_type::{PgType, oid};
pub use value::{FromValue, Value};

use crate::error::{Error, Result};
use crate::protocol::codec::write_i32;
use crate::protocol::types::{FormatCode, Oid};

/// Coerce `value` to the variant stored by `ty`.
///
/// Borrows when no conversion is needed.
fn coerce(value: &Value, ty: PgType) -> Result<Cow<'_, Value>> {
    use PgType as T;

    let converted = match (value, ty) {
        (Value::Bool(_), T::Bool)
        | (Value::Int2(_), T::Int2)
        | (Value::Int4(_), T::Int4)
        | (Value::Int8(_), T::Int8)
        | (Value::Float4(_), T::Float4)
        | (Value::Float8(_), T::Float8)
        | (Value::Numeric(_), T::Numeric)
        | (Value::Bytea(_), T::Bytea)
        | (Value::Json(_), T::Json | T::Jsonb)
        | (Value::Uuid(_), T::Uuid)
        | (Value::Date(_), T::Date)
        | (Value::Time(_), T::Time)
        | (Value::Timestamp(_), T::Timestamp)
        | (Value::Timestamptz(_), T::Timestamptz) => return Ok(Cow::Borrowed(value)),
        (Value::Text(_), t) if t.is_string_like() => return Ok(Cow::Borrowed(value)),
        (Value::Text(s), t) if t.has_infinity() && datetime::is_infinity(s) => {
            return Ok(Cow::Borrowed(value));
        }

        (Value::Int2(_) | Value::Int4(_) | Value::Int8(_), _) => {
            let wide = value.as_i64().unwrap_or_default();
            let narrow = |what| Error::Encode(format!("{} does not fit in {}", wide, what));
            match ty {
                T::Int2 => Value::Int2(i16::try_from(wide).map_err(|_| narrow("int2"))?),
                T::Int4 => Value::Int4(i32::try_from(wide).map_err(|_| narrow("int4"))?),
                T::Int8 => Value::Int8(wide),
                T::Oid => {
                    u32::try_from(wide).map_err(|_| narrow("oid"))?;
                    Value::Int8(wide)
                }
                T::Numeric => Value::Numeric(Numeric::from(wide)),
                _ => return Err(Error::encode_mismatch(value, ty.oid())),
            }
        }
        (Value::Float4(v), T::Float8) => Value::Float8(f64::from(*v)),
        (Value::Float8(v), T::Float4) => Value::Float4(f64_to_f32(*v)?),
        (Value::Numeric(n), T::Float4 | T::Float8) => {
            let v = n.to_f64();
            if ty == T::Float4 {
                Value::Float4(f64_to_f32(v)?)
            } else {
                Value::Float8(v)
            }
        }
        (Value::Uuid(u), T::Text | T::Varchar) => Value::Text(u.to_string()),
        _ => return Err(Error::encode_mismatch(value, ty.oid())),
    };
    Ok(Cow::Owned(converted))
}

fn f64_to_f32(v: f64) -> Result<f32> {
    if v.is_finite() && v.abs() > f64::from(f32::MAX) {
        return Err(Error::Encode(format!("{} does not fit in float4", v)));
    }
    Ok(v as f32)
}

/// Encode `value` for the column type `oid` in `format`.
///
/// Returns `None` for SQL NULL. An `oid` of 0 means "unspecified" and uses
/// the value's natural OID. Text-format values of types without a codec
/// are passed through if the value is `Text`.
pub fn encode(value: &Value, oid: Oid, format: FormatCode) -> Result<Option<Vec<u8>>> {
    if value.is_null() {
        return Ok(None);
    }
    let oid = if oid == 0 { value.natural_oid() } else { oid };
    let Some(ty) = PgType::from_oid(oid) else {
        return match (value, format) {
            (Value::Text(s), FormatCode::Text) => Ok(Some(s.as_bytes().to_vec())),
            _ => Err(Error::encode_mismatch(value, oid)),
        };
    };
    let value = coerce(value, ty)?;
    match format {
        FormatCode::Text => text::encode(&value).map(|s| Some(s.into_bytes())),
        FormatCode::Binary => {
            let mut buf = Vec::new();
            binary::encode(&value, ty, &mut buf)?;
            Ok(Some(buf))
        }
    }
}

/// Write `value` as a length-prefixed Bind parameter (-1 for NULL).
///
/// Nothing is written if encoding fails.
pub fn write_param(buf: &mut Vec<u8>, value: &Value, oid: Oid, format: FormatCode) -> Result<()> {
    match encode(value, oid, format)? {
        None => write_i32(buf, -1),
        Some(bytes) => {
            crate::protocol::codec::write_len(buf, bytes.len())?;
            buf.extend_from_slice(&bytes);
        }
    }
    Ok(())
}

/// Format a parameter of type `oid` should be sent in.
///
/// Binary is only used for types with a binary codec.
pub fn param_format(oid: Oid, prefer_binary: bool) -> FormatCode {
    FormatCode::from_binary_flag(prefer_binary && PgType::from_oid(oid).is_some())
}

/// Decode a column value. `None` bytes is SQL NULL.
pub fn decode(oid: Oid, format: FormatCode, bytes: Option<&[u8]>) -> Result<Value> {
    let Some(bytes) = bytes else {
        return Ok(Value::Null);
    };
    match format {
        FormatCode::Text => text::decode(oid, bytes),
        FormatCode::Binary => match PgType::from_oid(oid) {
            Some(ty) => binary::decode(ty, bytes),
            None => Err(Error::decode(oid, "no binary codec for this type")),
        },
    }
}
