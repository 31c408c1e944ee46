//! Binary format codec.

use chrono::{DateTime, Utc};

use super::datetime;
use super::{Numeric, PgType, Value};
use crate::error::{Error, Result};

/// JSONB binary format version.
const JSONB_VERSION: u8 = 1;

/// Encode a value already coerced to `ty`.
pub(super) fn encode(value: &Value, ty: PgType, buf: &mut Vec<u8>) -> Result<()> {
    match value {
        Value::Null => return Err(Error::Encode("NULL has no binary representation".into())),
        Value::Bool(b) => buf.push(u8::from(*b)),
        Value::Int2(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Int4(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Int8(v) if ty == PgType::Oid => {
            let oid = u32::try_from(*v)
                .map_err(|_| Error::Encode(format!("{} does not fit in oid", v)))?;
            buf.extend_from_slice(&oid.to_be_bytes());
        }
        Value::Int8(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Float4(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Float8(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Numeric(n) => n.encode_binary(buf)?,
        Value::Text(s) if ty == PgType::Date => {
            buf.extend_from_slice(&datetime::infinity_days(s).to_be_bytes());
        }
        Value::Text(s) if ty.has_infinity() => {
            buf.extend_from_slice(&datetime::infinity_micros(s).to_be_bytes());
        }
        Value::Text(s) => buf.extend_from_slice(s.as_bytes()),
        Value::Bytea(bytes) => buf.extend_from_slice(bytes),
        Value::Json(json) => {
            if ty == PgType::Jsonb {
                buf.push(JSONB_VERSION);
            }
            serde_json::to_writer(&mut *buf, json)
                .map_err(|e| Error::Encode(format!("JSON serialization failed: {}", e)))?;
        }
        Value::Uuid(u) => buf.extend_from_slice(u.as_bytes()),
        Value::Date(d) => buf.extend_from_slice(&datetime::date_to_days(*d)?.to_be_bytes()),
        Value::Time(t) => buf.extend_from_slice(&datetime::time_to_micros(*t).to_be_bytes()),
        Value::Timestamp(ts) => {
            buf.extend_from_slice(&datetime::timestamp_to_micros(*ts)?.to_be_bytes());
        }
        Value::Timestamptz(ts) => {
            buf.extend_from_slice(&datetime::timestamp_to_micros(ts.naive_utc())?.to_be_bytes());
        }
    }
    Ok(())
}

fn fixed<const N: usize>(ty: PgType, bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| {
        Error::decode(
            ty.oid(),
            format!("expected {} bytes, got {}", N, bytes.len()),
        )
    })
}

/// Decode a binary-format column value.
pub(super) fn decode(ty: PgType, bytes: &[u8]) -> Result<Value> {
    let out_of_range = || Error::decode(ty.oid(), "value out of range");
    let value = match ty {
        PgType::Bool => match fixed::<1>(ty, bytes)? {
            [0] => Value::Bool(false),
            [1] => Value::Bool(true),
            [b] => return Err(Error::decode(ty.oid(), format!("invalid bool byte {}", b))),
        },
        PgType::Int2 => Value::Int2(i16::from_be_bytes(fixed(ty, bytes)?)),
        PgType::Int4 => Value::Int4(i32::from_be_bytes(fixed(ty, bytes)?)),
        PgType::Int8 => Value::Int8(i64::from_be_bytes(fixed(ty, bytes)?)),
        PgType::Oid => Value::Int8(i64::from(u32::from_be_bytes(fixed(ty, bytes)?))),
        PgType::Float4 => Value::Float4(f32::from_be_bytes(fixed(ty, bytes)?)),
        PgType::Float8 => Value::Float8(f64::from_be_bytes(fixed(ty, bytes)?)),
        PgType::Numeric => Value::Numeric(Numeric::decode_binary(bytes)?),
        PgType::Text | PgType::Varchar | PgType::Bpchar | PgType::Name | PgType::Char => {
            let s = simdutf8::compat::from_utf8(bytes)
                .map_err(|e| Error::decode(ty.oid(), format!("invalid UTF-8: {}", e)))?;
            Value::Text(s.to_string())
        }
        PgType::Bytea => Value::Bytea(bytes.to_vec()),
        PgType::Json | PgType::Jsonb => {
            let body = if ty == PgType::Jsonb {
                match bytes.split_first() {
                    Some((&JSONB_VERSION, rest)) => rest,
                    _ => return Err(Error::decode(ty.oid(), "unsupported jsonb version")),
                }
            } else {
                bytes
            };
            Value::Json(
                serde_json::from_slice(body)
                    .map_err(|e| Error::decode(ty.oid(), format!("invalid JSON: {}", e)))?,
            )
        }
        PgType::Uuid => Value::Uuid(uuid::Uuid::from_bytes(fixed(ty, bytes)?)),
        PgType::Date => {
            let days = i32::from_be_bytes(fixed(ty, bytes)?);
            match datetime::special_days(days) {
                Some(special) => Value::Text(special.to_string()),
                None => Value::Date(datetime::days_to_date(days).ok_or_else(out_of_range)?),
            }
        }
        PgType::Time => {
            let usecs = i64::from_be_bytes(fixed(ty, bytes)?);
            Value::Time(datetime::micros_to_time(usecs).ok_or_else(out_of_range)?)
        }
        PgType::Timestamp | PgType::Timestamptz => {
            let usecs = i64::from_be_bytes(fixed(ty, bytes)?);
            if let Some(special) = datetime::special_micros(usecs) {
                return Ok(Value::Text(special.to_string()));
            }
            let naive = datetime::micros_to_timestamp(usecs).ok_or_else(out_of_range)?;
            if ty == PgType::Timestamp {
                Value::Timestamp(naive)
            } else {
                Value::Timestamptz(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
            }
        }
    };
    Ok(value)
}
