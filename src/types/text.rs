//! Text format codec.

use super::datetime;
use super::{Numeric, PgType, Value};
use crate::error::{Error, Result};
use crate::protocol::types::Oid;

/// Encode a value already coerced to its column type.
pub(super) fn encode(value: &Value) -> Result<String> {
    let text = match value {
        Value::Null => {
            return Err(Error::Encode("NULL has no text representation".into()));
        }
        Value::Bool(b) => if *b { "t" } else { "f" }.to_string(),
        Value::Int2(v) => v.to_string(),
        Value::Int4(v) => v.to_string(),
        Value::Int8(v) => v.to_string(),
        Value::Float4(v) => float_to_text(f64::from(*v), || v.to_string()),
        Value::Float8(v) => float_to_text(*v, || v.to_string()),
        Value::Numeric(n) => n.as_str().to_string(),
        Value::Text(s) => s.clone(),
        Value::Bytea(bytes) => {
            let mut out = String::with_capacity(2 + bytes.len() * 2);
            out.push_str("\\x");
            for b in bytes {
                out.push_str(&format!("{:02x}", b));
            }
            out
        }
        Value::Json(json) => json.to_string(),
        Value::Uuid(u) => u.hyphenated().to_string(),
        Value::Date(d) => datetime::date_to_text(*d),
        Value::Time(t) => datetime::time_to_text(*t),
        Value::Timestamp(ts) => datetime::timestamp_to_text(*ts),
        Value::Timestamptz(ts) => datetime::timestamptz_to_text(*ts),
    };
    Ok(text)
}

fn float_to_text(v: f64, finite: impl FnOnce() -> String) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v == f64::INFINITY {
        "Infinity".into()
    } else if v == f64::NEG_INFINITY {
        "-Infinity".into()
    } else {
        finite()
    }
}

/// Decode a text-format column value.
///
/// Types without a codec decode to [`Value::Text`].
pub(super) fn decode(oid: Oid, bytes: &[u8]) -> Result<Value> {
    let s = simdutf8::compat::from_utf8(bytes)
        .map_err(|e| Error::decode(oid, format!("invalid UTF-8: {}", e)))?;
    let Some(ty) = PgType::from_oid(oid) else {
        return Ok(Value::Text(s.to_string()));
    };
    let invalid = || Error::decode(oid, format!("invalid text value {:?}", s));
    if ty.has_infinity() && datetime::is_infinity(s) {
        return Ok(Value::Text(s.to_string()));
    }

    let value = match ty {
        PgType::Bool => match s {
            "t" => Value::Bool(true),
            "f" => Value::Bool(false),
            _ => return Err(invalid()),
        },
        PgType::Int2 => Value::Int2(s.parse().map_err(|_| invalid())?),
        PgType::Int4 => Value::Int4(s.parse().map_err(|_| invalid())?),
        PgType::Int8 => Value::Int8(s.parse().map_err(|_| invalid())?),
        PgType::Oid => Value::Int8(i64::from(s.parse::<u32>().map_err(|_| invalid())?)),
        PgType::Float4 => Value::Float4(parse_float(s).ok_or_else(invalid)?),
        PgType::Float8 => Value::Float8(parse_float(s).ok_or_else(invalid)?),
        PgType::Numeric => Value::Numeric(s.parse::<Numeric>().map_err(|_| invalid())?),
        PgType::Text | PgType::Varchar | PgType::Bpchar | PgType::Name | PgType::Char => {
            Value::Text(s.to_string())
        }
        PgType::Bytea => Value::Bytea(decode_bytea(s).ok_or_else(invalid)?),
        PgType::Json | PgType::Jsonb => Value::Json(
            serde_json::from_str(s).map_err(|e| Error::decode(oid, format!("invalid JSON: {}", e)))?,
        ),
        PgType::Uuid => Value::Uuid(uuid::Uuid::parse_str(s).map_err(|_| invalid())?),
        PgType::Date => Value::Date(datetime::parse_date(s).ok_or_else(invalid)?),
        PgType::Time => Value::Time(datetime::parse_time(s).ok_or_else(invalid)?),
        PgType::Timestamp => Value::Timestamp(datetime::parse_timestamp(s).ok_or_else(invalid)?),
        PgType::Timestamptz => {
            Value::Timestamptz(datetime::parse_timestamptz(s).ok_or_else(invalid)?)
        }
    };
    Ok(value)
}

fn parse_float<F: std::str::FromStr>(s: &str) -> Option<F> {
    let literal = match s {
        "NaN" => "NaN",
        "Infinity" => "inf",
        "-Infinity" => "-inf",
        // Rust also accepts "inf" and "nan"; the server never sends them
        _ if s.bytes().any(|b| b.is_ascii_alphabetic() && b != b'e' && b != b'E') => return None,
        _ => s,
    };
    literal.parse().ok()
}

/// Decode `\x`-hex or legacy escape format.
fn decode_bytea(s: &str) -> Option<Vec<u8>> {
    if let Some(hex) = s.strip_prefix("\\x") {
        if hex.len() % 2 != 0 {
            return None;
        }
        return hex
            .as_bytes()
            .chunks(2)
            .map(|pair| {
                let hi = (pair[0] as char).to_digit(16)?;
                let lo = (pair[1] as char).to_digit(16)?;
                Some((hi * 16 + lo) as u8)
            })
            .collect();
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
        } else if bytes.get(i + 1) == Some(&b'\\') {
            out.push(b'\\');
            i += 2;
        } else {
            let octal = bytes.get(i + 1..i + 4)?;
            if !octal.iter().all(|b| (b'0'..=b'7').contains(b)) {
                return None;
            }
            let v = octal
                .iter()
                .fold(0_u32, |acc, &b| acc * 8 + u32::from(b - b'0'));
            out.push(u8::try_from(v).ok()?);
            i += 4;
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::super::oid;
    use super::*;

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode(oid::BOOL, b"t").unwrap(), Value::Bool(true));
        assert!(decode(oid::BOOL, b"true").is_err());
        assert_eq!(decode(oid::INT2, b"-32768").unwrap(), Value::Int2(i16::MIN));
        assert!(decode(oid::INT2, b"32768").is_err());
        assert!(decode(oid::INT4, b"").is_err());
        assert_eq!(decode(oid::OID, b"4294967295").unwrap(), Value::Int8(4_294_967_295));
        assert_eq!(
            decode(oid::FLOAT8, b"-Infinity").unwrap(),
            Value::Float8(f64::NEG_INFINITY)
        );
        assert_eq!(decode(oid::FLOAT4, b"1.5e-3").unwrap(), Value::Float4(0.0015));
        assert!(decode(oid::FLOAT8, b"inf").is_err());
    }

    #[test]
    fn test_decode_bytea_formats() {
        assert_eq!(
            decode(oid::BYTEA, b"\\x00ff").unwrap(),
            Value::Bytea(vec![0, 0xff])
        );
        assert_eq!(
            decode(oid::BYTEA, b"a\\\\b\\001").unwrap(),
            Value::Bytea(vec![b'a', b'\\', b'b', 1])
        );
        assert!(decode(oid::BYTEA, b"\\x0").is_err());
        assert!(decode(oid::BYTEA, b"\\9").is_err());
    }

    #[test]
    fn test_decode_errors_name_oid() {
        let err = decode(oid::UUID, b"not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("2950"));
        assert!(matches!(decode(oid::TEXT, &[0xff]), Err(Error::Decode(_))));
        assert!(matches!(decode(oid::JSON, b"{"), Err(Error::Decode(_))));
    }

    #[test]
    fn test_decode_special_dates() {
        for oid in [oid::DATE, oid::TIMESTAMP, oid::TIMESTAMPTZ] {
            assert_eq!(
                decode(oid, b"infinity").unwrap(),
                Value::Text("infinity".into())
            );
            assert_eq!(
                decode(oid, b"-infinity").unwrap(),
                Value::Text("-infinity".into())
            );
            assert!(decode(oid, b"Infinity").is_err());
        }
        assert!(decode(oid::TIME, b"infinity").is_err());
        assert_eq!(
            decode(oid::DATE, b"0044-03-15 BC").unwrap(),
            Value::Date(chrono::NaiveDate::from_ymd_opt(-43, 3, 15).unwrap())
        );
    }
}
