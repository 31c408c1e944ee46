//! Host values as statement parameters.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use super::{Numeric, Value, param_format, write_param};
use crate::error::{Error, Result};
use crate::protocol::types::Oid;

/// Trait for encoding Rust values as PostgreSQL parameters.
///
/// A value converts into the codec's [`Value`] sum type; the target OID
/// then decides how it is written (see [`crate::types::encode`]).
pub trait ToWireValue {
    /// The value in codec form.
    fn to_value(&self) -> Value;

    /// The OID this value naturally encodes to.
    ///
    /// For example, i64 naturally encodes to INT8 (OID 20). NULL reports 0.
    fn natural_oid(&self) -> Oid {
        self.to_value().natural_oid()
    }
}

/// Trait for encoding multiple parameters.
pub trait ToParams {
    /// Number of parameters.
    fn param_count(&self) -> usize;

    /// Parameters in codec form.
    fn values(&self) -> Vec<Value>;

    /// Get natural OIDs for all parameters.
    fn natural_oids(&self) -> Vec<Oid> {
        self.values().iter().map(Value::natural_oid).collect()
    }

    /// Write Bind's parameter format codes, count and values.
    ///
    /// `target_oids` holds the statement's parameter types; 0 or a missing
    /// entry falls back to the value's natural OID. `prefer_binary` selects
    /// binary format for every type that has a binary codec.
    fn encode(&self, target_oids: &[Oid], prefer_binary: bool, buf: &mut Vec<u8>) -> Result<()> {
        let values = self.values();
        if !target_oids.is_empty() && target_oids.len() != values.len() {
            return Err(Error::Encode(format!(
                "statement expects {} parameters, got {}",
                target_oids.len(),
                values.len()
            )));
        }
        let oids: Vec<Oid> = values
            .iter()
            .enumerate()
            .map(|(i, v)| match target_oids.get(i) {
                Some(&oid) if oid != 0 => oid,
                _ => v.natural_oid(),
            })
            .collect();

        crate::protocol::codec::write_count(buf, values.len())?;
        for &oid in &oids {
            crate::protocol::codec::write_u16(buf, param_format(oid, prefer_binary).as_u16());
        }
        crate::protocol::codec::write_count(buf, values.len())?;
        for (value, &oid) in values.iter().zip(&oids) {
            write_param(buf, value, oid, param_format(oid, prefer_binary))?;
        }
        Ok(())
    }
}

impl ToWireValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl<T: ToWireValue> ToWireValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: ToWireValue + ?Sized> ToWireValue for &T {
    fn to_value(&self) -> Value {
        (*self).to_value()
    }
}

macro_rules! impl_to_wire_value {
    ($($t:ty => |$v:ident| $body:expr),+ $(,)?) => {
        $(
            impl ToWireValue for $t {
                fn to_value(&self) -> Value {
                    let $v = self;
                    $body
                }
            }
        )+
    };
}

impl_to_wire_value! {
    bool => |v| Value::Bool(*v),
    i16 => |v| Value::Int2(*v),
    i32 => |v| Value::Int4(*v),
    i64 => |v| Value::Int8(*v),
    u32 => |v| Value::Int8(i64::from(*v)),
    f32 => |v| Value::Float4(*v),
    f64 => |v| Value::Float8(*v),
    str => |v| Value::Text(v.to_string()),
    String => |v| Value::Text(v.clone()),
    [u8] => |v| Value::Bytea(v.to_vec()),
    Vec<u8> => |v| Value::Bytea(v.clone()),
    Numeric => |v| Value::Numeric(v.clone()),
    uuid::Uuid => |v| Value::Uuid(*v),
    serde_json::Value => |v| Value::Json(v.clone()),
    NaiveDate => |v| Value::Date(*v),
    NaiveTime => |v| Value::Time(*v),
    NaiveDateTime => |v| Value::Timestamp(*v),
    DateTime<Utc> => |v| Value::Timestamptz(*v),
}

#[cfg(feature = "with-rust-decimal")]
impl ToWireValue for rust_decimal::Decimal {
    fn to_value(&self) -> Value {
        Value::Numeric(Numeric::from(*self))
    }
}

// === ToParams implementations ===

impl ToParams for () {
    fn param_count(&self) -> usize {
        0
    }

    fn values(&self) -> Vec<Value> {
        Vec::new()
    }
}

impl<T: ToWireValue> ToParams for [T] {
    fn param_count(&self) -> usize {
        self.len()
    }

    fn values(&self) -> Vec<Value> {
        self.iter().map(ToWireValue::to_value).collect()
    }
}

impl<T: ToWireValue> ToParams for Vec<T> {
    fn param_count(&self) -> usize {
        self.len()
    }

    fn values(&self) -> Vec<Value> {
        self.as_slice().values()
    }
}

impl<T: ToWireValue, const N: usize> ToParams for [T; N] {
    fn param_count(&self) -> usize {
        N
    }

    fn values(&self) -> Vec<Value> {
        self.as_slice().values()
    }
}

impl<T: ToParams + ?Sized> ToParams for &T {
    fn param_count(&self) -> usize {
        (*self).param_count()
    }

    fn values(&self) -> Vec<Value> {
        (*self).values()
    }
}

// Tuple implementations via macro
macro_rules! impl_to_params {
    ($count:expr, $($idx:tt: $T:ident),+) => {
        impl<$($T: ToWireValue),+> ToParams for ($($T,)+) {
            fn param_count(&self) -> usize {
                $count
            }

            fn values(&self) -> Vec<Value> {
                vec![$(self.$idx.to_value()),+]
            }
        }
    };
}

impl_to_params!(1, 0: T0);
impl_to_params!(2, 0: T0, 1: T1);
impl_to_params!(3, 0: T0, 1: T1, 2: T2);
impl_to_params!(4, 0: T0, 1: T1, 2: T2, 3: T3);
impl_to_params!(5, 0: T0, 1: T1, 2: T2, 3: T3, 4: T4);
impl_to_params!(6, 0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5);
impl_to_params!(7, 0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6);
impl_to_params!(8, 0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7);
impl_to_params!(9, 0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7, 8: T8);
impl_to_params!(10, 0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7, 8: T8, 9: T9);
impl_to_params!(11, 0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7, 8: T8, 9: T9, 10: T10);
impl_to_params!(12, 0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7, 8: T8, 9: T9, 10: T10, 11: T11);
