//! PostgreSQL type identifiers used as codec dispatch keys.

use crate::protocol::types::Oid;

macro_rules! pg_types {
    ($($variant:ident, $konst:ident = $oid:literal => $name:literal),+ $(,)?) => {
        /// PostgreSQL types with a built-in codec.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum PgType {
            $(
                #[doc = concat!("`", $name, "` (oid ", stringify!($oid), ")")]
                $variant,
            )+
        }

        impl PgType {
            /// Look up a type by OID.
            pub fn from_oid(oid: Oid) -> Option<Self> {
                match oid {
                    $($oid => Some(PgType::$variant),)+
                    _ => None,
                }
            }

            /// The OID of this type.
            pub const fn oid(self) -> Oid {
                match self {
                    $(PgType::$variant => $oid,)+
                }
            }

            /// SQL type name.
            pub const fn name(self) -> &'static str {
                match self {
                    $(PgType::$variant => $name,)+
                }
            }
        }

        /// OID constants.
        pub mod oid {
            use crate::protocol::types::Oid;
            $(
                #[doc = concat!("`", $name, "`")]
                pub const $konst: Oid = $oid;
            )+
        }
    };
}

pg_types! {
    Bool, BOOL = 16 => "bool",
    Bytea, BYTEA = 17 => "bytea",
    Char, CHAR = 18 => "char",
    Name, NAME = 19 => "name",
    Int8, INT8 = 20 => "int8",
    Int2, INT2 = 21 => "int2",
    Int4, INT4 = 23 => "int4",
    Text, TEXT = 25 => "text",
    Oid, OID = 26 => "oid",
    Json, JSON = 114 => "json",
    Float4, FLOAT4 = 700 => "float4",
    Float8, FLOAT8 = 701 => "float8",
    Bpchar, BPCHAR = 1042 => "bpchar",
    Varchar, VARCHAR = 1043 => "varchar",
    Date, DATE = 1082 => "date",
    Time, TIME = 1083 => "time",
    Timestamp, TIMESTAMP = 1114 => "timestamp",
    Timestamptz, TIMESTAMPTZ = 1184 => "timestamptz",
    Numeric, NUMERIC = 1700 => "numeric",
    Uuid, UUID = 2950 => "uuid",
    Jsonb, JSONB = 3802 => "jsonb",
}

impl PgType {
    /// Name of an OID for error messages, `"unknown"` outside the table.
    pub fn name_of(oid: Oid) -> &'static str {
        PgType::from_oid(oid).map_or("unknown", PgType::name)
    }

    /// True for types whose text form is the value itself.
    pub fn is_string_like(self) -> bool {
        matches!(
            self,
            PgType::Text | PgType::Varchar | PgType::Bpchar | PgType::Name | PgType::Char
        )
    }

    /// Check if the type has `infinity` and `-infinity` values.
    pub fn has_infinity(self) -> bool {
        matches!(
            self,
            PgType::Date | PgType::Timestamp | PgType::Timestamptz
        )
    }
}
