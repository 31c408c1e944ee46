//! Common PostgreSQL wire protocol types.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{Error, Result};

/// PostgreSQL Object Identifier (OID)
pub type Oid = u32;

/// Data format code in PostgreSQL protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum FormatCode {
    /// Text format (human-readable)
    #[default]
    Text = 0,
    /// Binary format (type-specific packed representation)
    Binary = 1,
}

impl FormatCode {
    /// Create a FormatCode from a raw wire value.
    pub fn from_u16(value: u16) -> Result<Self> {
        match value {
            0 => Ok(FormatCode::Text),
            1 => Ok(FormatCode::Binary),
            other => Err(Error::Protocol(format!("unknown format code: {}", other))),
        }
    }

    /// Wire value of this format.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Text unless `binary` is set.
    pub fn from_binary_flag(binary: bool) -> Self {
        if binary {
            FormatCode::Binary
        } else {
            FormatCode::Text
        }
    }
}

/// Transaction status indicator from ReadyForQuery message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TransactionStatus {
    /// Idle (not in transaction block)
    #[default]
    Idle = b'I',
    /// In transaction block
    InTransaction = b'T',
    /// In failed transaction block (queries will be rejected until rollback)
    Failed = b'E',
}

impl TransactionStatus {
    /// Create a TransactionStatus from a raw byte value.
    pub fn from_byte(value: u8) -> Result<Self> {
        match value {
            b'I' => Ok(TransactionStatus::Idle),
            b'T' => Ok(TransactionStatus::InTransaction),
            b'E' => Ok(TransactionStatus::Failed),
            other => Err(Error::Protocol(format!(
                "unknown transaction status: 0x{:02x}",
                other
            ))),
        }
    }

    /// Returns true if currently in a transaction (either active or failed).
    pub fn in_transaction(self) -> bool {
        matches!(self, TransactionStatus::InTransaction | TransactionStatus::Failed)
    }

    /// Returns true if the transaction has failed.
    pub fn is_failed(self) -> bool {
        matches!(self, TransactionStatus::Failed)
    }
}

macro_rules! be_int {
    ($(#[$meta:meta])* $name:ident, $native:ty, $n:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromBytes, IntoBytes, KnownLayout, Immutable)]
        #[repr(C)]
        pub struct $name([u8; $n]);

        impl $name {
            /// Create from a native value.
            pub const fn new(value: $native) -> Self {
                Self(value.to_be_bytes())
            }

            /// Get the native value.
            pub const fn get(self) -> $native {
                <$native>::from_be_bytes(self.0)
            }
        }

        impl From<$native> for $name {
            fn from(value: $native) -> Self {
                Self::new(value)
            }
        }

        impl From<$name> for $native {
            fn from(value: $name) -> Self {
                value.get()
            }
        }
    };
}

be_int!(
    /// Big-endian 16-bit signed integer for zerocopy.
    I16BE, i16, 2
);
be_int!(
    /// Big-endian 16-bit unsigned integer for zerocopy.
    U16BE, u16, 2
);
be_int!(
    /// Big-endian 32-bit signed integer for zerocopy.
    I32BE, i32, 4
);
be_int!(
    /// Big-endian 32-bit unsigned integer for zerocopy.
    U32BE, u32, 4
);
