//! PostgreSQL frontend/backend protocol (v3) for clients.
//!
//! # Features
//!
//! - **Message codec**: every frontend message and the full backend catalog,
//!   parsed straight from the read buffer
//! - **Value codec**: text and binary formats for the common built-in types
//! - **Sans-I/O state machines**: startup/authentication and request cycles
//!   are separated from I/O
//! - **Blocking session**: a driver over any `Read + Write` transport with
//!   simple and extended queries, COPY, notifications and cancellation
//!
//! # Example
//!
//! ```no_run
//! use pgwire_session::reducer::Collect;
//! use pgwire_session::sync::Session;
//! use pgwire_session::Opts;
//!
//! fn main() -> pgwire_session::Result<()> {
//!     let opts = Opts {
//!         host: "localhost".into(),
//!         user: "postgres".into(),
//!         database: Some("mydb".into()),
//!         password: Some("secret".into()),
//!         ..Default::default()
//!     };
//!
//!     let mut session = Session::connect_tcp(opts)?;
//!
//!     let results = session.query("SELECT 1 AS num; SELECT 2", Collect)?;
//!     for rows in results {
//!         for row in rows {
//!             let num: i32 = row.try_get(0)?;
//!             println!("{}", num);
//!         }
//!     }
//!
//!     session.close()
//! }
//! ```

pub mod buffer_set;
pub mod error;
pub mod ids;
pub mod opts;
pub mod protocol;
pub mod reducer;
pub mod result;
pub mod row;
pub mod state;
pub mod statement;
pub mod types;

#[cfg(feature = "sync")]
pub mod sync;

pub use buffer_set::BufferSet;
pub use error::{Error, ErrorFields, Result};
pub use ids::NameGenerator;
pub use opts::Opts;
pub use protocol::types::{FormatCode, Oid, TransactionStatus};
pub use reducer::{Collect, First, IndexBy, Reducer};
pub use result::{QueryResult, SubResult};
pub use row::{Column, Row};
pub use state::Notification;
pub use statement::{IntoStatement, Portal, PreparedStatement};
pub use types::{FromValue, Numeric, PgType, ToParams, ToWireValue, Value};
