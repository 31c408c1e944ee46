//! Blocking session driver over any `Read + Write` transport.

mod cancel;
mod session;
mod stream;

pub use cancel::CancelToken;
pub use session::{Session, SessionPhase};
pub use stream::Stream;
