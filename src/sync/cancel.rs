//! Out-of-band query cancellation.

use std::io::Write;
use std::net::TcpStream;

use crate::error::Result;
use crate::protocol::frontend::write_cancel_request;

/// Key identifying a session to the server's cancel handler.
///
/// Cancellation uses a second, short-lived connection; the token can be
/// used from any thread while the session is busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelToken {
    pid: u32,
    secret_key: u32,
}

impl CancelToken {
    /// Token for a backend process.
    pub fn new(pid: u32, secret_key: u32) -> Self {
        Self { pid, secret_key }
    }

    /// Backend process id.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Backend secret key.
    pub fn secret_key(&self) -> u32 {
        self.secret_key
    }

    /// The 16-byte CancelRequest frame.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(16);
        write_cancel_request(&mut buf, self.pid, self.secret_key)?;
        Ok(buf)
    }

    /// Write the CancelRequest to a freshly opened transport.
    ///
    /// The server closes that transport without replying.
    pub fn send<W: Write>(&self, stream: &mut W) -> Result<()> {
        stream.write_all(&self.encode()?)?;
        stream.flush()?;
        tracing::debug!(pid = self.pid, "sent cancel request");
        Ok(())
    }

    /// Open a TCP connection to `host:port` and send the CancelRequest.
    pub fn cancel_tcp(&self, host: &str, port: u16) -> Result<()> {
        let mut stream = TcpStream::connect((host, port))?;
        self.send(&mut stream)
    }
}
