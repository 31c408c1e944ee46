//! Buffered transport wrapper.

use std::io::{BufReader, Read, Write};

use crate::buffer_set::BufferSet;
use crate::error::{Error, Result};

/// A byte transport with buffered reads.
///
/// Writes bypass the buffer and go straight to the transport.
pub struct Stream<S> {
    inner: BufReader<S>,
}

impl<S: Read + Write> Stream<S> {
    /// Wrap a connected transport.
    pub fn new(stream: S) -> Self {
        Self {
            inner: BufReader::new(stream),
        }
    }

    /// Get a reference to the transport.
    pub fn get_ref(&self) -> &S {
        self.inner.get_ref()
    }

    /// Read one backend message into the buffer set.
    pub fn read_message(&mut self, buffer_set: &mut BufferSet) -> Result<()> {
        let mut header = [0u8; 5];
        self.inner.read_exact(&mut header)?;
        let [type_byte, len @ ..] = header;
        let length = i32::from_be_bytes(len);

        let payload_len = usize::try_from(length)
            .ok()
            .and_then(|len| len.checked_sub(4))
            .ok_or_else(|| Error::Protocol(format!("invalid message length: {}", length)))?;

        buffer_set.type_byte = type_byte;
        buffer_set.read_buffer.clear();
        buffer_set.read_buffer.resize(payload_len, 0);
        self.inner.read_exact(&mut buffer_set.read_buffer)?;

        tracing::trace!(tag = %char::from(type_byte), len = payload_len, "received message");
        Ok(())
    }

    /// Write and flush the pending frames, then clear them.
    pub fn write_pending(&mut self, buffer_set: &mut BufferSet) -> Result<()> {
        if buffer_set.write_buffer.is_empty() {
            return Ok(());
        }
        tracing::trace!(len = buffer_set.write_buffer.len(), "sending frames");
        let stream = self.inner.get_mut();
        stream.write_all(&buffer_set.write_buffer)?;
        stream.flush()?;
        buffer_set.write_buffer.clear();
        Ok(())
    }

    /// Write and flush raw bytes.
    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.inner.get_mut();
        stream.write_all(data)?;
        stream.flush()?;
        Ok(())
    }
}
