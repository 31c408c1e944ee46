//! Buffers shared between the I/O driver and the state machines.

/// Buffer set for state machine operations.
#[derive(Debug)]
pub struct BufferSet {
    /// Payload of the last message read (after the length field)
    pub read_buffer: Vec<u8>,
    /// Frontend messages waiting to be written
    pub write_buffer: Vec<u8>,
    /// Type byte of the last message read
    pub type_byte: u8,
}

impl BufferSet {
    /// Create a new buffer set.
    pub fn new() -> Self {
        Self {
            read_buffer: Vec::with_capacity(8192),
            write_buffer: Vec::with_capacity(8192),
            type_byte: 0,
        }
    }
}

impl Default for BufferSet {
    fn default() -> Self {
        Self::new()
    }
}
