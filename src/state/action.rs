//! Action types for state machine I/O requests.

use crate::error::ErrorFields;

/// Action requested by a state machine.
///
/// The caller performs the requested I/O and then calls the machine's
/// `step()` with the next message in the buffer set.
#[derive(Debug)]
pub enum Action {
    /// Read a message from the server.
    ///
    /// The caller should:
    /// 1. Read the message type byte (1 byte)
    /// 2. Read the length (4 bytes, big-endian i32)
    /// 3. Read (length - 4) bytes of payload into the buffer set
    /// 4. Call the state machine's `step()` method again
    ReadMessage,

    /// Write `buffer_set.write_buffer` to the server, then read a message.
    WriteAndReadMessage,

    /// An asynchronous message was received.
    ///
    /// The caller should handle the message, read the next message,
    /// then call `step()` again.
    HandleAsyncMessageAndReadMessage(AsyncMessage),

    /// The server waits for COPY data.
    ///
    /// The caller streams CopyData followed by CopyDone (or CopyFail),
    /// then reads the next message.
    SendCopyData,

    /// `buffer_set.read_buffer` holds one CopyData payload.
    ///
    /// The caller hands it to the COPY sink, then reads the next message.
    ReceiveCopyData,

    /// The state machine has finished successfully.
    Finished,
}

/// LISTEN/NOTIFY delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// PID of the notifying backend process
    pub pid: u32,
    /// Channel name
    pub channel: String,
    /// Notification payload
    pub payload: String,
}

/// Asynchronous message from the server.
///
/// These can arrive at any time, in any phase.
#[derive(Debug, Clone)]
pub enum AsyncMessage {
    /// Notification from LISTEN/NOTIFY.
    Notification(Notification),

    /// Non-fatal notice/warning from server.
    Notice(ErrorFields),

    /// Server parameter value changed.
    ParameterChanged {
        /// Parameter name
        name: String,
        /// New value
        value: String,
    },
}
