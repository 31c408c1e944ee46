//! Sans-I/O state machines for the PostgreSQL protocol.
//!
//! These state machines handle the protocol logic without performing any I/O.
//! They produce [`Action`] values that tell the caller what to do next.

pub mod action;
pub mod connection;
pub mod query;

pub use action::{Action, AsyncMessage, Notification};
pub use connection::{ConnectionState, ConnectionStateMachine};
pub use query::{CopyMode, QueryStateMachine};

use crate::buffer_set::BufferSet;
use crate::error::Result;
use crate::protocol::backend::BackendMessage;
use crate::reducer::Reducer;

/// Map a message that may arrive in any phase to its async form.
pub(crate) fn async_message(message: &BackendMessage<'_>) -> Option<AsyncMessage> {
    match message {
        BackendMessage::NoticeResponse(fields) => Some(AsyncMessage::Notice(fields.clone())),
        BackendMessage::NotificationResponse(n) => Some(AsyncMessage::Notification(Notification {
            pid: n.pid,
            channel: n.channel.to_string(),
            payload: n.payload.to_string(),
        })),
        BackendMessage::ParameterStatus(p) => Some(AsyncMessage::ParameterChanged {
            name: p.name.to_string(),
            value: p.value.to_string(),
        }),
        _ => None,
    }
}

/// A machine the I/O driver can step with each received message.
pub trait StateMachine {
    /// Process the message in `buffer_set` and say what to do next.
    fn step(&mut self, buffer_set: &mut BufferSet) -> Result<Action>;
}

impl StateMachine for ConnectionStateMachine {
    fn step(&mut self, buffer_set: &mut BufferSet) -> Result<Action> {
        ConnectionStateMachine::step(self, buffer_set)
    }
}

impl<R: Reducer> StateMachine for QueryStateMachine<R> {
    fn step(&mut self, buffer_set: &mut BufferSet) -> Result<Action> {
        QueryStateMachine::step(self, buffer_set)
    }
}
