//! Request-cycle state machine.
//!
//! Drives one exchange (simple Query, or extended messages ending in Sync)
//! until ReadyForQuery, folding every message into a [`QueryResult`].
//! Server errors and undecodable rows are recorded and draining continues,
//! so the session is resynchronized when the machine finishes.

use crate::buffer_set::BufferSet;
use crate::error::{Error, ErrorFields, Result};
use crate::protocol::backend::BackendMessage;
use crate::protocol::frontend::write_copy_fail;
use crate::protocol::types::TransactionStatus;
use crate::reducer::Reducer;
use crate::result::QueryResult;
use crate::row::{Row, columns_of};

use super::action::Action;

/// How COPY sub-protocols are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// Refuse COPY FROM STDIN with CopyFail; drop COPY TO STDOUT data.
    Reject,
    /// The caller supplies data for COPY FROM STDIN.
    In,
    /// The caller consumes data from COPY TO STDOUT.
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Running,
    CopyIn,
    CopyOut,
    Finished,
}

/// Request-cycle state machine.
pub struct QueryStateMachine<R: Reducer> {
    state: State,
    copy_mode: CopyMode,
    result: QueryResult<R>,
    decode_error: Option<Error>,
    transaction_status: TransactionStatus,
}

impl<R: Reducer> QueryStateMachine<R> {
    /// Create a machine folding rows with `reducer`.
    pub fn new(reducer: R, copy_mode: CopyMode) -> Self {
        Self {
            state: State::Running,
            copy_mode,
            result: QueryResult::new(reducer),
            decode_error: None,
            transaction_status: TransactionStatus::Idle,
        }
    }

    /// Get the transaction status from the closing ReadyForQuery.
    pub fn transaction_status(&self) -> TransactionStatus {
        self.transaction_status
    }

    /// Check if ReadyForQuery was received.
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// First ErrorResponse received so far.
    pub fn server_error(&self) -> Option<&ErrorFields> {
        self.result.errors().first()
    }

    /// Take the accumulated result and the first decode error, if any.
    pub fn finish(self) -> (QueryResult<R>, Option<Error>) {
        (self.result, self.decode_error)
    }

    /// Process a message from the server.
    pub fn step(&mut self, buffer_set: &mut BufferSet) -> Result<Action> {
        let message = BackendMessage::parse(buffer_set.type_byte, &buffer_set.read_buffer)?;

        if let Some(async_msg) = super::async_message(&message) {
            return Ok(Action::HandleAsyncMessageAndReadMessage(async_msg));
        }

        match message {
            BackendMessage::ParseComplete
            | BackendMessage::BindComplete
            | BackendMessage::CloseComplete
            | BackendMessage::NoData => {}
            BackendMessage::ParameterDescription(desc) => {
                self.result.on_parameter_description(desc.oids().to_vec());
            }
            BackendMessage::RowDescription(desc) => {
                self.result.on_row_description(columns_of(&desc));
            }
            BackendMessage::DataRow(data) => {
                let columns = self
                    .result
                    .current_columns()
                    .ok_or_else(|| Error::Protocol("DataRow without RowDescription".into()))?
                    .clone();
                if self.decode_error.is_none() {
                    match Row::decode(&columns, data) {
                        Ok(row) => self.result.on_data_row(row)?,
                        Err(e @ Error::Decode(_)) => {
                            tracing::warn!(error = %e, "failed to decode row, draining");
                            self.decode_error = Some(e);
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
            BackendMessage::CommandComplete(complete) => {
                self.state = State::Running;
                self.result.on_command_complete(complete.tag);
            }
            BackendMessage::EmptyQueryResponse => self.result.on_empty_query(),
            BackendMessage::PortalSuspended => self.result.on_portal_suspended(),
            BackendMessage::ErrorResponse(fields) => {
                self.state = State::Running;
                self.result.on_error(fields);
            }
            BackendMessage::CopyInResponse(_) => {
                self.state = State::CopyIn;
                if self.copy_mode == CopyMode::In {
                    return Ok(Action::SendCopyData);
                }
                buffer_set.write_buffer.clear();
                write_copy_fail(
                    &mut buffer_set.write_buffer,
                    "COPY FROM STDIN is not supported by this operation",
                )?;
                return Ok(Action::WriteAndReadMessage);
            }
            BackendMessage::CopyOutResponse(_) => self.state = State::CopyOut,
            BackendMessage::CopyData(_) if self.state == State::CopyOut => {
                if self.copy_mode == CopyMode::Out {
                    return Ok(Action::ReceiveCopyData);
                }
                tracing::trace!("dropping COPY data");
            }
            BackendMessage::CopyDone if self.state == State::CopyOut => {
                self.state = State::Running;
            }
            BackendMessage::ReadyForQuery(ready) => {
                self.transaction_status = ready.status;
                self.state = State::Finished;
                return Ok(Action::Finished);
            }
            other => {
                return Err(Error::Protocol(format!(
                    "unexpected {} during query",
                    other.name()
                )));
            }
        }
        Ok(Action::ReadMessage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::Collect;

    fn feed<R: Reducer>(
        machine: &mut QueryStateMachine<R>,
        bs: &mut BufferSet,
        tag: u8,
        payload: &[u8],
    ) -> Result<Action> {
        bs.type_byte = tag;
        bs.read_buffer = payload.to_vec();
        machine.step(bs)
    }

    fn row_description() -> Vec<u8> {
        let mut buf = vec![0, 1, b'n', 0];
        buf.extend_from_slice(&[
            0, 0, 0, 0, // table oid
            0, 0, // column id
            0, 0, 0, 23, // int4
            0, 4, // size
            0xff, 0xff, 0xff, 0xff, // modifier
            0, 0, // text
        ]);
        buf
    }

    #[test]
    fn test_drains_after_error() {
        let mut machine = QueryStateMachine::new(Collect, CopyMode::Reject);
        let mut bs = BufferSet::new();
        feed(&mut machine, &mut bs, b'T', &row_description()).unwrap();
        feed(&mut machine, &mut bs, b'D', &[0, 1, 0, 0, 0, 1, b'5']).unwrap();
        feed(&mut machine, &mut bs, b'E', b"SERROR\0C22012\0Mdivision by zero\0\0").unwrap();
        assert!(!machine.is_finished());
        assert_eq!(machine.server_error().unwrap().code.as_deref(), Some("22012"));
        let action = feed(&mut machine, &mut bs, b'Z', b"I").unwrap();
        assert!(matches!(action, Action::Finished));

        let (result, decode_error) = machine.finish();
        assert!(decode_error.is_none());
        assert_eq!(result.into_results().unwrap_err().sqlstate(), Some("22012"));
    }

    #[test]
    fn test_decode_error_is_recorded() {
        let mut machine = QueryStateMachine::new(Collect, CopyMode::Reject);
        let mut bs = BufferSet::new();
        feed(&mut machine, &mut bs, b'T', &row_description()).unwrap();
        feed(&mut machine, &mut bs, b'D', &[0, 1, 0, 0, 0, 1, b'x']).unwrap();
        feed(&mut machine, &mut bs, b'D', &[0, 1, 0, 0, 0, 1, b'6']).unwrap();
        feed(&mut machine, &mut bs, b'C', b"SELECT 2\0").unwrap();
        feed(&mut machine, &mut bs, b'Z', b"T").unwrap();
        assert_eq!(machine.transaction_status(), TransactionStatus::InTransaction);
        let (_, decode_error) = machine.finish();
        assert!(matches!(decode_error, Some(Error::Decode(_))));
    }

    #[test]
    fn test_copy_in_rejected() {
        let mut machine = QueryStateMachine::new(Collect, CopyMode::Reject);
        let mut bs = BufferSet::new();
        let action = feed(&mut machine, &mut bs, b'G', &[0, 0, 0]).unwrap();
        assert!(matches!(action, Action::WriteAndReadMessage));
        assert_eq!(bs.write_buffer[0], b'f');
    }

    #[test]
    fn test_copy_out_data() {
        let mut machine = QueryStateMachine::new(Collect, CopyMode::Out);
        let mut bs = BufferSet::new();
        feed(&mut machine, &mut bs, b'H', &[0, 0, 0]).unwrap();
        let action = feed(&mut machine, &mut bs, b'd', b"1\n").unwrap();
        assert!(matches!(action, Action::ReceiveCopyData));
        feed(&mut machine, &mut bs, b'c', &[]).unwrap();
        feed(&mut machine, &mut bs, b'C', b"COPY 1\0").unwrap();
        feed(&mut machine, &mut bs, b'Z', b"I").unwrap();
        let (result, _) = machine.finish();
        assert_eq!(result.rows_affected(), Some(1));
    }

    #[test]
    fn test_unexpected_messages() {
        let mut machine = QueryStateMachine::new(Collect, CopyMode::Reject);
        let mut bs = BufferSet::new();
        assert!(matches!(
            feed(&mut machine, &mut bs, b'D', &[0, 0]),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            feed(&mut machine, &mut bs, b'R', &[0, 0, 0, 0]),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            feed(&mut machine, &mut bs, b'd', b"x"),
            Err(Error::Protocol(_))
        ));
    }
}
