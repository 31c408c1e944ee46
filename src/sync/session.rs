//! Blocking session driver.

use std::collections::{HashMap, VecDeque};
use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use crate::buffer_set::BufferSet;
use crate::error::{Error, Result};
use crate::ids::NameGenerator;
use crate::opts::Opts;
use crate::protocol::frontend::{
    Target, write_bind, write_close, write_copy_data, write_copy_done, write_copy_fail,
    write_describe, write_execute, write_flush, write_parse, write_query, write_sync,
    write_terminate,
};
use crate::protocol::types::{FormatCode, Oid, TransactionStatus};
use crate::reducer::{Count, Reducer};
use crate::result::QueryResult;
use crate::state::{
    Action, AsyncMessage, ConnectionStateMachine, CopyMode, Notification, QueryStateMachine,
    StateMachine,
};
use crate::statement::{IntoStatement, Portal, PreparedStatement};
use crate::types::ToParams;

use super::cancel::CancelToken;
use super::stream::Stream;

/// Size of the chunks read from a COPY source.
const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Lifecycle phase of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Not yet started.
    Disconnected,
    /// Transport established, StartupMessage being sent.
    Connecting,
    /// Answering authentication challenges.
    AuthenticationPending,
    /// Idle between requests.
    Ready,
    /// Requests were sent and their results are not fetched yet.
    QueryInFlight,
    /// A transport or protocol failure ended the session.
    Failed,
    /// Terminate was sent.
    Closed,
}

/// COPY data endpoints for one request cycle.
#[derive(Default)]
struct CopyIo<'a> {
    source: Option<&'a mut dyn Read>,
    sink: Option<&'a mut dyn Write>,
    error: Option<std::io::Error>,
}

/// A PostgreSQL session over a blocking transport.
///
/// A session serves one caller at a time. It is `Send` when the transport
/// is, but it must not be driven from several threads at once; wrap it in
/// a lock if it has to be shared. Out-of-band cancellation goes through a
/// [`CancelToken`] instead.
pub struct Session<S: Read + Write> {
    stream: Stream<S>,
    buffer_set: BufferSet,
    opts: Opts,
    names: Arc<NameGenerator>,
    id: String,
    phase: SessionPhase,
    backend_key: Option<CancelToken>,
    server_params: HashMap<String, String>,
    transaction_status: TransactionStatus,
    negotiated: Option<(i32, Vec<String>)>,
    notifications: VecDeque<Notification>,
    /// Query and Sync messages whose ReadyForQuery is not consumed yet
    pending_syncs: usize,
    /// Extended messages sent after the last Sync
    unsynced: bool,
}

impl Session<TcpStream> {
    /// Open a TCP connection to `opts.host:opts.port` and run the startup
    /// handshake.
    pub fn connect_tcp<O: TryInto<Opts>>(opts: O) -> Result<Self>
    where
        Error: From<O::Error>,
    {
        let opts = opts.try_into()?;
        if opts.host.is_empty() {
            return Err(Error::InvalidUsage("host is empty".into()));
        }
        let tcp = TcpStream::connect((opts.host.as_str(), opts.port))?;
        tcp.set_nodelay(true)?;
        Self::connect(tcp, opts)
    }
}

impl<S: Read + Write> Session<S> {
    /// Run the startup handshake over a connected transport.
    ///
    /// Names come from [`NameGenerator::shared`].
    pub fn connect(stream: S, opts: Opts) -> Result<Self> {
        Self::connect_with_names(stream, opts, NameGenerator::shared())
    }

    /// Run the startup handshake, taking statement and portal names from
    /// `names`.
    pub fn connect_with_names(stream: S, opts: Opts, names: Arc<NameGenerator>) -> Result<Self> {
        let id = names.session();
        let mut session = Self {
            stream: Stream::new(stream),
            buffer_set: BufferSet::new(),
            opts,
            names,
            id,
            phase: SessionPhase::Disconnected,
            backend_key: None,
            server_params: HashMap::new(),
            transaction_status: TransactionStatus::Idle,
            negotiated: None,
            notifications: VecDeque::new(),
            pending_syncs: 0,
            unsynced: false,
        };
        let result = session.handshake();
        if let Err(e) = result {
            session.fail(&e);
            return Err(e);
        }
        Ok(session)
    }

    fn handshake(&mut self) -> Result<()> {
        self.phase = SessionPhase::Connecting;
        let mut machine = ConnectionStateMachine::new(self.opts.clone());
        machine.start(&mut self.buffer_set)?;
        self.stream.write_pending(&mut self.buffer_set)?;
        self.phase = SessionPhase::AuthenticationPending;

        self.drive(&mut machine, Action::ReadMessage, &mut CopyIo::default())?;

        self.backend_key = machine
            .backend_key()
            .map(|(pid, secret)| CancelToken::new(pid, secret));
        self.negotiated = machine.negotiated().cloned();
        self.transaction_status = machine.transaction_status();
        self.phase = SessionPhase::Ready;
        tracing::debug!(session = %self.id, pid = ?self.backend_pid(), "session ready");
        Ok(())
    }

    // === Accessors ===

    /// Session id, e.g. `pg1`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Check if the session is failed or closed.
    pub fn is_broken(&self) -> bool {
        matches!(self.phase, SessionPhase::Failed | SessionPhase::Closed)
    }

    /// Options the session was opened with.
    pub fn opts(&self) -> &Opts {
        &self.opts
    }

    /// Get a reference to the transport.
    pub fn get_ref(&self) -> &S {
        self.stream.get_ref()
    }

    /// Transaction status from the last ReadyForQuery.
    pub fn transaction_status(&self) -> TransactionStatus {
        self.transaction_status
    }

    /// Check if a transaction block is open (including a failed one).
    pub fn in_transaction(&self) -> bool {
        self.transaction_status != TransactionStatus::Idle
    }

    /// Server parameters reported through ParameterStatus.
    pub fn server_params(&self) -> &HashMap<String, String> {
        &self.server_params
    }

    /// Look up one server parameter.
    pub fn server_param(&self, name: &str) -> Option<&str> {
        self.server_params.get(name).map(String::as_str)
    }

    /// Backend process id, if the server sent BackendKeyData.
    pub fn backend_pid(&self) -> Option<u32> {
        self.backend_key.map(|key| key.pid())
    }

    /// Token for cancelling this session's running request.
    pub fn cancel_token(&self) -> Option<CancelToken> {
        self.backend_key
    }

    /// Newest minor protocol version and unrecognized startup options,
    /// if the server sent NegotiateProtocolVersion.
    pub fn negotiated_protocol(&self) -> Option<(i32, &[String])> {
        self.negotiated
            .as_ref()
            .map(|(minor, options)| (*minor, options.as_slice()))
    }

    /// Take the queued LISTEN/NOTIFY deliveries.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    // === High-level operations ===

    /// Run SQL through the simple query protocol.
    ///
    /// Returns one output per statement. A COPY FROM STDIN inside `sql`
    /// is answered with CopyFail.
    pub fn query<R: Reducer>(&mut self, sql: &str, reducer: R) -> Result<Vec<R::Output>> {
        self.check_ready()?;
        let result = self.query_inner(sql, reducer);
        self.mark_broken(result)?.into_results()
    }

    fn query_inner<R: Reducer>(&mut self, sql: &str, reducer: R) -> Result<QueryResult<R>> {
        write_query(&mut self.buffer_set.write_buffer, sql)?;
        self.pending_syncs += 1;
        self.phase = SessionPhase::QueryInFlight;
        self.run_cycle(reducer, CopyMode::Reject, &mut CopyIo::default())
    }

    /// Prepare a named statement.
    ///
    /// `param_oids` may be shorter than the number of placeholders or hold
    /// 0 entries; the server infers those types.
    pub fn prepare(&mut self, sql: &str, param_oids: &[Oid]) -> Result<PreparedStatement> {
        self.check_ready()?;
        let name = self.names.statement();
        let result = self.prepare_inner(name, sql, param_oids);
        self.mark_broken(result)
    }

    fn prepare_inner(
        &mut self,
        name: String,
        sql: &str,
        param_oids: &[Oid],
    ) -> Result<PreparedStatement> {
        let buf = &mut self.buffer_set.write_buffer;
        write_parse(buf, &name, sql, param_oids)?;
        write_describe(buf, Target::Statement, &name)?;
        write_sync(buf)?;
        self.pending_syncs += 1;
        self.phase = SessionPhase::QueryInFlight;

        let described = self
            .run_cycle(Count, CopyMode::Reject, &mut CopyIo::default())?
            .into_sub_results()?
            .into_iter()
            .next();
        let (param_oids, columns) = match described {
            Some(sub) => (sub.param_oids.unwrap_or_default(), sub.columns),
            None => (Vec::new(), None),
        };
        tracing::debug!(session = %self.id, statement = %name, params = param_oids.len(), "prepared statement");
        Ok(PreparedStatement {
            name,
            param_oids,
            columns,
        })
    }

    /// Bind and run a prepared statement, folding its rows with `reducer`.
    pub fn execute_prepared<P: ToParams + ?Sized, R: Reducer>(
        &mut self,
        statement: &PreparedStatement,
        params: &P,
        reducer: R,
    ) -> Result<R::Output> {
        self.check_ready()?;
        check_param_count(statement, params)?;
        self.write_portal_run(statement, params)?;
        self.pending_syncs += 1;
        self.phase = SessionPhase::QueryInFlight;
        let result = self.run_cycle(reducer, CopyMode::Reject, &mut CopyIo::default());
        self.mark_broken(result)?.into_last()
    }

    /// Write Bind, Describe, Execute and Sync for the unnamed portal.
    ///
    /// On an encoding failure nothing stays in the write buffer.
    fn write_portal_run<P: ToParams + ?Sized>(
        &mut self,
        statement: &PreparedStatement,
        params: &P,
    ) -> Result<()> {
        let result_formats = statement.result_formats(self.opts.binary_decode);
        let buf = &mut self.buffer_set.write_buffer;
        let start = buf.len();
        let written = write_bind(
            buf,
            "",
            &statement.name,
            params,
            &statement.param_oids,
            self.opts.binary_encode,
            &result_formats,
        )
        .and_then(|()| write_describe(buf, Target::Portal, ""))
        .and_then(|()| write_execute(buf, "", 0))
        .and_then(|()| write_sync(buf));
        if written.is_err() {
            buf.truncate(start);
        }
        written
    }

    /// Run SQL text or a prepared statement with parameters.
    ///
    /// SQL text is prepared as the unnamed statement first, so parameter
    /// types are those the server infers.
    pub fn execute<T: IntoStatement, P: ToParams + ?Sized, R: Reducer>(
        &mut self,
        statement: T,
        params: &P,
        reducer: R,
    ) -> Result<R::Output> {
        if let Some(prepared) = statement.as_prepared() {
            return self.execute_prepared(prepared, params, reducer);
        }
        self.check_ready()?;
        let sql = statement.as_sql().unwrap_or_default();
        let result = self.prepare_inner(String::new(), sql, &[]);
        let unnamed = self.mark_broken(result)?;
        self.execute_prepared(&unnamed, params, reducer)
    }

    /// Bind a prepared statement to a new named portal.
    ///
    /// Needs an open transaction block; outside one the server drops the
    /// portal at the end of the request cycle.
    pub fn bind_portal<P: ToParams + ?Sized>(
        &mut self,
        statement: &PreparedStatement,
        params: &P,
    ) -> Result<Portal> {
        self.check_ready()?;
        if self.transaction_status != TransactionStatus::InTransaction {
            return Err(Error::InvalidUsage(
                "named portals need an open transaction".into(),
            ));
        }
        check_param_count(statement, params)?;
        let name = self.names.portal();
        let result = self.bind_portal_inner(&name, statement, params);
        self.mark_broken(result)?.into_results()?;
        tracing::debug!(session = %self.id, portal = %name, statement = %statement.name, "bound portal");
        Ok(Portal::new(name))
    }

    fn bind_portal_inner<P: ToParams + ?Sized>(
        &mut self,
        name: &str,
        statement: &PreparedStatement,
        params: &P,
    ) -> Result<QueryResult<Count>> {
        let result_formats = statement.result_formats(self.opts.binary_decode);
        let buf = &mut self.buffer_set.write_buffer;
        let start = buf.len();
        let written = write_bind(
            buf,
            name,
            &statement.name,
            params,
            &statement.param_oids,
            self.opts.binary_encode,
            &result_formats,
        )
        .and_then(|()| write_sync(buf));
        if let Err(e) = written {
            buf.truncate(start);
            return Err(e);
        }
        self.pending_syncs += 1;
        self.phase = SessionPhase::QueryInFlight;
        self.run_cycle(Count, CopyMode::Reject, &mut CopyIo::default())
    }

    /// Fetch up to `max_rows` rows from `portal`, 0 for all remaining.
    ///
    /// [`Portal::is_complete`] tells whether rows are left afterwards.
    pub fn fetch_portal<R: Reducer>(
        &mut self,
        portal: &mut Portal,
        max_rows: u64,
        reducer: R,
    ) -> Result<R::Output> {
        self.check_ready()?;
        let buf = &mut self.buffer_set.write_buffer;
        let start = buf.len();
        let written = write_describe(buf, Target::Portal, portal.name())
            .and_then(|()| write_execute(buf, portal.name(), max_rows))
            .and_then(|()| write_sync(buf));
        if let Err(e) = written {
            buf.truncate(start);
            return Err(e);
        }
        self.pending_syncs += 1;
        self.phase = SessionPhase::QueryInFlight;
        let result = self.run_cycle(reducer, CopyMode::Reject, &mut CopyIo::default());
        let result = self.mark_broken(result)?;
        let suspended = result.is_suspended();
        let output = result.into_last()?;
        portal.set_complete(!suspended);
        Ok(output)
    }

    /// Close a named portal on the server.
    pub fn close_portal(&mut self, portal: Portal) -> Result<()> {
        self.check_ready()?;
        let result = self.close_inner(Target::Portal, portal.name());
        self.mark_broken(result)?.into_results()?;
        Ok(())
    }

    /// Close a prepared statement on the server.
    pub fn close_statement(&mut self, statement: &PreparedStatement) -> Result<()> {
        self.check_ready()?;
        let result = self.close_inner(Target::Statement, &statement.name);
        self.mark_broken(result)?.into_results()?;
        Ok(())
    }

    fn close_inner(&mut self, target: Target, name: &str) -> Result<QueryResult<Count>> {
        let buf = &mut self.buffer_set.write_buffer;
        write_close(buf, target, name)?;
        write_sync(buf)?;
        self.pending_syncs += 1;
        self.phase = SessionPhase::QueryInFlight;
        self.run_cycle(Count, CopyMode::Reject, &mut CopyIo::default())
    }

    /// Run a `COPY ... TO STDOUT` statement, writing its data to `writer`.
    ///
    /// Returns the row count from the command tag. A failing writer stops
    /// consumption; the remaining data is drained and the writer's error
    /// returned with the session still usable.
    pub fn copy_out<W: Write>(&mut self, sql: &str, writer: &mut W) -> Result<u64> {
        self.check_ready()?;
        let mut copy = CopyIo {
            sink: Some(writer),
            ..CopyIo::default()
        };
        self.copy_cycle(sql, CopyMode::Out, &mut copy)
    }

    /// Run a `COPY ... FROM STDIN` statement, streaming `reader` as its data.
    ///
    /// Returns the row count from the command tag. A failing reader is
    /// reported to the server with CopyFail; its error is returned with the
    /// session still usable.
    pub fn copy_in<Rd: Read>(&mut self, sql: &str, reader: &mut Rd) -> Result<u64> {
        self.check_ready()?;
        let mut copy = CopyIo {
            source: Some(reader),
            ..CopyIo::default()
        };
        self.copy_cycle(sql, CopyMode::In, &mut copy)
    }

    fn copy_cycle(&mut self, sql: &str, mode: CopyMode, copy: &mut CopyIo<'_>) -> Result<u64> {
        let result = self.copy_inner(sql, mode, copy);
        let result = self.mark_broken(result)?;
        if let Some(e) = copy.error.take() {
            return Err(Error::Io(e));
        }
        let rows = result.rows_affected().unwrap_or(0);
        result.into_results()?;
        Ok(rows)
    }

    fn copy_inner(
        &mut self,
        sql: &str,
        mode: CopyMode,
        copy: &mut CopyIo<'_>,
    ) -> Result<QueryResult<Count>> {
        write_query(&mut self.buffer_set.write_buffer, sql)?;
        self.pending_syncs += 1;
        self.phase = SessionPhase::QueryInFlight;
        self.run_cycle(Count, mode, copy)
    }

    // === Low-level message interface ===

    /// Send a simple Query.
    pub fn send_query(&mut self, sql: &str) -> Result<()> {
        self.check_can_send()?;
        write_query(&mut self.buffer_set.write_buffer, sql)?;
        self.pending_syncs += 1;
        self.phase = SessionPhase::QueryInFlight;
        let result = self.stream.write_pending(&mut self.buffer_set);
        self.mark_broken(result)
    }

    /// Queue a Parse message.
    pub fn send_parse(&mut self, name: &str, sql: &str, param_oids: &[Oid]) -> Result<()> {
        self.check_can_send()?;
        write_parse(&mut self.buffer_set.write_buffer, name, sql, param_oids)?;
        self.queued();
        Ok(())
    }

    /// Queue a Bind message.
    ///
    /// `param_oids` are the statement's parameter types, used to pick each
    /// parameter's encoding.
    pub fn send_bind<P: ToParams + ?Sized>(
        &mut self,
        portal: &str,
        statement: &str,
        params: &P,
        param_oids: &[Oid],
        result_formats: &[FormatCode],
    ) -> Result<()> {
        self.check_can_send()?;
        write_bind(
            &mut self.buffer_set.write_buffer,
            portal,
            statement,
            params,
            param_oids,
            self.opts.binary_encode,
            result_formats,
        )?;
        self.queued();
        Ok(())
    }

    /// Queue a Describe message.
    pub fn send_describe(&mut self, target: Target, name: &str) -> Result<()> {
        self.check_can_send()?;
        write_describe(&mut self.buffer_set.write_buffer, target, name)?;
        self.queued();
        Ok(())
    }

    /// Queue an Execute message. `max_rows` 0 fetches all rows.
    ///
    /// A limit above [`crate::protocol::frontend::EXECUTE_MAX_ROWS`] is an
    /// encoding error and queues nothing.
    pub fn send_execute(&mut self, portal: &str, max_rows: u64) -> Result<()> {
        self.check_can_send()?;
        write_execute(&mut self.buffer_set.write_buffer, portal, max_rows)?;
        self.queued();
        Ok(())
    }

    /// Queue a Close message.
    pub fn send_close(&mut self, target: Target, name: &str) -> Result<()> {
        self.check_can_send()?;
        write_close(&mut self.buffer_set.write_buffer, target, name)?;
        self.queued();
        Ok(())
    }

    /// Send Sync along with every queued message.
    pub fn send_sync(&mut self) -> Result<()> {
        self.check_can_send()?;
        write_sync(&mut self.buffer_set.write_buffer)?;
        self.pending_syncs += 1;
        self.unsynced = false;
        self.phase = SessionPhase::QueryInFlight;
        let result = self.stream.write_pending(&mut self.buffer_set);
        self.mark_broken(result)
    }

    /// Send Flush along with every queued message.
    ///
    /// The server sends its pending responses but no ReadyForQuery; a later
    /// [`send_sync`](Self::send_sync) is needed before fetching results.
    pub fn send_flush(&mut self) -> Result<()> {
        self.check_can_send()?;
        write_flush(&mut self.buffer_set.write_buffer)?;
        self.queued();
        let result = self.stream.write_pending(&mut self.buffer_set);
        self.mark_broken(result)
    }

    /// Read the responses up to the next ReadyForQuery.
    ///
    /// Each Query or Sync sent produces one result; call this once per
    /// Query or Sync, in order.
    pub fn fetch_results<R: Reducer>(&mut self, reducer: R) -> Result<QueryResult<R>> {
        match self.phase {
            SessionPhase::QueryInFlight => {}
            SessionPhase::Failed | SessionPhase::Closed => return Err(Error::ConnectionBroken),
            _ => return Err(Error::InvalidUsage("no request is in flight".into())),
        }
        if self.pending_syncs == 0 {
            return Err(Error::InvalidUsage(
                "no Query or Sync was sent; call send_sync first".into(),
            ));
        }
        let result = self.run_cycle(reducer, CopyMode::Reject, &mut CopyIo::default());
        self.mark_broken(result)
    }

    /// Send Terminate and close the session.
    pub fn close(mut self) -> Result<()> {
        let result = match self.phase {
            SessionPhase::Ready | SessionPhase::QueryInFlight => self.send_terminate(),
            SessionPhase::Failed => {
                // The transport may already be gone
                let _ = self.send_terminate();
                Ok(())
            }
            _ => Ok(()),
        };
        self.phase = SessionPhase::Closed;
        tracing::debug!(session = %self.id, "session closed");
        result
    }

    // === Driver ===

    fn check_ready(&self) -> Result<()> {
        match self.phase {
            SessionPhase::Ready => Ok(()),
            SessionPhase::QueryInFlight => Err(Error::InvalidUsage(
                "results of sent requests must be fetched first".into(),
            )),
            _ => Err(Error::ConnectionBroken),
        }
    }

    fn check_can_send(&self) -> Result<()> {
        match self.phase {
            SessionPhase::Ready | SessionPhase::QueryInFlight => Ok(()),
            _ => Err(Error::ConnectionBroken),
        }
    }

    fn queued(&mut self) {
        self.unsynced = true;
        self.phase = SessionPhase::QueryInFlight;
    }

    fn mark_broken<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result
            && e.is_connection_broken()
        {
            self.fail(e);
        }
        result
    }

    fn fail(&mut self, error: &Error) {
        if self.phase != SessionPhase::Failed {
            tracing::warn!(session = %self.id, error = %error, "session failed");
        }
        self.phase = SessionPhase::Failed;
    }

    fn send_terminate(&mut self) -> Result<()> {
        let mut buf = Vec::with_capacity(5);
        write_terminate(&mut buf)?;
        self.stream.write_all(&buf)
    }

    /// Write the queued messages and drain one cycle up to ReadyForQuery.
    fn run_cycle<R: Reducer>(
        &mut self,
        reducer: R,
        mode: CopyMode,
        copy: &mut CopyIo<'_>,
    ) -> Result<QueryResult<R>> {
        let mut machine = QueryStateMachine::new(reducer, mode);
        if let Err(e) = self.drive(&mut machine, Action::WriteAndReadMessage, copy) {
            // A backend that exits reports why before closing the transport
            let e = match (e, machine.server_error()) {
                (Error::Io(io), Some(fields)) => {
                    tracing::debug!(session = %self.id, error = %io, "transport closed after server error");
                    Error::Server(fields.clone())
                }
                (e, _) => e,
            };
            self.fail(&e);
            return Err(e);
        }

        self.pending_syncs = self.pending_syncs.saturating_sub(1);
        self.transaction_status = machine.transaction_status();
        self.phase = if self.pending_syncs == 0 && !self.unsynced {
            SessionPhase::Ready
        } else {
            SessionPhase::QueryInFlight
        };

        let (result, decode_error) = machine.finish();
        match decode_error {
            Some(e) => Err(e),
            None => Ok(result),
        }
    }

    fn drive<M: StateMachine>(
        &mut self,
        machine: &mut M,
        mut action: Action,
        copy: &mut CopyIo<'_>,
    ) -> Result<()> {
        loop {
            match action {
                Action::ReadMessage => {}
                Action::WriteAndReadMessage => self.stream.write_pending(&mut self.buffer_set)?,
                Action::HandleAsyncMessageAndReadMessage(message) => self.handle_async(message),
                Action::SendCopyData => self.send_copy_data(copy)?,
                Action::ReceiveCopyData => self.receive_copy_data(copy),
                Action::Finished => return Ok(()),
            }
            self.stream.read_message(&mut self.buffer_set)?;
            action = machine.step(&mut self.buffer_set)?;
        }
    }

    fn handle_async(&mut self, message: AsyncMessage) {
        match message {
            AsyncMessage::Notice(fields) => {
                tracing::info!(session = %self.id, code = ?fields.code, "server notice: {}", fields);
            }
            AsyncMessage::Notification(notification) => {
                tracing::info!(
                    session = %self.id,
                    channel = %notification.channel,
                    pid = notification.pid,
                    "notification received"
                );
                self.notifications.push_back(notification);
            }
            AsyncMessage::ParameterChanged { name, value } => {
                tracing::debug!(session = %self.id, %name, %value, "server parameter");
                self.server_params.insert(name, value);
            }
        }
    }

    fn send_copy_data(&mut self, copy: &mut CopyIo<'_>) -> Result<()> {
        let Some(source) = copy.source.as_mut() else {
            write_copy_fail(&mut self.buffer_set.write_buffer, "no COPY data source")?;
            return self.stream.write_pending(&mut self.buffer_set);
        };

        let mut chunk = vec![0u8; COPY_CHUNK_SIZE];
        loop {
            match source.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    let data = chunk.get(..n).unwrap_or_default();
                    write_copy_data(&mut self.buffer_set.write_buffer, data)?;
                    if self.buffer_set.write_buffer.len() >= COPY_CHUNK_SIZE {
                        self.stream.write_pending(&mut self.buffer_set)?;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::debug!(session = %self.id, error = %e, "COPY source failed");
                    write_copy_fail(&mut self.buffer_set.write_buffer, &e.to_string())?;
                    copy.error = Some(e);
                    return self.stream.write_pending(&mut self.buffer_set);
                }
            }
        }
        write_copy_done(&mut self.buffer_set.write_buffer)?;
        self.stream.write_pending(&mut self.buffer_set)
    }

    fn receive_copy_data(&mut self, copy: &mut CopyIo<'_>) {
        if copy.error.is_some() {
            return;
        }
        if let Some(sink) = copy.sink.as_mut()
            && let Err(e) = sink.write_all(&self.buffer_set.read_buffer)
        {
            tracing::debug!(session = %self.id, error = %e, "COPY sink failed");
            copy.error = Some(e);
        }
    }
}

fn check_param_count<P: ToParams + ?Sized>(
    statement: &PreparedStatement,
    params: &P,
) -> Result<()> {
    if params.param_count() == statement.param_oids.len() {
        return Ok(());
    }
    Err(Error::Encode(format!(
        "statement {:?} expects {} parameters, got {}",
        statement.name,
        statement.param_oids.len(),
        params.param_count()
    )))
}

impl<S: Read + Write> Drop for Session<S> {
    fn drop(&mut self) {
        if matches!(
            self.phase,
            SessionPhase::Ready | SessionPhase::QueryInFlight
        ) {
            let _ = self.send_terminate();
            self.phase = SessionPhase::Closed;
        }
    }
}
