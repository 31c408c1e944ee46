//! Connection startup and authentication state machine.

use crate::buffer_set::BufferSet;
use crate::error::{Error, Result};
use crate::opts::Opts;
use crate::protocol::backend::{AuthenticationMessage, BackendMessage};
use crate::protocol::frontend::auth::{SCRAM_SHA_256, ScramClient, md5_password};
use crate::protocol::frontend::{
    write_password, write_sasl_initial_response, write_sasl_response, write_startup,
};
use crate::protocol::types::TransactionStatus;

use super::action::Action;

/// Connection state during startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Initial,
    WaitingAuth,
    SaslInProgress,
    WaitingAuthResult,
    WaitingReady,
    Ready,
    Failed,
}

/// Connection startup state machine.
///
/// Sends the StartupMessage, answers authentication challenges and
/// collects BackendKeyData until the first ReadyForQuery.
pub struct ConnectionStateMachine {
    state: ConnectionState,
    options: Opts,
    backend_key: Option<(u32, u32)>,
    negotiated: Option<(i32, Vec<String>)>,
    transaction_status: TransactionStatus,
    scram_client: Option<ScramClient>,
}

impl ConnectionStateMachine {
    /// Create a new connection state machine.
    pub fn new(options: Opts) -> Self {
        Self {
            state: ConnectionState::Initial,
            options,
            backend_key: None,
            negotiated: None,
            transaction_status: TransactionStatus::Idle,
            scram_client: None,
        }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Backend process id and secret key, if the server sent them.
    pub fn backend_key(&self) -> Option<(u32, u32)> {
        self.backend_key
    }

    /// Newest supported minor version and unrecognized options, if the
    /// server sent NegotiateProtocolVersion.
    pub fn negotiated(&self) -> Option<&(i32, Vec<String>)> {
        self.negotiated.as_ref()
    }

    /// Get the transaction status from the first ReadyForQuery.
    pub fn transaction_status(&self) -> TransactionStatus {
        self.transaction_status
    }

    /// Write the StartupMessage.
    pub fn start(&mut self, buffer_set: &mut BufferSet) -> Result<Action> {
        buffer_set.write_buffer.clear();
        write_startup(
            &mut buffer_set.write_buffer,
            self.options.protocol_version,
            &self.options.startup_params(),
        )?;
        tracing::debug!(
            user = %self.options.user,
            version = self.options.protocol_version,
            "sending startup message"
        );
        self.state = ConnectionState::WaitingAuth;
        Ok(Action::WriteAndReadMessage)
    }

    /// Process a message from the server.
    ///
    /// The caller should fill buffer_set.read_buffer with the message payload
    /// and set buffer_set.type_byte to the message type.
    pub fn step(&mut self, buffer_set: &mut BufferSet) -> Result<Action> {
        let result = self.step_inner(buffer_set);
        if result.is_err() {
            self.state = ConnectionState::Failed;
        }
        result
    }

    fn step_inner(&mut self, buffer_set: &mut BufferSet) -> Result<Action> {
        self.dispatch(
            buffer_set.type_byte,
            &buffer_set.read_buffer,
            &mut buffer_set.write_buffer,
        )
    }

    fn dispatch(&mut self, type_byte: u8, payload: &[u8], out: &mut Vec<u8>) -> Result<Action> {
        let message = BackendMessage::parse(type_byte, payload)?;

        if let Some(async_msg) = super::async_message(&message) {
            return Ok(Action::HandleAsyncMessageAndReadMessage(async_msg));
        }

        match message {
            BackendMessage::ErrorResponse(fields) => Err(Error::Server(fields)),
            BackendMessage::NegotiateProtocolVersion(negotiate)
                if self.state == ConnectionState::WaitingAuth =>
            {
                tracing::debug!(
                    newest_minor = negotiate.newest_minor_version,
                    unrecognized = ?negotiate.unrecognized_options,
                    "server negotiated protocol version"
                );
                self.negotiated = Some((
                    negotiate.newest_minor_version,
                    negotiate
                        .unrecognized_options
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                ));
                Ok(Action::ReadMessage)
            }
            BackendMessage::Authentication(auth) => match self.state {
                ConnectionState::WaitingAuth => self.handle_auth_request(auth, out),
                ConnectionState::SaslInProgress => self.handle_sasl_message(auth, out),
                ConnectionState::WaitingAuthResult => self.handle_auth_result(auth),
                _ => Err(Error::Protocol(format!(
                    "unexpected authentication message in state {:?}",
                    self.state
                ))),
            },
            BackendMessage::BackendKeyData { pid, secret_key }
                if self.state == ConnectionState::WaitingReady =>
            {
                tracing::debug!(pid, "received backend key data");
                self.backend_key = Some((pid, secret_key));
                Ok(Action::ReadMessage)
            }
            BackendMessage::ReadyForQuery(ready) if self.state == ConnectionState::WaitingReady => {
                self.transaction_status = ready.status;
                self.state = ConnectionState::Ready;
                Ok(Action::Finished)
            }
            other => Err(Error::Protocol(format!(
                "unexpected {} in state {:?}",
                other.name(),
                self.state
            ))),
        }
    }

    fn password(&self) -> Result<&str> {
        self.options
            .password
            .as_deref()
            .ok_or_else(|| Error::Auth("password required but not provided".into()))
    }

    fn handle_auth_request(
        &mut self,
        auth: AuthenticationMessage<'_>,
        out: &mut Vec<u8>,
    ) -> Result<Action> {
        tracing::debug!(method = auth.method_name(), "authentication requested");
        out.clear();

        match auth {
            AuthenticationMessage::Ok => {
                self.state = ConnectionState::WaitingReady;
                Ok(Action::ReadMessage)
            }
            AuthenticationMessage::CleartextPassword => {
                write_password(out, self.password()?)?;
                self.state = ConnectionState::WaitingAuthResult;
                Ok(Action::WriteAndReadMessage)
            }
            AuthenticationMessage::Md5Password { salt } => {
                let hashed = md5_password(&self.options.user, self.password()?, &salt);
                write_password(out, &hashed)?;
                self.state = ConnectionState::WaitingAuthResult;
                Ok(Action::WriteAndReadMessage)
            }
            AuthenticationMessage::Sasl { mechanisms } => {
                if !mechanisms.contains(&SCRAM_SHA_256) {
                    return Err(Error::Auth(format!(
                        "no supported SASL mechanism, server offers {:?}",
                        mechanisms
                    )));
                }

                let scram = ScramClient::new(self.password()?);
                write_sasl_initial_response(
                    out,
                    SCRAM_SHA_256,
                    scram.client_first_message().as_bytes(),
                )?;
                self.scram_client = Some(scram);
                self.state = ConnectionState::SaslInProgress;
                Ok(Action::WriteAndReadMessage)
            }
            other => Err(Error::Unsupported(format!(
                "authentication method {} is not supported",
                other.method_name()
            ))),
        }
    }

    fn handle_sasl_message(
        &mut self,
        auth: AuthenticationMessage<'_>,
        out: &mut Vec<u8>,
    ) -> Result<Action> {
        let scram = self
            .scram_client
            .as_mut()
            .ok_or_else(|| Error::Protocol("SCRAM client not initialized".into()))?;

        match auth {
            AuthenticationMessage::SaslContinue { data } => {
                let server_first = simdutf8::compat::from_utf8(data)
                    .map_err(|e| Error::Auth(format!("invalid server-first-message: {}", e)))?;
                let client_final = scram.process_server_first(server_first)?;

                out.clear();
                write_sasl_response(out, client_final.as_bytes())?;
                Ok(Action::WriteAndReadMessage)
            }
            AuthenticationMessage::SaslFinal { data } => {
                let server_final = simdutf8::compat::from_utf8(data)
                    .map_err(|e| Error::Auth(format!("invalid server-final-message: {}", e)))?;
                scram.verify_server_final(server_final)?;

                self.state = ConnectionState::WaitingAuthResult;
                Ok(Action::ReadMessage)
            }
            other => Err(Error::Protocol(format!(
                "unexpected {} authentication message during SASL exchange",
                other.method_name()
            ))),
        }
    }

    fn handle_auth_result(&mut self, auth: AuthenticationMessage<'_>) -> Result<Action> {
        match auth {
            AuthenticationMessage::Ok => {
                tracing::debug!("authentication succeeded");
                self.state = ConnectionState::WaitingReady;
                Ok(Action::ReadMessage)
            }
            other => Err(Error::Auth(format!(
                "unexpected authentication result: {}",
                other.method_name()
            ))),
        }
    }
}
