//! In-memory transport replaying scripted backend frames.

#![allow(dead_code)]

use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex};

use pgwire_session::Opts;
use pgwire_session::sync::Session;

/// Transport that serves scripted backend bytes and records what the
/// client writes.
pub struct ScriptedStream {
    input: Cursor<Vec<u8>>,
    written: Written,
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Shared view of the bytes written by the client.
#[derive(Clone, Default)]
pub struct Written(Arc<Mutex<Vec<u8>>>);

impl Written {
    pub fn bytes(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    /// Tagged frontend messages written so far.
    pub fn messages(&self) -> Vec<(u8, Vec<u8>)> {
        tagged_frames(&self.bytes())
    }

    /// Type bytes of the tagged frontend messages written so far.
    pub fn tags(&self) -> String {
        self.messages()
            .iter()
            .map(|(tag, _)| char::from(*tag))
            .collect()
    }
}

/// Split a byte stream of tagged frames.
pub fn tagged_frames(mut bytes: &[u8]) -> Vec<(u8, Vec<u8>)> {
    let mut frames = Vec::new();
    while !bytes.is_empty() {
        let tag = bytes[0];
        let len = i32::from_be_bytes(bytes[1..5].try_into().unwrap()) as usize;
        frames.push((tag, bytes[5..1 + len].to_vec()));
        bytes = &bytes[1 + len..];
    }
    frames
}

/// Builder of backend frames.
#[derive(Default)]
pub struct Script {
    bytes: Vec<u8>,
}

fn cstr(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(mut self, tag: u8, body: &[u8]) -> Self {
        self.bytes.push(tag);
        self.bytes
            .extend_from_slice(&(body.len() as i32 + 4).to_be_bytes());
        self.bytes.extend_from_slice(body);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Append another script.
    pub fn then(self, next: Script) -> Self {
        self.raw(&next.bytes)
    }

    pub fn auth(self, code: i32, extra: &[u8]) -> Self {
        let mut body = code.to_be_bytes().to_vec();
        body.extend_from_slice(extra);
        self.frame(b'R', &body)
    }

    pub fn auth_ok(self) -> Self {
        self.auth(0, &[])
    }

    pub fn backend_key(self, pid: u32, secret: u32) -> Self {
        let mut body = pid.to_be_bytes().to_vec();
        body.extend_from_slice(&secret.to_be_bytes());
        self.frame(b'K', &body)
    }

    pub fn parameter_status(self, name: &str, value: &str) -> Self {
        let mut body = Vec::new();
        cstr(&mut body, name);
        cstr(&mut body, value);
        self.frame(b'S', &body)
    }

    pub fn ready(self, status: u8) -> Self {
        self.frame(b'Z', &[status])
    }

    /// AuthenticationOk, server_version, BackendKeyData(42, 7), idle.
    pub fn startup(self) -> Self {
        self.auth_ok()
            .parameter_status("server_version", "16.2")
            .backend_key(42, 7)
            .ready(b'I')
    }

    /// Text-format columns of the given types.
    pub fn row_description(self, columns: &[(&str, u32)]) -> Self {
        let mut body = (columns.len() as i16).to_be_bytes().to_vec();
        for (name, oid) in columns {
            cstr(&mut body, name);
            body.extend_from_slice(&0u32.to_be_bytes());
            body.extend_from_slice(&0i16.to_be_bytes());
            body.extend_from_slice(&oid.to_be_bytes());
            body.extend_from_slice(&(-1i16).to_be_bytes());
            body.extend_from_slice(&(-1i32).to_be_bytes());
            body.extend_from_slice(&0i16.to_be_bytes());
        }
        self.frame(b'T', &body)
    }

    pub fn data_row(self, values: &[Option<&str>]) -> Self {
        let mut body = (values.len() as i16).to_be_bytes().to_vec();
        for value in values {
            match value {
                Some(v) => {
                    body.extend_from_slice(&(v.len() as i32).to_be_bytes());
                    body.extend_from_slice(v.as_bytes());
                }
                None => body.extend_from_slice(&(-1i32).to_be_bytes()),
            }
        }
        self.frame(b'D', &body)
    }

    pub fn command_complete(self, tag: &str) -> Self {
        let mut body = Vec::new();
        cstr(&mut body, tag);
        self.frame(b'C', &body)
    }

    fn fields(fields: &[(u8, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (field, value) in fields {
            body.push(*field);
            cstr(&mut body, value);
        }
        body.push(0);
        body
    }

    pub fn error(self, fields: &[(u8, &str)]) -> Self {
        self.frame(b'E', &Self::fields(fields))
    }

    pub fn notice(self, fields: &[(u8, &str)]) -> Self {
        self.frame(b'N', &Self::fields(fields))
    }

    pub fn notification(self, pid: u32, channel: &str, payload: &str) -> Self {
        let mut body = pid.to_be_bytes().to_vec();
        cstr(&mut body, channel);
        cstr(&mut body, payload);
        self.frame(b'A', &body)
    }

    pub fn parse_complete(self) -> Self {
        self.frame(b'1', &[])
    }

    pub fn bind_complete(self) -> Self {
        self.frame(b'2', &[])
    }

    pub fn close_complete(self) -> Self {
        self.frame(b'3', &[])
    }

    pub fn no_data(self) -> Self {
        self.frame(b'n', &[])
    }

    pub fn empty_query(self) -> Self {
        self.frame(b'I', &[])
    }

    pub fn portal_suspended(self) -> Self {
        self.frame(b's', &[])
    }

    pub fn parameter_description(self, oids: &[u32]) -> Self {
        let mut body = (oids.len() as i16).to_be_bytes().to_vec();
        for oid in oids {
            body.extend_from_slice(&oid.to_be_bytes());
        }
        self.frame(b't', &body)
    }

    fn copy_response(self, tag: u8, columns: i16) -> Self {
        let mut body = vec![0];
        body.extend_from_slice(&columns.to_be_bytes());
        for _ in 0..columns {
            body.extend_from_slice(&0i16.to_be_bytes());
        }
        self.frame(tag, &body)
    }

    pub fn copy_in_response(self, columns: i16) -> Self {
        self.copy_response(b'G', columns)
    }

    pub fn copy_out_response(self, columns: i16) -> Self {
        self.copy_response(b'H', columns)
    }

    pub fn copy_data(self, data: &[u8]) -> Self {
        self.frame(b'd', data)
    }

    pub fn copy_done(self) -> Self {
        self.frame(b'c', &[])
    }

    pub fn negotiate_protocol_version(self, minor: i32, options: &[&str]) -> Self {
        let mut body = minor.to_be_bytes().to_vec();
        body.extend_from_slice(&(options.len() as i32).to_be_bytes());
        for option in options {
            cstr(&mut body, option);
        }
        self.frame(b'v', &body)
    }

    pub fn into_stream(self) -> (ScriptedStream, Written) {
        let written = Written::default();
        let stream = ScriptedStream {
            input: Cursor::new(self.bytes),
            written: written.clone(),
        };
        (stream, written)
    }
}

pub fn opts() -> Opts {
    Opts {
        user: "alice".into(),
        database: Some("app".into()),
        password: Some("secret".into()),
        ..Opts::default()
    }
}

/// Connected session whose script continues with `after_startup`.
///
/// The recorded bytes are cleared once the handshake is done.
pub fn session(after_startup: Script) -> (Session<ScriptedStream>, Written) {
    let (stream, written) = Script::new().startup().then(after_startup).into_stream();
    let session = Session::connect(stream, opts()).unwrap();
    written.clear();
    (session, written)
}
