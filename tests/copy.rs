//! COPY sub-protocol against a scripted server.

mod common;

use std::io::{self, Read};

use common::{Script, session};
use pgwire_session::Error;
use pgwire_session::sync::SessionPhase;

#[test]
fn test_copy_out_to_writer() {
    let (mut session, written) = session(
        Script::new()
            .copy_out_response(2)
            .copy_data(b"1\tann\n")
            .copy_data(b"2\tbob\n")
            .copy_done()
            .command_complete("COPY 2")
            .ready(b'I'),
    );

    let mut out = Vec::new();
    let rows = session.copy_out("COPY users TO STDOUT", &mut out).unwrap();
    assert_eq!(rows, 2);
    assert_eq!(out, b"1\tann\n2\tbob\n");
    assert_eq!(written.tags(), "Q");
    assert_eq!(session.phase(), SessionPhase::Ready);
}

#[test]
fn test_copy_in_from_reader() {
    let (mut session, written) = session(
        Script::new()
            .copy_in_response(2)
            .command_complete("COPY 2")
            .ready(b'I'),
    );

    let mut data: &[u8] = b"1\tann\n2\tbob\n";
    let rows = session.copy_in("COPY users FROM STDIN", &mut data).unwrap();
    assert_eq!(rows, 2);

    let messages = written.messages();
    assert_eq!(written.tags(), "Qdc");
    assert_eq!(messages[1].1, b"1\tann\n2\tbob\n");
}

struct FailingReader {
    served: bool,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.served {
            return Err(io::Error::other("disk read failed"));
        }
        self.served = true;
        buf[..4].copy_from_slice(b"1\t2\n");
        Ok(4)
    }
}

#[test]
fn test_copy_in_reader_error_sends_copy_fail() {
    let (mut session, written) = session(
        Script::new()
            .copy_in_response(2)
            .error(&[(b'S', "ERROR"), (b'C', "57014"), (b'M', "COPY from stdin failed")])
            .ready(b'I'),
    );

    let mut reader = FailingReader { served: false };
    let err = session.copy_in("COPY t FROM STDIN", &mut reader).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(written.tags(), "Qdf");
    assert_eq!(session.phase(), SessionPhase::Ready);
}

#[test]
fn test_copy_out_server_error() {
    let (mut session, _written) = session(
        Script::new()
            .error(&[(b'S', "ERROR"), (b'C', "42P01"), (b'M', "relation \"nope\" does not exist")])
            .ready(b'I'),
    );
    let mut out = Vec::new();
    let err = session.copy_out("COPY nope TO STDOUT", &mut out).unwrap_err();
    assert_eq!(err.sqlstate(), Some("42P01"));
    assert!(out.is_empty());
    assert_eq!(session.phase(), SessionPhase::Ready);
}
