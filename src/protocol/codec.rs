//! PostgreSQL wire protocol encoding and decoding primitives.
//!
//! PostgreSQL uses big-endian (network byte order) for all integers.
//! Readers take a slice and return `(value, rest)`; every read is
//! bounds-checked and reports a protocol error instead of panicking.

use crate::error::{Error, Result};
use zerocopy::FromBytes;

use super::types::{I16BE, I32BE, U16BE, U32BE};

/// Read 1-byte unsigned integer.
#[inline]
pub fn read_u8(data: &[u8]) -> Result<(u8, &[u8])> {
    match data.split_first() {
        Some((&b, rest)) => Ok((b, rest)),
        None => Err(Error::Protocol("read_u8: empty buffer".into())),
    }
}

/// Read 2-byte big-endian signed integer.
#[inline]
pub fn read_i16(data: &[u8]) -> Result<(i16, &[u8])> {
    let (value, rest) = I16BE::read_from_prefix(data)
        .map_err(|_| Error::Protocol(format!("read_i16: buffer too short: {} < 2", data.len())))?;
    Ok((value.get(), rest))
}

/// Read 2-byte big-endian unsigned integer.
#[inline]
pub fn read_u16(data: &[u8]) -> Result<(u16, &[u8])> {
    let (value, rest) = U16BE::read_from_prefix(data)
        .map_err(|_| Error::Protocol(format!("read_u16: buffer too short: {} < 2", data.len())))?;
    Ok((value.get(), rest))
}

/// Read 4-byte big-endian signed integer.
#[inline]
pub fn read_i32(data: &[u8]) -> Result<(i32, &[u8])> {
    let (value, rest) = I32BE::read_from_prefix(data)
        .map_err(|_| Error::Protocol(format!("read_i32: buffer too short: {} < 4", data.len())))?;
    Ok((value.get(), rest))
}

/// Read 4-byte big-endian unsigned integer.
#[inline]
pub fn read_u32(data: &[u8]) -> Result<(u32, &[u8])> {
    let (value, rest) = U32BE::read_from_prefix(data)
        .map_err(|_| Error::Protocol(format!("read_u32: buffer too short: {} < 4", data.len())))?;
    Ok((value.get(), rest))
}

/// Read fixed-length bytes.
#[inline]
pub fn read_bytes(data: &[u8], len: usize) -> Result<(&[u8], &[u8])> {
    if data.len() < len {
        return Err(Error::Protocol(format!(
            "read_bytes: buffer too short: {} < {}",
            data.len(),
            len
        )));
    }
    Ok(data.split_at(len))
}

/// Read an i32-length-prefixed byte string. Length -1 is SQL NULL.
#[inline]
pub fn read_nullable_bytes(data: &[u8]) -> Result<(Option<&[u8]>, &[u8])> {
    let (len, rest) = read_i32(data)?;
    if len == -1 {
        return Ok((None, rest));
    }
    let len = usize::try_from(len)
        .map_err(|_| Error::Protocol(format!("invalid value length: {}", len)))?;
    let (bytes, rest) = read_bytes(rest, len)?;
    Ok((Some(bytes), rest))
}

/// Read null-terminated string (PostgreSQL String type).
/// Returns the string bytes (without the null terminator) and remaining data.
#[inline]
pub fn read_cstring(data: &[u8]) -> Result<(&[u8], &[u8])> {
    match memchr::memchr(0, data) {
        Some(pos) => Ok((&data[..pos], &data[pos + 1..])),
        None => Err(Error::Protocol(
            "read_cstring: no null terminator found".into(),
        )),
    }
}

/// Read null-terminated string as &str.
#[inline]
pub fn read_cstr(data: &[u8]) -> Result<(&str, &[u8])> {
    let (bytes, rest) = read_cstring(data)?;
    let s = simdutf8::compat::from_utf8(bytes)
        .map_err(|e| Error::Protocol(format!("read_cstr: invalid UTF-8: {e}")))?;
    Ok((s, rest))
}

/// Write 1-byte unsigned integer.
#[inline]
pub fn write_u8(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

/// Write 2-byte big-endian signed integer.
#[inline]
pub fn write_i16(out: &mut Vec<u8>, value: i16) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Write 2-byte big-endian unsigned integer.
#[inline]
pub fn write_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Write 4-byte big-endian signed integer.
#[inline]
pub fn write_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Write 4-byte big-endian unsigned integer.
#[inline]
pub fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Write raw bytes.
#[inline]
pub fn write_bytes(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(data);
}

/// Write null-terminated string (PostgreSQL String type).
///
/// Fails if `s` contains an interior NUL, since the receiver would
/// truncate the string at that byte.
#[inline]
pub fn write_cstring(out: &mut Vec<u8>, s: &[u8]) -> Result<()> {
    if let Some(pos) = memchr::memchr(0, s) {
        return Err(Error::Encode(format!(
            "string contains NUL byte at offset {}",
            pos
        )));
    }
    out.extend_from_slice(s);
    out.push(0);
    Ok(())
}

/// Write null-terminated string from &str.
#[inline]
pub fn write_cstr(out: &mut Vec<u8>, s: &str) -> Result<()> {
    write_cstring(out, s.as_bytes())
}

/// Write an i32 length, failing if it does not fit.
#[inline]
pub fn write_len(out: &mut Vec<u8>, len: usize) -> Result<()> {
    let len = i32::try_from(len)
        .map_err(|_| Error::Encode(format!("length {} exceeds i32::MAX", len)))?;
    write_i32(out, len);
    Ok(())
}

/// Write an i16 count, failing if it does not fit.
#[inline]
pub fn write_count(out: &mut Vec<u8>, count: usize) -> Result<()> {
    let count = i16::try_from(count)
        .map_err(|_| Error::Encode(format!("count {} exceeds i16::MAX", count)))?;
    write_i16(out, count);
    Ok(())
}

/// Message builder helper that handles the length field.
///
/// PostgreSQL message format:
/// - Type byte (1 byte) - NOT included in length
/// - Length (4 bytes) - includes itself
/// - Payload (Length - 4 bytes)
///
/// A builder that is dropped without [`finish`](Self::finish) removes
/// everything it wrote, so a failed encode never leaves a partial frame
/// in the output buffer.
pub struct MessageBuilder<'a> {
    buf: &'a mut Vec<u8>,
    frame_start: usize,
    len_pos: usize,
    finished: bool,
}

impl<'a> MessageBuilder<'a> {
    /// Start building a message with a type byte.
    pub fn new(buf: &'a mut Vec<u8>, type_byte: u8) -> Self {
        let frame_start = buf.len();
        buf.push(type_byte);
        let len_pos = buf.len();
        buf.extend_from_slice(&[0, 0, 0, 0]);
        Self {
            buf,
            frame_start,
            len_pos,
            finished: false,
        }
    }

    /// Start building an untagged message (Startup, CancelRequest, SSLRequest).
    pub fn new_untagged(buf: &'a mut Vec<u8>) -> Self {
        let frame_start = buf.len();
        buf.extend_from_slice(&[0, 0, 0, 0]);
        Self {
            buf,
            frame_start,
            len_pos: frame_start,
            finished: false,
        }
    }

    /// Get mutable access to the underlying buffer.
    pub fn buf(&mut self) -> &mut Vec<u8> {
        self.buf
    }

    /// Write a u8.
    pub fn write_u8(&mut self, value: u8) {
        write_u8(self.buf, value);
    }

    /// Write an i16.
    pub fn write_i16(&mut self, value: i16) {
        write_i16(self.buf, value);
    }

    /// Write a u16.
    pub fn write_u16(&mut self, value: u16) {
        write_u16(self.buf, value);
    }

    /// Write an i32.
    pub fn write_i32(&mut self, value: i32) {
        write_i32(self.buf, value);
    }

    /// Write a u32.
    pub fn write_u32(&mut self, value: u32) {
        write_u32(self.buf, value);
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, data: &[u8]) {
        write_bytes(self.buf, data);
    }

    /// Write null-terminated string.
    pub fn write_cstr(&mut self, s: &str) -> Result<()> {
        write_cstr(self.buf, s)
    }

    /// Write an i16 element count.
    pub fn write_count(&mut self, count: usize) -> Result<()> {
        write_count(self.buf, count)
    }

    /// Finish building the message and fill in the length field.
    pub fn finish(mut self) -> Result<()> {
        let len = i32::try_from(self.buf.len() - self.len_pos)
            .map_err(|_| Error::Encode("message exceeds i32::MAX bytes".into()))?;
        self.buf[self.len_pos..self.len_pos + 4].copy_from_slice(&len.to_be_bytes());
        self.finished = true;
        Ok(())
    }
}

impl Drop for MessageBuilder<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.buf.truncate(self.frame_start);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_short_buffers() {
        assert!(read_u8(&[]).is_err());
        assert!(read_i16(&[1]).is_err());
        assert!(read_i32(&[1, 2, 3]).is_err());
        assert!(read_bytes(&[1, 2], 3).is_err());
        assert!(read_cstr(b"abc").is_err());
    }

    #[test]
    fn test_read_values() {
        let data = [0xff, 0xfe, 0, 0, 0, 7, b'h', b'i', 0, 9];
        let (a, rest) = read_i16(&data).unwrap();
        assert_eq!(a, -2);
        let (b, rest) = read_u32(rest).unwrap();
        assert_eq!(b, 7);
        let (s, rest) = read_cstr(rest).unwrap();
        assert_eq!(s, "hi");
        assert_eq!(rest, &[9]);
    }

    #[test]
    fn test_read_nullable_bytes() {
        let (v, rest) = read_nullable_bytes(&[0xff, 0xff, 0xff, 0xff, 1]).unwrap();
        assert_eq!(v, None);
        assert_eq!(rest, &[1]);

        let (v, rest) = read_nullable_bytes(&[0, 0, 0, 2, b'o', b'k']).unwrap();
        assert_eq!(v, Some(&b"ok"[..]));
        assert!(rest.is_empty());

        assert!(read_nullable_bytes(&[0, 0, 0, 5, b'x']).is_err());
        assert!(read_nullable_bytes(&[0xff, 0xff, 0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_builder_fills_length() {
        let mut buf = Vec::new();
        let mut msg = MessageBuilder::new(&mut buf, b'Q');
        msg.write_cstr("SELECT 1").unwrap();
        msg.finish().unwrap();
        assert_eq!(buf[0], b'Q');
        assert_eq!(&buf[1..5], &13_i32.to_be_bytes());
        assert_eq!(&buf[5..], b"SELECT 1\0");
    }

    #[test]
    fn test_untagged_length_includes_itself() {
        let mut buf = vec![0xaa];
        let mut msg = MessageBuilder::new_untagged(&mut buf);
        msg.write_i32(196608);
        msg.finish().unwrap();
        assert_eq!(buf, [0xaa, 0, 0, 0, 8, 0, 3, 0, 0]);
    }

    #[test]
    fn test_unfinished_builder_rolls_back() {
        let mut buf = b"prior".to_vec();
        {
            let mut msg = MessageBuilder::new(&mut buf, b'P');
            msg.write_cstr("name").unwrap();
            assert!(msg.write_cstr("bad\0query").is_err());
        }
        assert_eq!(buf, b"prior");
    }

    #[test]
    fn test_count_overflow() {
        let mut buf = Vec::new();
        assert!(write_count(&mut buf, 40_000).is_err());
        assert!(buf.is_empty());
    }
}
