//! encode.rs
//! Renders a `Bundle` as one OSC 1.0 bundle packet into a caller-owned buffer.
//!
//! Layout:
//!   "#bundle\0" | timetag (8, BE) | { size (i32 BE) | message }*
//!   message = address (NUL, pad 4) | ",tags" (NUL, pad 4) | args
//!
//! Every write is checked against the buffer length; on overflow the encoder
//! returns `BufferTooSmall` and nothing is written past the end. The buffer
//! content is unspecified after an error and must not be transmitted.

use crate::{
    bundle::{Bundle, Message, Value},
    codec::{padded_str_len, timetag::Timetag},
    error::EncodingError,
};

/// Largest datagram the sender will emit.
pub const MAX_PACKET_SIZE: usize = 8192;

pub const BUNDLE_TAG: &[u8; 8] = b"#bundle\0";

/// Encodes `bundle` into `buffer` and returns the number of bytes written.
pub fn encode(buffer: &mut [u8], bundle: &Bundle) -> Result<usize, EncodingError> {
    let mut w = PacketWriter::new(buffer);
    w.put_bytes(BUNDLE_TAG)?;
    w.put_bytes(&Timetag::from_system_time(bundle.time).to_be_bytes())?;

    for (index, message) in bundle.messages.iter().enumerate() {
        validate(index, message)?;

        let size_at = w.reserve(4)?;
        let start = w.pos;
        write_message(&mut w, message)?;
        let size = (w.pos - start) as i32;
        w.patch(size_at, &size.to_be_bytes());
    }

    Ok(w.pos)
}

/// Exact encoded size of `bundle`, without touching a buffer.
pub fn encoded_len(bundle: &Bundle) -> usize {
    16 + bundle
        .messages
        .iter()
        .map(|m| 4 + message_len(m))
        .sum::<usize>()
}

fn message_len(message: &Message) -> usize {
    let args: usize = message
        .args
        .iter()
        .map(|v| match v {
            Value::Float(_) | Value::Int(_) => 4,
            Value::String(s) => padded_str_len(s.len()),
        })
        .sum();
    padded_str_len(message.address.len()) + padded_str_len(1 + message.args.len()) + args
}

// OSC strings are NUL-terminated, so an interior NUL cannot be represented.
fn validate(index: usize, message: &Message) -> Result<(), EncodingError> {
    if message.address.as_bytes().contains(&0) {
        return Err(EncodingError::UnsupportedType {
            message: index,
            reason: "address contains NUL",
        });
    }
    for value in &message.args {
        if let Value::String(s) = value {
            if s.as_bytes().contains(&0) {
                return Err(EncodingError::UnsupportedType {
                    message: index,
                    reason: "string argument contains NUL",
                });
            }
        }
    }
    Ok(())
}

fn write_message(w: &mut PacketWriter<'_>, message: &Message) -> Result<(), EncodingError> {
    w.put_str(message.address.as_bytes())?;

    // Type tag string: ',' + one tag per argument, padded like any string.
    let tags_len = padded_str_len(1 + message.args.len());
    let at = w.reserve(tags_len)?;
    w.buf[at] = b',';
    for (i, value) in message.args.iter().enumerate() {
        w.buf[at + 1 + i] = value.tag();
    }
    w.buf[at + 1 + message.args.len()..at + tags_len].fill(0);

    for value in &message.args {
        match value {
            Value::Float(f) => w.put_bytes(&f.to_be_bytes())?,
            Value::Int(i) => w.put_bytes(&i.to_be_bytes())?,
            Value::String(s) => w.put_str(s.as_bytes())?,
        }
    }
    Ok(())
}

/// Cursor over a fixed slice; refuses any write that would cross its end.
struct PacketWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> PacketWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Claims `len` bytes and returns their offset.
    #[inline]
    fn reserve(&mut self, len: usize) -> Result<usize, EncodingError> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.buf.len());
        match end {
            Some(end) => {
                let at = self.pos;
                self.pos = end;
                Ok(at)
            }
            None => Err(EncodingError::BufferTooSmall {
                capacity: self.buf.len(),
            }),
        }
    }

    #[inline]
    fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodingError> {
        let at = self.reserve(bytes.len())?;
        self.buf[at..at + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn put_str(&mut self, bytes: &[u8]) -> Result<(), EncodingError> {
        let len = padded_str_len(bytes.len());
        let at = self.reserve(len)?;
        self.buf[at..at + bytes.len()].copy_from_slice(bytes);
        self.buf[at + bytes.len()..at + len].fill(0);
        Ok(())
    }

    fn patch(&mut self, at: usize, bytes: &[u8; 4]) {
        self.buf[at..at + 4].copy_from_slice(bytes);
    }
}
