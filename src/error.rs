//! Error kinds for encoding, endpoint parsing, transport and decoding.
//!
//! Encoding and endpoint errors are always recovered locally: the affected
//! bundle or endpoint update is discarded and logged. Transport errors only
//! reach logs and counters. None of them ever reach the real-time producer.

use std::io;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// Message `message` holds something OSC cannot represent.
    #[error("message {message}: unsupported value ({reason})")]
    UnsupportedType { message: usize, reason: &'static str },

    /// Bundle does not fit in the destination buffer.
    #[error("encoded bundle exceeds buffer capacity of {capacity} bytes")]
    BufferTooSmall { capacity: usize },
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EndpointParseError {
    #[error("endpoint must look like \"address:port\"")]
    MalformedInput,
    #[error("address is not an IPv4 or IPv6 literal")]
    InvalidAddress,
    #[error("port must be a decimal number in 0..=65535")]
    InvalidPort,
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("transport failure: {0}")]
    TransportFailure(#[from] io::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("packet truncated at offset {offset}")]
    Truncated { offset: usize },
    #[error("packet is neither a message nor a #bundle")]
    UnknownPacket,
    #[error("type tag string must start with ','")]
    MissingTypeTags,
    #[error("unsupported type tag '{0}'")]
    UnsupportedTag(char),
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    #[error("bundle element size {size} is invalid")]
    BadElementSize { size: i32 },
}
