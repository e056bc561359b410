//! # osc_sender
//! Non-blocking OSC-over-UDP sender for real-time producers.
//!
//! A real-time callback builds a [`Bundle`] and hands it to [`OscSender::try_send`];
//! a drain thread encodes it into a reusable 8 KiB buffer and a reactor thread
//! performs the datagram I/O.
//!
//! ## Key Architecture
//! - **codec:** NTP64 time tags + OSC 1.0 bundle encoder/decoder (big-endian, 4-byte padded).
//! - **sender::queue:** fixed-capacity lock-free queue (producer never blocks).
//! - **sender::endpoint:** atomically swapped destination, writable from any thread.
//! - **sender::drain / sender::reactor:** queue-to-socket pump + tokio I/O driver.

pub mod bundle;
pub mod codec;
pub mod config;
pub mod error;
pub mod sender;

pub use bundle::{Bundle, Message, Value};
pub use codec::{
    decode::{decode_packet, Packet},
    encode::{encode, MAX_PACKET_SIZE},
    timetag::Timetag,
};
pub use config::SenderConfig;
pub use error::{DecodeError, EncodingError, EndpointParseError, SendError};
pub use sender::{
    endpoint::parse_endpoint,
    stats::StatsSnapshot,
    OscSender, SenderState,
};
