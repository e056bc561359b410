//! endpoint.rs
//! Hot-swappable destination shared between the control path and the drain thread.
//!
//! The slot holds either a complete `SocketAddr` or nothing. Updates replace the
//! whole value with an atomic pointer swap, so a reader can never observe a
//! half-written address/port pair.

use arc_swap::ArcSwapOption;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use crate::error::EndpointParseError;

#[derive(Default)]
pub struct EndpointSlot {
    current: ArcSwapOption<SocketAddr>,
}

impl EndpointSlot {
    pub fn new(initial: Option<SocketAddr>) -> Self {
        Self {
            current: ArcSwapOption::new(initial.map(Arc::new)),
        }
    }

    pub fn set(&self, addr: IpAddr, port: u16) {
        self.store(Some(SocketAddr::new(addr, port)));
    }

    pub fn store(&self, endpoint: Option<SocketAddr>) {
        self.current.store(endpoint.map(Arc::new));
    }

    pub fn clear(&self) {
        self.current.store(None);
    }

    /// Consistent snapshot of the current destination.
    #[inline]
    pub fn load(&self) -> Option<SocketAddr> {
        self.current.load().as_deref().copied()
    }
}

/// Parses a user-typed `"address:port"` string.
///
/// Splits on the last colon, so bare IPv6 literals (`::1:9000`) work; a
/// bracketed form (`[::1]:9000`) is accepted too. Surrounding whitespace is
/// ignored. The port must be plain decimal digits.
pub fn parse_endpoint(input: &str) -> Result<SocketAddr, EndpointParseError> {
    let input = input.trim();
    let (host, port) = input
        .rsplit_once(':')
        .ok_or(EndpointParseError::MalformedInput)?;

    if host.is_empty() {
        return Err(EndpointParseError::MalformedInput);
    }

    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    let addr: IpAddr = host.parse().map_err(|_| EndpointParseError::InvalidAddress)?;

    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EndpointParseError::InvalidPort);
    }
    let port: u16 = port.parse().map_err(|_| EndpointParseError::InvalidPort)?;

    Ok(SocketAddr::new(addr, port))
}
