//! UDP socket setup: built with socket2, then registered with the reactor.

use log::debug;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::{io, net::SocketAddr};
use tokio::{net::UdpSocket, runtime::Handle};

/// Opens a non-blocking datagram socket bound to `bind_addr` (port 0 = ephemeral)
/// and registers it with the reactor behind `handle`.
pub fn open_socket(
    bind_addr: SocketAddr,
    send_buffer_size: Option<usize>,
    handle: &Handle,
) -> io::Result<UdpSocket> {
    let socket = Socket::new(
        Domain::for_address(bind_addr),
        Type::DGRAM,
        Some(Protocol::UDP),
    )?;
    if let Some(size) = send_buffer_size {
        socket.set_send_buffer_size(size)?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&SockAddr::from(bind_addr))?;

    let std_socket: std::net::UdpSocket = socket.into();
    debug!("[Sender] socket bound to {:?}", std_socket.local_addr());

    let _enter = handle.enter();
    UdpSocket::from_std(std_socket)
}
