//! OSC listener: binds a UDP port and prints every decoded packet.
//!
//! Usage: `osc_dump [bind_addr]` (default `127.0.0.1:7500`).
//! Handy as the receiving end of `cv_to_osc`.

use osc_sender::{decode_packet, Packet, Timetag, MAX_PACKET_SIZE};

use log::{error, info, warn};
use std::{env, net::SocketAddr, time::SystemTime};
use tokio::net::UdpSocket;

const DEFAULT_BIND: &str = "127.0.0.1:7500";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let bind = env::args().nth(1).unwrap_or_else(|| DEFAULT_BIND.to_string());
    let bind: SocketAddr = match bind.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("invalid bind address {:?}: {}", bind, e);
            return;
        }
    };

    let socket = match UdpSocket::bind(bind).await {
        Ok(socket) => socket,
        Err(e) => {
            error!("bind {} failed: {}", bind, e);
            return;
        }
    };
    info!("listening on {}", bind);

    let mut buf = vec![0u8; MAX_PACKET_SIZE];
    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, from)) => match decode_packet(&buf[..len]) {
                    Ok(packet) => print_packet(from, &packet),
                    Err(e) => warn!("{} sent {} undecodable bytes: {}", from, len, e),
                },
                Err(e) => warn!("recv failed: {}", e),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, exiting");
                return;
            }
        }
    }
}

fn print_packet(from: SocketAddr, packet: &Packet) {
    if let Packet::Bundle { timetag, .. } = packet {
        println!("{} bundle, {}", from, describe_latency(*timetag));
    }
    for message in packet.messages() {
        println!("  {} {:?}", message.address, message.args);
    }
}

fn describe_latency(timetag: Timetag) -> String {
    if timetag == Timetag::IMMEDIATE {
        return "immediate".to_string();
    }
    match SystemTime::now().duration_since(timetag.to_system_time()) {
        Ok(age) => format!("age {} µs", age.as_micros()),
        Err(e) => format!("{} µs in the future", e.duration().as_micros()),
    }
}
