//! drain.rs
//! Queue-to-socket pump running on its own thread.
//!
//! Each iteration: pop one bundle → snapshot the endpoint → encode into the
//! reusable buffer → submit the datagram. Idle iterations back off and then
//! park until `try_send` unparks the thread or `idle_wait` elapses, so the
//! stop flag is observed within one iteration without pinning a core.
//!
//! Failures are logged and counted, never retried, never surfaced to producers.

use crossbeam::utils::Backoff;
use log::{debug, error, warn};
use std::{
    io,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};
use tokio::{net::UdpSocket, runtime::Handle};

use crate::{
    bundle::Bundle,
    codec::encode::{encode, MAX_PACKET_SIZE},
    error::{EncodingError, SendError},
    sender::{endpoint::EndpointSlot, queue::BundleQueue, stats::SendStats, SenderState},
};

pub struct DrainLoop {
    pub queue: Arc<BundleQueue>,
    pub endpoint: Arc<EndpointSlot>,
    pub stats: Arc<SendStats>,
    pub state: Arc<AtomicU8>,
    pub socket: UdpSocket,
    pub reactor: Handle,
    pub idle_wait: Duration,
    pub send_timeout: Duration,
    // Only this thread touches it, so it is reused for every bundle.
    pub buffer: Box<[u8; MAX_PACKET_SIZE]>,
}

impl DrainLoop {
    pub fn run(mut self) {
        let backoff = Backoff::new();

        while self.state.load(Ordering::Acquire) == SenderState::Running as u8 {
            match self.queue.pop() {
                Some(bundle) => {
                    backoff.reset();
                    self.dispatch(bundle);
                }
                None if backoff.is_completed() => thread::park_timeout(self.idle_wait),
                None => backoff.snooze(),
            }
        }

        let abandoned = self.queue.len();
        if abandoned > 0 {
            debug!("[Drain] stopping with {} bundles still queued", abandoned);
        }
        debug!("[Drain] exited");
    }

    fn dispatch(&mut self, bundle: Bundle) {
        let Some(dest) = self.endpoint.load() else {
            self.stats.record_no_endpoint();
            return;
        };

        let size = match encode(&mut self.buffer[..], &bundle) {
            Ok(size) => size,
            Err(err) => {
                self.stats.record_encode_failure();
                match err {
                    EncodingError::BufferTooSmall { .. } => {
                        warn!("[Drain] dropping bundle: {}", err);
                    }
                    EncodingError::UnsupportedType { .. } => {
                        error!("[Drain] dropping bundle: {}", err);
                    }
                }
                return;
            }
        };

        match self.transmit(size, dest) {
            Ok(()) => self.stats.record_sent(size),
            Err(err) => {
                self.stats.record_transport_failure();
                debug!("[Drain] error sending to {}: {}", dest, err);
            }
        }
    }

    /// Tries the non-blocking send first; if the socket is not writable yet,
    /// waits for readiness through the reactor, bounded by `send_timeout`.
    fn transmit(&self, size: usize, dest: SocketAddr) -> Result<(), SendError> {
        let datagram = &self.buffer[..size];
        match self.socket.try_send_to(datagram, dest) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                // The timer must be created inside the runtime context.
                let pending = async {
                    tokio::time::timeout(self.send_timeout, self.socket.send_to(datagram, dest))
                        .await
                };
                match self.reactor.block_on(pending) {
                    Ok(sent) => sent.map(|_| ()).map_err(SendError::from),
                    Err(_) => Err(SendError::TransportFailure(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "socket not writable before send timeout",
                    ))),
                }
            }
            Err(err) => Err(err.into()),
        }
    }
}
