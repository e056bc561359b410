//! Sender façade: owns the queue, endpoint slot, counters, drain thread and reactor.
//!
//! Lifecycle: `Created → Running → Stopped` (terminal).
//! - `start()` opens the socket and spawns the reactor + drain threads; calling it
//!   twice, or after `stop()`, is a contract violation and panics.
//! - `stop()` is idempotent and joins both threads before returning. `Drop` calls it.
//! - `try_send()` is the only entry point meant for the real-time callback.

pub mod drain;
pub mod endpoint;
pub mod queue;
pub mod reactor;
pub mod stats;
pub mod transport;

use crossbeam::utils::Backoff;
use log::{error, info, warn};
use parking_lot::Mutex;
use std::{
    net::{IpAddr, SocketAddr},
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc, OnceLock,
    },
    thread::{self, JoinHandle, Thread},
};

use crate::{
    bundle::Bundle,
    codec::encode::MAX_PACKET_SIZE,
    config::SenderConfig,
    error::{EndpointParseError, SendError},
};
use self::{
    drain::DrainLoop,
    endpoint::{parse_endpoint, EndpointSlot},
    queue::{BundleQueue, DEFAULT_QUEUE_CAPACITY},
    reactor::Reactor,
    stats::{SendStats, StatsSnapshot},
    transport::open_socket,
};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    Created = 0,
    Running = 1,
    Stopped = 2,
}

impl SenderState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SenderState::Created,
            1 => SenderState::Running,
            _ => SenderState::Stopped,
        }
    }
}

struct Workers {
    reactor: Reactor,
    drain: JoinHandle<()>,
}

pub struct OscSender {
    config: SenderConfig,
    queue: Arc<BundleQueue>,
    endpoint: Arc<EndpointSlot>,
    stats: Arc<SendStats>,
    state: Arc<AtomicU8>,
    // Set once by start(); read lock-free by producers to wake the drain thread.
    drain_thread: OnceLock<Thread>,
    workers: Mutex<Option<Workers>>,
}

impl OscSender {
    /// Sender with no destination: bundles are drained and discarded until one is set.
    pub fn new(config: SenderConfig) -> Self {
        Self::with_endpoint(config, None)
    }

    pub fn with_endpoint(mut config: SenderConfig, endpoint: Option<SocketAddr>) -> Self {
        if config.queue_capacity == 0 {
            warn!(
                "[Sender] queue capacity 0 is invalid, using {}",
                DEFAULT_QUEUE_CAPACITY
            );
            config.queue_capacity = DEFAULT_QUEUE_CAPACITY;
        }
        Self {
            queue: Arc::new(BundleQueue::new(config.queue_capacity)),
            endpoint: Arc::new(EndpointSlot::new(endpoint)),
            stats: Arc::new(SendStats::default()),
            state: Arc::new(AtomicU8::new(SenderState::Created as u8)),
            drain_thread: OnceLock::new(),
            workers: Mutex::new(None),
            config,
        }
    }

    pub fn start(&self) -> Result<(), SendError> {
        let mut workers = self.workers.lock();

        let claimed = self.state.compare_exchange(
            SenderState::Created as u8,
            SenderState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if let Err(current) = claimed {
            panic!(
                "OscSender::start() called while {:?}",
                SenderState::from_u8(current)
            );
        }

        match self.launch() {
            Ok(started) => {
                *workers = Some(started);
                info!(
                    "[Sender] started (queue capacity {}, bind {})",
                    self.queue.capacity(),
                    self.config.bind_addr
                );
                Ok(())
            }
            Err(err) => {
                self.revert_failed_start();
                error!("[Sender] failed to start: {}", err);
                Err(err)
            }
        }
    }

    // A concurrent stop() already made this sender terminal; keep it that way.
    fn revert_failed_start(&self) {
        let _ = self.state.compare_exchange(
            SenderState::Running as u8,
            SenderState::Created as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    fn launch(&self) -> Result<Workers, SendError> {
        let reactor = Reactor::spawn("osc-reactor")?;
        let socket = open_socket(
            self.config.bind_addr,
            self.config.send_buffer_size,
            reactor.handle(),
        )?;

        let drain = DrainLoop {
            queue: self.queue.clone(),
            endpoint: self.endpoint.clone(),
            stats: self.stats.clone(),
            state: self.state.clone(),
            socket,
            reactor: reactor.handle().clone(),
            idle_wait: self.config.idle_wait,
            send_timeout: self.config.send_timeout,
            buffer: Box::new([0u8; MAX_PACKET_SIZE]),
        };
        let drain = thread::Builder::new()
            .name("osc-drain".to_string())
            .spawn(move || drain.run())?;
        let _ = self.drain_thread.set(drain.thread().clone());

        Ok(Workers { reactor, drain })
    }

    /// Stops the drain loop, then the reactor, joining both. Bundles still queued are dropped.
    pub fn stop(&self) {
        let previous = SenderState::from_u8(
            self.state.swap(SenderState::Stopped as u8, Ordering::AcqRel),
        );
        if previous != SenderState::Running {
            return;
        }

        if let Some(mut workers) = self.workers.lock().take() {
            workers.drain.thread().unpark();
            if workers.drain.join().is_err() {
                error!("[Sender] drain thread panicked");
            }
            workers.reactor.shutdown();
        }
        info!("[Sender] stopped: {:?}", self.stats.snapshot());
    }

    /// Non-blocking enqueue, safe from the real-time callback.
    /// Returns `false` (and drops the bundle) when the queue is full or the sender is stopped.
    #[inline]
    pub fn try_send(&self, bundle: Bundle) -> bool {
        if self.state() == SenderState::Stopped {
            self.stats.record_dropped_full();
            return false;
        }
        match self.queue.try_push(bundle) {
            Ok(()) => {
                self.stats.record_enqueued();
                self.wake_drain();
                true
            }
            Err(_) => {
                self.stats.record_dropped_full();
                false
            }
        }
    }

    /// Retries until the queue accepts the bundle. Not for the real-time thread.
    /// Gives up (dropping the bundle) once the sender is stopped.
    pub fn send(&self, bundle: Bundle) {
        let backoff = Backoff::new();
        let mut bundle = bundle;
        loop {
            if self.state() == SenderState::Stopped {
                warn!("[Sender] send() on stopped sender, bundle dropped");
                self.stats.record_dropped_full();
                return;
            }
            match self.queue.try_push(bundle) {
                Ok(()) => {
                    self.stats.record_enqueued();
                    self.wake_drain();
                    return;
                }
                Err(rejected) => {
                    bundle = rejected;
                    self.wake_drain();
                    backoff.snooze();
                }
            }
        }
    }

    #[inline]
    fn wake_drain(&self) {
        if let Some(thread) = self.drain_thread.get() {
            thread.unpark();
        }
    }

    pub fn set_endpoint(&self, addr: IpAddr, port: u16) {
        self.endpoint.set(addr, port);
        info!("[Sender] endpoint set to {}", SocketAddr::new(addr, port));
    }

    pub fn clear_endpoint(&self) {
        self.endpoint.clear();
        info!("[Sender] endpoint cleared");
    }

    /// Applies a user-typed `"address:port"`; anything malformed clears the endpoint.
    pub fn set_endpoint_str(&self, input: &str) -> Result<SocketAddr, EndpointParseError> {
        match parse_endpoint(input) {
            Ok(addr) => {
                self.set_endpoint(addr.ip(), addr.port());
                Ok(addr)
            }
            Err(err) => {
                self.endpoint.clear();
                warn!("[Sender] endpoint {:?} rejected ({}), cleared", input, err);
                Err(err)
            }
        }
    }

    pub fn endpoint(&self) -> Option<SocketAddr> {
        self.endpoint.load()
    }

    pub fn state(&self) -> SenderState {
        SenderState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }
}

impl Default for OscSender {
    fn default() -> Self {
        Self::new(SenderConfig::default())
    }
}

impl Drop for OscSender {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{Message, Value};
    use std::{
        net::{Ipv4Addr, UdpSocket},
        time::{Duration, Instant},
    };

    fn small(capacity: usize) -> SenderConfig {
        SenderConfig::default()
            .with_queue_capacity(capacity)
            .with_bind_addr((Ipv4Addr::LOCALHOST, 0).into())
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    #[test]
    fn lifecycle_transitions() {
        let sender = OscSender::new(small(4));
        assert_eq!(sender.state(), SenderState::Created);
        sender.start().unwrap();
        assert_eq!(sender.state(), SenderState::Running);
        sender.stop();
        assert_eq!(sender.state(), SenderState::Stopped);
        sender.stop();
        assert_eq!(sender.state(), SenderState::Stopped);
    }

    #[test]
    #[should_panic(expected = "Running")]
    fn double_start_panics() {
        let sender = OscSender::new(small(4));
        sender.start().unwrap();
        let _ = sender.start();
    }

    #[test]
    #[should_panic(expected = "Stopped")]
    fn restart_after_stop_panics() {
        let sender = OscSender::new(small(4));
        sender.start().unwrap();
        sender.stop();
        let _ = sender.start();
    }

    #[test]
    fn try_send_reports_backpressure_when_not_draining() {
        let sender = OscSender::new(small(3));
        for _ in 0..3 {
            assert!(sender.try_send(Bundle::now()));
        }
        let start = Instant::now();
        assert!(!sender.try_send(Bundle::now()));
        assert!(!sender.try_send(Bundle::now()));
        assert!(start.elapsed() < Duration::from_millis(50));

        let stats = sender.stats();
        assert_eq!(stats.enqueued, 3);
        assert_eq!(stats.dropped_full, 2);
    }

    #[test]
    fn bundles_without_endpoint_are_discarded() {
        let sender = OscSender::new(small(16));
        sender.start().unwrap();
        for _ in 0..5 {
            assert!(sender.try_send(Bundle::now().message(Message::new("/x").arg(1))));
        }
        assert!(wait_until(|| sender.stats().discarded_no_endpoint == 5));
        assert_eq!(sender.stats().datagrams_sent, 0);
    }

    #[test]
    fn invalid_endpoint_string_clears_previous_endpoint() {
        let sender = OscSender::default();
        sender.set_endpoint_str("127.0.0.1:7500").unwrap();
        assert_eq!(sender.endpoint(), Some("127.0.0.1:7500".parse().unwrap()));

        assert_eq!(
            sender.set_endpoint_str("127.0.0.1:port"),
            Err(EndpointParseError::InvalidPort)
        );
        assert_eq!(sender.endpoint(), None);
    }

    #[test]
    fn send_gives_up_once_stopped() {
        let sender = OscSender::new(small(1));
        assert!(sender.try_send(Bundle::now()));
        sender.stop();
        sender.send(Bundle::now());
        assert_eq!(sender.stats().dropped_full, 1);
    }

    #[test]
    fn try_send_after_stop_is_rejected() {
        let sender = OscSender::new(small(4));
        sender.start().unwrap();
        sender.stop();

        assert!(!sender.try_send(Bundle::now()));
        assert_eq!(sender.queue_len(), 0);
        let stats = sender.stats();
        assert_eq!(stats.enqueued, 0);
        assert_eq!(stats.dropped_full, 1);
    }

    #[test]
    fn failed_start_reports_transport_failure_and_stays_startable() {
        // TEST-NET-1 address: never assigned to a local interface.
        let config = small(4).with_bind_addr("192.0.2.1:0".parse().unwrap());
        let sender = OscSender::new(config);

        let err = sender.start().unwrap_err();
        assert!(matches!(err, SendError::TransportFailure(_)));
        assert_eq!(sender.state(), SenderState::Created);
        assert!(sender.workers.lock().is_none());
    }

    #[test]
    fn failed_start_does_not_undo_a_concurrent_stop() {
        let sender = OscSender::new(small(4));
        sender.state.store(SenderState::Running as u8, Ordering::Release);
        sender.stop();

        sender.revert_failed_start();
        assert_eq!(sender.state(), SenderState::Stopped);
    }

    #[test]
    fn unencodable_bundle_does_not_stop_draining() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener.set_read_timeout(Some(Duration::from_secs(1))).unwrap();

        let sender = OscSender::with_endpoint(small(8), Some(listener.local_addr().unwrap()));
        sender.start().unwrap();

        let bad = Message::with_args("/bad", vec![Value::String("a\0b".to_string())]);
        assert!(sender.try_send(Bundle::now().message(bad)));
        assert!(sender.try_send(Bundle::now().message(Message::new("/good").arg(1))));

        let mut buf = [0u8; MAX_PACKET_SIZE];
        let (len, _) = listener.recv_from(&mut buf).expect("valid bundle never arrived");
        let packet = crate::codec::decode::decode_packet(&buf[..len]).unwrap();
        assert_eq!(packet.messages()[0].address, "/good");

        assert!(wait_until(|| sender.stats().datagrams_sent == 1));
        assert_eq!(sender.stats().encode_failures, 1);
        assert_eq!(sender.state(), SenderState::Running);
    }

    #[test]
    fn send_errors_are_counted_not_fatal() {
        // IPv6 destination on an IPv4 socket: every send fails at the OS.
        let sender = OscSender::with_endpoint(small(8), Some("[::1]:9".parse().unwrap()));
        sender.start().unwrap();

        assert!(sender.try_send(Bundle::now().message(Message::new("/lost").arg(1))));
        assert!(wait_until(|| sender.stats().transport_failures == 1));

        assert!(sender.try_send(Bundle::now().message(Message::new("/lost").arg(2))));
        assert!(wait_until(|| sender.stats().transport_failures == 2));
        assert_eq!(sender.stats().datagrams_sent, 0);
        assert_eq!(sender.state(), SenderState::Running);
    }

    #[test]
    fn stop_wakes_a_parked_drain_thread() {
        let config = small(4).with_idle_wait(Duration::from_secs(30));
        let sender = OscSender::new(config);
        sender.start().unwrap();
        // Let the drain thread exhaust its backoff and park.
        thread::sleep(Duration::from_millis(100));

        let started = Instant::now();
        sender.stop();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(sender.state(), SenderState::Stopped);
    }

    #[test]
    fn zero_capacity_falls_back_to_default() {
        let config: SenderConfig = serde_json::from_str(r#"{"queue_capacity": 0}"#).unwrap();
        let sender = OscSender::new(config);
        assert_eq!(sender.config().queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert!(sender.try_send(Bundle::now()));
    }

    #[test]
    fn drop_joins_running_threads() {
        let sender = OscSender::new(small(8));
        sender.start().unwrap();
        sender.try_send(Bundle::now());
        drop(sender);
    }
}
