//! reactor.rs
//! Dedicated I/O thread running a current-thread tokio runtime.
//!
//! The runtime is kept alive by an outstanding shutdown signal (the work guard):
//! `block_on` only returns once `shutdown()` fires or drops it, never merely
//! because no I/O is pending. The drain thread sends on its own; this thread
//! drives socket readiness and timers, which `handle().block_on` relies on when
//! a send has to wait for the socket to become writable.

use log::{debug, error};
use std::{
    io,
    thread::{self, JoinHandle},
};
use tokio::{
    runtime::{Builder, Handle},
    sync::oneshot,
};

pub struct Reactor {
    handle: Handle,
    guard: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Reactor {
    pub fn spawn(name: &str) -> io::Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_io()
            .enable_time()
            .thread_name(name)
            .build()?;
        let handle = runtime.handle().clone();
        let (guard, released) = oneshot::channel::<()>();

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!("[Reactor] event loop running");
                runtime.block_on(async {
                    // Err = guard dropped without an explicit signal; both mean stop.
                    let _ = released.await;
                });
                debug!("[Reactor] event loop stopped");
            })?;

        Ok(Self {
            handle,
            guard: Some(guard),
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Releases the work guard and joins the I/O thread. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(guard) = self.guard.take() {
            let _ = guard.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("[Reactor] I/O thread panicked");
            }
        }
    }
}

impl Drop for Reactor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn stays_alive_without_pending_io_and_stops_on_shutdown() {
        let mut reactor = Reactor::spawn("reactor-test").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        // Timers are driven by the reactor thread, so this only completes if it is still running.
        let value = reactor.handle().block_on(async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            7
        });
        assert_eq!(value, 7);

        reactor.shutdown();
        reactor.shutdown();
    }
}
