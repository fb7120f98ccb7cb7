//! Single-threaded, readiness-driven server.
//!
//! One thread owns the poller, the listening socket and every connection.
//! The only other thread involved is the [`DelayScheduler`]'s timer thread,
//! and it never touches a connection: when a delay expires it queues the
//! connection's token and wakes the poller. The loop thread drains that
//! queue after each readiness batch and applies the transition itself, so
//! phase, attached response and registered interest only ever change on
//! one thread and are never observed half-updated.

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token, Waker};
use tracing::{debug, info, trace, warn};

use super::connection::{Connection, Directive, Ready};
use super::registry::{Registry, LISTENER, WAKER};
use super::scheduler::DelayScheduler;
use crate::config::Config;
use crate::http::response::ResponseProvider;

/// Stops a running [`EventLoop`] from any thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    /// Asks the loop to return once it finishes the current batch.
    pub fn shutdown(&self) {
        self.requested.store(true, Ordering::Release);
        if let Err(e) = self.waker.wake() {
            warn!(error = %e, "failed to wake event loop for shutdown");
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

pub struct EventLoop {
    poll: Poll,
    listener: TcpListener,
    local_addr: SocketAddr,
    registry: Registry<TcpStream>,
    waker: Arc<Waker>,
    timers: DelayScheduler,
    expired_tx: Sender<Token>,
    expired_rx: Receiver<Token>,
    provider: ResponseProvider,
    shutdown: Arc<AtomicBool>,
    delay: Duration,
    read_buffer: usize,
    events_capacity: usize,
}

impl EventLoop {
    pub fn bind(addr: SocketAddr, cfg: &Config) -> Result<Self> {
        Self::bind_with(addr, cfg, ResponseProvider::new())
    }

    /// Like [`EventLoop::bind`], serving `provider`'s payload.
    pub fn bind_with(addr: SocketAddr, cfg: &Config, provider: ResponseProvider) -> Result<Self> {
        let poll = Poll::new().context("failed to create poller")?;

        let mut listener =
            TcpListener::bind(addr).with_context(|| format!("failed to bind {addr}"))?;
        let local_addr = listener.local_addr()?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)
            .context("failed to register listener")?;

        let waker = Arc::new(Waker::new(poll.registry(), WAKER).context("failed to create waker")?);
        let (expired_tx, expired_rx) = mpsc::channel();

        Ok(Self {
            poll,
            listener,
            local_addr,
            registry: Registry::new(),
            waker,
            timers: DelayScheduler::new()?,
            expired_tx,
            expired_rx,
            provider,
            shutdown: Arc::new(AtomicBool::new(false)),
            delay: cfg.delay(),
            read_buffer: cfg.read_buffer,
            events_capacity: cfg.events_capacity.max(1),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            requested: Arc::clone(&self.shutdown),
            waker: Arc::clone(&self.waker),
        }
    }

    pub fn registry(&self) -> &Registry<TcpStream> {
        &self.registry
    }

    /// Runs the loop on a dedicated thread.
    pub fn spawn(mut self) -> Result<(SocketAddr, ShutdownHandle, JoinHandle<Result<()>>)> {
        let addr = self.local_addr;
        let shutdown = self.shutdown_handle();
        let handle = thread::Builder::new()
            .name("hellobench-event-loop".to_string())
            .spawn(move || self.run())
            .context("failed to spawn event loop thread")?;
        Ok((addr, shutdown, handle))
    }

    /// Blocks until shutdown is requested or the poller fails.
    ///
    /// Per-connection I/O errors only close that connection. Poller and
    /// registration failures are returned.
    pub fn run(&mut self) -> Result<()> {
        let mut events = Events::with_capacity(self.events_capacity);
        info!(
            addr = %self.local_addr,
            delay_ms = self.delay.as_millis() as u64,
            "event-loop server listening"
        );

        while !self.shutdown.load(Ordering::Acquire) {
            if let Err(e) = self.poll.poll(&mut events, None) {
                if e.kind() == ErrorKind::Interrupted {
                    continue;
                }
                return Err(e).context("readiness wait failed");
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER => self.accept()?,
                    WAKER => trace!("woken"),
                    token => self.dispatch(token, Ready::from(event))?,
                }
            }

            self.apply_expired_timers()?;
        }

        self.stop();
        Ok(())
    }

    fn accept(&mut self) -> Result<()> {
        loop {
            match self.listener.accept() {
                Ok((mut stream, peer)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!(%peer, error = %e, "failed to set TCP_NODELAY");
                    }

                    let token = self.registry.next_token();
                    self.poll
                        .registry()
                        .register(&mut stream, token, Interest::READABLE)
                        .context("failed to register connection")?;
                    self.registry.insert(Connection::new(stream));
                    debug!(conn = token.0, %peer, "accepted connection");
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    return Ok(());
                }
            }
        }
    }

    fn dispatch(&mut self, token: Token, ready: Ready) -> Result<()> {
        let Some(conn) = self.registry.get_mut(token) else {
            trace!(conn = token.0, "event for a connection that is already gone");
            return Ok(());
        };

        match conn.handle(ready, self.read_buffer, &self.provider) {
            Ok(Directive::Idle) => {}
            Ok(Directive::Quiesce) => {
                self.poll
                    .registry()
                    .deregister(conn.stream_mut())
                    .context("failed to quiesce connection")?;
                self.schedule_wakeup(token);
            }
            Ok(Directive::Rearm) => {
                self.poll
                    .registry()
                    .reregister(conn.stream_mut(), token, Interest::WRITABLE)
                    .context("failed to re-arm connection")?;
            }
            Ok(Directive::Close) => {
                debug!(conn = token.0, written = conn.written(), "response flushed");
                self.close(token);
            }
            Err(e) => {
                debug!(conn = token.0, error = %e, "connection failed");
                self.close(token);
            }
        }

        Ok(())
    }

    fn schedule_wakeup(&self, token: Token) {
        let expired = self.expired_tx.clone();
        let waker = Arc::clone(&self.waker);

        self.timers.schedule(self.delay, move || {
            // Loop already gone.
            if expired.send(token).is_err() {
                return;
            }
            if let Err(e) = waker.wake() {
                warn!(conn = token.0, error = %e, "failed to wake event loop");
            }
        });
    }

    /// Arms every connection whose delay has expired.
    fn apply_expired_timers(&mut self) -> Result<()> {
        while let Ok(token) = self.expired_rx.try_recv() {
            let Some(conn) = self.registry.get_mut(token) else {
                trace!(conn = token.0, "timer fired for a closed connection");
                continue;
            };

            if !conn.on_timer(self.provider.get()) {
                trace!(conn = token.0, phase = ?conn.phase(), "stale timer ignored");
                continue;
            }

            self.poll
                .registry()
                .register(conn.stream_mut(), token, Interest::WRITABLE)
                .context("failed to arm connection for writing")?;
            trace!(conn = token.0, "delay elapsed, armed for writing");
        }

        Ok(())
    }

    fn close(&mut self, token: Token) {
        if let Some(mut conn) = self.registry.remove(token) {
            conn.close();
            if let Err(e) = self.poll.registry().deregister(conn.stream_mut()) {
                trace!(conn = token.0, error = %e, "deregister on close failed");
            }
        }
    }

    fn stop(&mut self) {
        self.timers.shutdown();

        let open = self.registry.len();
        for (_, mut conn) in self.registry.drain() {
            if conn.phase().interest().is_some() {
                let _ = self.poll.registry().deregister(conn.stream_mut());
            }
        }
        info!(abandoned = open, "event loop stopped");
    }
}
