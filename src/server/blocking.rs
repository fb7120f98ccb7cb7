//! Blocking strategies: one thread in the accept loop, or a fixed pool of
//! worker threads fed by it. Either way a thread sleeps through every
//! connection's delay.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::http::response::ResponseProvider;

/// Serves one connection start to finish on the calling thread.
pub fn handle_connection(
    mut stream: TcpStream,
    delay: Duration,
    read_buffer: usize,
    payload: &[u8],
) -> io::Result<()> {
    let mut buf = vec![0u8; read_buffer];
    let n = stream.read(&mut buf)?;
    trace!(read = n, "request chunk discarded");

    // Simulated downstream latency
    thread::sleep(delay);

    stream.write_all(payload)?;
    stream.flush()
}

/// Accepts and serves connections strictly one after another.
pub fn serve_single_thread(
    listener: TcpListener,
    cfg: &Config,
    provider: ResponseProvider,
) -> Result<()> {
    info!(addr = %listener.local_addr()?, "single-thread server listening");
    let payload = provider.get();

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let peer = stream.peer_addr().ok();
                if let Err(e) = handle_connection(stream, cfg.delay(), cfg.read_buffer, &payload) {
                    debug!(?peer, error = %e, "connection failed");
                }
            }
            Err(e) => warn!(error = %e, "accept failed"),
        }
    }

    Ok(())
}

/// Hands every accepted connection to a fixed pool of `cfg.threads`
/// workers. The accepting thread never touches client I/O.
pub fn serve_thread_pool(
    listener: TcpListener,
    cfg: &Config,
    provider: ResponseProvider,
) -> Result<()> {
    let threads = cfg.threads.max(1);
    let (tx, rx) = mpsc::channel::<TcpStream>();
    let rx = Arc::new(Mutex::new(rx));

    for id in 0..threads {
        let rx = Arc::clone(&rx);
        let payload = provider.get();
        let delay = cfg.delay();
        let read_buffer = cfg.read_buffer;

        thread::Builder::new()
            .name(format!("hellobench-worker-{id}"))
            .spawn(move || {
                loop {
                    let next = match rx.lock() {
                        Ok(queue) => queue.recv(),
                        Err(_) => break,
                    };
                    let Ok(stream) = next else {
                        break;
                    };

                    let peer = stream.peer_addr().ok();
                    if let Err(e) = handle_connection(stream, delay, read_buffer, &payload) {
                        debug!(worker = id, ?peer, error = %e, "connection failed");
                    }
                }
            })
            .context("failed to spawn pool worker")?;
    }

    info!(
        addr = %listener.local_addr()?,
        threads,
        "thread-pool server listening"
    );

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                if tx.send(stream).is_err() {
                    anyhow::bail!("all pool workers have exited");
                }
            }
            Err(e) => warn!(error = %e, "accept failed"),
        }
    }

    Ok(())
}
