use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, trace};

use crate::config::Config;
use crate::http::response::ResponseProvider;

/// Spawns one lightweight task per accepted connection.
///
/// The delay is a timer await, so a parked connection costs a task, not a
/// thread.
pub async fn serve(
    listener: TcpListener,
    cfg: &Config,
    provider: ResponseProvider,
) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "task-per-connection server listening");

    loop {
        let (socket, peer) = listener.accept().await?;
        trace!(%peer, "accepted connection");

        let payload = provider.get();
        let delay = cfg.delay();
        let read_buffer = cfg.read_buffer;
        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, peer, delay, read_buffer, payload).await {
                debug!(%peer, error = %e, "connection failed");
            }
        });
    }
}

async fn handle_connection(
    mut socket: TcpStream,
    peer: SocketAddr,
    delay: Duration,
    read_buffer: usize,
    payload: Bytes,
) -> std::io::Result<()> {
    let mut buf = vec![0u8; read_buffer];
    let n = socket.read(&mut buf).await?;
    trace!(%peer, read = n, "request chunk discarded");

    tokio::time::sleep(delay).await;

    socket.write_all(&payload).await?;
    socket.shutdown().await
}
