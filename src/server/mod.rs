//! The four serving strategies being compared.
//!
//! All of them answer every connection the same way: read one chunk, wait
//! out the configured delay, write the canned response, close. They differ
//! only in what sits idle during that delay:
//!
//! | strategy              | idle during the delay          |
//! |-----------------------|--------------------------------|
//! | `single-thread`       | the only thread (serial)       |
//! | `thread-pool`         | one of N pooled OS threads     |
//! | `task-per-connection` | a tokio task                   |
//! | `event-loop`          | nothing; a timer re-arms it    |
//!
//! The event loop is the interesting one; see [`event_loop`] and
//! [`connection`].

pub mod blocking;
pub mod connection;
pub mod event_loop;
pub mod registry;
pub mod scheduler;
pub mod tasks;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::Deserialize;
use tracing::info;

use crate::config::Config;
use crate::http::response::ResponseProvider;

use event_loop::EventLoop;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    SingleThread,
    ThreadPool,
    TaskPerConnection,
    EventLoop,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::SingleThread => "single-thread",
            Strategy::ThreadPool => "thread-pool",
            Strategy::TaskPerConnection => "task-per-connection",
            Strategy::EventLoop => "event-loop",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "single-thread" => Ok(Strategy::SingleThread),
            "thread-pool" => Ok(Strategy::ThreadPool),
            "task-per-connection" => Ok(Strategy::TaskPerConnection),
            "event-loop" => Ok(Strategy::EventLoop),
            other => anyhow::bail!("unknown strategy {other:?}"),
        }
    }
}

/// Binds the configured address and serves with the configured strategy
/// until Ctrl-C.
///
/// Installs the process-wide signal handler, so it is meant to be called
/// once, from `main`.
pub fn run(cfg: &Config) -> Result<()> {
    let provider = ResponseProvider::new();

    match cfg.strategy {
        Strategy::EventLoop => {
            let mut event_loop = EventLoop::bind(cfg.socket_addr()?, cfg)?;
            let shutdown = event_loop.shutdown_handle();
            ctrlc::set_handler(move || {
                info!("Shutdown signal received");
                shutdown.shutdown();
            })?;
            event_loop.run()
        }

        Strategy::TaskPerConnection => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;

            runtime.block_on(async {
                let listener = tokio::net::TcpListener::bind(cfg.listen_addr()).await?;

                tokio::select! {
                    res = tasks::serve(listener, cfg, provider) => {
                        res?;
                    }

                    _ = tokio::signal::ctrl_c() => {
                        info!("Shutdown signal received");
                    }
                }

                Ok::<_, anyhow::Error>(())
            })
        }

        Strategy::SingleThread | Strategy::ThreadPool => {
            // Blocking accept loops have nothing to unwind.
            ctrlc::set_handler(|| {
                info!("Shutdown signal received");
                std::process::exit(0);
            })?;

            let listener = std::net::TcpListener::bind(cfg.listen_addr())?;
            if cfg.strategy == Strategy::SingleThread {
                blocking::serve_single_thread(listener, cfg, provider)
            } else {
                blocking::serve_thread_pool(listener, cfg, provider)
            }
        }
    }
}
