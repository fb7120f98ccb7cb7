//! hellobench - four ways to serve a slow "Hello, World!"
//!
//! Every server reads one request chunk, waits out a simulated downstream
//! delay and writes a fixed response. What differs is the concurrency
//! strategy: a single blocking thread, a thread pool, a task per connection,
//! or a single-threaded readiness-driven event loop.

pub mod config;
pub mod http;
pub mod server;
