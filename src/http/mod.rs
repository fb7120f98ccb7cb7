//! HTTP wire pieces shared by every serving strategy.
//!
//! None of the servers parse requests: they read one bounded chunk, wait
//! out the simulated downstream latency, and answer with the same canned
//! response.
//!
//! - **`response`**: response representation, encoder and the
//!   [`ResponseProvider`](response::ResponseProvider) handing out the
//!   pre-encoded payload
//! - **`writer`**: cursor over an encoded response for non-blocking,
//!   partial-completion-tolerant writes
//!
//! # Example
//!
//! ```
//! use hellobench::http::response::ResponseProvider;
//!
//! let provider = ResponseProvider::new();
//! assert_eq!(
//!     &provider.get()[..],
//!     b"HTTP/1.1 200 OK\r\nContent-Length: 13\r\n\r\nHello, World!"
//! );
//! ```

pub mod response;
pub mod writer;
