//! Wire codec layer: incremental parsing and response composition
//!
//! This module turns bytes into messages and messages back into bytes using
//! a state machine pattern.
//!
//! # Architecture
//!
//! - Request side:
//!   - [`MessageParser`]: resumable parser driving
//!     `start line -> headers -> body -> trailers`, one [`Step`] at a time
//!   - [`ServerStateMachine`]: request-specific validation layered on the
//!     parser's phase boundaries, pairing every request with a response
//! - Response side:
//!   - [`ComposedResponse`]: header finalization and serialization
//!
//! # Example
//!
//! ```
//! use httpkit::codec::{ComposedResponse, ServerStateMachine};
//!
//! let mut machine = ServerStateMachine::new("http", "localhost", 8090);
//! let pairs = machine.parse(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n").unwrap();
//!
//! for (request, mut response) in pairs {
//!     response.body_mut().set("hello");
//!     let wire = ComposedResponse::new(&mut response, Some(&request)).prepare().unwrap();
//!     assert!(wire.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! }
//! ```

mod compose;
pub use compose::ComposedResponse;

mod message_parser;
pub use message_parser::MessageParser;
pub use message_parser::Step;

mod server;
pub use server::H2cUpgrade;
pub use server::ServerStateMachine;
