//! An HTTP/1.0 and HTTP/1.1 message toolkit.
//!
//! This crate is the protocol core a server embeds: it parses and composes
//! messages, manages headers and bodies, and drives a server-side state
//! machine that consumes bytes incrementally and yields validated
//! request/response pairs. It does no I/O of its own; the transport feeds
//! bytes in and writes the composed replies out.
//!
//! # Modules
//!
//! - [`codec`]: the incremental [`codec::MessageParser`], the
//!   [`codec::ServerStateMachine`] layering request validation on top of it,
//!   and [`codec::ComposedResponse`] for the reply path
//! - [`header`]: the case-insensitive multi-valued [`header::Headers`] store
//!   with per-field element parsing (quality negotiation, coding
//!   resolution, host validation)
//! - [`protocol`]: the message data model (requests, responses, methods,
//!   versions, URIs, bodies, the status taxonomy and error types)
//! - [`coding`]: gzip/deflate content codings and their registry
//! - [`auth`]: RFC 2617 digest authentication
//! - [`buffer`]: the byte accumulator the parser runs on
//!
//! # Example
//!
//! ```
//! use httpkit::codec::{ComposedResponse, ServerStateMachine};
//! use httpkit::protocol::Response;
//!
//! let mut machine = ServerStateMachine::new("http", "localhost", 8090);
//!
//! match machine.parse(b"GET / HTTP/1.1\r\nHost: example.org\r\n\r\n") {
//!     Ok(pairs) => {
//!         for (request, mut response) in pairs {
//!             assert_eq!(request.uri().path(), "/");
//!             response.body_mut().set("hi");
//!             let wire = ComposedResponse::new(&mut response, Some(&request))
//!                 .prepare()
//!                 .unwrap();
//!             assert!(wire.starts_with(b"HTTP/1.1 200 OK\r\n"));
//!         }
//!     }
//!     Err(signal) => {
//!         // parse failures resolve to a status; compose the reply from it
//!         let mut reply = Response::from_signal(&signal);
//!         let _ = ComposedResponse::new(&mut reply, None).prepare().unwrap();
//!     }
//! }
//! ```

pub mod auth;
pub mod buffer;
pub mod codec;
pub mod coding;
pub mod header;
pub mod protocol;

mod utils;

pub(crate) use utils::ensure;
