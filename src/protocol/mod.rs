//! Core HTTP protocol abstractions.
//!
//! This module holds the data model the rest of the crate operates on:
//! request and response messages and the pieces they are assembled from.
//!
//! - **Messages**: [`Request`] and [`Response`], each owning a
//!   [`crate::header::Headers`] and a [`Body`]
//! - **Request line**: [`Method`] with its safety classification, [`Uri`]
//!   with normalization, [`Version`] as an ordered pair
//! - **Status taxonomy** ([`status`]): what a status means for the body and
//!   headers around it
//! - **Errors** ([`error`]): the parse/send taxonomy plus [`StatusSignal`],
//!   the status a failed request resolves to

mod body;
pub use body::Body;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
pub use error::StatusSignal;

mod method;
pub use method::Method;

mod request;
pub use request::Request;

mod response;
pub use response::Response;

pub mod status;

mod uri;
pub use uri::Uri;

mod version;
pub use version::Version;
