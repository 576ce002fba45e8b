//! # htb-core
//!
//! Request construction and response interpretation for the Hack The Box API.
//!
//! This crate turns an abstract API call into a well-formed HTTP request and
//! turns the HTTP response into either a typed payload or a classified error.
//! Domain operations live in `htb-client`.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy shared by every operation
//! - [`paths`] - Compiled-in host, endpoint paths and query keys
//! - [`query`] - Deterministic query parameter container
//! - [`request`] - Declarative request description and builder
//! - [`transport`] - Transport abstraction and cancellation/deadline context
//! - [`response`] - Envelope types and the response interpreter
//! - [`config`] - User-facing client configuration
//! - [`client`] - HTTP transport settings

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod paths;
pub mod query;
pub mod request;
pub mod response;
pub mod transport;

// Re-export commonly used types
pub use error::{Error, Result, TransportError};
pub use paths::ApiPath;
pub use query::QueryParams;
pub use request::{RequestSpec, RequestSpecBuilder};
pub use response::{DataEnvelope, Envelope, InfoEnvelope, ResponseInterpreter};
pub use transport::{HttpTransport, RequestContext};
