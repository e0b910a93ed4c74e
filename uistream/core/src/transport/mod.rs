//! Patch Transport
//!
//! The session controller does not care where patch bytes come from. This
//! module defines the [`PatchSource`] trait it consumes and the adapters that
//! ship with the crate.
//!
//! # Available Sources
//!
//! - **HTTP**: POSTs the prompt to a generator endpoint and streams the body
//! - **Memory**: replays fixed chunks (recorded files, tests)
//!
//! # Usage
//!
//! ```ignore
//! use uistream_core::transport::{GenerateRequest, HttpSource, PatchSource};
//!
//! let source = HttpSource::new(&TransportSettings::default())?;
//! let mut stream = source.open(&GenerateRequest::new("A contact form")).await?;
//! ```

mod http;
mod memory;
mod traits;

pub use http::HttpSource;
pub use memory::MemorySource;
pub use traits::{ByteStream, GenerateRequest, PatchSource, TransportError};
