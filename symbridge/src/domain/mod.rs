//! Domain model for symbridge
//!
//! Core error taxonomy shared by the resolver handle, the wire framing, the
//! trace decoder and the command-line tool.

pub mod errors;

pub use errors::{ResolverError, TraceError};
