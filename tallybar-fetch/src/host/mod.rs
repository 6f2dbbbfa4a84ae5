//! Host APIs for TallyBar fetch strategies.
//!
//! - [`http`] - HTTP client with tracing and domain allowlist
//! - [`process`] - Subprocess execution for local probes

pub mod http;
pub mod process;

pub use http::{HttpClient, ResponseExt};
pub use process::{ProcessOutput, ProcessRunner};
