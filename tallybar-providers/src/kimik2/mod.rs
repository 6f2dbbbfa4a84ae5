//! Kimi K2 provider implementation.
//!
//! Kimi K2 sells prepaid credits. The credits endpoint has shipped several
//! response shapes, so parsing looks the figures up by name instead of
//! binding to one schema.

mod api;
mod descriptor;
mod error;
mod strategies;

pub use api::{KimiK2Client, KimiK2Credits, parse_credits};
pub use descriptor::kimik2_descriptor;
pub use error::KimiK2Error;
pub use strategies::KimiK2ApiStrategy;
