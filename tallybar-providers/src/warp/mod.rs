//! Warp provider implementation.
//!
//! Warp meters AI requests per refresh period. The limit and the
//! consumed count come from a single GraphQL query authenticated with a
//! Warp API key.

mod api;
mod descriptor;
mod error;
mod strategies;

pub use api::{WarpBonusGrant, WarpClient, WarpRequestLimits, WarpUsage};
pub use descriptor::warp_descriptor;
pub use error::WarpError;
pub use strategies::WarpApiStrategy;
