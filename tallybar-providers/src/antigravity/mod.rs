//! Antigravity provider implementation.
//!
//! Antigravity uses a local language server probe (no external auth).
//! The probe finds the running server, reads its CSRF token, and queries
//! its Connect-style API for per-model quotas.

mod api;
mod descriptor;
mod error;
mod process;
mod quota;
mod strategies;

pub use api::{LanguageServerClient, parse_command_model_configs, parse_user_status};
pub use descriptor::antigravity_descriptor;
pub use error::AntigravityError;
pub use process::{LanguageServer, find_language_server, parse_listening_ports};
pub use quota::{AccountQuotas, ModelQuota, build_snapshot, select_models};
pub use strategies::AntigravityLocalStrategy;
