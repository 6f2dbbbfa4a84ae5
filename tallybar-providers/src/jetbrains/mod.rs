//! JetBrains AI Assistant provider implementation.
//!
//! The IDEs cache the AI Assistant quota in an XML options file under the
//! JetBrains config directory. The newest such file across installed IDEs
//! is read; nothing is fetched over the network.

mod descriptor;
mod error;
mod locator;
mod parser;
mod strategies;

pub use descriptor::jetbrains_descriptor;
pub use error::JetBrainsError;
pub use locator::{JetBrainsLocator, QUOTA_FILE_NAME, QuotaFile};
pub use parser::{JetBrainsQuota, build_snapshot, parse_duration_minutes, parse_quota_xml};
pub use strategies::JetBrainsLocalStrategy;
