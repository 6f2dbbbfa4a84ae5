//! Provider-related types.
//!
//! This module contains types related to usage providers:
//! - [`ProviderKind`] - Enum of supported providers
//! - [`ProviderIdentity`] - Account identity (siloed per provider)
//! - [`ProviderMetadata`] - Provider capabilities and display info
//! - [`ProviderBranding`] - Visual styling

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

// ============================================================================
// Provider Kind
// ============================================================================

/// Supported usage provider kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenRouter API credits
    OpenRouter,
    /// Warp terminal AI requests
    Warp,
    /// Antigravity IDE
    Antigravity,
    /// JetBrains AI Assistant
    JetBrains,
    /// Kimi K2
    KimiK2,
}

impl ProviderKind {
    /// Returns the display name for this provider.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenRouter => "OpenRouter",
            Self::Warp => "Warp",
            Self::Antigravity => "Antigravity",
            Self::JetBrains => "JetBrains AI",
            Self::KimiK2 => "Kimi K2",
        }
    }

    /// Returns all available provider kinds.
    pub fn all() -> &'static [ProviderKind] {
        &[
            Self::OpenRouter,
            Self::Warp,
            Self::Antigravity,
            Self::JetBrains,
            Self::KimiK2,
        ]
    }

    /// Returns the CLI name for this provider (lowercase, no spaces).
    pub fn cli_name(&self) -> &'static str {
        match self {
            Self::OpenRouter => "openrouter",
            Self::Warp => "warp",
            Self::Antigravity => "antigravity",
            Self::JetBrains => "jetbrains",
            Self::KimiK2 => "kimik2",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_name())
    }
}

impl FromStr for ProviderKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.cli_name() == needle)
            .ok_or_else(|| CoreError::UnknownProviderName(s.to_string()))
    }
}

// ============================================================================
// Provider Identity
// ============================================================================

/// Account identity information for a provider.
///
/// **Important**: This is siloed per provider - never mix identity from
/// different providers. Each provider has its own authentication context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderIdentity {
    /// The provider this identity belongs to.
    pub provider_id: ProviderKind,
    /// Account email address.
    pub account_email: Option<String>,
    /// Organization name (if applicable).
    pub account_organization: Option<String>,
    /// Plan/subscription name.
    pub plan_name: Option<String>,
    /// How the user authenticated.
    pub login_method: Option<LoginMethod>,
}

impl ProviderIdentity {
    /// Creates a new identity for the given provider.
    pub fn new(provider_id: ProviderKind) -> Self {
        Self {
            provider_id,
            account_email: None,
            account_organization: None,
            plan_name: None,
            login_method: None,
        }
    }

    /// Returns a display string for this identity.
    pub fn display_string(&self) -> String {
        match (&self.account_email, &self.account_organization) {
            (Some(email), Some(org)) => format!("{email} ({org})"),
            (Some(email), None) => email.clone(),
            (None, Some(org)) => org.clone(),
            (None, None) => self.provider_id.display_name().to_string(),
        }
    }
}

/// How the user authenticated with a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoginMethod {
    /// API key / bearer token.
    #[default]
    ApiKey,
    /// OAuth 2.0 flow.
    OAuth,
    /// Signed in through a locally running application.
    LocalApp,
    /// CLI tool authentication.
    CLI,
}

// ============================================================================
// Provider Metadata
// ============================================================================

/// Metadata describing a provider's capabilities and display info.
///
/// This is static configuration that describes what a provider supports
/// and how it should be displayed in the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct ProviderMetadata {
    /// The provider this metadata describes.
    pub id: ProviderKind,
    /// Display name in UI.
    pub display_name: String,
    /// Label for the session window.
    pub session_label: String,
    /// Label for the weekly/refill window (e.g., "Weekly", "Monthly").
    pub weekly_label: String,
    /// Label for the secondary metric (e.g., "Flash").
    pub opus_label: Option<String>,
    /// Whether this provider reports a secondary metric.
    pub supports_opus: bool,
    /// Whether this provider uses a credit system.
    pub supports_credits: bool,
    /// Hint text for credits display.
    pub credits_hint: String,
    /// Title for the toggle in settings (e.g., "Show Warp usage").
    pub toggle_title: String,
    /// CLI command name.
    pub cli_name: String,
    /// Whether to use account fallback for display.
    pub uses_account_fallback: bool,
    /// URL to the provider's dashboard.
    pub dashboard_url: Option<String>,
}

impl ProviderMetadata {
    /// Creates default metadata for a provider kind.
    pub fn for_provider(kind: ProviderKind) -> Self {
        let name = kind.display_name();
        Self {
            id: kind,
            display_name: name.to_string(),
            session_label: "Session".to_string(),
            weekly_label: "Weekly".to_string(),
            opus_label: None,
            supports_opus: false,
            supports_credits: false,
            credits_hint: String::new(),
            toggle_title: format!("Show {name} usage"),
            cli_name: kind.cli_name().to_string(),
            uses_account_fallback: false,
            dashboard_url: None,
        }
    }
}

// ============================================================================
// Provider Branding
// ============================================================================

/// Visual branding for a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderBranding {
    /// Resource key for the icon asset.
    pub icon_resource_name: String,
    /// Primary color for this provider.
    pub color: ProviderColor,
}

impl ProviderBranding {
    /// Creates branding for a provider kind with defaults.
    pub fn for_provider(kind: ProviderKind) -> Self {
        let color = match kind {
            ProviderKind::OpenRouter => ProviderColor::new(0.39, 0.40, 0.95),
            ProviderKind::Warp => ProviderColor::new(0.0, 0.84, 0.84),
            ProviderKind::Antigravity => ProviderColor::new(0.2, 0.8, 0.8),
            ProviderKind::JetBrains => ProviderColor::new(1.0, 0.19, 0.55),
            ProviderKind::KimiK2 => ProviderColor::new(0.1, 0.1, 0.1),
        };

        Self {
            icon_resource_name: format!("icon_{}", kind.cli_name()),
            color,
        }
    }
}

/// RGB color for provider branding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProviderColor {
    /// Red component (0.0 - 1.0).
    pub red: f32,
    /// Green component (0.0 - 1.0).
    pub green: f32,
    /// Blue component (0.0 - 1.0).
    pub blue: f32,
}

impl ProviderColor {
    /// Creates a new color.
    pub const fn new(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }

    /// Converts to 8-bit RGB tuple.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_rgb8(&self) -> (u8, u8, u8) {
        (
            (self.red * 255.0) as u8,
            (self.green * 255.0) as u8,
            (self.blue * 255.0) as u8,
        )
    }

    /// Converts to hex string (e.g., "#FF6600").
    pub fn to_hex(&self) -> String {
        let (r, g, b) = self.to_rgb8();
        format!("#{r:02X}{g:02X}{b:02X}")
    }
}

impl Default for ProviderColor {
    fn default() -> Self {
        Self::new(0.5, 0.5, 0.5)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_display_name() {
        assert_eq!(ProviderKind::JetBrains.display_name(), "JetBrains AI");
        assert_eq!(ProviderKind::KimiK2.display_name(), "Kimi K2");
    }

    #[test]
    fn test_provider_kind_cli_name() {
        assert_eq!(ProviderKind::OpenRouter.cli_name(), "openrouter");
        assert_eq!(ProviderKind::KimiK2.to_string(), "kimik2");
    }

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("warp".parse::<ProviderKind>().unwrap(), ProviderKind::Warp);
        assert_eq!(" OpenRouter ".parse::<ProviderKind>().unwrap(), ProviderKind::OpenRouter);
        assert!(matches!(
            "codex".parse::<ProviderKind>(),
            Err(CoreError::UnknownProviderName(_))
        ));
    }

    #[test]
    fn test_provider_color_hex() {
        let color = ProviderColor::new(1.0, 0.5, 0.0);
        assert_eq!(color.to_hex(), "#FF7F00");
    }

    #[test]
    fn test_identity_display_string() {
        let mut identity = ProviderIdentity::new(ProviderKind::Antigravity);
        assert_eq!(identity.display_string(), "Antigravity");

        identity.account_email = Some("test@example.com".to_string());
        identity.account_organization = Some("Acme Inc".to_string());
        assert_eq!(identity.display_string(), "test@example.com (Acme Inc)");
    }

    #[test]
    fn test_metadata_defaults() {
        let metadata = ProviderMetadata::for_provider(ProviderKind::Warp);
        assert_eq!(metadata.toggle_title, "Show Warp usage");
        assert_eq!(metadata.cli_name, "warp");
        assert!(!metadata.supports_opus);
    }
}
