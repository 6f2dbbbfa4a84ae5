//! Parser for the AI Assistant quota options file.
//!
//! The file is IDE-written XML whose interesting parts are two `<option>`
//! elements carrying XML-escaped JSON:
//!
//! ```xml
//! <option name="quotaInfo" value="{&quot;current&quot;:&quot;7478.3&quot;,...}" />
//! <option name="nextRefill" value="{&quot;next&quot;:&quot;2026-11-01T00:00:00Z&quot;,...}" />
//! ```

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use tallybar_core::{LoginMethod, ProviderIdentity, ProviderKind, UsageSnapshot, UsageWindow};

use super::error::JetBrainsError;

static OPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<option\s+name="([A-Za-z]+)"\s+value="([^"]*)""#).expect("valid regex")
});

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9A-Fa-f]+|#[0-9]+|quot|apos|lt|gt|amp);").expect("valid regex")
});

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?)?$").expect("valid regex")
});

// ============================================================================
// Quota Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberValue {
    Number(f64),
    String(String),
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<NumberValue>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        NumberValue::Number(n) => Some(n),
        NumberValue::String(s) => s.trim().parse().ok(),
    }))
}

#[derive(Debug, Deserialize)]
struct QuotaInfo {
    #[serde(default, deserialize_with = "lenient_number")]
    current: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    maximum: Option<f64>,
    #[serde(default)]
    until: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct NextRefill {
    #[serde(default)]
    next: Option<DateTime<Utc>>,
    #[serde(default)]
    tariff: Option<Tariff>,
}

#[derive(Debug, Deserialize)]
struct Tariff {
    #[serde(default)]
    duration: Option<String>,
}

/// Quota read from the options file.
#[derive(Debug, Clone, PartialEq)]
pub struct JetBrainsQuota {
    /// Credits consumed in the current period.
    pub used: f64,
    /// Credits allowed per period.
    pub maximum: f64,
    /// When the allowance refills.
    pub refills_at: Option<DateTime<Utc>>,
    /// Refill period length.
    pub period_minutes: Option<u32>,
}

// ============================================================================
// Parsing
// ============================================================================

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "quot" => Some('"'),
        "apos" => Some('\''),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        _ => {
            let reference = entity.strip_prefix('#')?;
            let code = match reference.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => reference.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Decodes named and numeric character references in one pass. References
/// that do not name a valid character are kept as written.
fn xml_unescape(value: &str) -> String {
    ENTITY_RE
        .replace_all(value, |caps: &regex::Captures<'_>| match decode_entity(&caps[1]) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn option_value(xml: &str, name: &str) -> Option<String> {
    OPTION_RE
        .captures_iter(xml)
        .find(|caps| &caps[1] == name)
        .map(|caps| xml_unescape(&caps[2]))
}

/// Parses an ISO-8601 duration of days, hours and minutes into minutes
/// (`PT720H` is 43200).
pub fn parse_duration_minutes(value: &str) -> Option<u32> {
    let caps = DURATION_RE.captures(value.trim())?;
    let part = |i: usize| -> Option<u32> {
        caps.get(i)
            .map_or(Some(0), |m| m.as_str().parse::<u32>().ok())
    };

    let minutes = part(1)?
        .checked_mul(24 * 60)?
        .checked_add(part(2)?.checked_mul(60)?)?
        .checked_add(part(3)?)?;
    (minutes > 0).then_some(minutes)
}

/// Parses the options file content.
pub fn parse_quota_xml(xml: &str) -> Result<JetBrainsQuota, JetBrainsError> {
    let quota_json = option_value(xml, "quotaInfo").ok_or(JetBrainsError::MissingOption("quotaInfo"))?;
    let quota: QuotaInfo = serde_json::from_str(&quota_json)
        .map_err(|e| JetBrainsError::InvalidQuota(format!("quotaInfo: {e}")))?;

    let maximum = quota
        .maximum
        .ok_or_else(|| JetBrainsError::InvalidQuota("quotaInfo has no maximum".to_string()))?;

    // The refill option is optional; older IDE builds only write quotaInfo.
    let refill = match option_value(xml, "nextRefill") {
        Some(json) => Some(
            serde_json::from_str::<NextRefill>(&json)
                .map_err(|e| JetBrainsError::InvalidQuota(format!("nextRefill: {e}")))?,
        ),
        None => None,
    };

    let refills_at = refill.as_ref().and_then(|r| r.next).or(quota.until);
    let period_minutes = refill
        .as_ref()
        .and_then(|r| r.tariff.as_ref())
        .and_then(|t| t.duration.as_deref())
        .and_then(parse_duration_minutes);

    Ok(JetBrainsQuota {
        used: quota.current.unwrap_or(0.0),
        maximum,
        refills_at,
        period_minutes,
    })
}

/// Builds the normalized snapshot. The quota is the weekly (refill) window.
pub fn build_snapshot(quota: &JetBrainsQuota) -> UsageSnapshot {
    let mut window = UsageWindow::with_limit(quota.used, quota.maximum)
        .resetting_at(quota.refills_at)
        .labeled("AI credits");
    if let Some(minutes) = quota.period_minutes {
        window = window.spanning(minutes);
    }

    let mut identity = ProviderIdentity::new(ProviderKind::JetBrains);
    identity.login_method = Some(LoginMethod::LocalApp);

    let mut snapshot = UsageSnapshot::new();
    snapshot.weekly = Some(window);
    snapshot.identity = Some(identity);
    snapshot
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<application>
  <component name="AIAssistantQuotaManager2">
    <option name="nextRefill" value="{&quot;type&quot;:&quot;Known&quot;,&quot;next&quot;:&quot;2026-11-01T00:00:00Z&quot;,&quot;tariff&quot;:{&quot;amount&quot;:&quot;1000000&quot;,&quot;duration&quot;:&quot;PT720H&quot;}}" />
    <option name="quotaInfo" value="{&quot;type&quot;:&quot;Available&quot;,&quot;current&quot;:&quot;250000&quot;,&quot;maximum&quot;:&quot;1000000&quot;,&quot;until&quot;:&quot;2026-11-09T21:00:00Z&quot;}" />
  </component>
</application>"#;

    #[test]
    fn test_parse_quota() {
        let quota = parse_quota_xml(XML).unwrap();
        assert_eq!(quota.used, 250_000.0);
        assert_eq!(quota.maximum, 1_000_000.0);
        assert_eq!(quota.period_minutes, Some(43_200));
        assert_eq!(
            quota.refills_at.unwrap().to_rfc3339(),
            "2026-11-01T00:00:00+00:00"
        );
    }

    #[test]
    fn test_snapshot() {
        let snapshot = build_snapshot(&parse_quota_xml(XML).unwrap());
        let weekly = snapshot.weekly.unwrap();
        assert_eq!(weekly.used_percent(), Some(25.0));
        assert_eq!(weekly.window_minutes, Some(43_200));
        assert!(snapshot.session.is_none());
    }

    #[test]
    fn test_without_refill_uses_until() {
        let xml = r#"<option name="quotaInfo" value="{&quot;current&quot;:12.5,&quot;maximum&quot;:100,&quot;until&quot;:&quot;2026-11-09T21:00:00Z&quot;}"/>"#;
        let quota = parse_quota_xml(xml).unwrap();
        assert_eq!(quota.used, 12.5);
        assert!(quota.period_minutes.is_none());
        assert_eq!(
            quota.refills_at.unwrap().to_rfc3339(),
            "2026-11-09T21:00:00+00:00"
        );
    }

    #[test]
    fn test_missing_option() {
        assert!(matches!(
            parse_quota_xml("<application/>"),
            Err(JetBrainsError::MissingOption("quotaInfo"))
        ));
    }

    #[test]
    fn test_missing_maximum() {
        let xml = r#"<option name="quotaInfo" value="{&quot;current&quot;:&quot;1&quot;}"/>"#;
        assert!(matches!(parse_quota_xml(xml), Err(JetBrainsError::InvalidQuota(_))));
    }

    #[test]
    fn test_durations() {
        assert_eq!(parse_duration_minutes("PT720H"), Some(43_200));
        assert_eq!(parse_duration_minutes("P7D"), Some(10_080));
        assert_eq!(parse_duration_minutes("P1DT2H30M"), Some(1_590));
        assert_eq!(parse_duration_minutes("P"), None);
        assert_eq!(parse_duration_minutes("720 hours"), None);
    }

    #[test]
    fn test_unescape_order() {
        assert_eq!(xml_unescape("&amp;quot;"), "&quot;");
    }

    #[test]
    fn test_unescape_numeric_references() {
        assert_eq!(xml_unescape("a&#10;b&#13;c"), "a\nb\rc");
        assert_eq!(xml_unescape("it&#x27;s &#X41;&#65;"), "it's AA");
        assert_eq!(xml_unescape("&lt;&#x3C;&gt;"), "<<>");
        // Not a character: kept as written.
        assert_eq!(xml_unescape("&#xD800;&#99999999999;"), "&#xD800;&#99999999999;");
        assert_eq!(xml_unescape("&nbsp;"), "&nbsp;");
    }
}
