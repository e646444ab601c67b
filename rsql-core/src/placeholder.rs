//! Reserved `${NAME}` placeholder tokens

use crate::{Clock, FilterConfig, Timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of placeholders a filter value may reference. Adding one
/// means adding a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placeholder {
    /// The translation instant.
    Now,
    /// Now minus the polling interval and the overdue grace period.
    OverdueThreshold,
}

impl Placeholder {
    pub const ALL: [Placeholder; 2] = [Placeholder::Now, Placeholder::OverdueThreshold];

    /// Canonical name, as written between `${` and `}`.
    pub fn name(&self) -> &'static str {
        match self {
            Placeholder::Now => "NOW_TS",
            Placeholder::OverdueThreshold => "OVERDUE_TS",
        }
    }

    /// Every accepted spelling, canonical first.
    pub fn names(&self) -> &'static [&'static str] {
        match self {
            Placeholder::Now => &["NOW_TS", "NOW"],
            Placeholder::OverdueThreshold => &["OVERDUE_TS", "OVERDUE"],
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.names().iter().any(|n| *n == name))
    }

    /// The full `${NAME}` token.
    pub fn token(&self) -> String {
        format!("${{{}}}", self.name())
    }
}

/// Returns the name inside a `${...}` token, or `None` if `text` is not
/// shaped like a placeholder.
pub fn placeholder_name(text: &str) -> Option<&str> {
    text.strip_prefix("${")?.strip_suffix('}')
}

/// Placeholder values captured once for a single translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderValues {
    pub now: Timestamp,
    pub overdue_threshold: Timestamp,
}

impl PlaceholderValues {
    pub fn capture(clock: &dyn Clock, config: &FilterConfig) -> Self {
        let now = clock.now();
        let overdue_threshold = now
            .checked_sub_signed(config.overdue_window())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self {
            now,
            overdue_threshold,
        }
    }

    pub fn resolve(&self, placeholder: Placeholder) -> Timestamp {
        match placeholder {
            Placeholder::Now => self.now,
            Placeholder::OverdueThreshold => self.overdue_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixedClock;

    #[test]
    fn test_placeholder_lookup_accepts_aliases() {
        assert_eq!(Placeholder::from_name("NOW_TS"), Some(Placeholder::Now));
        assert_eq!(Placeholder::from_name("NOW"), Some(Placeholder::Now));
        assert_eq!(
            Placeholder::from_name("OVERDUE"),
            Some(Placeholder::OverdueThreshold)
        );
        assert_eq!(Placeholder::from_name("now_ts"), None);
        assert_eq!(Placeholder::from_name("TOMORROW"), None);
    }

    #[test]
    fn test_placeholder_name_extraction() {
        assert_eq!(placeholder_name("${NOW_TS}"), Some("NOW_TS"));
        assert_eq!(placeholder_name("${}"), Some(""));
        assert_eq!(placeholder_name("$NOW_TS"), None);
        assert_eq!(placeholder_name("NOW_TS"), None);
        assert_eq!(Placeholder::Now.token(), "${NOW_TS}");
    }

    #[test]
    fn test_capture_subtracts_overdue_window() {
        let clock = FixedClock::at_millis(1_000_000_000).unwrap();
        let config = FilterConfig {
            polling_interval_secs: 60,
            polling_overdue_secs: 30,
            ..FilterConfig::default()
        };
        let values = PlaceholderValues::capture(&clock, &config);
        assert_eq!(values.resolve(Placeholder::Now).timestamp_millis(), 1_000_000_000);
        assert_eq!(
            values.resolve(Placeholder::OverdueThreshold).timestamp_millis(),
            1_000_000_000 - 90_000
        );
    }
}
