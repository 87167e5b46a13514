use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

/// What a refresh should do when every page yields zero items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyPolicy {
    /// Treat an empty result as a failed refresh and keep the previous items.
    #[default]
    Reject,
    /// Publish the empty result, clearing the feed.
    Accept,
}

/// One configured feed origin.
#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    pub name: String,
    pub slug: String,
    pub url: String,

    /// Poll interval in seconds. Accepts an integer or a string like "30m".
    #[serde(alias = "delay", deserialize_with = "deserialize_interval")]
    pub interval: u64,

    /// Overrides the global item cap.
    #[serde(default)]
    pub max_items: Option<usize>,

    /// Overrides the global empty policy.
    #[serde(default)]
    pub empty_policy: Option<EmptyPolicy>,

    #[serde(default)]
    pub item_selector: String,
    #[serde(default)]
    pub title_selector: String,
    #[serde(default)]
    pub link_selector: String,
    #[serde(default)]
    pub description_selector: String,

    /// JSON path (JSON pages) or regex with one capture group (HTML pages).
    #[serde(default)]
    pub next_page_match: String,
}

impl Source {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn has_pagination(&self) -> bool {
        !self.next_page_match.is_empty()
    }
}

/// Parse interval string like "1h", "30m", "45s", "1d" or raw seconds.
pub fn parse_interval(s: &str) -> Result<u64, String> {
    let s = s.trim().to_lowercase();

    let (digits, unit, scale) = if let Some(days) = s.strip_suffix('d') {
        (days, "days", 86400)
    } else if let Some(hours) = s.strip_suffix('h') {
        (hours, "hours", 3600)
    } else if let Some(minutes) = s.strip_suffix('m') {
        (minutes, "minutes", 60)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, "seconds", 1)
    } else {
        return s
            .parse::<u64>()
            .map_err(|_| format!("Invalid interval: {}. Use format like '1h', '30m', '1d'", s));
    };

    digits
        .parse::<u64>()
        .map_err(|_| format!("Invalid {}: {}", unit, digits))?
        .checked_mul(scale)
        .ok_or_else(|| format!("Interval too large: {}", s))
}

/// Format an interval for display, using the largest exact unit.
pub fn format_interval(secs: u64) -> String {
    if secs >= 86400 && secs % 86400 == 0 {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

fn deserialize_interval<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Secs(secs) => Ok(secs),
        Raw::Text(text) => parse_interval(&text).map_err(serde::de::Error::custom),
    }
}
