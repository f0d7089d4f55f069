//! # Tag Filter
//!
//! Optional narrowing of a secret list to the secrets carrying a given set of tags.
//! The filter is configured as `KEY=VALUE` pairs separated by `;`, for example
//! `team=payments;tier=1`.

use super::model::Secret;
use crate::error::ConfigError;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Required tags, compared as strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    tags: BTreeMap<String, String>,
}

/// Result of applying a [`TagFilter`]
#[derive(Debug, Clone, PartialEq)]
pub struct Filtered {
    /// False when the filter was empty and the input was returned untouched
    pub applied: bool,
    pub secrets: Vec<Secret>,
}

impl TagFilter {
    /// Parse `KEY=VALUE;KEY2=VALUE2`.
    ///
    /// An empty string is an empty filter. Any pair that does not contain
    /// exactly one `=` is a configuration error.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let mut tags = BTreeMap::new();
        if input.is_empty() {
            return Ok(Self { tags });
        }

        for pair in input.split(';') {
            let mut parts = pair.split('=');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => {
                    tags.insert(key.to_string(), value.to_string());
                }
                _ => return Err(ConfigError::InvalidTagFilter(pair.to_string())),
            }
        }

        Ok(Self { tags })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// True if `secret` carries every required tag with an exactly matching value
    #[must_use]
    pub fn matches(&self, secret: &Secret) -> bool {
        self.tags
            .iter()
            .all(|(key, value)| secret.contains_tag_with_value(key, value))
    }

    /// Keep only the secrets matching this filter
    #[must_use]
    pub fn apply(&self, secrets: Vec<Secret>) -> Filtered {
        if self.is_empty() {
            return Filtered {
                applied: false,
                secrets,
            };
        }

        info!(filter = %self, "Filtering secrets by tags");
        let secrets = secrets
            .into_iter()
            .filter(|secret| self.matches(secret))
            .collect();

        Filtered {
            applied: true,
            secrets,
        }
    }
}

impl FromStr for TagFilter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .tags
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        f.write_str(&pairs.join(";"))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagFilter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            tags: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Keep only the secrets whose tags match every entry in `required`
#[must_use]
pub fn filter_by_tags(secrets: Vec<Secret>, required: &TagFilter) -> Filtered {
    required.apply(secrets)
}
