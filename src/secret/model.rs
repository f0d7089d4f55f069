//! # Secret
//!
//! One logical secret at a store path: its payload, its tags, and the environment
//! it resolves to.

use super::environment::{belongs_to, Environment};
use super::value::{SecretMap, Value};

/// Tag holding the environment of a secret whose name carries no suffix
pub const ENVIRONMENT_TAG: &str = "Environment";

/// A secret containing its name/path, payload and tags
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Secret {
    /// Store path, possibly ending in an environment suffix such as `-dev`
    pub name: String,
    /// Secret payload
    pub data: SecretMap,
    /// Metadata; may carry an `Environment` tag
    pub tags: SecretMap,
    /// Resolved environment, absent until [`Secret::set_environment`] runs
    pub environment: Option<Environment>,
}

impl Secret {
    /// Create a secret with empty data and tags
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: SecretMap) -> Self {
        self.add_data(data);
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: SecretMap) -> Self {
        self.add_tags(tags);
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Merge `data` into the payload, overwriting existing keys
    pub fn add_data(&mut self, data: SecretMap) {
        self.data.extend(data);
    }

    /// Merge `tags` into the tags, overwriting existing keys
    pub fn add_tags(&mut self, tags: SecretMap) {
        self.tags.extend(tags);
    }

    /// Resolve the environment of this secret.
    ///
    /// Precedence, first match wins: the already resolved environment, the last
    /// `-`-separated segment of the name, the `Environment` tag.
    #[must_use]
    pub fn resolve_environment(&self) -> Option<Environment> {
        self.environment
            .or_else(|| self.environment_from_name())
            .or_else(|| self.environment_from_tags())
    }

    /// Resolve and store the environment; a second call never changes it
    pub fn set_environment(&mut self) {
        self.environment = self.resolve_environment();
    }

    /// Environment named by the suffix after the last `-` in the name
    #[must_use]
    pub fn environment_from_name(&self) -> Option<Environment> {
        let (_, suffix) = self.name.rsplit_once('-')?;
        Environment::lookup(suffix)
    }

    /// Environment named by the `Environment` tag
    #[must_use]
    pub fn environment_from_tags(&self) -> Option<Environment> {
        self.tag_value(ENVIRONMENT_TAG)
            .and_then(|value| Environment::lookup(&value))
    }

    /// Tag value rendered as a string; `None` when missing or null
    #[must_use]
    pub fn tag_value(&self, key: &str) -> Option<String> {
        self.tags
            .get(key)
            .filter(|value| !value.is_null())
            .map(Value::to_string)
    }

    /// True if a non-null tag `key` exists
    #[must_use]
    pub fn contains_tag(&self, key: &str) -> bool {
        self.tag_value(key).is_some()
    }

    /// True if tag `key` renders exactly as `value`
    #[must_use]
    pub fn contains_tag_with_value(&self, key: &str, value: &str) -> bool {
        self.tag_value(key).as_deref() == Some(value)
    }

    /// Whether this secret's resolved environment belongs to `target`
    #[must_use]
    pub fn belongs_to(&self, target: Option<Environment>) -> bool {
        belongs_to(self.environment, target)
    }

    /// Remove the environment suffix from the name, once.
    ///
    /// `apps/my-app/db-password-dev` becomes `apps/my-app/db-password`. Names
    /// without a recognised suffix are left alone.
    pub fn trim_name_environment(&mut self) {
        if let Some(env) = self.environment_from_name() {
            self.trim_name_suffix(&env.name_suffix());
        }
    }

    /// Remove `suffix` from the end of the name, once
    pub fn trim_name_suffix(&mut self, suffix: &str) {
        if let Some(trimmed) = self.name.strip_suffix(suffix) {
            self.name = trimmed.to_string();
        }
    }

    #[must_use]
    pub fn data_eq(&self, other: &Secret) -> bool {
        self.data == other.data
    }

    #[must_use]
    pub fn tags_eq(&self, other: &Secret) -> bool {
        self.tags == other.tags
    }
}
