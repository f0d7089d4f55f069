//! # Environments
//!
//! The closed set of deployment environments a secret can be scoped to, and the
//! membership rule that decides whether a secret belongs to a sync target.
//!
//! | Name      | Production | Group |
//! |-----------|------------|-------|
//! | `dev`     | no         | no    |
//! | `test`    | no         | no    |
//! | `staging` | no         | no    |
//! | `prod`    | yes        | no    |
//! | `nonprod` | no         | yes   |
//! | `global`  | yes        | yes   |

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// A deployment environment or a group of environments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Environment {
    Dev,
    Test,
    Staging,
    Prod,
    /// Every non-production environment
    Nonprod,
    /// Every environment, production included
    Global,
}

impl Environment {
    /// All environments, in declaration order
    pub const ALL: [Environment; 6] = [
        Environment::Dev,
        Environment::Test,
        Environment::Staging,
        Environment::Prod,
        Environment::Nonprod,
        Environment::Global,
    ];

    /// Canonical lowercase name, also used as the secret name suffix
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Test => "test",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
            Environment::Nonprod => "nonprod",
            Environment::Global => "global",
        }
    }

    /// True for `prod` and for `global`, which encompasses production
    #[must_use]
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Prod | Environment::Global)
    }

    /// True for environments that stand for several deployable targets
    #[must_use]
    pub fn is_group(self) -> bool {
        matches!(self, Environment::Nonprod | Environment::Global)
    }

    /// Look up an environment by its exact name.
    ///
    /// Unknown names, the empty string included, yield `None`. This is not an
    /// error: a secret without a recognisable environment is simply out of scope.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|env| env.name() == name)
    }

    /// Suffix appended to secret names scoped to this environment, e.g. `-dev`
    #[must_use]
    pub fn name_suffix(self) -> String {
        format!("-{}", self.name())
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| ConfigError::UnknownEnvironment(s.to_string()))
    }
}

/// Decide whether a secret scoped to `secret_env` belongs to the sync target `target`.
///
/// Rules, first match wins:
/// 1. Either side absent: never in scope.
/// 2. Same environment.
/// 3. Either side is `global`.
/// 4. One side is `nonprod` and the other is not production.
#[must_use]
pub fn belongs_to(secret_env: Option<Environment>, target: Option<Environment>) -> bool {
    let (Some(secret_env), Some(target)) = (secret_env, target) else {
        return false;
    };

    if secret_env == target {
        return true;
    }

    if secret_env == Environment::Global || target == Environment::Global {
        return true;
    }

    (secret_env == Environment::Nonprod && !target.is_production())
        || (target == Environment::Nonprod && !secret_env.is_production())
}
