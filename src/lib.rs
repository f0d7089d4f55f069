//! # Secret Sync
//!
//! Reconciles the secrets of a source store into a destination store for one
//! deployment environment.
//!
//! A secret is scoped to an environment by a name suffix (`db-password-dev`) or
//! an `Environment` tag. A run fetches the source secrets that belong to the
//! target environment, trims the suffix when the target is a single
//! environment, and creates, updates or deletes destination secrets until both
//! sides match.
//!
//! - [`secret`]: environments, secrets and their values
//! - [`provider`]: the [`provider::SecretStore`] trait and its backends
//! - [`sync`]: scoping, planning and applying a sync run
//! - [`config`]: process configuration from environment variables
//! - [`observability`]: logging and Prometheus metrics

pub mod config;
pub mod constants;
pub mod error;
pub mod observability;
pub mod provider;
pub mod secret;
pub mod sync;
