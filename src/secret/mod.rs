//! # Secret Model
//!
//! Secrets, their environments, and the values they carry.

pub mod environment;
pub mod filter;
pub mod model;
pub mod value;

pub use environment::{belongs_to, Environment};
pub use filter::{filter_by_tags, Filtered, TagFilter};
pub use model::{Secret, ENVIRONMENT_TAG};
pub use value::{SecretMap, Value};
