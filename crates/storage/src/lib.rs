//! Object storage targets.
//!
//! An [`ObjectStore`] receives local files under a `(bucket, key)` address.
//! Keys are `/`-separated and validated with [`validate_key`] before any
//! store touches them.

pub mod backend;
pub mod error;
mod key;

pub use crate::backend::ObjectStore;
pub use crate::key::{join_key, validate as validate_key};
