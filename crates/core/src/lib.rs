//! Shared types for warehouse stores: where files live and how callers refer to them.

pub mod config;
pub mod kinds;

pub use config::StoreConfig;
pub use kinds::{LocationKind, RelativePath};
