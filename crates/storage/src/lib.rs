//! Save and reload files inside an application's sandboxed storage areas.
//!
//! Saved files are referred to by home-relative paths (see [`paths::Locations::to_relative`])
//! so the handles callers persist keep working when the absolute home path changes.

pub mod config;
pub mod error;
pub mod fs;
pub mod paths;
pub mod store;

pub use error::StoreError;
pub use fs::{EntryKind, FileSystem, MemoryFileSystem, OsFileSystem};
pub use paths::Locations;
pub use store::{file_exists_at_path, open_file, PathStore, PendingSave};
pub use warehouse_core::{LocationKind, RelativePath, StoreConfig};
