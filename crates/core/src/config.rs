use serde::{Deserialize, Serialize};

use crate::kinds::LocationKind;

/// Declarative description of one storage area.
///
/// ```json
/// { "location": "cache", "sub_directory": "thumbnails" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub location: LocationKind,
    pub sub_directory: Option<String>,
}

impl StoreConfig {
    pub fn new(location: LocationKind, sub_directory: Option<&str>) -> Self {
        Self {
            location,
            sub_directory: sub_directory.map(str::to_string),
        }
    }

    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
