use anyhow::{Context as _, Result};
use plexi_core::{
    defaults::{DEFAULT_MAX_PAYLOAD, DEFAULT_MAX_STATISTICS, DEFAULT_STORAGE},
    stats::Storage,
};
use serde::{Deserialize, Serialize};

/// Settings of a [`Plexi`] node.
///
/// ## Defaults
///
/// | Setting | Default |
/// |---------|---------|
/// | `max_statistics` | [`DEFAULT_MAX_STATISTICS`] |
/// | `max_payload` | [`DEFAULT_MAX_PAYLOAD`] |
/// | `storage` | [`DEFAULT_STORAGE`] |
///
/// ```
/// use plexi::Configuration;
/// use plexi_core::stats::Storage;
///
/// let configuration = Configuration::from_toml_str(
///     r#"
///     max_statistics = 16
///     storage = "packed"
///     "#,
/// )
/// .unwrap();
/// assert_eq!(configuration.max_statistics, 16);
/// assert_eq!(configuration.max_payload, 256);
/// assert_eq!(configuration.storage, Storage::Packed);
/// ```
///
/// [`Plexi`]: crate::Plexi
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Configuration {
    /// number of statistics records shared by all links
    pub max_statistics: usize,
    /// reassembly limit of block-wise writes, in bytes
    pub max_payload: usize,
    pub storage: Storage,
}

impl Configuration {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse plexi configuration")
    }

    pub fn set_max_statistics(mut self, max_statistics: usize) -> Self {
        self.max_statistics = max_statistics;
        self
    }

    pub fn set_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    pub fn set_storage(mut self, storage: Storage) -> Self {
        self.storage = storage;
        self
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            max_statistics: DEFAULT_MAX_STATISTICS,
            max_payload: DEFAULT_MAX_PAYLOAD,
            storage: DEFAULT_STORAGE,
        }
    }
}
