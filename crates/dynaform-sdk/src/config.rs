use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Per-table request settings.
///
/// Every field has a default, so a TOML document only needs the keys it
/// changes:
///
/// ```toml
/// consistent_reads = true
/// page_size = 50
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Strongly consistent reads for gets, batch gets, scans and queries.
    pub consistent_reads: bool,
    /// Limit placed on each scan or query request.
    pub page_size: Option<u32>,
    /// Keys per batch-get call. The store accepts at most 100.
    pub batch_get_chunk: usize,
    /// Writes per batch-write call. The store accepts at most 25.
    pub batch_write_chunk: usize,
    /// Item budget for eager collection of a scan or query.
    pub max_items: Option<usize>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            consistent_reads: false,
            page_size: None,
            batch_get_chunk: 100,
            batch_write_chunk: 25,
            max_items: None,
        }
    }
}

impl TableConfig {
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SdkResult<()> {
        if self.batch_get_chunk == 0 || self.batch_get_chunk > dynaform_ops::MAX_BATCH_GET {
            return Err(SdkError::InvalidConfig(format!(
                "batch_get_chunk must be between 1 and {}",
                dynaform_ops::MAX_BATCH_GET
            )));
        }
        if self.batch_write_chunk == 0 || self.batch_write_chunk > dynaform_ops::MAX_BATCH_WRITE {
            return Err(SdkError::InvalidConfig(format!(
                "batch_write_chunk must be between 1 and {}",
                dynaform_ops::MAX_BATCH_WRITE
            )));
        }
        if self.page_size == Some(0) {
            return Err(SdkError::InvalidConfig("page_size must be positive".into()));
        }
        Ok(())
    }
}
