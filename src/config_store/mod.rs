//! ConfigStore - persisted section/key/value settings
//!
//! ## Responsibilities
//!
//! - Sections of string keys holding JSON values
//! - Server registry entries (`server_1`, `server_2`, ...) live here
//! - Panel credentials (`panel.APIKey`)
//!
//! ## Backings
//!
//! - [`MemoryConfigStore`]: process-local, used by tests and dry runs
//! - [`SqliteConfigStore`]: `config(section, key, value)` table through sqlx
//!
//! Callers only see the [`ConfigStore`] trait, so the registry logic does not
//! care which backing is in use.

mod memory;
mod repository;
mod types;

pub use memory::MemoryConfigStore;
pub use repository::SqliteConfigStore;
pub use types::*;

use async_trait::async_trait;
use serde_json::Value;

/// Section-oriented persisted store
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Value at `section.key`, `None` when absent
    async fn get(&self, section: &str, key: &str) -> crate::Result<Option<Value>>;

    async fn set(&self, section: &str, key: &str, value: Value) -> crate::Result<()>;

    /// All keys of a section; empty when the section does not exist
    async fn get_section(&self, section: &str) -> crate::Result<SectionMap>;

    /// Names of every non-empty section
    async fn all_sections(&self) -> crate::Result<Vec<String>>;

    async fn delete_section(&self, section: &str) -> crate::Result<()>;

    /// Flush pending writes
    async fn save(&self) -> crate::Result<()>;

    /// Value at `section.key`, or `default` when absent
    async fn get_or(&self, section: &str, key: &str, default: Value) -> crate::Result<Value> {
        Ok(self.get(section, key).await?.unwrap_or(default))
    }

    /// Apply a batch of mutations in order. Backings with transactions
    /// override this to make the batch atomic.
    async fn apply(&self, ops: &[StoreOp]) -> crate::Result<()> {
        for op in ops {
            match op {
                StoreOp::Set {
                    section,
                    key,
                    value,
                } => self.set(section, key, value.clone()).await?,
                StoreOp::DeleteSection { section } => self.delete_section(section).await?,
            }
        }
        Ok(())
    }
}
