//! In-memory ConfigStore

use super::{ConfigStore, SectionMap, StoreOp};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Process-local store; counts writes so callers can observe no-op passes
#[derive(Default)]
pub struct MemoryConfigStore {
    sections: RwLock<BTreeMap<String, SectionMap>>,
    writes: AtomicUsize,
    saves: AtomicUsize,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from `(section, keys)` pairs without counting writes
    pub fn with_sections<I>(sections: I) -> Self
    where
        I: IntoIterator<Item = (String, SectionMap)>,
    {
        Self {
            sections: RwLock::new(sections.into_iter().collect()),
            ..Self::default()
        }
    }

    /// `set` + `delete_section` calls so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Copy of every section
    pub async fn snapshot(&self) -> BTreeMap<String, SectionMap> {
        self.sections.read().await.clone()
    }

    fn apply_locked(sections: &mut BTreeMap<String, SectionMap>, op: &StoreOp) {
        match op {
            StoreOp::Set {
                section,
                key,
                value,
            } => {
                sections
                    .entry(section.clone())
                    .or_default()
                    .insert(key.clone(), value.clone());
            }
            StoreOp::DeleteSection { section } => {
                sections.remove(section);
            }
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get(&self, section: &str, key: &str) -> crate::Result<Option<Value>> {
        Ok(self
            .sections
            .read()
            .await
            .get(section)
            .and_then(|s| s.get(key))
            .cloned())
    }

    async fn set(&self, section: &str, key: &str, value: Value) -> crate::Result<()> {
        let mut sections = self.sections.write().await;
        Self::apply_locked(&mut sections, &StoreOp::set(section, key, value));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_section(&self, section: &str) -> crate::Result<SectionMap> {
        Ok(self
            .sections
            .read()
            .await
            .get(section)
            .cloned()
            .unwrap_or_default())
    }

    async fn all_sections(&self) -> crate::Result<Vec<String>> {
        Ok(self
            .sections
            .read()
            .await
            .iter()
            .filter(|(_, keys)| !keys.is_empty())
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn delete_section(&self, section: &str) -> crate::Result<()> {
        let mut sections = self.sections.write().await;
        Self::apply_locked(&mut sections, &StoreOp::delete_section(section));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn save(&self) -> crate::Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn apply(&self, ops: &[StoreOp]) -> crate::Result<()> {
        let mut sections = self.sections.write().await;
        for op in ops {
            Self::apply_locked(&mut sections, op);
        }
        self.writes.fetch_add(ops.len(), Ordering::SeqCst);
        Ok(())
    }
}
