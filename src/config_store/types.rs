//! ConfigStore type definitions

use serde_json::Value;
use std::collections::BTreeMap;

/// Keys and values of one section
pub type SectionMap = BTreeMap<String, Value>;

/// Section holding panel credentials
pub const PANEL_SECTION: &str = "panel";

/// Panel API token key inside [`PANEL_SECTION`]
pub const PANEL_API_KEY: &str = "APIKey";

/// One staged store mutation
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Set {
        section: String,
        key: String,
        value: Value,
    },
    DeleteSection {
        section: String,
    },
}

impl StoreOp {
    pub fn set(section: impl Into<String>, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Set {
            section: section.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete_section(section: impl Into<String>) -> Self {
        Self::DeleteSection {
            section: section.into(),
        }
    }

    pub fn section(&self) -> &str {
        match self {
            Self::Set { section, .. } | Self::DeleteSection { section } => section,
        }
    }
}
