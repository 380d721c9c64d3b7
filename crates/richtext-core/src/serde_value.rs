use serde::{Deserialize, Serialize};

use crate::core::Document;
use crate::error::SnapshotError;

pub const SNAPSHOT_SCHEMA: &str = "manos-richtext";
pub const SNAPSHOT_VERSION: u32 = 1;

/// Versioned JSON envelope around a document. A payload without header
/// fields reads as the current schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentValue {
    #[serde(default = "DocumentValue::current_schema")]
    pub schema: String,
    #[serde(default = "DocumentValue::current_version")]
    pub version: u32,
    pub document: Document,
}

impl DocumentValue {
    fn current_schema() -> String {
        SNAPSHOT_SCHEMA.to_string()
    }

    fn current_version() -> u32 {
        SNAPSHOT_VERSION
    }

    pub fn new(document: Document) -> Self {
        Self {
            schema: Self::current_schema(),
            version: SNAPSHOT_VERSION,
            document,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.schema == SNAPSHOT_SCHEMA && self.version == SNAPSHOT_VERSION
    }

    pub fn into_document(self) -> Result<Document, SnapshotError> {
        if !self.is_supported() {
            return Err(SnapshotError::Unsupported {
                schema: self.schema,
                version: self.version,
            });
        }
        Ok(self.document)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(SnapshotError::Encode)
    }
}

/// Compact snapshot of `doc`. Equal documents always yield equal strings.
pub fn serialize(doc: &Document) -> Result<String, SnapshotError> {
    #[derive(Serialize)]
    struct Borrowed<'a> {
        schema: &'a str,
        version: u32,
        document: &'a Document,
    }

    let value = Borrowed {
        schema: SNAPSHOT_SCHEMA,
        version: SNAPSHOT_VERSION,
        document: doc,
    };
    serde_json::to_string(&value).map_err(SnapshotError::Encode)
}

pub fn deserialize(s: &str) -> Result<Document, SnapshotError> {
    serde_json::from_str::<DocumentValue>(s)
        .map_err(SnapshotError::Decode)?
        .into_document()
}
