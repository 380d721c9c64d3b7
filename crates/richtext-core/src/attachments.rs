use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{ATTR_ATTACHMENT_ID, Document, Node, VoidKind};

/// Opaque handle stored in attachment nodes in place of the file bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(String);

impl AttachmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AttachmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for AttachmentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub mime: Option<String>,
    pub bytes: Arc<[u8]>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Human readable size in kilobytes with one decimal, e.g. `1.5 KB`.
    pub fn size_label(&self) -> String {
        format!("{:.1} KB", self.len() as f64 / 1024.0)
    }
}

/// Session-owned blob store behind attachment nodes. Snapshots only carry
/// ids, so undo and redo never copy file contents.
#[derive(Debug, Clone, Default)]
pub struct AttachmentRegistry {
    blobs: HashMap<AttachmentId, Attachment>,
}

impl AttachmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: AttachmentId, attachment: Attachment) {
        log::debug!(
            "registered attachment {id} ({}, {} bytes)",
            attachment.name,
            attachment.len()
        );
        self.blobs.insert(id, attachment);
    }

    pub fn resolve(&self, id: &AttachmentId) -> Option<&Attachment> {
        self.blobs.get(id)
    }

    pub fn contains(&self, id: &AttachmentId) -> bool {
        self.blobs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn retain_referenced(&mut self, keep: &HashSet<AttachmentId>) -> usize {
        let before = self.blobs.len();
        self.blobs.retain(|id, _| keep.contains(id));
        before - self.blobs.len()
    }
}

pub fn referenced_attachments(doc: &Document) -> HashSet<AttachmentId> {
    fn walk(children: &[Node], out: &mut HashSet<AttachmentId>) {
        for node in children {
            match node {
                Node::Void(v) if v.kind == VoidKind::Attachment => {
                    if let Some(id) = v.attr_str(ATTR_ATTACHMENT_ID) {
                        out.insert(AttachmentId::from(id));
                    }
                }
                Node::Element(el) => walk(&el.children, out),
                _ => {}
            }
        }
    }

    let mut out = HashSet::new();
    walk(&doc.children, &mut out);
    out
}
