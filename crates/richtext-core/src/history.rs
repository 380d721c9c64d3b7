use std::sync::Arc;

use crate::attachments::{AttachmentId, referenced_attachments};
use crate::core::Document;
use crate::error::SnapshotError;
use crate::selection::Selection;
use crate::serde_value::{deserialize, serialize};

/// One committed state: the serialized document plus the selection the
/// edit left behind.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    snapshot: Arc<str>,
    selection: Option<Selection>,
    attachments: Arc<[AttachmentId]>,
}

impl HistoryEntry {
    /// Snapshots `doc`. An encoding failure is logged and leaves an empty
    /// snapshot, which later fails to restore instead of panicking here.
    pub fn capture(doc: &Document, selection: Option<Selection>) -> Self {
        let snapshot = serialize(doc).unwrap_or_else(|err| {
            log::error!("failed to snapshot document: {err}");
            String::new()
        });
        let attachments: Vec<AttachmentId> = referenced_attachments(doc).into_iter().collect();
        Self {
            snapshot: snapshot.into(),
            selection,
            attachments: attachments.into(),
        }
    }

    pub fn snapshot(&self) -> &str {
        &self.snapshot
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn attachments(&self) -> &[AttachmentId] {
        &self.attachments
    }

    pub fn restore(&self) -> Result<Document, SnapshotError> {
        deserialize(&self.snapshot)
    }
}

/// Linear undo/redo over snapshots. `entries[0]` is the initial document
/// and `cursor` always indexes the entry matching the live document.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    max_entries: Option<usize>,
}

impl History {
    pub fn new(initial: HistoryEntry) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            max_entries: None,
        }
    }

    /// Bounds the stack; `None` or `Some(0)` keeps everything. The bound
    /// never drops `entries[0]`.
    pub fn with_limit(mut self, max_entries: Option<usize>) -> Self {
        self.max_entries = max_entries.filter(|max| *max > 0).map(|max| max.max(2));
        self
    }

    pub fn commit(&mut self, entry: HistoryEntry) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(entry);
        self.cursor = self.entries.len() - 1;

        if let Some(max) = self.max_entries {
            while self.entries.len() > max {
                self.entries.remove(1);
                self.cursor -= 1;
            }
        }
    }

    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.cursor)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }
}
