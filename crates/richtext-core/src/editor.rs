use std::collections::HashSet;

use crate::attachments::{Attachment, AttachmentId, AttachmentRegistry, referenced_attachments};
use crate::config::{AttachmentRetention, EditorConfig};
use crate::core::{ATTR_ATTACHMENT_ID, Document, Node, NodeId, NodeIds, Path, VoidKind};
use crate::engine::{CommandContext, Edit, execute};
use crate::format::{FormatState, resolve_formats_with};
use crate::history::{History, HistoryEntry};
use crate::index::DocIndex;
use crate::inline::Affinity;
use crate::keymap::{KeyChord, Shortcut, shortcut_for};
use crate::normalize::normalize;
use crate::ops::Command;
use crate::position::{TextPosition, block_len, point_at, resolve_range, selection_for};
use crate::selection::{Point, Selection, SelectionTracker};
use crate::stats::TextStats;

/// Insertion point captured before an asynchronous payload (a file read,
/// a signature export) was requested.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingInsert {
    version: u64,
    selection: Option<Selection>,
}

/// One editing session: the live document, its selection, history and the
/// blobs behind attachment nodes.
pub struct Editor {
    doc: Document,
    index: DocIndex,
    ids: NodeIds,
    tracker: SelectionTracker,
    history: History,
    attachments: AttachmentRegistry,
    config: EditorConfig,
    version: u64,
    attached: bool,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Self {
        let mut ids = NodeIds::new();
        let doc = Document::empty(&mut ids);
        Self::from_document(doc, config)
    }

    pub fn from_document(mut doc: Document, config: EditorConfig) -> Self {
        let config = config.with_defaults();
        let mut ids = NodeIds::new();
        ids.observe(&doc);

        let mut selection = document_start(&doc)
            .unwrap_or_else(|| Selection::collapsed(Point::new(NodeId::default(), 0)));
        normalize(&mut doc, &mut selection, &mut ids);
        let selection = document_start(&doc).unwrap_or(selection);

        let index = DocIndex::new(&doc);
        let max_history = (config.max_history > 0).then_some(config.max_history);
        let history = History::new(HistoryEntry::capture(&doc, Some(selection.clone())))
            .with_limit(max_history);

        Self {
            doc,
            index,
            ids,
            tracker: SelectionTracker::new(selection),
            history,
            attachments: AttachmentRegistry::new(),
            config,
            version: 0,
            attached: true,
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.tracker.current()
    }

    pub fn saved_selection(&self) -> Option<&Selection> {
        self.tracker.saved()
    }

    pub fn is_focused(&self) -> bool {
        self.tracker.is_focused()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn attachments(&self) -> &AttachmentRegistry {
        &self.attachments
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Bumped by every change to the live document.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Marks the session as torn down; later commands and async
    /// completions are ignored.
    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn on_selection_change(&mut self, range: Option<Selection>) {
        self.tracker.on_selection_change(range, &self.index);
    }

    pub fn on_focus_change(&mut self, focused: bool) {
        self.tracker.on_focus_change(focused);
    }

    pub fn format_state(&self) -> FormatState {
        let mut state = match self.tracker.current() {
            Some(selection) => resolve_formats_with(
                &self.doc,
                &self.index,
                selection,
                &self.config.font_size_bands,
            ),
            None => FormatState::default(),
        };
        state.can_undo = self.history.can_undo();
        state.can_redo = self.history.can_redo();
        state
    }

    pub fn stats(&self) -> TextStats {
        TextStats::of(&self.doc)
    }

    pub fn dispatch(&mut self, command: Command) -> FormatState {
        if !self.attached {
            log::debug!("{} ignored: editor detached", command.name());
            return self.format_state();
        }
        match self.command_selection(&command) {
            Some(selection) => self.run(command, selection),
            None => log::debug!("{} skipped: no usable selection", command.name()),
        }
        self.format_state()
    }

    pub fn handle_shortcut(&mut self, chord: KeyChord) -> Option<FormatState> {
        let state = match shortcut_for(chord)? {
            Shortcut::Command(command) => self.dispatch(command),
            Shortcut::Undo => self.undo(),
            Shortcut::Redo => self.redo(),
        };
        Some(state)
    }

    pub fn undo(&mut self) -> FormatState {
        if self.attached {
            match self.history.undo().cloned() {
                Some(entry) => self.restore_entry(&entry),
                None => log::debug!("nothing to undo"),
            }
        }
        self.format_state()
    }

    pub fn redo(&mut self) -> FormatState {
        if self.attached {
            match self.history.redo().cloned() {
                Some(entry) => self.restore_entry(&entry),
                None => log::debug!("nothing to redo"),
            }
        }
        self.format_state()
    }

    pub fn resolve_attachment(&self, id: &AttachmentId) -> Option<&Attachment> {
        self.attachments.resolve(id)
    }

    pub fn attachment_for_node(&self, node: NodeId) -> Option<&Attachment> {
        let path = self.index.path(node)?;
        match self.doc.node(path)? {
            Node::Void(void) if void.kind == VoidKind::Attachment => {
                let id = void.attr_str(ATTR_ATTACHMENT_ID)?;
                self.attachments.resolve(&AttachmentId::from(id))
            }
            _ => None,
        }
    }

    /// Evicts blobs that neither the live document nor any history entry
    /// references. Returns the number evicted.
    pub fn prune_attachments(&mut self) -> usize {
        let mut keep: HashSet<AttachmentId> = referenced_attachments(&self.doc);
        for entry in self.history.entries() {
            keep.extend(entry.attachments().iter().cloned());
        }
        let evicted = self.attachments.retain_referenced(&keep);
        if evicted > 0 {
            log::debug!("evicted {evicted} unreferenced attachments");
        }
        evicted
    }

    pub fn begin_async_insert(&self) -> PendingInsert {
        PendingInsert {
            version: self.version,
            selection: self.tracker.current().cloned(),
        }
    }

    /// Finishes an insert started with [`Editor::begin_async_insert`].
    ///
    /// The captured selection is used only while the document is unchanged
    /// and the selection still resolves; otherwise the current selection,
    /// then the end of the document. A missing payload is a no-op.
    pub fn complete_async_insert(
        &mut self,
        pending: PendingInsert,
        command: Option<Command>,
    ) -> FormatState {
        if !self.attached {
            log::debug!("async insert dropped: editor detached");
            return self.format_state();
        }
        let Some(command) = command else {
            log::debug!("async insert produced no payload");
            return self.format_state();
        };

        let unchanged = pending.version == self.version;
        let target = pending
            .selection
            .filter(|s| unchanged && s.is_inside(&self.index))
            .or_else(|| {
                self.tracker
                    .current()
                    .filter(|s| s.is_inside(&self.index))
                    .cloned()
            })
            .or_else(|| document_end(&self.doc));
        match target {
            Some(selection) => self.run(command, selection),
            None => log::warn!("async insert has no insertion point"),
        }
        self.format_state()
    }

    fn command_selection(&mut self, command: &Command) -> Option<Selection> {
        if command.restores_saved_selection() && !self.tracker.is_focused() {
            return self.tracker.restore(&self.doc, &self.index);
        }
        self.tracker
            .current()
            .filter(|s| s.is_inside(&self.index))
            .cloned()
    }

    fn run(&mut self, command: Command, selection: Selection) {
        let name = command.name();
        let mut cx = CommandContext {
            ids: &mut self.ids,
            config: &self.config,
            attachments: &mut self.attachments,
        };
        match execute(&self.doc, &self.index, &selection, command, &mut cx) {
            Ok(edit) => self.commit(name, edit),
            Err(err) => log::debug!("{name} skipped: {err}"),
        }
    }

    fn commit(&mut self, name: &str, edit: Edit) {
        if edit.document == self.doc {
            log::debug!("{name} left the document unchanged");
            self.tracker.set_from_command(edit.selection);
            return;
        }
        self.carry_saved_selection(&edit.document);
        self.doc = edit.document;
        self.index = DocIndex::new(&self.doc);
        self.version += 1;
        self.tracker.set_from_command(edit.selection.clone());
        if edit.typing_only {
            log::debug!("{name} changed typing marks only");
            return;
        }
        self.history
            .commit(HistoryEntry::capture(&self.doc, Some(edit.selection)));
        log::debug!(
            "{name} committed, history at {}/{}",
            self.history.cursor() + 1,
            self.history.len()
        );
        if self.config.attachment_retention == AttachmentRetention::Reachable {
            self.prune_attachments();
        }
    }

    /// Moves the saved range onto `next` when the edit kept every text
    /// block and its length, so the range covers the same characters even
    /// though the runs under it were split or merged.
    fn carry_saved_selection(&mut self, next: &Document) {
        let Some(saved) = self.tracker.saved() else {
            return;
        };
        if block_lengths(&self.doc) != block_lengths(next) {
            return;
        }
        let carried = resolve_range(&self.doc, &self.index, saved)
            .and_then(|range| selection_for(next, &range));
        if let Some(carried) = carried {
            self.tracker.carry_saved(carried);
        }
    }

    fn restore_entry(&mut self, entry: &HistoryEntry) {
        let doc = match entry.restore() {
            Ok(doc) => doc,
            Err(err) => {
                log::error!("history entry failed to restore: {err}");
                return;
            }
        };
        self.ids.observe(&doc);
        self.doc = doc;
        self.index = DocIndex::new(&self.doc);
        self.version += 1;
        let selection = entry
            .selection()
            .filter(|s| s.is_inside(&self.index))
            .cloned()
            .or_else(|| document_start(&self.doc));
        if let Some(selection) = selection {
            self.tracker.set_from_command(selection);
        }
    }
}

fn block_lengths(doc: &Document) -> Vec<(Path, usize)> {
    doc.text_block_paths()
        .into_iter()
        .map(|path| {
            let len = block_len(doc, &path);
            (path, len)
        })
        .collect()
}

fn document_start(doc: &Document) -> Option<Selection> {
    let first = doc.text_block_paths().into_iter().next()?;
    point_at(doc, &TextPosition::new(first, 0), Affinity::Forward).map(Selection::collapsed)
}

fn document_end(doc: &Document) -> Option<Selection> {
    let last = doc.text_block_paths().pop()?;
    let len = block_len(doc, &last);
    point_at(doc, &TextPosition::new(last, len), Affinity::Backward).map(Selection::collapsed)
}
