//! Applies commands to a working copy of the document.
//!
//! Every command resolves the selection into text-block positions, edits a
//! clone of the document, and hands back the normalized result together
//! with the selection the edit leaves behind. Failures leave nothing
//! behind; the caller keeps its document untouched.

use crate::attachments::{Attachment, AttachmentId, AttachmentRegistry};
use crate::config::EditorConfig;
use crate::core::{
    ATTR_ALIGN, ATTR_ALT, ATTR_ATTACHMENT_ID, ATTR_LEVEL, ATTR_LIST_KIND, ATTR_MIME, ATTR_NAME,
    ATTR_REL, ATTR_SIZE, ATTR_SIZE_LABEL, ATTR_SRC, ATTR_TARGET, ATTR_URL, Alignment, Attrs,
    Document, ElementKind, ElementNode, ListKind, Marks, Node, NodeId, NodeIds, Path, TextNode,
    VoidKind,
};
use crate::error::CommandError;
use crate::format::all_runs_have;
use crate::index::{DocIndex, enclosing_list, enclosing_list_item};
use crate::inline::{
    Affinity, clamp_to_char_boundary, extract_range, inline_len_all, leaves, map_text_marks,
    prev_char_boundary, split_inlines, strip_font_size, unwrap_elements,
};
use crate::normalize::normalize;
use crate::ops::{ColorChannel, Command, ImageData, MarkKind};
use crate::position::{
    BlockSlice, TextPosition, TextRange, block_len, block_slices, point_at, resolve_range,
    selection_for, text_blocks_between,
};
use crate::selection::{Point, Selection};

pub struct CommandContext<'a> {
    pub ids: &'a mut NodeIds,
    pub config: &'a EditorConfig,
    pub attachments: &'a mut AttachmentRegistry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edit {
    pub document: Document,
    pub selection: Selection,
    /// Only the typing marks at a collapsed caret changed; nothing visible
    /// did, so the edit is kept out of history.
    pub typing_only: bool,
}

pub fn execute(
    doc: &Document,
    index: &DocIndex,
    selection: &Selection,
    command: Command,
    cx: &mut CommandContext<'_>,
) -> Result<Edit, CommandError> {
    if !selection.is_inside(index) {
        return Err(CommandError::OutsideRoot);
    }
    let mut draft = Draft {
        doc: doc.clone(),
        index: index.clone(),
        selection: selection.clone(),
        typing_only: false,
    };
    let ids = &mut *cx.ids;
    let mut blob = None;

    match command {
        Command::ToggleMark(kind) => draft.toggle_mark(kind, ids)?,
        Command::SetAlignment(alignment) => draft.set_alignment(alignment)?,
        Command::SetFontSize(px) => draft.set_font_size(px, ids)?,
        Command::SetListType(kind) => draft.set_list_type(kind, ids)?,
        Command::SetColor(channel, color) => draft.set_color(channel, color, ids)?,
        Command::InsertLink(url) => {
            let url = normalize_link_url(&url, &cx.config.default_link_scheme)
                .ok_or(CommandError::EmptyInput("link url"))?;
            draft.insert_link(url, cx.config, ids)?
        }
        Command::RemoveLink => draft.remove_link(ids)?,
        Command::InsertAttachment(attachment) => {
            let id = draft.insert_attachment(&attachment, ids)?;
            blob = Some((id, attachment));
        }
        Command::InsertSignatureImage(image) => draft.insert_image(&image, "Signature", ids)?,
        Command::InsertImage { image, alt } => draft.insert_image(&image, &alt, ids)?,
        Command::InsertEmoji(symbol) => draft.insert_text(&symbol, "emoji", ids)?,
        Command::InsertText(text) => draft.insert_text(&text, "text", ids)?,
        Command::InsertLineBreak => {
            let node = Node::void(ids, VoidKind::LineBreak, Attrs::default());
            draft.insert_at_caret(node, ids)?
        }
        Command::SplitBlock => draft.split_block(ids)?,
        Command::DeleteBackward => draft.delete_backward(ids)?,
        Command::DeleteSelection => {
            let range = draft.range()?;
            if range.is_collapsed() {
                return Err(CommandError::NotApplicable("nothing is selected"));
            }
            draft.delete_range(range, ids)?;
        }
        Command::RemoveList => draft.remove_list(ids)?,
        Command::IndentListItem => draft.indent_list_items(ids)?,
        Command::OutdentListItem => draft.outdent_list_items(ids)?,
        Command::SetHeading(level) => draft.set_heading(level)?,
    }

    let edit = draft.finish(ids);
    if let Some((id, attachment)) = blob {
        cx.attachments.register(id, attachment);
    }
    Ok(edit)
}

/// Trims `raw` and prefixes `default_scheme` unless it already names an
/// http(s) scheme. Returns `None` for blank input.
pub fn normalize_link_url(raw: &str, default_scheme: &str) -> Option<String> {
    let url = raw.trim();
    if url.is_empty() {
        return None;
    }
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(url.to_string())
    } else {
        Some(format!("{default_scheme}{url}"))
    }
}

struct Draft {
    doc: Document,
    index: DocIndex,
    selection: Selection,
    typing_only: bool,
}

fn invalid(path: &[usize]) -> CommandError {
    CommandError::InvalidPath(path.to_vec())
}

impl Draft {
    fn finish(mut self, ids: &mut NodeIds) -> Edit {
        normalize(&mut self.doc, &mut self.selection, ids);
        Edit {
            document: self.doc,
            selection: self.selection,
            typing_only: self.typing_only,
        }
    }

    fn reindex(&mut self) {
        self.index = DocIndex::new(&self.doc);
    }

    fn range(&self) -> Result<TextRange, CommandError> {
        resolve_range(&self.doc, &self.index, &self.selection).ok_or(CommandError::OutsideRoot)
    }

    fn children_mut(&mut self, path: &[usize]) -> Result<&mut Vec<Node>, CommandError> {
        self.doc.children_mut(path).ok_or_else(|| invalid(path))
    }

    fn element_mut(&mut self, path: &[usize]) -> Result<&mut ElementNode, CommandError> {
        self.doc.element_mut(path).ok_or_else(|| invalid(path))
    }

    fn select(&mut self, range: &TextRange) -> Result<(), CommandError> {
        self.selection =
            selection_for(&self.doc, range).ok_or_else(|| invalid(&range.start.block))?;
        Ok(())
    }

    /// Path of the run holding the caret and the byte offset inside it.
    fn caret_run(&self, range: &TextRange) -> Result<(Path, usize), CommandError> {
        let focus = &self.selection.focus;
        if let Some(path) = self.index.path(focus.node) {
            if let Some(Node::Text(run)) = self.doc.node(path) {
                return Ok((path.clone(), clamp_to_char_boundary(&run.text, focus.offset)));
            }
        }
        let point = point_at(&self.doc, &range.start, Affinity::Backward)
            .ok_or_else(|| invalid(&range.start.block))?;
        let path = self
            .doc
            .find_path(point.node)
            .ok_or_else(|| invalid(&range.start.block))?;
        Ok((path, point.offset))
    }

    fn caret_marks(&self, range: &TextRange) -> Result<Marks, CommandError> {
        let (path, _) = self.caret_run(range)?;
        match self.doc.node(&path) {
            Some(Node::Text(run)) => Ok(run.marks.clone()),
            _ => Err(invalid(&path)),
        }
    }

    /// Splits the caret run and parks the caret in a new empty run whose
    /// marks are `apply`'d; the next typed text picks them up.
    fn retag_caret(
        &mut self,
        range: &TextRange,
        ids: &mut NodeIds,
        apply: &dyn Fn(&mut Marks),
    ) -> Result<(), CommandError> {
        let (path, offset) = self.caret_run(range)?;
        self.typing_only = true;
        let (&leaf_ix, parent) = path.split_last().ok_or_else(|| invalid(&path))?;
        let children = self.children_mut(parent)?;
        let Some(Node::Text(run)) = children.get_mut(leaf_ix) else {
            return Err(invalid(&path));
        };
        if run.text.is_empty() {
            apply(&mut run.marks);
            let id = run.id;
            self.selection = Selection::collapsed(Point::new(id, 0));
            return Ok(());
        }

        let mut marks = run.marks.clone();
        apply(&mut marks);
        let tail = TextNode {
            id: ids.fresh(),
            text: run.text.split_off(offset),
            marks: run.marks.clone(),
        };
        let typing = TextNode {
            id: ids.fresh(),
            text: String::new(),
            marks,
        };
        let typing_id = typing.id;
        let mut at = leaf_ix + 1;
        children.insert(at, Node::Text(typing));
        if !tail.text.is_empty() {
            at += 1;
            children.insert(at, Node::Text(tail));
        }
        self.selection = Selection::collapsed(Point::new(typing_id, 0));
        Ok(())
    }

    /// Applies `apply` to the marks of exactly the selected content,
    /// splitting runs at the range edges.
    fn restyle_range(
        &mut self,
        range: &TextRange,
        slices: Vec<BlockSlice>,
        ids: &mut NodeIds,
        apply: &dyn Fn(&mut Marks),
    ) -> Result<(), CommandError> {
        for slice in slices.into_iter().filter(|s| !s.is_empty()) {
            let children = self.children_mut(&slice.path)?;
            let (mut before, mut middle, after) =
                extract_range(std::mem::take(children), slice.start, slice.end, ids);
            map_text_marks(&mut middle, apply);
            before.extend(middle);
            before.extend(after);
            *children = before;
        }
        self.select(range)
    }

    fn wrap_range(
        &mut self,
        range: &TextRange,
        ids: &mut NodeIds,
        wrap: &dyn Fn(&mut NodeIds, Vec<Node>) -> Node,
    ) -> Result<(), CommandError> {
        for slice in block_slices(&self.doc, range).into_iter().filter(|s| !s.is_empty()) {
            let children = self.children_mut(&slice.path)?;
            let (mut before, middle, after) =
                extract_range(std::mem::take(children), slice.start, slice.end, ids);
            before.push(wrap(ids, middle));
            before.extend(after);
            *children = before;
        }
        self.select(range)
    }

    fn toggle_mark(&mut self, kind: MarkKind, ids: &mut NodeIds) -> Result<(), CommandError> {
        let range = self.range()?;
        if range.is_collapsed() {
            return self.retag_caret(&range, ids, &|marks: &mut Marks| {
                let value = !kind.get(marks);
                kind.set(marks, value);
            });
        }
        let slices = block_slices(&self.doc, &range);
        let value = !all_runs_have(&self.doc, &slices, |marks| kind.get(marks));
        self.restyle_range(&range, slices, ids, &|marks: &mut Marks| {
            kind.set(marks, value)
        })
    }

    fn set_color(
        &mut self,
        channel: ColorChannel,
        color: Option<String>,
        ids: &mut NodeIds,
    ) -> Result<(), CommandError> {
        if color.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(CommandError::EmptyInput("color"));
        }
        let apply = |marks: &mut Marks| match channel {
            ColorChannel::Text => marks.text_color = color.clone(),
            ColorChannel::Highlight => marks.highlight_color = color.clone(),
        };
        let range = self.range()?;
        if range.is_collapsed() {
            return self.retag_caret(&range, ids, &apply);
        }
        let slices = block_slices(&self.doc, &range);
        self.restyle_range(&range, slices, ids, &apply)
    }

    fn set_alignment(&mut self, alignment: Alignment) -> Result<(), CommandError> {
        let range = self.range()?;
        for slice in block_slices(&self.doc, &range) {
            let block = self.element_mut(&slice.path)?;
            match alignment {
                Alignment::Left => {
                    block.remove_attr(ATTR_ALIGN);
                }
                other => block.set_attr(ATTR_ALIGN, other.as_str()),
            }
        }
        Ok(())
    }

    fn set_heading(&mut self, level: Option<u8>) -> Result<(), CommandError> {
        let range = self.range()?;
        for slice in block_slices(&self.doc, &range) {
            let block = self.element_mut(&slice.path)?;
            match level {
                Some(level) => {
                    block.kind = ElementKind::Heading;
                    block.set_attr(ATTR_LEVEL, level.clamp(1, 6));
                }
                None => {
                    block.kind = ElementKind::Paragraph;
                    block.remove_attr(ATTR_LEVEL);
                }
            }
        }
        Ok(())
    }

    fn set_font_size(&mut self, px: u32, ids: &mut NodeIds) -> Result<(), CommandError> {
        if px == 0 {
            return Err(CommandError::EmptyInput("font size"));
        }
        let range = self.range()?;
        if range.is_collapsed() {
            let mut marks = self.caret_marks(&range)?;
            marks.font_size = None;
            let marker_text = Node::text(ids, "", marks);
            let marker_text_id = marker_text.id();
            let marker = Node::span_with_font_size(ids, px, vec![marker_text]);
            self.insert_inline(&range, marker, ids)?;
            self.typing_only = true;
            self.selection = Selection::collapsed(Point::new(marker_text_id, 0));
            return Ok(());
        }
        self.wrap_range(&range, ids, &|ids: &mut NodeIds, content: Vec<Node>| {
            Node::span_with_font_size(ids, px, strip_font_size(content))
        })
    }

    fn insert_link(
        &mut self,
        url: String,
        config: &EditorConfig,
        ids: &mut NodeIds,
    ) -> Result<(), CommandError> {
        let mut attrs = Attrs::default();
        attrs.insert(ATTR_URL.to_string(), url.clone().into());
        attrs.insert(ATTR_TARGET.to_string(), config.link_target.clone().into());
        attrs.insert(ATTR_REL.to_string(), config.link_rel.clone().into());

        let range = self.range()?;
        if range.is_collapsed() {
            let marks = self.caret_marks(&range)?;
            let label = Node::text(ids, url, marks);
            let link = Node::element(ids, ElementKind::Link, attrs, vec![label]);
            self.insert_inline(&range, link, ids)?;
            return Ok(());
        }
        self.wrap_range(&range, ids, &|ids: &mut NodeIds, content: Vec<Node>| {
            let content = unwrap_elements(content, ElementKind::Link);
            Node::element(ids, ElementKind::Link, attrs.clone(), content)
        })
    }

    fn remove_link(&mut self, ids: &mut NodeIds) -> Result<(), CommandError> {
        let range = self.range()?;
        if !range.is_collapsed() {
            for slice in block_slices(&self.doc, &range).into_iter().filter(|s| !s.is_empty()) {
                let children = self.children_mut(&slice.path)?;
                let (mut before, middle, after) =
                    extract_range(std::mem::take(children), slice.start, slice.end, ids);
                before.extend(unwrap_elements(middle, ElementKind::Link));
                before.extend(after);
                *children = before;
            }
            return self.select(&range);
        }

        let (path, _) = self.caret_run(&range)?;
        let link_path = (1..path.len())
            .rev()
            .map(|len| &path[..len])
            .find(|p| {
                self.doc
                    .element(p)
                    .is_some_and(|el| el.kind == ElementKind::Link)
            })
            .map(<[usize]>::to_vec)
            .ok_or(CommandError::NotApplicable("caret is not inside a link"))?;
        let (&ix, parent) = link_path.split_last().ok_or_else(|| invalid(&link_path))?;
        let siblings = self.children_mut(parent)?;
        let Node::Element(link) = siblings.remove(ix) else {
            return Err(invalid(&link_path));
        };
        siblings.splice(ix..ix, link.children);
        Ok(())
    }

    /// Inserts an inline node at the caret of a collapsed `range`, splitting
    /// the caret run in place so enclosing inline elements stay intact. The
    /// caret ends up right after the node.
    fn insert_inline(
        &mut self,
        range: &TextRange,
        node: Node,
        ids: &mut NodeIds,
    ) -> Result<(), CommandError> {
        let (path, offset) = self.caret_run(range)?;
        let (&leaf_ix, parent) = path.split_last().ok_or_else(|| invalid(&path))?;
        let children = self.children_mut(parent)?;
        let Some(Node::Text(run)) = children.get_mut(leaf_ix) else {
            return Err(invalid(&path));
        };
        let right = TextNode {
            id: ids.fresh(),
            text: run.text.split_off(offset),
            marks: run.marks.clone(),
        };
        let right_id = right.id;
        children.splice(leaf_ix + 1..leaf_ix + 1, [node, Node::Text(right)]);
        self.selection = Selection::collapsed(Point::new(right_id, 0));
        Ok(())
    }

    fn insert_at_caret(&mut self, node: Node, ids: &mut NodeIds) -> Result<(), CommandError> {
        let mut range = self.range()?;
        if !range.is_collapsed() {
            range = self.delete_range(range, ids)?;
        }
        self.insert_inline(&range, node, ids)
    }

    fn insert_text(
        &mut self,
        text: &str,
        what: &'static str,
        ids: &mut NodeIds,
    ) -> Result<(), CommandError> {
        if text.is_empty() {
            return Err(CommandError::EmptyInput(what));
        }
        let mut range = self.range()?;
        if !range.is_collapsed() {
            range = self.delete_range(range, ids)?;
        }
        let (path, offset) = self.caret_run(&range)?;
        let Some(Node::Text(run)) = self.doc.node_mut(&path) else {
            return Err(invalid(&path));
        };
        run.text.insert_str(offset, text);
        let id = run.id;
        self.selection = Selection::collapsed(Point::new(id, offset + text.len()));
        Ok(())
    }

    fn insert_attachment(
        &mut self,
        attachment: &Attachment,
        ids: &mut NodeIds,
    ) -> Result<AttachmentId, CommandError> {
        if attachment.is_empty() {
            return Err(CommandError::EmptyInput("attachment"));
        }
        let id = AttachmentId::new();
        let mut attrs = Attrs::default();
        attrs.insert(ATTR_ATTACHMENT_ID.to_string(), id.as_str().into());
        attrs.insert(ATTR_NAME.to_string(), attachment.name.clone().into());
        attrs.insert(ATTR_SIZE.to_string(), (attachment.len() as u64).into());
        attrs.insert(ATTR_SIZE_LABEL.to_string(), attachment.size_label().into());
        if let Some(mime) = &attachment.mime {
            attrs.insert(ATTR_MIME.to_string(), mime.clone().into());
        }
        let node = Node::void(ids, VoidKind::Attachment, attrs);
        self.insert_at_caret(node, ids)?;
        Ok(id)
    }

    fn insert_image(
        &mut self,
        image: &ImageData,
        alt: &str,
        ids: &mut NodeIds,
    ) -> Result<(), CommandError> {
        if image.is_empty() {
            return Err(CommandError::EmptyInput("image"));
        }
        let mut attrs = Attrs::default();
        attrs.insert(ATTR_SRC.to_string(), image.to_data_url().into());
        attrs.insert(ATTR_ALT.to_string(), alt.into());
        attrs.insert(ATTR_MIME.to_string(), image.mime.clone().into());
        let node = Node::void(ids, VoidKind::Image, attrs);
        self.insert_at_caret(node, ids)
    }

    /// Removes the content of `range` and returns the collapsed range left
    /// at its start. Blocks fully inside the range disappear; the first and
    /// last block are joined.
    fn delete_range(
        &mut self,
        range: TextRange,
        ids: &mut NodeIds,
    ) -> Result<TextRange, CommandError> {
        let caret = TextRange::caret(range.start.clone());
        if range.is_collapsed() {
            return Ok(caret);
        }
        let (start, end) = (range.start, range.end);
        if start.block == end.block {
            let children = self.children_mut(&start.block)?;
            let (mut before, _, after) =
                extract_range(std::mem::take(children), start.offset, end.offset, ids);
            before.extend(after);
            *children = before;
        } else {
            let end_children = self.children_mut(&end.block)?;
            let (_, tail) = split_inlines(std::mem::take(end_children), end.offset, ids);
            let start_children = self.children_mut(&start.block)?;
            let (mut head, _) = split_inlines(std::mem::take(start_children), start.offset, ids);
            head.extend(tail);
            *start_children = head;

            let doomed = text_blocks_between(&self.doc, &start.block, &end.block);
            for path in doomed.iter().rev().filter(|p| **p != start.block) {
                self.remove_node(path)?;
            }
        }
        self.reindex();
        self.select(&caret)?;
        Ok(caret)
    }

    fn remove_node(&mut self, path: &[usize]) -> Result<Node, CommandError> {
        let (&ix, parent) = path.split_last().ok_or_else(|| invalid(path))?;
        let siblings = self.children_mut(parent)?;
        if ix >= siblings.len() {
            return Err(invalid(path));
        }
        Ok(siblings.remove(ix))
    }

    fn split_block(&mut self, ids: &mut NodeIds) -> Result<(), CommandError> {
        let mut range = self.range()?;
        if !range.is_collapsed() {
            range = self.delete_range(range, ids)?;
        }
        let pos = range.start.clone();
        let item = enclosing_list_item(&self.doc, &pos.block);
        let first_in_item = pos.block.last() == Some(&0);

        // Enter in an empty list item leaves the list.
        if let Some(item) = &item {
            if first_in_item && block_len(&self.doc, &pos.block) == 0 {
                return self.outdent_item(item, ids);
            }
        }

        let marks = self.caret_marks(&range)?;
        let block = self.element_mut(&pos.block)?;
        let (left, mut right) = split_inlines(std::mem::take(&mut block.children), pos.offset, ids);
        block.children = left;
        if !leaves(&right).iter().any(|l| l.is_text) {
            right.insert(0, Node::text(ids, "", marks));
        }
        let mut kind = block.kind;
        let mut attrs = block.attrs.clone();
        if kind == ElementKind::Heading && inline_len_all(&right) == 0 {
            kind = ElementKind::Paragraph;
            attrs.remove(ATTR_LEVEL);
        }
        let new_block = Node::element(ids, kind, attrs, right);
        let new_id = new_block.id();

        match item {
            Some(item) if first_in_item => {
                let (&item_ix, list) = item.split_last().ok_or_else(|| invalid(&item))?;
                let old_item = self.element_mut(&item)?;
                let mut moved = vec![new_block];
                moved.extend(old_item.children.drain(1..));
                let new_item = Node::list_item(ids, moved);
                self.children_mut(list)?.insert(item_ix + 1, new_item);
            }
            _ => {
                let (&ix, parent) = pos.block.split_last().ok_or_else(|| invalid(&pos.block))?;
                self.children_mut(parent)?.insert(ix + 1, new_block);
            }
        }

        self.reindex();
        let path = self.index.path(new_id).cloned().ok_or_else(|| invalid(&pos.block))?;
        let caret = point_at(&self.doc, &TextPosition::new(path.clone(), 0), Affinity::Forward)
            .ok_or_else(|| invalid(&path))?;
        self.selection = Selection::collapsed(caret);
        Ok(())
    }

    fn delete_backward(&mut self, ids: &mut NodeIds) -> Result<(), CommandError> {
        let range = self.range()?;
        if !range.is_collapsed() {
            self.delete_range(range, ids)?;
            return Ok(());
        }
        let pos = range.start;
        if pos.offset > 0 {
            let block = self.doc.element(&pos.block).ok_or_else(|| invalid(&pos.block))?;
            let leaves = leaves(&block.children);
            let leaf = leaves
                .iter()
                .find(|l| l.start < pos.offset && pos.offset <= l.end)
                .ok_or_else(|| invalid(&pos.block))?;
            let start = if leaf.is_text {
                let mut path = pos.block.clone();
                path.extend(&leaf.path);
                let Some(Node::Text(run)) = self.doc.node(&path) else {
                    return Err(invalid(&path));
                };
                leaf.start + prev_char_boundary(&run.text, pos.offset - leaf.start)
            } else {
                leaf.start
            };
            let doomed = TextRange {
                start: TextPosition::new(pos.block.clone(), start),
                end: pos,
                anchor_is_start: true,
            };
            self.delete_range(doomed, ids)?;
            return Ok(());
        }

        // Backspace at the start of a list item lifts it out of the list.
        if pos.block.last() == Some(&0) {
            if let Some(item) = enclosing_list_item(&self.doc, &pos.block) {
                return self.outdent_item(&item, ids);
            }
        }

        let blocks = self.doc.text_block_paths();
        let ix = blocks
            .iter()
            .position(|p| *p == pos.block)
            .ok_or_else(|| invalid(&pos.block))?;
        if ix == 0 {
            return Err(CommandError::NotApplicable("caret is at the start of the document"));
        }
        let into = blocks[ix - 1].clone();
        let joined_at = block_len(&self.doc, &into);
        let Node::Element(removed) = self.remove_node(&pos.block)? else {
            return Err(invalid(&pos.block));
        };
        self.element_mut(&into)?.children.extend(removed.children);
        self.reindex();
        let joined = TextPosition::new(into.clone(), joined_at);
        let caret = point_at(&self.doc, &joined, Affinity::Backward).ok_or_else(|| invalid(&into))?;
        self.selection = Selection::collapsed(caret);
        Ok(())
    }

    fn set_list_type(&mut self, kind: ListKind, ids: &mut NodeIds) -> Result<(), CommandError> {
        let range = self.range()?;
        let structural = match kind {
            ListKind::OrderedAlpha => ListKind::OrderedNumeric,
            other => other,
        };

        let mut block_ids: Vec<NodeId> = Vec::new();
        let mut containers: Vec<Path> = Vec::new();
        let mut loose: Vec<Path> = Vec::new();
        for slice in block_slices(&self.doc, &range) {
            if let Some(el) = self.doc.element(&slice.path) {
                block_ids.push(el.id);
            }
            match enclosing_list_item(&self.doc, &slice.path) {
                Some(item) => {
                    let list = item[..item.len() - 1].to_vec();
                    if !containers.contains(&list) {
                        containers.push(list);
                    }
                }
                None => loose.push(slice.path),
            }
        }

        for list in &containers {
            self.element_mut(list)?
                .set_attr(ATTR_LIST_KIND, structural.as_str());
        }

        // Runs of consecutive sibling blocks become one list each.
        let mut runs: Vec<(Path, usize, usize)> = Vec::new();
        for path in loose {
            let Some((&ix, parent)) = path.split_last() else {
                continue;
            };
            if let Some((run_parent, _, last)) = runs.last_mut() {
                if run_parent.as_slice() == parent && *last + 1 == ix {
                    *last = ix;
                    continue;
                }
            }
            runs.push((parent.to_vec(), ix, ix));
        }
        for (parent, first, last) in runs.into_iter().rev() {
            let siblings = self.children_mut(&parent)?;
            let blocks: Vec<Node> = siblings.drain(first..=last).collect();
            let items = blocks
                .into_iter()
                .map(|block| Node::list_item(ids, vec![block]))
                .collect();
            let list = Node::list(ids, structural, items);
            siblings.insert(first, list);
        }
        self.reindex();

        if kind == ListKind::OrderedAlpha {
            let mut found = false;
            for id in block_ids {
                let Some(path) = self.index.path(id).cloned() else {
                    continue;
                };
                if let Some(list) = enclosing_list(&self.doc, &path) {
                    self.element_mut(&list)?
                        .set_attr(ATTR_LIST_KIND, ListKind::OrderedAlpha.as_str());
                    found = true;
                }
            }
            if !found {
                log::warn!("no list container found after conversion, keeping numeric markers");
            }
        }
        Ok(())
    }

    /// Ids of the list items directly holding the selected blocks, in
    /// document order.
    fn selected_items(&self) -> Result<Vec<NodeId>, CommandError> {
        let range = self.range()?;
        let mut items = Vec::new();
        for slice in block_slices(&self.doc, &range) {
            let Some(item) = enclosing_list_item(&self.doc, &slice.path) else {
                continue;
            };
            if let Some(el) = self.doc.element(&item) {
                if !items.contains(&el.id) {
                    items.push(el.id);
                }
            }
        }
        Ok(items)
    }

    fn indent_list_items(&mut self, ids: &mut NodeIds) -> Result<(), CommandError> {
        self.for_each_item(ids, "indent", Self::indent_item)
    }

    fn outdent_list_items(&mut self, ids: &mut NodeIds) -> Result<(), CommandError> {
        self.for_each_item(ids, "outdent", Self::outdent_item)
    }

    fn for_each_item(
        &mut self,
        ids: &mut NodeIds,
        what: &'static str,
        op: fn(&mut Self, &[usize], &mut NodeIds) -> Result<(), CommandError>,
    ) -> Result<(), CommandError> {
        let items = self.selected_items()?;
        if items.is_empty() {
            return Err(CommandError::NotApplicable("selection is not in a list"));
        }
        let mut applied = 0usize;
        for id in items {
            let Some(path) = self.index.path(id).cloned() else {
                continue;
            };
            match op(self, &path, ids) {
                Ok(()) => applied += 1,
                Err(err) => log::debug!("{what} skipped item: {err}"),
            }
        }
        if applied == 0 {
            return Err(CommandError::NotApplicable("no list item could be moved"));
        }
        Ok(())
    }

    fn indent_item(&mut self, item: &[usize], ids: &mut NodeIds) -> Result<(), CommandError> {
        let (&ix, list) = item.split_last().ok_or_else(|| invalid(item))?;
        if ix == 0 {
            return Err(CommandError::NotApplicable("first list item cannot be indented"));
        }
        let attrs = self.element_mut(list)?.attrs.clone();
        let moved = self.remove_node(item)?;
        let mut prev_path = list.to_vec();
        prev_path.push(ix - 1);
        let prev = self.element_mut(&prev_path)?;
        match prev.children.last_mut() {
            Some(Node::Element(nested)) if nested.kind == ElementKind::List => {
                nested.children.push(moved);
            }
            _ => prev.children.push(Node::Element(ElementNode {
                id: ids.fresh(),
                kind: ElementKind::List,
                attrs,
                children: vec![moved],
            })),
        }
        self.reindex();
        Ok(())
    }

    /// Lifts the item one level. Items after it move into a list of their
    /// own so document order is preserved; at the top level the item's
    /// blocks replace it.
    fn outdent_item(&mut self, item: &[usize], ids: &mut NodeIds) -> Result<(), CommandError> {
        let (&ix, list_path) = item.split_last().ok_or_else(|| invalid(item))?;
        let (&list_ix, list_parent) = list_path.split_last().ok_or_else(|| invalid(item))?;
        let list = self.element_mut(list_path)?;
        let attrs = list.attrs.clone();
        let mut items = std::mem::take(&mut list.children);
        if ix >= items.len() {
            list.children = items;
            return Err(invalid(item));
        }
        let tail = items.split_off(ix + 1);
        let moved = items.pop();
        list.children = items;
        let Some(Node::Element(mut moved)) = moved else {
            return Err(invalid(item));
        };
        let tail_list = (!tail.is_empty()).then(|| {
            Node::Element(ElementNode {
                id: ids.fresh(),
                kind: ElementKind::List,
                attrs,
                children: tail,
            })
        });

        let nested = !list_parent.is_empty()
            && self
                .doc
                .element(list_parent)
                .is_some_and(|el| el.kind == ElementKind::ListItem);
        if nested {
            moved.children.extend(tail_list);
            let (&parent_ix, outer_list) = list_parent.split_last().ok_or_else(|| invalid(item))?;
            self.children_mut(outer_list)?
                .insert(parent_ix + 1, Node::Element(moved));
        } else {
            let siblings = self.children_mut(list_parent)?;
            let at = list_ix + 1;
            siblings.splice(at..at, moved.children.into_iter().chain(tail_list));
        }
        self.reindex();
        Ok(())
    }

    fn remove_list(&mut self, ids: &mut NodeIds) -> Result<(), CommandError> {
        let range = self.range()?;
        let blocks: Vec<NodeId> = block_slices(&self.doc, &range)
            .iter()
            .filter(|s| enclosing_list(&self.doc, &s.path).is_some())
            .filter_map(|s| self.doc.element(&s.path).map(|el| el.id))
            .collect();
        if blocks.is_empty() {
            return Err(CommandError::NotApplicable("selection is not in a list"));
        }
        for id in blocks {
            // Each pass lifts the block one level; depth bounds the loop.
            loop {
                let Some(path) = self.index.path(id).cloned() else {
                    break;
                };
                let Some(item) = enclosing_list_item(&self.doc, &path) else {
                    break;
                };
                self.outdent_item(&item, ids)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_urls_get_a_scheme() {
        assert_eq!(
            normalize_link_url("  example.com ", "https://").as_deref(),
            Some("https://example.com")
        );
        assert_eq!(
            normalize_link_url("HTTP://Example.com", "https://").as_deref(),
            Some("HTTP://Example.com")
        );
        assert_eq!(
            normalize_link_url("https://a.b/c", "https://").as_deref(),
            Some("https://a.b/c")
        );
        assert_eq!(normalize_link_url("   ", "https://"), None);
    }
}
