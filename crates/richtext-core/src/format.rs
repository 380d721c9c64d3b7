//! Toolbar state derived from the document and a selection.

use serde::Serialize;

use crate::config::FontSizeBands;
use crate::core::{Alignment, Document, ElementKind, ListKind, Marks, Node};
use crate::index::DocIndex;
use crate::inline::leaves;
use crate::position::{BlockSlice, block_slices, focus_leaf, resolve_range};
use crate::selection::Selection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FontSizeBand {
    Small,
    #[default]
    Normal,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    #[default]
    None,
    Unordered,
    OrderedNumeric,
    OrderedAlpha,
}

impl From<ListKind> for ListType {
    fn from(kind: ListKind) -> Self {
        match kind {
            ListKind::Unordered => ListType::Unordered,
            ListKind::OrderedNumeric => ListType::OrderedNumeric,
            ListKind::OrderedAlpha => ListType::OrderedAlpha,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct FormatState {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub alignment: Alignment,
    pub font_size: FontSizeBand,
    pub font_size_px: Option<u32>,
    pub list_type: ListType,
    pub list_depth: usize,
    pub heading_level: Option<u8>,
    pub link: Option<String>,
    pub text_color: Option<String>,
    pub highlight_color: Option<String>,
    pub can_undo: bool,
    pub can_redo: bool,
}

pub fn resolve_formats(doc: &Document, index: &DocIndex, selection: &Selection) -> FormatState {
    resolve_formats_with(doc, index, selection, &FontSizeBands::default())
}

pub fn resolve_formats_with(
    doc: &Document,
    index: &DocIndex,
    selection: &Selection,
    bands: &FontSizeBands,
) -> FormatState {
    let Some(range) = resolve_range(doc, index, selection) else {
        return FormatState::default();
    };
    let mut state = FormatState::default();

    let focus = focus_leaf(doc, index, &selection.focus).unwrap_or(selection.focus.node);
    let chain = index.ancestry(doc, focus).unwrap_or_default();
    let focus_marks = match chain.first() {
        Some(Node::Text(t)) => t.marks.clone(),
        _ => Marks::default(),
    };

    if range.is_collapsed() {
        state.bold = focus_marks.bold;
        state.italic = focus_marks.italic;
        state.underline = focus_marks.underline;
    } else {
        let slices = block_slices(doc, &range);
        state.bold = all_runs_have(doc, &slices, |m| m.bold);
        state.italic = all_runs_have(doc, &slices, |m| m.italic);
        state.underline = all_runs_have(doc, &slices, |m| m.underline);
    }
    state.text_color = focus_marks.text_color.clone();
    state.highlight_color = focus_marks.highlight_color.clone();

    for node in &chain {
        match node {
            Node::Text(t) => {
                if state.font_size_px.is_none() {
                    state.font_size_px = t.marks.font_size;
                }
            }
            Node::Element(el) => {
                if state.font_size_px.is_none() {
                    state.font_size_px = el.font_size();
                }
                if el.kind == ElementKind::Link && state.link.is_none() {
                    state.link = el.url().map(str::to_string);
                }
                if state.heading_level.is_none() {
                    state.heading_level = el.heading_level();
                }
                if !el.kind.is_inline() && state.alignment == Alignment::Left {
                    if let Some(align) = el.alignment() {
                        state.alignment = align;
                    }
                }
            }
            Node::Void(_) => {}
        }
    }
    state.font_size = state
        .font_size_px
        .map(|px| bands.classify(px))
        .unwrap_or_default();

    let start = if range.anchor_is_start {
        &selection.anchor
    } else {
        &selection.focus
    };
    if let Some(start_chain) = index.ancestry(doc, start.node) {
        let mut lists = start_chain
            .iter()
            .filter_map(|node| node.as_element().and_then(|el| el.list_kind()));
        if let Some(kind) = lists.next() {
            state.list_type = kind.into();
            state.list_depth = 1 + lists.count();
        }
    }

    state
}

/// True when every run overlapping the slices carries the mark. Runs that
/// touch a slice only at its edge do not count; no overlapping run at all
/// yields false.
pub fn all_runs_have(doc: &Document, slices: &[BlockSlice], get: impl Fn(&Marks) -> bool) -> bool {
    let mut seen = false;
    for slice in slices {
        if slice.is_empty() {
            continue;
        }
        let Some(block) = doc.element(&slice.path) else {
            continue;
        };
        for leaf in leaves(&block.children) {
            if !leaf.is_text || leaf.start >= slice.end || leaf.end <= slice.start {
                continue;
            }
            let mut path = slice.path.clone();
            path.extend(&leaf.path);
            let Some(Node::Text(t)) = doc.node(&path) else {
                continue;
            };
            if !get(&t.marks) {
                return false;
            }
            seen = true;
        }
    }
    seen
}
