//! Structural normalization, run after every command.
//!
//! - the document always holds at least one block
//! - lists hold only non-empty list items; adjacent lists of the same kind merge
//! - every text block holds at least one text run
//! - inline elements without content disappear, spans without attributes unwrap
//! - adjacent runs with equal marks and adjacent equal inline elements merge
//!
//! Nodes referenced by the selection survive even when empty, and the
//! selection is remapped whenever the node it points into is merged away.

use std::collections::HashSet;

use crate::core::{
    ATTR_LEVEL, Attrs, Document, ElementKind, ElementNode, Marks, Node, NodeId, NodeIds,
};
use crate::inline::{inline_len_all, leaves};
use crate::selection::Selection;

pub fn normalize(doc: &mut Document, selection: &mut Selection, ids: &mut NodeIds) {
    let protected: HashSet<NodeId> = [selection.anchor.node, selection.focus.node]
        .into_iter()
        .collect();
    let mut pass = Normalizer {
        selection,
        ids,
        protected,
    };
    let children = std::mem::take(&mut doc.children);
    doc.children = pass.blocks(children);
    if doc.children.is_empty() {
        doc.children.push(Node::paragraph(pass.ids, ""));
    }
}

struct Normalizer<'a> {
    selection: &'a mut Selection,
    ids: &'a mut NodeIds,
    protected: HashSet<NodeId>,
}

impl Normalizer<'_> {
    /// Children of the root or of a list item.
    fn blocks(&mut self, nodes: Vec<Node>) -> Vec<Node> {
        let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
        let mut stray: Vec<Node> = Vec::new();
        for node in nodes {
            if node.is_inline() {
                stray.push(node);
                continue;
            }
            self.flush_stray(&mut stray, &mut out);
            let Node::Element(el) = node else {
                continue;
            };
            match el.kind {
                ElementKind::Paragraph | ElementKind::Heading => {
                    out.push(Node::Element(self.text_block(el)));
                }
                ElementKind::List => {
                    if let Some(list) = self.list(el) {
                        self.push_list(&mut out, list);
                    }
                }
                ElementKind::ListItem => {
                    let children = self.blocks(el.children);
                    out.extend(children);
                }
                ElementKind::Span | ElementKind::Link => {}
            }
        }
        self.flush_stray(&mut stray, &mut out);
        out
    }

    fn flush_stray(&mut self, stray: &mut Vec<Node>, out: &mut Vec<Node>) {
        if stray.is_empty() {
            return;
        }
        let block = ElementNode {
            id: self.ids.fresh(),
            kind: ElementKind::Paragraph,
            attrs: Attrs::default(),
            children: std::mem::take(stray),
        };
        out.push(Node::Element(self.text_block(block)));
    }

    fn push_list(&mut self, out: &mut Vec<Node>, list: ElementNode) {
        if let Some(Node::Element(prev)) = out.last_mut() {
            if prev.kind == ElementKind::List && prev.attrs == list.attrs {
                self.remap(list.id, prev.id, prev.children.len());
                prev.children.extend(list.children);
                return;
            }
        }
        out.push(Node::Element(list));
    }

    fn list(&mut self, mut list: ElementNode) -> Option<ElementNode> {
        let mut items = Vec::with_capacity(list.children.len());
        for child in std::mem::take(&mut list.children) {
            let item = match child {
                Node::Element(el) if el.kind == ElementKind::ListItem => el,
                other => ElementNode {
                    id: self.ids.fresh(),
                    kind: ElementKind::ListItem,
                    attrs: Attrs::default(),
                    children: vec![other],
                },
            };
            if let Some(item) = self.list_item(item) {
                items.push(Node::Element(item));
            }
        }
        if items.is_empty() {
            return None;
        }
        list.children = items;
        Some(list)
    }

    fn list_item(&mut self, mut item: ElementNode) -> Option<ElementNode> {
        item.children = self.blocks(std::mem::take(&mut item.children));
        (!item.children.is_empty()).then_some(item)
    }

    fn text_block(&mut self, mut block: ElementNode) -> ElementNode {
        if block.kind == ElementKind::Heading {
            let level = block.heading_level().unwrap_or(1);
            block.set_attr(ATTR_LEVEL, level);
        }
        block.children = self.inlines(std::mem::take(&mut block.children));
        if !leaves(&block.children).iter().any(|l| l.is_text) {
            block
                .children
                .push(Node::text(self.ids, "", Marks::default()));
        }
        block
    }

    fn inlines(&mut self, nodes: Vec<Node>) -> Vec<Node> {
        let mut flat = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Element(mut el) => {
                    el.children = self.inlines(std::mem::take(&mut el.children));
                    let bare_span = el.kind == ElementKind::Span && el.attrs.is_empty();
                    if !el.kind.is_inline() || bare_span {
                        flat.extend(el.children);
                    } else if inline_len_all(&el.children) > 0 || self.guards(&el.children) {
                        flat.push(Node::Element(el));
                    }
                }
                other => flat.push(other),
            }
        }

        let mut kept: Vec<Node> = Vec::with_capacity(flat.len());
        let mut iter = flat.into_iter().peekable();
        while let Some(node) = iter.next() {
            let drop = match &node {
                Node::Text(t) if t.text.is_empty() && !self.protected.contains(&t.id) => {
                    matches!(kept.last(), Some(Node::Text(_)))
                        || matches!(iter.peek(), Some(Node::Text(_)))
                }
                _ => false,
            };
            if !drop {
                kept.push(node);
            }
        }

        let mut out: Vec<Node> = Vec::with_capacity(kept.len());
        for node in kept {
            let rest = match out.last_mut() {
                Some(prev) => self.absorb(prev, node),
                None => Some(node),
            };
            if let Some(node) = rest {
                out.push(node);
            }
        }
        out
    }

    /// Merges `next` into `prev` when they are runs with equal marks or equal
    /// inline elements. Returns `next` back when they stay apart.
    fn absorb(&mut self, prev: &mut Node, next: Node) -> Option<Node> {
        match (prev, next) {
            (Node::Text(prev), Node::Text(next)) if prev.marks == next.marks => {
                self.remap(next.id, prev.id, prev.text.len());
                prev.text.push_str(&next.text);
                None
            }
            (Node::Element(prev), Node::Element(next))
                if prev.kind.is_inline() && prev.kind == next.kind && prev.attrs == next.attrs =>
            {
                self.remap(next.id, prev.id, prev.children.len());
                let mut children = std::mem::take(&mut prev.children);
                children.extend(next.children);
                prev.children = self.inlines(children);
                None
            }
            (_, next) => Some(next),
        }
    }

    fn guards(&self, nodes: &[Node]) -> bool {
        nodes.iter().any(|node| {
            self.protected.contains(&node.id())
                || matches!(node, Node::Element(el) if self.guards(&el.children))
        })
    }

    fn remap(&mut self, from: NodeId, to: NodeId, shift: usize) {
        for point in [&mut self.selection.anchor, &mut self.selection.focus] {
            if point.node == from {
                point.node = to;
                point.offset += shift;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ListKind;
    use crate::selection::Point;

    fn caret(id: NodeId) -> Selection {
        Selection::collapsed(Point::new(id, 0))
    }

    #[test]
    fn merges_equal_runs_and_remaps_selection() {
        let mut ids = NodeIds::new();
        let a = Node::text(&mut ids, "ab", Marks::default());
        let b = Node::text(&mut ids, "cd", Marks::default());
        let a_id = a.id();
        let b_id = b.id();
        let block = Node::element(&mut ids, ElementKind::Paragraph, Attrs::default(), vec![a, b]);
        let mut doc = Document::new(vec![block]);
        let mut selection = Selection::collapsed(Point::new(b_id, 1));

        normalize(&mut doc, &mut selection, &mut ids);

        let Node::Element(block) = &doc.children[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(block.children.len(), 1);
        assert_eq!(selection.focus, Point::new(a_id, 3));
    }

    #[test]
    fn keeps_protected_empty_run() {
        let mut ids = NodeIds::new();
        let a = Node::text(&mut ids, "ab", Marks::default());
        let bold = Marks {
            bold: true,
            ..Marks::default()
        };
        let typing = Node::text(&mut ids, "", bold);
        let typing_id = typing.id();
        let block = Node::element(
            &mut ids,
            ElementKind::Paragraph,
            Attrs::default(),
            vec![a, typing],
        );
        let mut doc = Document::new(vec![block]);

        let mut selection = caret(typing_id);
        normalize(&mut doc, &mut selection, &mut ids);
        assert!(doc.find_path(typing_id).is_some());

        let mut elsewhere = caret(NodeId(0));
        normalize(&mut doc, &mut elsewhere, &mut ids);
        assert!(doc.find_path(typing_id).is_none());
    }

    #[test]
    fn drops_empty_lists_and_keeps_document_non_empty() {
        let mut ids = NodeIds::new();
        let list = Node::list(&mut ids, ListKind::Unordered, Vec::new());
        let mut doc = Document::new(vec![list]);
        let mut selection = caret(NodeId(0));
        normalize(&mut doc, &mut selection, &mut ids);

        assert_eq!(doc.children.len(), 1);
        let Node::Element(paragraph) = &doc.children[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(paragraph.kind, ElementKind::Paragraph);
        assert!(matches!(paragraph.children[0], Node::Text(_)));
    }
}
