//! Mapping between selection points and flattened text-block positions.

use crate::core::{Document, Node, NodeId, Path};
use crate::index::{DocIndex, enclosing_text_block};
use crate::inline::{Affinity, inline_len_all, leaves, offset_of, text_leaf_at};
use crate::selection::{Point, Selection};

/// A position inside a text block: the block's path plus a flattened
/// inline offset. Ordering follows document order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TextPosition {
    pub block: Path,
    pub offset: usize,
}

impl TextPosition {
    pub fn new(block: Path, offset: usize) -> Self {
        Self { block, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRange {
    pub start: TextPosition,
    pub end: TextPosition,
    pub anchor_is_start: bool,
}

impl TextRange {
    pub fn caret(pos: TextPosition) -> Self {
        Self {
            start: pos.clone(),
            end: pos,
            anchor_is_start: true,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn anchor(&self) -> &TextPosition {
        if self.anchor_is_start {
            &self.start
        } else {
            &self.end
        }
    }

    pub fn focus(&self) -> &TextPosition {
        if self.anchor_is_start {
            &self.end
        } else {
            &self.start
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSlice {
    pub path: Path,
    pub start: usize,
    pub end: usize,
}

impl BlockSlice {
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

pub fn block_len(doc: &Document, block: &[usize]) -> usize {
    doc.element(block)
        .map(|el| inline_len_all(&el.children))
        .unwrap_or(0)
}

pub fn locate(doc: &Document, index: &DocIndex, point: &Point) -> Option<TextPosition> {
    let path = index.path(point.node)?;
    let Some(block) = enclosing_text_block(doc, path) else {
        return locate_in_container(doc, path, point.offset);
    };
    let block_el = doc.element(&block)?;
    let rel = &path[block.len()..];
    let offset = if rel.is_empty() {
        let upto = point.offset.min(block_el.children.len());
        inline_len_all(&block_el.children[..upto])
    } else {
        let start = offset_of(&block_el.children, rel)?;
        let local = match doc.node(path)? {
            Node::Element(el) => {
                let upto = point.offset.min(el.children.len());
                inline_len_all(&el.children[..upto])
            }
            node => node.clamp_offset(point.offset),
        };
        start + local
    };
    Some(TextPosition::new(block, offset))
}

/// A point on a block container (list, list item) resolves to the first
/// text block at or after the addressed child, or the end of the last one.
fn locate_in_container(doc: &Document, path: &[usize], offset: usize) -> Option<TextPosition> {
    let container = doc.element(path)?;
    let mut child = path.to_vec();
    child.push(offset.min(container.children.len()));
    let inside: Vec<Path> = doc
        .text_block_paths()
        .into_iter()
        .filter(|p| p.starts_with(path))
        .collect();
    if let Some(block) = inside.iter().find(|p| p.as_slice() >= child.as_slice()) {
        return Some(TextPosition::new(block.clone(), 0));
    }
    let last = inside.last()?;
    Some(TextPosition::new(last.clone(), block_len(doc, last)))
}

pub fn point_at(doc: &Document, pos: &TextPosition, affinity: Affinity) -> Option<Point> {
    let block = doc.element(&pos.block)?;
    let leaves = leaves(&block.children);
    let (id, offset) = text_leaf_at(&leaves, pos.offset, affinity)?;
    Some(Point::new(id, offset))
}

pub fn resolve_range(doc: &Document, index: &DocIndex, selection: &Selection) -> Option<TextRange> {
    let anchor = locate(doc, index, &selection.anchor)?;
    let focus = locate(doc, index, &selection.focus)?;
    Some(if anchor <= focus {
        TextRange {
            start: anchor,
            end: focus,
            anchor_is_start: true,
        }
    } else {
        TextRange {
            start: focus,
            end: anchor,
            anchor_is_start: false,
        }
    })
}

/// Selection whose points bind inward: the start binds forward and the end
/// binds backward, so both land on the content the range covers.
pub fn selection_for(doc: &Document, range: &TextRange) -> Option<Selection> {
    if range.is_collapsed() {
        return point_at(doc, &range.start, Affinity::Backward).map(Selection::collapsed);
    }
    let start = point_at(doc, &range.start, Affinity::Forward)?;
    let end = point_at(doc, &range.end, Affinity::Backward)?;
    Some(if range.anchor_is_start {
        Selection::new(start, end)
    } else {
        Selection::new(end, start)
    })
}

/// Text blocks from `from` to `to` inclusive, in document order. Subtrees
/// entirely outside the span are skipped.
pub fn text_blocks_between(doc: &Document, from: &[usize], to: &[usize]) -> Vec<Path> {
    fn walk(children: &[Node], path: &mut Path, from: &[usize], to: &[usize], out: &mut Vec<Path>) {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            if path.as_slice() > to {
                path.pop();
                return;
            }
            let before = path.as_slice() < from && !from.starts_with(path);
            if let (false, Node::Element(el)) = (before, node) {
                if el.kind.is_text_block() {
                    out.push(path.clone());
                } else if !el.kind.is_inline() {
                    walk(&el.children, path, from, to, out);
                }
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut Path::new(), from, to, &mut out);
    out
}

pub fn block_slices(doc: &Document, range: &TextRange) -> Vec<BlockSlice> {
    text_blocks_between(doc, &range.start.block, &range.end.block)
        .into_iter()
        .map(|path| {
            let start = if path == range.start.block {
                range.start.offset
            } else {
                0
            };
            let end = if path == range.end.block {
                range.end.offset
            } else {
                block_len(doc, &path)
            };
            BlockSlice { path, start, end }
        })
        .collect()
}

/// The text run a point addresses: the node itself for a run, otherwise the
/// run just before the point's position.
pub fn focus_leaf(doc: &Document, index: &DocIndex, point: &Point) -> Option<NodeId> {
    let path = index.path(point.node)?;
    if let Some(Node::Text(_)) = doc.node(path) {
        return Some(point.node);
    }
    let pos = locate(doc, index, point)?;
    point_at(doc, &pos, Affinity::Backward).map(|p| p.node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ListKind, NodeIds};

    #[test]
    fn range_orders_backward_selection() {
        let mut ids = NodeIds::new();
        let first = Node::paragraph(&mut ids, "abc");
        let second = Node::paragraph(&mut ids, "def");
        let a = first.as_element().map(|el| el.children[0].id()).unwrap();
        let b = second.as_element().map(|el| el.children[0].id()).unwrap();
        let doc = Document::new(vec![first, second]);
        let index = DocIndex::new(&doc);

        let selection = Selection::new(Point::new(b, 1), Point::new(a, 2));
        let range = resolve_range(&doc, &index, &selection).unwrap();
        assert!(!range.anchor_is_start);
        assert_eq!(range.start, TextPosition::new(vec![0], 2));
        assert_eq!(range.end, TextPosition::new(vec![1], 1));

        let slices = block_slices(&doc, &range);
        assert_eq!(
            slices,
            vec![
                BlockSlice { path: vec![0], start: 2, end: 3 },
                BlockSlice { path: vec![1], start: 0, end: 1 },
            ]
        );
    }

    #[test]
    fn container_point_resolves_to_first_block_inside() {
        let mut ids = NodeIds::new();
        let intro = Node::paragraph(&mut ids, "intro");
        let one = Node::paragraph(&mut ids, "one");
        let two = Node::paragraph(&mut ids, "two");
        let items = vec![
            Node::list_item(&mut ids, vec![one]),
            Node::list_item(&mut ids, vec![two]),
        ];
        let list = Node::list(&mut ids, ListKind::Unordered, items);
        let list_id = list.id();
        let doc = Document::new(vec![intro, list]);
        let index = DocIndex::new(&doc);

        let pos = locate(&doc, &index, &Point::new(list_id, 1)).unwrap();
        assert_eq!(pos, TextPosition::new(vec![1, 1, 0], 0));
        assert_eq!(
            text_blocks_between(&doc, &[1, 0, 0], &[1, 1, 0]),
            vec![vec![1, 0, 0], vec![1, 1, 0]]
        );
    }
}
