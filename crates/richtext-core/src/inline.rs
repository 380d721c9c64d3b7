//! Surgery on the inline children of a text block.
//!
//! Inline content is addressed by a flattened offset: text runs count their
//! bytes, voids count one, inline elements count the sum of their children.

use crate::core::{
    ATTR_FONT_SIZE, ElementKind, ElementNode, Marks, Node, NodeId, NodeIds, Path, TextNode,
};

pub fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

pub fn prev_char_boundary(s: &str, ix: usize) -> usize {
    let ix = clamp_to_char_boundary(s, ix);
    s[..ix].char_indices().last().map(|(i, _)| i).unwrap_or(0)
}

pub fn inline_len_all(nodes: &[Node]) -> usize {
    nodes.iter().map(Node::inline_len).sum()
}

pub fn offset_of(children: &[Node], rel_path: &[usize]) -> Option<usize> {
    let (first, rest) = rel_path.split_first()?;
    let before = inline_len_all(children.get(..*first)?);
    if rest.is_empty() {
        return children.get(*first).map(|_| before);
    }
    match children.get(*first)? {
        Node::Element(el) => Some(before + offset_of(&el.children, rest)?),
        Node::Text(_) | Node::Void(_) => None,
    }
}

/// Splits `nodes` at flattened offset `at`. The left half keeps the ids of
/// split nodes; right halves get fresh ids. Zero-width nodes sitting exactly
/// at `at` stay on the left.
pub fn split_inlines(nodes: Vec<Node>, at: usize, ids: &mut NodeIds) -> (Vec<Node>, Vec<Node>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut cursor = 0usize;
    for node in nodes {
        let len = node.inline_len();
        if cursor + len <= at {
            left.push(node);
        } else if cursor >= at {
            right.push(node);
        } else {
            let local = at - cursor;
            match node {
                Node::Text(mut text) => {
                    let ix = clamp_to_char_boundary(&text.text, local);
                    let tail = text.text.split_off(ix);
                    right.push(Node::Text(TextNode {
                        id: ids.fresh(),
                        text: tail,
                        marks: text.marks.clone(),
                    }));
                    left.push(Node::Text(text));
                }
                Node::Element(mut el) => {
                    let children = std::mem::take(&mut el.children);
                    let (head, tail) = split_inlines(children, local, ids);
                    let tail = ElementNode {
                        id: ids.fresh(),
                        kind: el.kind,
                        attrs: el.attrs.clone(),
                        children: tail,
                    };
                    el.children = head;
                    left.push(Node::Element(el));
                    right.push(Node::Element(tail));
                }
                // A void is one unit wide, so `at` can never fall inside it.
                Node::Void(void) => right.push(Node::Void(void)),
            }
        }
        cursor += len;
    }
    (left, right)
}

/// Cuts `[start, end)` out of `nodes`, returning `(before, middle, after)`.
pub fn extract_range(
    nodes: Vec<Node>,
    start: usize,
    end: usize,
    ids: &mut NodeIds,
) -> (Vec<Node>, Vec<Node>, Vec<Node>) {
    let (before, rest) = split_inlines(nodes, start, ids);
    let (middle, after) = split_inlines(rest, end.saturating_sub(start), ids);
    (before, middle, after)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub id: NodeId,
    pub start: usize,
    pub end: usize,
    pub is_text: bool,
    pub path: Path,
}

pub fn leaves(children: &[Node]) -> Vec<Leaf> {
    fn walk(children: &[Node], cursor: &mut usize, path: &mut Path, out: &mut Vec<Leaf>) {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            match node {
                Node::Element(el) => walk(&el.children, cursor, path, out),
                Node::Text(_) | Node::Void(_) => {
                    let len = node.inline_len();
                    out.push(Leaf {
                        id: node.id(),
                        start: *cursor,
                        end: *cursor + len,
                        is_text: matches!(node, Node::Text(_)),
                        path: path.clone(),
                    });
                    *cursor += len;
                }
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(children, &mut 0, &mut Path::new(), &mut out);
    out
}

/// Which neighbour a position on a run boundary binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    Backward,
    Forward,
}

/// Text leaf and local offset for flattened position `at`. An empty run
/// sitting exactly at `at` always wins, so typing marks and font-size
/// markers receive the caret.
pub fn text_leaf_at(leaves: &[Leaf], at: usize, affinity: Affinity) -> Option<(NodeId, usize)> {
    let texts: Vec<&Leaf> = leaves.iter().filter(|l| l.is_text).collect();
    let empty_at = |l: &&&Leaf| l.start == at && l.end == at;
    let empty = match affinity {
        Affinity::Forward => texts.iter().find(empty_at),
        Affinity::Backward => texts.iter().rev().find(empty_at),
    };
    if let Some(leaf) = empty {
        return Some((leaf.id, 0));
    }

    let backward = || {
        texts
            .iter()
            .find(|l| l.start < at && at <= l.end)
            .map(|l| (l.id, at - l.start))
    };
    let forward = || {
        texts
            .iter()
            .find(|l| l.start <= at && at < l.end)
            .map(|l| (l.id, at - l.start))
    };
    let found = match affinity {
        Affinity::Backward => backward().or_else(forward),
        Affinity::Forward => forward().or_else(backward),
    };
    found.or_else(|| {
        texts
            .iter()
            .rev()
            .find(|l| l.end <= at)
            .map(|l| (l.id, l.end - l.start))
            .or_else(|| texts.first().map(|l| (l.id, 0)))
    })
}

pub fn map_text_marks(nodes: &mut [Node], f: &dyn Fn(&mut Marks)) {
    for node in nodes {
        match node {
            Node::Text(t) => f(&mut t.marks),
            Node::Element(el) => map_text_marks(&mut el.children, f),
            Node::Void(_) => {}
        }
    }
}

/// Removes every explicit font size below `nodes`: run marks and span
/// attributes. Spans left without attributes are unwrapped.
pub fn strip_font_size(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Text(mut t) => {
                t.marks.font_size = None;
                out.push(Node::Text(t));
            }
            Node::Element(mut el) => {
                el.remove_attr(ATTR_FONT_SIZE);
                el.children = strip_font_size(std::mem::take(&mut el.children));
                if el.kind == ElementKind::Span && el.attrs.is_empty() {
                    out.extend(el.children);
                } else {
                    out.push(Node::Element(el));
                }
            }
            Node::Void(v) => out.push(Node::Void(v)),
        }
    }
    out
}

pub fn unwrap_elements(nodes: Vec<Node>, kind: ElementKind) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Element(mut el) => {
                let children = unwrap_elements(std::mem::take(&mut el.children), kind);
                if el.kind == kind {
                    out.extend(children);
                } else {
                    el.children = children;
                    out.push(Node::Element(el));
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Attrs;

    fn text(ids: &mut NodeIds, s: &str) -> Node {
        Node::text(ids, s, Marks::default())
    }

    fn texts(nodes: &[Node]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| match n {
                Node::Text(t) => t.text.clone(),
                Node::Element(el) => format!("[{}]", texts(&el.children).join("|")),
                Node::Void(_) => "#".to_string(),
            })
            .collect()
    }

    #[test]
    fn split_inside_span_keeps_left_id() {
        let mut ids = NodeIds::new();
        let a = text(&mut ids, "ab");
        let inner = text(&mut ids, "cdef");
        let span = Node::span_with_font_size(&mut ids, 20, vec![inner]);
        let span_id = span.id();
        let (left, right) = split_inlines(vec![a, span], 4, &mut ids);

        assert_eq!(texts(&left), vec!["ab", "[cd]"]);
        assert_eq!(texts(&right), vec!["[ef]"]);
        assert_eq!(left[1].id(), span_id);
        assert_ne!(right[0].id(), span_id);
    }

    #[test]
    fn extract_range_spans_runs() {
        let mut ids = NodeIds::new();
        let a = text(&mut ids, "abc");
        let b = text(&mut ids, "def");
        let (before, middle, after) = extract_range(vec![a, b], 2, 4, &mut ids);
        assert_eq!(texts(&before), vec!["ab"]);
        assert_eq!(texts(&middle), vec!["c", "d"]);
        assert_eq!(texts(&after), vec!["ef"]);
    }

    #[test]
    fn split_never_cuts_a_char() {
        let mut ids = NodeIds::new();
        let node = text(&mut ids, "é!");
        let (left, right) = split_inlines(vec![node], 1, &mut ids);
        assert_eq!(texts(&left), vec![""]);
        assert_eq!(texts(&right), vec!["é!"]);
        assert_eq!(prev_char_boundary("aé", 3), 1);
    }

    #[test]
    fn empty_leaf_receives_the_caret() {
        let mut ids = NodeIds::new();
        let a = text(&mut ids, "ab");
        let marker = text(&mut ids, "");
        let marker_id = marker.id();
        let b = text(&mut ids, "cd");
        let nodes = vec![a, marker, b];
        let leaves = leaves(&nodes);

        assert_eq!(text_leaf_at(&leaves, 2, Affinity::Forward), Some((marker_id, 0)));
        assert_eq!(text_leaf_at(&leaves, 1, Affinity::Backward), Some((nodes[0].id(), 1)));
        assert_eq!(text_leaf_at(&leaves, 4, Affinity::Forward), Some((nodes[2].id(), 2)));
    }

    #[test]
    fn strip_font_size_unwraps_bare_spans() {
        let mut ids = NodeIds::new();
        let mut marks = Marks::default();
        marks.font_size = Some(30);
        let inner = Node::text(&mut ids, "x", marks);
        let span = Node::span_with_font_size(&mut ids, 20, vec![inner]);
        let link = Node::element(&mut ids, ElementKind::Link, Attrs::default(), vec![span]);

        let out = strip_font_size(vec![link]);
        let Node::Element(link) = &out[0] else {
            panic!("expected link element");
        };
        let Node::Text(t) = &link.children[0] else {
            panic!("expected unwrapped text");
        };
        assert_eq!(t.marks.font_size, None);
    }
}
