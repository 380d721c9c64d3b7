use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::inline::clamp_to_char_boundary;

pub type Attrs = BTreeMap<String, Value>;
pub type Path = Vec<usize>;

pub const ATTR_ALIGN: &str = "align";
pub const ATTR_LEVEL: &str = "level";
pub const ATTR_LIST_KIND: &str = "list_kind";
pub const ATTR_FONT_SIZE: &str = "font_size";
pub const ATTR_URL: &str = "url";
pub const ATTR_TARGET: &str = "target";
pub const ATTR_REL: &str = "rel";
pub const ATTR_ATTACHMENT_ID: &str = "attachment_id";
pub const ATTR_NAME: &str = "name";
pub const ATTR_SIZE: &str = "size";
pub const ATTR_SIZE_LABEL: &str = "size_label";
pub const ATTR_SRC: &str = "src";
pub const ATTR_ALT: &str = "alt";
pub const ATTR_MIME: &str = "mime";

/// Stable identity of a node. Survives edits of the node itself; the right
/// half of a split node gets a fresh id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct NodeId(pub u64);

/// Session-owned id generator. Never hands out an id it has already seen.
#[derive(Debug, Clone, Default)]
pub struct NodeIds {
    last: u64,
}

impl NodeIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> NodeId {
        self.last += 1;
        NodeId(self.last)
    }

    pub fn observe(&mut self, doc: &Document) {
        self.last = self.last.max(doc.max_node_id().0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Paragraph,
    Heading,
    List,
    ListItem,
    Span,
    Link,
}

impl ElementKind {
    pub fn is_inline(self) -> bool {
        matches!(self, ElementKind::Span | ElementKind::Link)
    }

    pub fn is_text_block(self) -> bool {
        matches!(self, ElementKind::Paragraph | ElementKind::Heading)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoidKind {
    LineBreak,
    Attachment,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" => Some(Alignment::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Unordered,
    OrderedNumeric,
    OrderedAlpha,
}

impl ListKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ListKind::Unordered => "unordered",
            ListKind::OrderedNumeric => "ordered_numeric",
            ListKind::OrderedAlpha => "ordered_alpha",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unordered" => Some(ListKind::Unordered),
            "ordered_numeric" => Some(ListKind::OrderedNumeric),
            "ordered_alpha" => Some(ListKind::OrderedAlpha),
            _ => None,
        }
    }

    pub fn is_ordered(self) -> bool {
        !matches!(self, ListKind::Unordered)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
    Void(VoidNode),
}

impl Node {
    pub fn text(ids: &mut NodeIds, text: impl Into<String>, marks: Marks) -> Self {
        Node::Text(TextNode {
            id: ids.fresh(),
            text: text.into(),
            marks,
        })
    }

    pub fn element(
        ids: &mut NodeIds,
        kind: ElementKind,
        attrs: Attrs,
        children: Vec<Node>,
    ) -> Self {
        Node::Element(ElementNode {
            id: ids.fresh(),
            kind,
            attrs,
            children,
        })
    }

    pub fn paragraph(ids: &mut NodeIds, text: impl Into<String>) -> Self {
        let text = Node::text(ids, text, Marks::default());
        Node::element(ids, ElementKind::Paragraph, Attrs::default(), vec![text])
    }

    pub fn heading(ids: &mut NodeIds, level: u8, text: impl Into<String>) -> Self {
        let text = Node::text(ids, text, Marks::default());
        let mut attrs = Attrs::default();
        attrs.insert(ATTR_LEVEL.to_string(), Value::from(level.clamp(1, 6)));
        Node::element(ids, ElementKind::Heading, attrs, vec![text])
    }

    pub fn list(ids: &mut NodeIds, kind: ListKind, items: Vec<Node>) -> Self {
        let mut attrs = Attrs::default();
        attrs.insert(
            ATTR_LIST_KIND.to_string(),
            Value::String(kind.as_str().to_string()),
        );
        Node::element(ids, ElementKind::List, attrs, items)
    }

    pub fn list_item(ids: &mut NodeIds, children: Vec<Node>) -> Self {
        Node::element(ids, ElementKind::ListItem, Attrs::default(), children)
    }

    pub fn span_with_font_size(ids: &mut NodeIds, px: u32, children: Vec<Node>) -> Self {
        let mut attrs = Attrs::default();
        attrs.insert(ATTR_FONT_SIZE.to_string(), Value::from(px));
        Node::element(ids, ElementKind::Span, attrs, children)
    }

    pub fn void(ids: &mut NodeIds, kind: VoidKind, attrs: Attrs) -> Self {
        Node::Void(VoidNode {
            id: ids.fresh(),
            kind,
            attrs,
        })
    }

    pub fn id(&self) -> NodeId {
        match self {
            Node::Element(el) => el.id,
            Node::Text(t) => t.id,
            Node::Void(v) => v.id,
        }
    }

    /// Length of the node in the flattened inline coordinate space of its
    /// text block: text bytes, one unit per void.
    pub fn inline_len(&self) -> usize {
        match self {
            Node::Text(t) => t.text.len(),
            Node::Void(_) => 1,
            Node::Element(el) => el.children.iter().map(Node::inline_len).sum(),
        }
    }

    pub fn is_inline(&self) -> bool {
        match self {
            Node::Element(el) => el.kind.is_inline(),
            Node::Text(_) | Node::Void(_) => true,
        }
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            Node::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn max_offset(&self) -> usize {
        match self {
            Node::Text(t) => t.text.len(),
            Node::Void(_) => 1,
            Node::Element(el) => el.children.len(),
        }
    }

    pub fn clamp_offset(&self, offset: usize) -> usize {
        match self {
            Node::Text(t) => clamp_to_char_boundary(&t.text, offset),
            other => offset.min(other.max_offset()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub id: NodeId,
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl ElementNode {
    pub fn alignment(&self) -> Option<Alignment> {
        self.attrs
            .get(ATTR_ALIGN)
            .and_then(|v| v.as_str())
            .and_then(Alignment::parse)
    }

    pub fn font_size(&self) -> Option<u32> {
        self.attrs
            .get(ATTR_FONT_SIZE)
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
    }

    pub fn list_kind(&self) -> Option<ListKind> {
        if self.kind != ElementKind::List {
            return None;
        }
        Some(
            self.attrs
                .get(ATTR_LIST_KIND)
                .and_then(|v| v.as_str())
                .and_then(ListKind::parse)
                .unwrap_or(ListKind::Unordered),
        )
    }

    pub fn heading_level(&self) -> Option<u8> {
        if self.kind != ElementKind::Heading {
            return None;
        }
        let level = self
            .attrs
            .get(ATTR_LEVEL)
            .and_then(|v| v.as_u64())
            .unwrap_or(1)
            .clamp(1, 6);
        Some(level as u8)
    }

    pub fn url(&self) -> Option<&str> {
        self.attrs.get(ATTR_URL).and_then(|v| v.as_str())
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<Value>) {
        self.attrs.insert(key.to_string(), value.into());
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<Value> {
        self.attrs.remove(key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoidNode {
    pub id: NodeId,
    pub kind: VoidKind,
    #[serde(default)]
    pub attrs: Attrs,
}

impl VoidNode {
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(|v| v.as_str())
    }

    pub fn inline_text(&self) -> &str {
        match self.kind {
            VoidKind::LineBreak => "\n",
            VoidKind::Attachment => self.attr_str(ATTR_NAME).unwrap_or(""),
            VoidKind::Image => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub id: NodeId,
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Marks {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_color: Option<String>,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn empty(ids: &mut NodeIds) -> Self {
        Self {
            children: vec![Node::paragraph(ids, "")],
        }
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get(*first)?;
        for &ix in rest {
            node = match node {
                Node::Element(el) => el.children.get(ix)?,
                Node::Text(_) | Node::Void(_) => return None,
            };
        }
        Some(node)
    }

    pub fn node_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (last, parent) = path.split_last()?;
        self.children_mut(parent)?.get_mut(*last)
    }

    pub fn element(&self, path: &[usize]) -> Option<&ElementNode> {
        self.node(path).and_then(Node::as_element)
    }

    pub fn element_mut(&mut self, path: &[usize]) -> Option<&mut ElementNode> {
        match self.node_mut(path)? {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Children of the node at `path`; the empty path addresses the root.
    pub fn children(&self, path: &[usize]) -> Option<&Vec<Node>> {
        if path.is_empty() {
            return Some(&self.children);
        }
        match self.node(path)? {
            Node::Element(el) => Some(&el.children),
            Node::Text(_) | Node::Void(_) => None,
        }
    }

    pub fn children_mut(&mut self, path: &[usize]) -> Option<&mut Vec<Node>> {
        let mut children = &mut self.children;
        for &ix in path {
            children = match children.get_mut(ix)? {
                Node::Element(el) => &mut el.children,
                Node::Text(_) | Node::Void(_) => return None,
            };
        }
        Some(children)
    }

    pub fn find_path(&self, id: NodeId) -> Option<Path> {
        fn walk(children: &[Node], id: NodeId, path: &mut Path) -> bool {
            for (ix, node) in children.iter().enumerate() {
                path.push(ix);
                if node.id() == id {
                    return true;
                }
                if let Node::Element(el) = node {
                    if walk(&el.children, id, path) {
                        return true;
                    }
                }
                path.pop();
            }
            false
        }

        let mut path = Path::new();
        walk(&self.children, id, &mut path).then_some(path)
    }

    pub fn max_node_id(&self) -> NodeId {
        fn walk(children: &[Node], max: &mut NodeId) {
            for node in children {
                *max = (*max).max(node.id());
                if let Node::Element(el) = node {
                    walk(&el.children, max);
                }
            }
        }

        let mut max = NodeId::default();
        walk(&self.children, &mut max);
        max
    }

    pub fn text_block_paths(&self) -> Vec<Path> {
        fn walk(children: &[Node], path: &mut Path, out: &mut Vec<Path>) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                if el.kind.is_inline() {
                    continue;
                }
                path.push(ix);
                if el.kind.is_text_block() {
                    out.push(path.clone());
                } else {
                    walk(&el.children, path, out);
                }
                path.pop();
            }
        }

        let mut out = Vec::new();
        walk(&self.children, &mut Path::new(), &mut out);
        out
    }

    /// Plain text of the document, blocks separated by newlines.
    pub fn plain_text(&self) -> String {
        fn inline_text(children: &[Node], out: &mut String) {
            for node in children {
                match node {
                    Node::Text(t) => out.push_str(&t.text),
                    Node::Void(v) => out.push_str(v.inline_text()),
                    Node::Element(el) => inline_text(&el.children, out),
                }
            }
        }

        let mut lines: Vec<String> = Vec::new();
        for path in self.text_block_paths() {
            let Some(block) = self.element(&path) else {
                continue;
            };
            let mut line = String::new();
            inline_text(&block.children, &mut line);
            lines.push(line);
        }
        lines.join("\n")
    }
}
