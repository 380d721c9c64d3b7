use std::collections::HashMap;

use crate::core::{Document, ElementKind, Node, NodeId, Path};

/// Node id → path lookup, rebuilt after every structural edit.
#[derive(Debug, Clone, Default)]
pub struct DocIndex {
    paths: HashMap<NodeId, Path>,
}

impl DocIndex {
    pub fn new(doc: &Document) -> Self {
        let mut index = Self::default();
        let mut path = Path::new();
        index.visit(&doc.children, &mut path);
        index
    }

    fn visit(&mut self, children: &[Node], path: &mut Path) {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            self.paths.insert(node.id(), path.clone());
            if let Node::Element(el) = node {
                self.visit(&el.children, path);
            }
            path.pop();
        }
    }

    pub fn path(&self, id: NodeId) -> Option<&Path> {
        self.paths.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.paths.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// The node with `id` followed by each of its ancestors, innermost first.
    /// The root itself is not a node and never appears.
    pub fn ancestry<'a>(&self, doc: &'a Document, id: NodeId) -> Option<Vec<&'a Node>> {
        let path = self.path(id)?;
        let mut chain = Vec::with_capacity(path.len());
        let (first, rest) = path.split_first()?;
        let mut node = doc.children.get(*first)?;
        chain.push(node);
        for &ix in rest {
            node = match node {
                Node::Element(el) => el.children.get(ix)?,
                Node::Text(_) | Node::Void(_) => return None,
            };
            chain.push(node);
        }
        chain.reverse();
        Some(chain)
    }
}

pub fn enclosing_text_block(doc: &Document, path: &[usize]) -> Option<Path> {
    (1..=path.len()).rev().find_map(|len| {
        let el = doc.element(&path[..len])?;
        el.kind.is_text_block().then(|| path[..len].to_vec())
    })
}

/// Path of the list item whose text block is `block_path`, if the block
/// sits directly inside one.
pub fn enclosing_list_item(doc: &Document, block_path: &[usize]) -> Option<Path> {
    let (_, parent) = block_path.split_last()?;
    let item = doc.element(parent)?;
    if item.kind != ElementKind::ListItem {
        return None;
    }
    let (_, list_path) = parent.split_last()?;
    let list = doc.element(list_path)?;
    (list.kind == ElementKind::List).then(|| parent.to_vec())
}

pub fn enclosing_list(doc: &Document, path: &[usize]) -> Option<Path> {
    (1..=path.len()).rev().find_map(|len| {
        let el = doc.element(&path[..len])?;
        (el.kind == ElementKind::List).then(|| path[..len].to_vec())
    })
}
