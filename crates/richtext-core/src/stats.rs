use serde::Serialize;

use crate::core::{Document, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct TextStats {
    pub words: usize,
    pub chars: usize,
}

impl TextStats {
    /// Words are whitespace-separated tokens of the plain text; chars count
    /// the characters of text runs only.
    pub fn of(doc: &Document) -> Self {
        fn run_chars(children: &[Node]) -> usize {
            children
                .iter()
                .map(|node| match node {
                    Node::Text(t) => t.text.chars().count(),
                    Node::Element(el) => run_chars(&el.children),
                    Node::Void(_) => 0,
                })
                .sum()
        }

        let words = doc.plain_text().split_whitespace().count();
        let chars = doc
            .text_block_paths()
            .iter()
            .filter_map(|path| doc.element(path))
            .map(|block| run_chars(&block.children))
            .sum();
        Self { words, chars }
    }
}
