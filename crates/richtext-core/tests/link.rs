use manos_richtext_core::{
    ATTR_REL, ATTR_TARGET, Affinity, Command, Document, Editor, EditorConfig, ElementKind,
    ElementNode, Node, NodeIds, Selection, TextPosition, point_at,
};
use pretty_assertions::assert_eq;

fn editor_with(text: &str) -> Editor {
    let mut ids = NodeIds::new();
    Editor::from_document(
        Document::new(vec![Node::paragraph(&mut ids, text)]),
        EditorConfig::default(),
    )
}

fn select(editor: &mut Editor, from: usize, to: usize) {
    let doc = editor.document();
    let start = TextPosition::new(vec![0], from);
    let end = TextPosition::new(vec![0], to);
    let anchor = point_at(doc, &start, Affinity::Forward).unwrap();
    let focus = point_at(doc, &end, Affinity::Backward).unwrap();
    editor.on_selection_change(Some(Selection::new(anchor, focus)));
}

fn links(doc: &Document) -> Vec<&ElementNode> {
    fn walk<'a>(nodes: &'a [Node], out: &mut Vec<&'a ElementNode>) {
        for node in nodes {
            if let Node::Element(el) = node {
                if el.kind == ElementKind::Link {
                    out.push(el);
                }
                walk(&el.children, out);
            }
        }
    }
    let mut out = Vec::new();
    walk(&doc.children, &mut out);
    out
}

fn label(link: &ElementNode) -> String {
    link.children
        .iter()
        .filter_map(|n| n.as_text().map(|t| t.text.as_str()))
        .collect()
}

#[test]
fn collapsed_link_in_empty_document_gets_https_scheme() {
    let mut editor = Editor::new();

    editor.dispatch(Command::InsertLink("example.com".to_string()));

    let doc = editor.document();
    let found = links(doc);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].url(), Some("https://example.com"));
    assert_eq!(label(found[0]), "https://example.com");
    assert_eq!(doc.plain_text(), "https://example.com");
}

#[test]
fn selected_text_becomes_link_label() {
    let mut editor = editor_with("click here now");
    select(&mut editor, 6, 10);

    let state = editor.dispatch(Command::InsertLink("http://example.org/a".to_string()));

    assert_eq!(state.link.as_deref(), Some("http://example.org/a"));
    let doc = editor.document();
    let found = links(doc);
    assert_eq!(found.len(), 1);
    assert_eq!(label(found[0]), "here");
    assert_eq!(
        found[0].attrs.get(ATTR_TARGET).and_then(|v| v.as_str()),
        Some("_blank")
    );
    assert_eq!(
        found[0].attrs.get(ATTR_REL).and_then(|v| v.as_str()),
        Some("noopener noreferrer")
    );
    assert_eq!(doc.plain_text(), "click here now");
}

#[test]
fn relinking_over_an_existing_link_replaces_it() {
    let mut editor = editor_with("one two three");
    select(&mut editor, 4, 7);
    editor.dispatch(Command::InsertLink("a.test".to_string()));

    select(&mut editor, 0, 13);
    editor.dispatch(Command::InsertLink("b.test".to_string()));

    let found = links(editor.document());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].url(), Some("https://b.test"));
    assert_eq!(label(found[0]), "one two three");
}

#[test]
fn blank_url_is_rejected() {
    let mut editor = editor_with("text");
    select(&mut editor, 0, 4);
    let before = editor.document().clone();

    editor.dispatch(Command::InsertLink("   ".to_string()));

    assert_eq!(editor.document(), &before);
    assert!(!editor.can_undo());
}

#[test]
fn remove_link_at_caret_unwraps_it() {
    let mut editor = editor_with("click here");
    select(&mut editor, 6, 10);
    editor.dispatch(Command::InsertLink("example.com".to_string()));

    select(&mut editor, 8, 8);
    assert_eq!(editor.format_state().link.as_deref(), Some("https://example.com"));
    let state = editor.dispatch(Command::RemoveLink);

    assert_eq!(state.link, None);
    let doc = editor.document();
    assert!(links(doc).is_empty());
    let Some(Node::Element(block)) = doc.children.first() else {
        panic!("expected paragraph");
    };
    assert_eq!(block.children.len(), 1);
    assert_eq!(doc.plain_text(), "click here");
}
