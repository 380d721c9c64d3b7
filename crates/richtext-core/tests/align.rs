use manos_richtext_core::{
    ATTR_ALIGN, Affinity, Alignment, Command, Document, Editor, EditorConfig, Node, NodeIds,
    Selection, TextPosition, point_at,
};
use pretty_assertions::assert_eq;

fn editor_with(paragraphs: &[&str]) -> Editor {
    let mut ids = NodeIds::new();
    let children = paragraphs
        .iter()
        .map(|text| Node::paragraph(&mut ids, *text))
        .collect();
    Editor::from_document(Document::new(children), EditorConfig::default())
}

fn select(editor: &mut Editor, from: (usize, usize), to: (usize, usize)) {
    let doc = editor.document();
    let start = TextPosition::new(vec![from.0], from.1);
    let end = TextPosition::new(vec![to.0], to.1);
    let anchor = point_at(doc, &start, Affinity::Forward).unwrap();
    let focus = point_at(doc, &end, Affinity::Backward).unwrap();
    editor.on_selection_change(Some(Selection::new(anchor, focus)));
}

fn alignments(doc: &Document) -> Vec<Option<Alignment>> {
    doc.children
        .iter()
        .map(|n| n.as_element().and_then(|el| el.alignment()))
        .collect()
}

#[test]
fn alignment_applies_to_every_selected_block() {
    let mut editor = editor_with(&["one", "two", "three"]);
    select(&mut editor, (0, 1), (1, 1));

    let state = editor.dispatch(Command::SetAlignment(Alignment::Center));

    assert_eq!(state.alignment, Alignment::Center);
    assert_eq!(
        alignments(editor.document()),
        vec![Some(Alignment::Center), Some(Alignment::Center), None]
    );
}

#[test]
fn left_alignment_clears_the_attribute() {
    let mut editor = editor_with(&["text"]);
    select(&mut editor, (0, 2), (0, 2));
    editor.dispatch(Command::SetAlignment(Alignment::Right));

    let state = editor.dispatch(Command::SetAlignment(Alignment::Left));

    assert_eq!(state.alignment, Alignment::Left);
    let block = editor.document().children[0].as_element().unwrap();
    assert!(!block.attrs.contains_key(ATTR_ALIGN));
}

#[test]
fn alignment_survives_enter() {
    let mut editor = editor_with(&["centered"]);
    select(&mut editor, (0, 8), (0, 8));
    editor.dispatch(Command::SetAlignment(Alignment::Center));

    let state = editor.dispatch(Command::SplitBlock);

    assert_eq!(state.alignment, Alignment::Center);
    assert_eq!(
        alignments(editor.document()),
        vec![Some(Alignment::Center), Some(Alignment::Center)]
    );
}
