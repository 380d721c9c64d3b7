use manos_richtext_core::{
    Affinity, ColorChannel, Command, Document, Editor, EditorConfig, MarkKind, Node, NodeId,
    NodeIds, Point, Selection, TextPosition, point_at,
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

fn range(editor: &Editor, block: usize, from: usize, to: usize) -> Selection {
    let doc = editor.document();
    let start = TextPosition::new(vec![block], from);
    let end = TextPosition::new(vec![block], to);
    let anchor = point_at(doc, &start, Affinity::Forward).unwrap();
    let focus = point_at(doc, &end, Affinity::Backward).unwrap();
    Selection::new(anchor, focus)
}

/// `(text, bold, text color, highlight)` for every run of the first block.
fn styled_runs(editor: &Editor) -> Vec<(String, bool, Option<String>, Option<String>)> {
    let Some(Node::Element(block)) = editor.document().children.first() else {
        panic!("expected paragraph");
    };
    block
        .children
        .iter()
        .filter_map(|n| n.as_text())
        .map(|t| {
            let marks = &t.marks;
            (
                t.text.clone(),
                marks.bold,
                marks.text_color.clone(),
                marks.highlight_color.clone(),
            )
        })
        .collect()
}

fn outside_root() -> Selection {
    Selection::collapsed(Point::new(NodeId(9_999), 0))
}

#[test]
fn emoji_goes_to_the_saved_caret_after_focus_moves_to_picker() {
    let mut editor = editor_with(&["hello"]);
    editor.on_selection_change(Some(range(&editor, 0, 5, 5)));
    editor.on_selection_change(Some(outside_root()));
    assert!(!editor.is_focused());

    editor.dispatch(Command::InsertText("x".to_string()));
    assert_eq!(editor.document().plain_text(), "hello");

    editor.dispatch(Command::InsertEmoji("😀".to_string()));
    assert_eq!(editor.document().plain_text(), "hello😀");
    assert!(editor.is_focused());
}

#[test]
fn color_applies_to_saved_range_after_blur() {
    let mut editor = editor_with(&["hello world"]);
    editor.on_selection_change(Some(range(&editor, 0, 0, 5)));
    editor.on_focus_change(false);
    editor.on_selection_change(None);

    let state = editor.dispatch(Command::SetColor(
        ColorChannel::Text,
        Some("#ff0000".to_string()),
    ));

    assert_eq!(state.text_color.as_deref(), Some("#ff0000"));
    let Some(Node::Element(block)) = editor.document().children.first() else {
        panic!("expected paragraph");
    };
    let colors: Vec<(String, Option<String>)> = block
        .children
        .iter()
        .filter_map(|n| n.as_text())
        .map(|t| (t.text.clone(), t.marks.text_color.clone()))
        .collect();
    assert_eq!(
        colors,
        vec![
            ("hello".to_string(), Some("#ff0000".to_string())),
            (" world".to_string(), None),
        ]
    );
}

#[test]
fn clearing_highlight_removes_it() {
    let mut editor = editor_with(&["marked"]);
    editor.on_selection_change(Some(range(&editor, 0, 0, 6)));
    editor.dispatch(Command::SetColor(ColorChannel::Highlight, Some("yellow".to_string())));
    assert_eq!(editor.format_state().highlight_color.as_deref(), Some("yellow"));

    let state = editor.dispatch(Command::SetColor(ColorChannel::Highlight, None));
    assert_eq!(state.highlight_color, None);
}

#[test]
fn stale_saved_caret_is_clamped() {
    let mut editor = editor_with(&["hello"]);
    editor.on_selection_change(Some(range(&editor, 0, 5, 5)));
    for _ in 0..3 {
        editor.dispatch(Command::DeleteBackward);
    }
    assert_eq!(editor.document().plain_text(), "he");
    editor.on_focus_change(false);

    editor.dispatch(Command::InsertEmoji("🙂".to_string()));

    assert_eq!(editor.document().plain_text(), "he🙂");
}

#[test]
fn saved_caret_in_a_removed_block_is_not_restored() {
    let mut editor = editor_with(&["a"]);
    editor.on_selection_change(Some(range(&editor, 0, 1, 1)));
    editor.dispatch(Command::SplitBlock);
    editor.on_selection_change(Some(range(&editor, 1, 0, 0)));
    editor.undo();
    assert_eq!(editor.document().plain_text(), "a");
    editor.on_focus_change(false);
    let before = editor.document().clone();

    editor.dispatch(Command::InsertEmoji("🙂".to_string()));

    assert_eq!(editor.document(), &before);
}

#[test]
fn focused_editor_uses_the_live_caret() {
    let mut editor = editor_with(&["hello"]);
    editor.on_selection_change(Some(range(&editor, 0, 5, 5)));
    editor.dispatch(Command::InsertText("x".to_string()));

    editor.dispatch(Command::InsertEmoji("😀".to_string()));

    assert_eq!(editor.document().plain_text(), "hellox😀");
}

#[test]
fn emoji_without_any_saved_range_is_ignored() {
    let mut editor = Editor::new();
    assert!(editor.saved_selection().is_none());

    editor.dispatch(Command::InsertEmoji("👍".to_string()));
    assert_eq!(editor.document().plain_text(), "");

    editor.dispatch(Command::InsertText("typed".to_string()));
    editor.dispatch(Command::InsertEmoji("👍".to_string()));
    assert_eq!(editor.document().plain_text(), "typed👍");
}

#[test]
fn saved_range_follows_runs_split_by_formatting() {
    let mut editor = editor_with(&["hello"]);
    editor.on_selection_change(Some(range(&editor, 0, 1, 4)));
    editor.dispatch(Command::ToggleMark(MarkKind::Bold));
    editor.on_selection_change(None);

    editor.dispatch(Command::SetColor(ColorChannel::Text, Some("red".to_string())));
    editor.on_focus_change(false);
    editor.dispatch(Command::SetColor(ColorChannel::Highlight, Some("yellow".to_string())));

    let red = Some("red".to_string());
    let yellow = Some("yellow".to_string());
    assert_eq!(
        styled_runs(&editor),
        vec![
            ("h".to_string(), false, None, None),
            ("ell".to_string(), true, red, yellow),
            ("o".to_string(), false, None, None),
        ]
    );
}
