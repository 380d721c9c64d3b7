use manos_richtext_core::{
    Affinity, Attachment, Command, Document, DocumentValue, Editor, ImageData, ListKind, MarkKind,
    Node, NodeId, SnapshotError, TextPosition, deserialize, point_at, serialize,
};
use pretty_assertions::assert_eq;

fn rich_document() -> Document {
    let mut editor = Editor::new();
    editor.dispatch(Command::SetHeading(Some(2)));
    editor.dispatch(Command::InsertText("Title".to_string()));
    editor.dispatch(Command::SplitBlock);
    editor.dispatch(Command::ToggleMark(MarkKind::Bold));
    editor.dispatch(Command::InsertText("bold".to_string()));
    editor.dispatch(Command::ToggleMark(MarkKind::Bold));
    editor.dispatch(Command::InsertText(" and ".to_string()));
    editor.dispatch(Command::InsertLink("example.com".to_string()));
    editor.dispatch(Command::InsertLineBreak);
    editor.dispatch(Command::InsertAttachment(Attachment::new(
        "notes.txt",
        b"hello".to_vec(),
    )));
    editor.dispatch(Command::InsertSignatureImage(ImageData::new(
        "image/png",
        vec![0x89, 0x50, 0x4e, 0x47],
    )));
    editor.dispatch(Command::SplitBlock);
    editor.dispatch(Command::InsertText("item".to_string()));
    editor.dispatch(Command::SetListType(ListKind::OrderedAlpha));
    editor.document().clone()
}

#[test]
fn documents_survive_a_round_trip() {
    let doc = rich_document();
    let json = serialize(&doc).unwrap();

    let restored = deserialize(&json).unwrap();

    assert_eq!(restored, doc);
    assert_eq!(serialize(&restored).unwrap(), json);
}

#[test]
fn rich_document_has_every_node_kind() {
    let doc = rich_document();
    let json = serialize(&doc).unwrap();

    for needle in [
        r#""node":"element""#,
        r#""node":"text""#,
        r#""node":"void""#,
        r#""kind":"heading""#,
        r#""kind":"link""#,
        r#""kind":"line_break""#,
        r#""kind":"attachment""#,
        r#""kind":"image""#,
        r#""list_kind":"ordered_alpha""#,
        r#""bold":true"#,
    ] {
        assert!(json.contains(needle), "missing {needle} in {json}");
    }
    assert!(json.starts_with(r#"{"schema":"manos-richtext","version":1,"#));
}

#[test]
fn missing_optional_fields_take_defaults() {
    let json = r#"{
        "document": {
            "children": [
                { "node": "element", "id": 2, "kind": "paragraph",
                  "children": [ { "node": "text", "id": 1, "text": "plain" } ] }
            ]
        }
    }"#;

    let doc = deserialize(json).unwrap();

    let Some(Node::Element(block)) = doc.children.first() else {
        panic!("expected paragraph");
    };
    assert!(block.attrs.is_empty());
    let Node::Text(run) = &block.children[0] else {
        panic!("expected text run");
    };
    assert_eq!(run.id, NodeId(1));
    assert!(!run.marks.bold);
    assert_eq!(run.marks.font_size, None);
}

#[test]
fn unknown_schema_or_version_is_rejected() {
    let doc = rich_document();
    let mut value = DocumentValue::new(doc);
    value.version = 7;
    let json = value.to_json().unwrap();

    let Err(SnapshotError::Unsupported { schema, version }) = deserialize(&json) else {
        panic!("expected unsupported snapshot");
    };
    assert_eq!(schema, "manos-richtext");
    assert_eq!(version, 7);
}

#[test]
fn malformed_json_is_a_decode_error() {
    assert!(matches!(deserialize("{ not json"), Err(SnapshotError::Decode(_))));
    assert!(matches!(
        deserialize(r#"{"document":{"children":[{"node":"bogus","id":1}]}}"#),
        Err(SnapshotError::Decode(_))
    ));
}

#[test]
fn restored_document_accepts_new_edits() {
    let doc = deserialize(&serialize(&rich_document()).unwrap()).unwrap();
    let mut editor = Editor::from_document(doc, Default::default());
    let end = editor.document().text_block_paths().pop().unwrap();
    let point = point_at(
        editor.document(),
        &TextPosition::new(end, 4),
        Affinity::Backward,
    )
    .unwrap();
    editor.on_selection_change(Some(manos_richtext_core::Selection::collapsed(point)));

    editor.dispatch(Command::InsertText("s".to_string()));

    assert!(editor.document().plain_text().ends_with("items"));
}
