//! End-to-end editing scenarios through an edit session

use folio_editor::{Cursor, EditSession, EngineConfig, ManualClock};
use folio_layout::FixedMetrics;
use folio_model::{parse_markup, ComponentRegistry, Tree};
use std::sync::Arc;
use std::time::Duration;

// Model: d(0) p(1) "Hello world"(2..13) p/(13) q(14) "Second line"(15..26) q/(26) d/(27)
// Render: "Hello world"(0..11) ↵(11) "Second line"(12..23) ↵(23)
const TWO_PARAGRAPHS: &str = r#"<doc id="d"><paragraph id="p"><text id="t">Hello world</text></paragraph><paragraph id="q"><text id="u">Second line</text></paragraph></doc>"#;

fn open(source: &str) -> (EditSession, ManualClock) {
    let clock = ManualClock::new();
    let session = EditSession::from_markup(
        source,
        ComponentRegistry::with_defaults(),
        Arc::new(FixedMetrics::new(10.0, 20.0)),
        EngineConfig::default(),
    )
    .unwrap()
    .with_clock(clock.clone());
    (session, clock)
}

fn parsed(source: &str) -> Tree {
    parse_markup(source, &ComponentRegistry::with_defaults()).unwrap()
}

fn assert_offsets_consistent(session: &EditSession) {
    let render = session.render();
    for offset in 0..render.size() {
        let model = render.to_model_offset(offset).unwrap();
        assert_eq!(render.to_render_offset(model).unwrap(), offset);
    }
}

#[test]
fn test_insert_between_words() {
    let (mut session, _) =
        open(r#"<doc id="d"><paragraph id="p"><text id="t">Hello world</text></paragraph></doc>"#);
    session.set_cursor(6, 6, None).unwrap();

    session.insert_text("there ").unwrap();

    assert_eq!(session.model().text(), "Hello there world");
    assert_eq!(session.get_cursor().head, 12);
    assert_eq!(session.layout().line_texts(), vec!["Hello there world↵".to_string()]);
}

#[test]
fn test_typing_replaces_selection() {
    let (mut session, _) = open(TWO_PARAGRAPHS);
    session.set_cursor(11, 6, None).unwrap();

    let update = session.insert_text("there").unwrap();

    assert_eq!(session.model().text(), "Hello thereSecond line");
    assert_eq!(update.cursor, Cursor::collapsed(11));
    assert_offsets_consistent(&session);
}

#[test]
fn test_delete_across_paragraphs_and_undo() {
    let (mut session, _) = open(TWO_PARAGRAPHS);

    session.delete_range(3, 15).unwrap();
    assert_eq!(session.model().text(), "Helond line");
    assert_eq!(session.render().size(), 12);
    assert_eq!(session.get_cursor(), Cursor::collapsed(3));
    assert_offsets_consistent(&session);

    assert!(session.undo().unwrap());
    assert_eq!(session.model(), &parsed(TWO_PARAGRAPHS));
    assert_eq!(session.render().size(), 24);
    assert_eq!(session.layout().line_count(), 2);
    assert_offsets_consistent(&session);

    assert!(session.redo().unwrap());
    assert_eq!(session.model().text(), "Helond line");
}

#[test]
fn test_select_all_delete_keeps_one_block() {
    let (mut session, _) = open(TWO_PARAGRAPHS);

    session.delete_range(0, 23).unwrap();
    let model = session.model();
    assert_eq!(model.text(), "");
    assert_eq!(model.children(model.root()).len(), 1);
    model.check_invariants().unwrap();
    assert_eq!(session.render().size(), 1);
    assert_eq!(session.get_cursor(), Cursor::collapsed(0));

    assert!(session.undo().unwrap());
    assert_eq!(session.model(), &parsed(TWO_PARAGRAPHS));
}

#[test]
fn test_quick_inserts_undo_together() {
    let (mut session, clock) = open(TWO_PARAGRAPHS);
    session.set_cursor(5, 5, None).unwrap();

    session.insert_text("!").unwrap();
    clock.advance(Duration::from_millis(100));
    session.insert_text("?").unwrap();
    assert_eq!(session.model().text(), "Hello!? worldSecond line");
    assert_eq!(session.history().undo_levels(), 1);

    assert!(session.undo().unwrap());
    assert_eq!(session.model(), &parsed(TWO_PARAGRAPHS));
    assert_eq!(session.get_cursor(), Cursor::collapsed(5));
    assert!(!session.history().can_undo());
}

#[test]
fn test_slow_inserts_undo_separately() {
    let (mut session, clock) = open(TWO_PARAGRAPHS);
    session.set_cursor(5, 5, None).unwrap();

    session.insert_text("!").unwrap();
    clock.advance(Duration::from_secs(1));
    session.insert_text("?").unwrap();
    assert_eq!(session.history().undo_levels(), 2);

    assert!(session.undo().unwrap());
    assert_eq!(session.model().text(), "Hello! worldSecond line");
    assert_eq!(session.get_cursor(), Cursor::collapsed(6));
}

#[test]
fn test_new_edit_after_undo_prunes_redo() {
    let (mut session, clock) = open(TWO_PARAGRAPHS);
    session.set_cursor(5, 5, None).unwrap();

    session.insert_text("!").unwrap();
    clock.advance(Duration::from_secs(1));
    session.insert_text("?").unwrap();
    assert!(session.undo().unwrap());
    assert!(session.history().can_redo());

    clock.advance(Duration::from_secs(1));
    session.insert_text("x").unwrap();
    assert!(!session.history().can_redo());
    assert!(!session.redo().unwrap());
    assert_eq!(session.model().text(), "Hello!x worldSecond line");
}

#[test]
fn test_history_boundaries_are_no_ops() {
    let (mut session, _) = open(TWO_PARAGRAPHS);
    assert!(!session.undo().unwrap());
    assert!(!session.redo().unwrap());
    assert_eq!(session.model(), &parsed(TWO_PARAGRAPHS));
    assert!(session.last_update().is_none());
}
