//! Sequences of changes recorded in a history
//!
//! This tests:
//! - Typing bursts that coalesce into one action
//! - Batched edits across paragraph boundaries
//! - Threaded transformations and their reverses
//! - Document integrity after undo/redo chains

use folio_editor::{History, ManualClock, ReplaceChange, Transformation};
use folio_model::{parse_markup, ComponentRegistry, IdGenerator, Tree};
use std::time::Duration;

// d(0) p1(1) "abc"(2..5) p1/(5) p2(6) "def"(7..10) p2/(10) d/(11)
fn two_paragraphs() -> Tree {
    parse_markup(
        r#"<doc id="d"><paragraph id="p1"><text id="a">abc</text></paragraph><paragraph id="p2"><text id="b">def</text></paragraph></doc>"#,
        &ComponentRegistry::with_defaults(),
    )
    .unwrap()
}

fn history() -> (History, ManualClock) {
    let clock = ManualClock::new();
    (History::new().with_clock(clock.clone()), clock)
}

#[test]
fn test_typing_burst_is_one_action() {
    let original = two_paragraphs();
    let mut tree = original.clone();
    let mut ids = IdGenerator::default();
    let (mut history, clock) = history();

    for (i, ch) in ["x", "y", "z"].into_iter().enumerate() {
        let change = ReplaceChange::text(5 + i, 5 + i, ch);
        history
            .apply(&Transformation::single(change), &mut tree, &mut ids)
            .unwrap();
        clock.advance(Duration::from_millis(50));
    }
    assert_eq!(tree.text(), "abcxyzdef");
    assert_eq!(history.undo_levels(), 1);

    history.undo(&mut tree, &mut ids).unwrap();
    assert_eq!(tree, original);

    history.redo(&mut tree, &mut ids).unwrap();
    assert_eq!(tree.text(), "abcxyzdef");
    tree.check_invariants().unwrap();
}

#[test]
fn test_batched_join_then_type() {
    let original = two_paragraphs();
    let mut tree = original.clone();
    let mut ids = IdGenerator::default();
    let (mut history, clock) = history();

    history.begin_batch();
    history
        .apply(&Transformation::single(ReplaceChange::delete(3, 8)), &mut tree, &mut ids)
        .unwrap();
    clock.advance(Duration::from_secs(10));
    history
        .apply(&Transformation::single(ReplaceChange::text(3, 3, "Z")), &mut tree, &mut ids)
        .unwrap();
    history.end_batch();
    history.set_description("join and type");

    assert_eq!(tree.text(), "aZef");
    assert_eq!(tree.children(tree.root()).len(), 1);
    assert_eq!(history.undo_levels(), 1);
    assert_eq!(history.undo_description(), Some("join and type"));

    history.undo(&mut tree, &mut ids).unwrap();
    assert_eq!(tree, original);
    assert_eq!(history.redo_description(), Some("join and type"));
}

#[test]
fn test_threaded_changes_in_two_paragraphs() {
    let original = two_paragraphs();
    let mut tree = original.clone();
    let mut ids = IdGenerator::default();

    // Both offsets address the document before either change
    let transformation = Transformation::new(vec![
        ReplaceChange::text(3, 3, "X"),
        ReplaceChange::text(8, 8, "Y"),
    ]);
    let applied = transformation.apply(&mut tree, &mut ids).unwrap();
    assert_eq!(tree.text(), "aXbcdYef");
    assert_eq!(applied.maps.len(), 2);
    assert_eq!(applied.updated, vec!["p1".to_string(), "p2".to_string()]);

    applied.reverse.apply(&mut tree, &mut ids).unwrap();
    assert_eq!(tree, original);
}

#[test]
fn test_deleted_paragraph_comes_back_with_its_id() {
    let original = two_paragraphs();
    let mut tree = original.clone();
    let mut ids = IdGenerator::default();
    let (mut history, _) = history();

    history
        .apply(&Transformation::single(ReplaceChange::delete(6, 11)), &mut tree, &mut ids)
        .unwrap();
    assert!(tree.get("p2").is_none());

    history.undo(&mut tree, &mut ids).unwrap();
    assert!(tree.get("p2").is_some());
    assert_eq!(tree, original);

    history.redo(&mut tree, &mut ids).unwrap();
    assert!(tree.get("p2").is_none());
    assert_eq!(tree.text(), "abc");
}

#[test]
fn test_undo_all_then_redo_all() {
    let original = two_paragraphs();
    let mut tree = original.clone();
    let mut ids = IdGenerator::default();
    let (mut history, clock) = history();

    let edits = [
        ReplaceChange::text(2, 2, ">"),
        ReplaceChange::delete(4, 9),
        ReplaceChange::text(3, 4, "--"),
    ];
    for change in edits {
        history
            .apply(&Transformation::single(change), &mut tree, &mut ids)
            .unwrap();
        tree.check_invariants().unwrap();
        clock.advance(Duration::from_secs(1));
    }
    let edited = tree.clone();
    assert_eq!(history.undo_levels(), 3);

    while history.can_undo() {
        history.undo(&mut tree, &mut ids).unwrap();
        tree.check_invariants().unwrap();
    }
    assert_eq!(tree, original);
    assert!(history.undo(&mut tree, &mut ids).unwrap().is_none());

    while history.can_redo() {
        history.redo(&mut tree, &mut ids).unwrap();
    }
    assert_eq!(tree, edited);
}

#[test]
fn test_history_cap_drops_oldest() {
    let mut tree = two_paragraphs();
    let mut ids = IdGenerator::default();
    let clock = ManualClock::new();
    let mut history = History::with_max_levels(2).with_clock(clock.clone());

    for ch in ["1", "2", "3"] {
        history
            .apply(&Transformation::single(ReplaceChange::text(2, 2, ch)), &mut tree, &mut ids)
            .unwrap();
        clock.advance(Duration::from_secs(1));
    }
    assert_eq!(tree.text(), "321abcdef");
    assert_eq!(history.undo_levels(), 2);

    history.undo(&mut tree, &mut ids).unwrap();
    history.undo(&mut tree, &mut ids).unwrap();
    assert!(!history.can_undo());
    assert_eq!(tree.text(), "1abcdef");
}
