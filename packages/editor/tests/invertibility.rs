//! Every balanced range of a small document, deleted or replaced by text
//!
//! This tests:
//! - Applying the reverse change restores the original document
//! - The tree stays consistent after both the change and its reverse
//! - Rejected changes leave the document untouched

use folio_editor::ReplaceChange;
use folio_model::{parse_markup, ComponentRegistry, IdGenerator, Tree};

// d(0) h(1) "Hi"(2..4) h/(4) p1(5) "ab"(6..8) "cd"(8..10) p1/(10) p2(11) "ef"(12..14) p2/(14) d/(15)
fn document() -> Tree {
    parse_markup(
        concat!(
            r#"<doc id="d">"#,
            r#"<heading id="h" level="1"><text id="t">Hi</text></heading>"#,
            r#"<paragraph id="p1"><text id="a">ab</text><text id="b" bold="true">cd</text></paragraph>"#,
            r#"<paragraph id="p2"><text id="c">ef</text></paragraph>"#,
            r#"</doc>"#,
        ),
        &ComponentRegistry::with_defaults(),
    )
    .unwrap()
}

fn check(original: &Tree, change: ReplaceChange) -> bool {
    let label = format!("{}..{} {:?}", change.from, change.to, change.fragments);
    let mut tree = original.clone();
    let mut ids = IdGenerator::from_seed("s".into());

    let result = match change.apply(&mut tree, &mut ids) {
        Ok(result) => result,
        Err(_) => {
            assert_eq!(&tree, original, "rejected change {} modified the tree", label);
            return false;
        }
    };
    tree.check_invariants()
        .unwrap_or_else(|error| panic!("{} broke the tree: {}", label, error));

    result
        .reverse
        .apply(&mut tree, &mut ids)
        .unwrap_or_else(|error| panic!("reverse of {} failed: {}", label, error));
    tree.check_invariants()
        .unwrap_or_else(|error| panic!("reverse of {} broke the tree: {}", label, error));
    assert_eq!(&tree, original, "reverse of {} did not restore the document", label);
    true
}

fn ranges(tree: &Tree) -> impl Iterator<Item = (usize, usize)> {
    let size = tree.size();
    (1..size).flat_map(move |from| (from..size).map(move |to| (from, to)))
}

#[test]
fn test_every_delete_is_reversible() {
    let original = document();
    let applied = ranges(&original)
        .filter(|(from, to)| check(&original, ReplaceChange::delete(*from, *to)))
        .count();

    // Every balanced range applies except removing all three blocks
    assert!(applied > 40, "only {} deletes applied", applied);
}

#[test]
fn test_every_text_replace_is_reversible() {
    let original = document();
    let applied = ranges(&original)
        .filter(|(from, to)| check(&original, ReplaceChange::text(*from, *to, "X")))
        .count();

    assert!(applied > 30, "only {} replacements applied", applied);
}

#[test]
fn test_delete_up_to_block_end_keeps_next_block() {
    let original = document();
    let mut tree = original.clone();
    let mut ids = IdGenerator::from_seed("s".into());

    let result = ReplaceChange::delete(4, 10).apply(&mut tree, &mut ids).unwrap();
    assert_eq!(tree.text(), "Hief");
    result.reverse.apply(&mut tree, &mut ids).unwrap();

    assert_eq!(tree, original);
    let p2 = tree.key_of("p2").unwrap();
    assert_eq!(tree.text_of(tree.children(p2)[0]), "ef");
}
