use folio_layout::{FixedMetrics, FlowState, LayoutOptions, LayoutTree, Rect};
use folio_model::{parse_markup, ComponentRegistry, Node, Tree};
use folio_render::RenderTree;
use std::sync::Arc;

fn setup(source: &str) -> (Tree, RenderTree, ComponentRegistry) {
    let registry = ComponentRegistry::with_defaults();
    let model = parse_markup(source, &registry).unwrap();
    let mut render = RenderTree::build(&model, &registry);
    render.mark_laid_out();
    (model, render, registry)
}

fn layout(render: &RenderTree, char_width: f32, line_height: f32, options: LayoutOptions) -> LayoutTree {
    let (tree, _) = LayoutTree::build(
        render,
        Arc::new(FixedMetrics::new(char_width, line_height)),
        options,
    );
    tree
}

#[test]
fn test_six_words_wrap_onto_two_lines() {
    let (_, render, _) = setup(
        r#"<doc id="d"><paragraph id="p"><text id="t">Hello Hello Hello Hello Hello Hello </text></paragraph></doc>"#,
    );
    let tree = layout(
        &render,
        20.0,
        20.0,
        LayoutOptions {
            line_width: 700.0,
            ..LayoutOptions::default()
        },
    );

    assert_eq!(tree.line_count(), 2);
    assert_eq!(
        tree.line_texts(),
        vec![
            "Hello Hello Hello Hello Hello ".to_string(),
            "Hello ↵".to_string()
        ]
    );
    for line in tree.lines() {
        assert_eq!(tree.node(line).state, FlowState::Flowed);
        assert!(tree.node(line).width <= 700.0);
    }
    assert_eq!(tree.size(), render.size());
}

#[test]
fn test_oversize_word_keeps_line_break_on_its_line() {
    let (_, render, _) = setup(r#"<doc id="d"><paragraph id="p"><text id="t">enormous</text></paragraph></doc>"#);
    let tree = layout(
        &render,
        10.0,
        20.0,
        LayoutOptions {
            line_width: 30.0,
            ..LayoutOptions::default()
        },
    );

    assert_eq!(tree.line_count(), 1);
    assert_eq!(tree.line_texts(), vec!["enormous↵".to_string()]);
    assert_eq!(tree.size(), render.size());
}

#[test]
fn test_oversize_word_then_short_word_wraps() {
    let (_, render, _) = setup(r#"<doc id="d"><paragraph id="p"><text id="t">enormous x</text></paragraph></doc>"#);
    let tree = layout(
        &render,
        10.0,
        20.0,
        LayoutOptions {
            line_width: 30.0,
            ..LayoutOptions::default()
        },
    );

    assert_eq!(
        tree.line_texts(),
        vec!["enormous ".to_string(), "x↵".to_string()]
    );
}

#[test]
fn test_page_overflow_then_join() {
    let (mut model, mut render, registry) = setup(
        r#"<doc id="d"><paragraph id="p1"><text id="a" scale="2">big</text></paragraph><paragraph id="p2"><text id="b">small</text></paragraph></doc>"#,
    );
    let options = LayoutOptions {
        line_width: 700.0,
        page_height: 50.0,
        ..LayoutOptions::default()
    };
    let mut tree = layout(&render, 10.0, 20.0, options);
    assert_eq!(tree.page_count(), 2);
    assert_eq!(tree.line_count(), 2);

    let p1 = model.key_of("p1").unwrap();
    model
        .replace(p1, 0..1, vec![Node::leaf("text", "a", "big")])
        .unwrap();
    render.sync(&model, "p1", &registry).unwrap();
    let update = tree.sync(&render);
    render.mark_laid_out();

    assert_eq!(update.rebuilt, 1);
    assert_eq!(update.report.joins, 1);
    assert_eq!(tree.page_count(), 1);
    let page = tree.children(tree.root())[0];
    assert_eq!(tree.children(page).len(), 2);
    assert_eq!(tree.node(page).height, 40.0);
}

#[test]
fn test_sync_rebuilds_only_changed_blocks() {
    let (mut model, mut render, registry) = setup(
        r#"<doc id="d"><paragraph id="p1"><text id="a">one two three</text></paragraph><paragraph id="p2"><text id="b">four</text></paragraph><paragraph id="p3"><text id="c">five</text></paragraph></doc>"#,
    );
    let mut tree = layout(&render, 10.0, 20.0, LayoutOptions::default());
    let untouched = tree.block_pieces()[2].1;

    let b = model.key_of("b").unwrap();
    model.splice_text(b, 4..4, " and more").unwrap();
    render.sync(&model, "p2", &registry).unwrap();
    let update = tree.sync(&render);
    render.mark_laid_out();

    assert_eq!(update.rebuilt, 1);
    assert_eq!(update.removed, 0);
    assert_eq!(tree.block_pieces()[2].1, untouched);
    assert_eq!(tree.line_texts()[1], "four and more↵");
    assert_eq!(tree.size(), render.size());
}

#[test]
fn test_removed_block_leaves_layout() {
    let (mut model, mut render, registry) = setup(
        r#"<doc id="d"><paragraph id="p1"><text id="a">one</text></paragraph><paragraph id="p2"><text id="b">two</text></paragraph></doc>"#,
    );
    let mut tree = layout(&render, 10.0, 20.0, LayoutOptions::default());

    let root = model.root();
    model.detach(root, 0..1);
    render.sync(&model, "d", &registry).unwrap();
    let update = tree.sync(&render);

    assert_eq!(update.removed, 1);
    assert_eq!(tree.line_texts(), vec!["two↵".to_string()]);
}

#[test]
fn test_long_block_breaks_across_pages() {
    let text = "word ".repeat(40);
    let source = format!(
        r#"<doc id="d"><paragraph id="p"><text id="t">{text}</text></paragraph></doc>"#
    );
    let (_, render, _) = setup(&source);
    let options = LayoutOptions {
        line_width: 100.0,
        page_height: 100.0,
        ..LayoutOptions::default()
    };
    let tree = layout(&render, 10.0, 20.0, options);

    // Two words per line, five lines per page
    assert_eq!(tree.line_count(), 20);
    assert_eq!(tree.page_count(), 4);
    let pieces = tree.block_pieces();
    assert_eq!(pieces.len(), 4);
    assert!(pieces.iter().all(|(id, _)| id == "p"));
}

#[test]
fn test_queries() {
    let (_, render, _) = setup(
        r#"<doc id="d"><paragraph id="p"><text id="t">Hello world</text></paragraph></doc>"#,
    );
    let tree = layout(&render, 20.0, 20.0, LayoutOptions::default());

    assert_eq!(
        tree.bounding_box(6).unwrap(),
        Rect {
            x: 120.0,
            y: 0.0,
            width: 20.0,
            height: 20.0
        }
    );
    assert_eq!(tree.bounding_box(11).unwrap().width, 0.0);
    assert!(tree.bounding_box(12).is_err());

    assert_eq!(tree.offset_at_point(125.0, 5.0), 6);
    assert_eq!(tree.offset_at_point(1000.0, 5.0), 11);
    assert_eq!(tree.offset_at_point(0.0, 500.0), 0);

    let caret = tree.caret_rect(&render, 8).unwrap();
    assert_eq!(caret.x, 120.0);
    assert_eq!(caret.width, 0.0);
}
