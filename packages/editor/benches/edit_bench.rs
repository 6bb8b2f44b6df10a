use criterion::{black_box, criterion_group, criterion_main, Criterion};
use folio_editor::{EditSession, EngineConfig, ReplaceChange, Transformation};
use folio_layout::FixedMetrics;
use folio_model::{parse_markup, ComponentRegistry, IdGenerator};
use std::sync::Arc;

fn long_source(paragraphs: usize) -> String {
    let mut source = String::from("<doc id=\"d\">");
    for i in 0..paragraphs {
        source.push_str(&format!(
            "<paragraph id=\"p{i}\"><text id=\"t{i}\">{}</text></paragraph>",
            "lorem ipsum dolor sit amet ".repeat(8)
        ));
    }
    source.push_str("</doc>");
    source
}

fn change_and_reverse(c: &mut Criterion) {
    let mut tree = match parse_markup(&long_source(300), &ComponentRegistry::with_defaults()) {
        Ok(tree) => tree,
        Err(err) => panic!("bench document failed to parse: {err}"),
    };
    let mut ids = IdGenerator::default();
    // Spans the boundary between the first two paragraphs
    let transformation = Transformation::single(ReplaceChange::delete(200, 240));

    c.bench_function("delete_join_and_reverse", |b| {
        b.iter(|| {
            if let Ok(applied) = transformation.apply(&mut tree, &mut ids) {
                let _ = black_box(applied.reverse.apply(&mut tree, &mut ids));
            }
        })
    });
}

fn session_typing(c: &mut Criterion) {
    let mut session = match EditSession::from_markup(
        &long_source(300),
        ComponentRegistry::with_defaults(),
        Arc::new(FixedMetrics::default()),
        EngineConfig::default(),
    ) {
        Ok(session) => session,
        Err(err) => panic!("{err}"),
    };
    let _ = session.set_cursor(4000, 4000, None);

    c.bench_function("session_insert_then_undo", |b| {
        b.iter(|| {
            if session.insert_text("x").is_ok() {
                let _ = black_box(session.undo());
            }
        })
    });
}

criterion_group!(benches, change_and_reverse, session_typing);
criterion_main!(benches);
