use criterion::{black_box, criterion_group, criterion_main, Criterion};
use folio_model::{parse_markup, to_markup, ComponentRegistry};

fn parse_small_document(c: &mut Criterion) {
    let registry = ComponentRegistry::with_defaults();
    let source = r#"
        <doc id="d">
            <heading id="h" level="1"><text id="h1">Title</text></heading>
            <paragraph id="p"><text id="t1">Some </text><text id="t2" bold="true">bold</text></paragraph>
        </doc>
    "#;

    c.bench_function("parse_small_document", |b| {
        b.iter(|| parse_markup(black_box(source), &registry))
    });
}

fn large_source(paragraphs: usize) -> String {
    let mut source = String::from("<doc id=\"d\">");
    for i in 0..paragraphs {
        source.push_str(&format!(
            "<paragraph id=\"p{i}\"><text id=\"a{i}\">Paragraph {i} with some words &amp; </text><text id=\"b{i}\" italic=\"true\">emphasis</text></paragraph>"
        ));
    }
    source.push_str("</doc>");
    source
}

fn parse_large_document(c: &mut Criterion) {
    let registry = ComponentRegistry::with_defaults();
    let source = large_source(500);

    c.bench_function("parse_large_document", |b| {
        b.iter(|| parse_markup(black_box(&source), &registry))
    });
}

fn serialize_large_document(c: &mut Criterion) {
    let registry = ComponentRegistry::with_defaults();
    let tree = match parse_markup(&large_source(500), &registry) {
        Ok(tree) => tree,
        Err(err) => panic!("bench source failed to parse: {err}"),
    };

    c.bench_function("serialize_large_document", |b| {
        b.iter(|| to_markup(black_box(&tree)))
    });
}

fn resolve_positions(c: &mut Criterion) {
    let registry = ComponentRegistry::with_defaults();
    let tree = match parse_markup(&large_source(500), &registry) {
        Ok(tree) => tree,
        Err(err) => panic!("bench source failed to parse: {err}"),
    };
    let size = tree.size();

    c.bench_function("resolve_positions", |b| {
        b.iter(|| {
            for offset in (0..size).step_by(97) {
                let _ = black_box(tree.resolve_position(offset));
            }
        })
    });
}

criterion_group!(
    benches,
    parse_small_document,
    parse_large_document,
    serialize_large_document,
    resolve_positions
);
criterion_main!(benches);
