//! Benchmarks for opening a document and filling the viewport.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use pagewise::document::{DocumentSource, FixtureLoader, FixtureManifest};
use pagewise::engine::{InlineExecutor, PreviewConfig, PreviewController};

fn fill(json: &[u8], scale: Option<f32>) {
    let mut config = PreviewConfig::default();
    config.display.device_pixel_ratio = scale;
    let mut preview =
        PreviewController::new(FixtureLoader, InlineExecutor::new(), config, 612.0, 1000.0);
    preview
        .open(DocumentSource::Bytes(json.to_vec()), std::time::Instant::now())
        .unwrap();
    preview.run_until_idle();
    black_box(preview.rendered_pages());
}

fn bench_initial_fill(c: &mut Criterion) {
    let json = FixtureManifest::uniform(50, 612.0, 792.0)
        .to_json()
        .unwrap()
        .into_bytes();
    c.bench_function("initial_fill_letter", |b| b.iter(|| fill(&json, None)));
    c.bench_function("initial_fill_letter_2x", |b| {
        b.iter(|| fill(&json, Some(2.0)));
    });
}

criterion_group!(benches, bench_initial_fill);
criterion_main!(benches);
