//! Performance benchmarks for payload hydration
//!
//! Measures:
//! - Entity extraction over a wide feed of thread fixtures
//! - Label folding and merging
//! - Full payload hydration against the in-memory data plane
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};
use skyweave::{
    config::{HydrationConfig, LabelPolicy},
    dataplane::MemoryDataPlane,
    hydration::{EntityExtractor, HydrateCtx, HydrationState, Hydrator, Labels},
    properties::{Label, ParsedLabelers, RawLabel},
};
use std::path::PathBuf;

const MOD_LABELER: &str = "did:plc:ar7c4by46qjdydhdevvrndac";

fn load_fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(path).unwrap()
}

// A timeline-shaped payload: the thread fixture repeated under distinct rkeys.
fn feed_payload(items: usize) -> Value {
    let thread = load_fixture("thread.json");
    let feed = (0..items)
        .map(|idx| {
            let item = thread.replace("/3k", &format!("/{idx}k"));
            serde_json::from_str::<Value>(&item).unwrap()["thread"].clone()
        })
        .collect::<Vec<_>>();
    json!({ "feed": feed, "cursor": "3kcursor" })
}

fn synthetic_labels(count: usize) -> Vec<Label> {
    (0..count)
        .map(|idx| Label {
            ver: Some(1),
            src: MOD_LABELER.to_string(),
            uri: format!(
                "at://did:plc:alice1234567890abcdefghij/app.bsky.feed.post/{}kroot",
                idx % 50
            ),
            cid: None,
            val: ["spam", "!takedown", "needs-review", "porn"][idx % 4].to_string(),
            neg: idx % 7 == 0,
            cts: None,
            exp: None,
        })
        .collect()
}

fn bench_extract_feed(c: &mut Criterion) {
    let payload = feed_payload(100);
    let extractor = EntityExtractor::default();

    c.bench_function("extract_feed_100", |b| {
        b.iter(|| {
            let mut state = HydrationState::new();
            extractor.extract(&payload, &mut state).len()
        });
    });
}

fn bench_fold_and_merge_labels(c: &mut Criterion) {
    let labels = synthetic_labels(1000);
    let labelers = ParsedLabelers::parse_header(&format!("{MOD_LABELER};redact"));
    let policy = LabelPolicy::default();

    c.bench_function("fold_and_merge_labels_1000", |b| {
        b.iter(|| {
            let (left, right) = labels.split_at(labels.len() / 2);
            let mut folded = Labels::fold(left.to_vec(), &labelers, &policy);
            folded.merge(Labels::fold(right.to_vec(), &labelers, &policy));
            folded.len()
        });
    });
}

fn bench_hydrate_payload(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let payload = feed_payload(100);
    let dataplane = MemoryDataPlane::new();
    dataplane.add_labels(
        synthetic_labels(500)
            .into_iter()
            .map(RawLabel::from)
            .collect::<Vec<_>>(),
    );
    let hydrator = Hydrator::new(&dataplane, HydrationConfig::default());
    let ctx = HydrateCtx::new(ParsedLabelers::parse_header(&format!("{MOD_LABELER};redact")));

    c.bench_function("hydrate_payload_100", |b| {
        b.to_async(&rt)
            .iter(|| hydrator.hydrate_payload(&payload, &ctx));
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(50);
    targets =
        bench_extract_feed,
        bench_fold_and_merge_labels,
        bench_hydrate_payload
}

criterion_main!(benches);
