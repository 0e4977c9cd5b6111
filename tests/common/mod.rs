//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use serde_json::Value;
use skyweave::properties::{Did, ParsedLabelers, RawLabel};
use std::path::PathBuf;

pub const MOD_LABELER: &str = "did:plc:ar7c4by46qjdydhdevvrndac";
pub const SUBSCRIBED_LABELER: &str = "did:plc:subscribedlabeler0000000";

pub const ALICE: &str = "did:plc:alice1234567890abcdefghij";
pub const BOB: &str = "did:plc:bob1234567890abcdefghijkl";
pub const ROOT_POST: &str = "at://did:plc:alice1234567890abcdefghij/app.bsky.feed.post/3kroot";
pub const REPLY_POST: &str = "at://did:plc:bob1234567890abcdefghijkl/app.bsky.feed.post/3kreply";
pub const MISSING_POST: &str = "at://did:plc:carol1234567890abcdefghij/app.bsky.feed.post/3kgone";

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

#[allow(dead_code)]
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// The thread fixture: a root post by alice with a threadgate and a root-author like, one reply
/// by bob, and one reply that is no longer available.
#[allow(dead_code)]
pub fn thread_payload() -> Value {
    let content = std::fs::read_to_string(fixture_path("thread.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

/// The labels fixture: a takedown on bob's reply from the moderation labeler, a needs-review
/// and a content label on alice, and a negated label on the root post.
#[allow(dead_code)]
pub fn fixture_labels() -> Vec<RawLabel> {
    let content = std::fs::read_to_string(fixture_path("labels.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

/// The moderation labeler redacts; the subscribed labeler is informational.
#[allow(dead_code)]
pub fn accepted_labelers() -> ParsedLabelers {
    ParsedLabelers::parse_header(&format!("{MOD_LABELER};redact, {SUBSCRIBED_LABELER}"))
}

#[allow(dead_code)]
pub fn did(s: &str) -> Did {
    Did::try_from(s).unwrap()
}
