//! # skyweave
//!
//! Hydration state for social-graph content: the per-request maps of posts, actors,
//! interaction counters, thread contexts, moderation labels and labeler services that an
//! appview assembles before rendering views.
//!
//! ## Overview
//!
//! - **[`hydration::HydrationMap`]**: an insertion-ordered map that distinguishes a key that was
//!   never looked up from one confirmed missing (a tombstone), and merges with last-write-wins.
//! - **[`hydration::EntityExtractor`]**: walks untyped upstream payloads and files every entity
//!   it recognizes into a [`hydration::HydrationState`].
//! - **[`hydration::Labels`]**: folds flat label lists into per-subject moderation state, scoped
//!   to the labelers that hold redaction authority for the request.
//! - **[`hydration::LabelHydrator`]** and **[`hydration::Hydrator`]**: batched lookups against
//!   the [`dataplane::DataPlane`] boundary, with concurrent fan-out and merge on fan-in.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use skyweave::{
//!     config::HydrationConfig,
//!     dataplane::MemoryDataPlane,
//!     hydration::{HydrateCtx, Hydrator},
//!     properties::ParsedLabelers,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dataplane = MemoryDataPlane::new();
//!     let hydrator = Hydrator::new(&dataplane, HydrationConfig::default());
//!     let ctx = HydrateCtx::new(ParsedLabelers::parse_header("did:plc:ar7c4by46qjdydhdevvrndac;redact"));
//!
//!     let payload = json!({"feed": [{"post": {"uri": "at://did:plc:alice/app.bsky.feed.post/1", "record": {}}}]});
//!     let hydrated = hydrator.hydrate_payload(&payload, &ctx).await?;
//!     println!("{}", serde_json::to_string_pretty(&hydrated)?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dataplane;
pub mod error;
pub mod hydration;
pub mod properties;

pub use error::*;
