//! The hydration core: turns payloads and data-plane lookups into a [HydrationState].
//!
//! - [map]: [HydrationMap], the ordered, mergeable map every entity kind is stored in.
//! - [state]: [HydrationState], one explicitly constructed bundle per request or branch.
//! - [extract]: [EntityExtractor], which files posts, actors and counters out of raw payloads.
//! - [label]: [Labels] folding and the labeler-service lookups of [LabelHydrator].
//! - [hydrator]: [Hydrator], concurrent fan-out over the above with merge on fan-in.

pub mod extract;
pub mod hydrator;
pub mod label;
pub mod map;
pub mod state;

pub use extract::{EntityExtractor, PayloadShape};
pub use hydrator::{HydrateCtx, HydratedPayload, Hydrator};
pub use label::{
    LabelHydrator, LabelerAggs, LabelerViewerStates, Labelers, Labels, SubjectLabels,
};
pub use map::HydrationMap;
pub use state::{Actors, HydrationState, PostAggs, Posts, ThreadContexts};
