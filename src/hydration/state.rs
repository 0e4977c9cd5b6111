use serde::Serialize;

use crate::{
    hydration::{
        label::{LabelerAggs, LabelerViewerStates, Labelers, Labels},
        HydrationMap,
    },
    properties::{Actor, Did, Post, PostAgg, ThreadContext},
};

pub type Posts = HydrationMap<String, Post>;
pub type PostAggs = HydrationMap<String, PostAgg>;
pub type Actors = HydrationMap<Did, Actor>;
pub type ThreadContexts = HydrationMap<String, ThreadContext>;

/// The entity maps assembled for one hydration request (or one branch of it).
///
/// A state is created empty with [HydrationState::new], filled by the extractor and the label
/// hydrator, and reconciled with sibling branches through [HydrationState::merge]. It is owned
/// by exactly one request and is never shared while it is being filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HydrationState {
    pub posts: Posts,
    pub post_aggs: PostAggs,
    pub actors: Actors,
    pub thread_contexts: ThreadContexts,
    pub labels: Labels,
    pub labelers: Labelers,
    pub labeler_aggs: LabelerAggs,
    pub labeler_viewers: LabelerViewerStates,
}

impl HydrationState {
    pub fn new() -> Self {
        HydrationState::default()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
            && self.post_aggs.is_empty()
            && self.actors.is_empty()
            && self.thread_contexts.is_empty()
            && self.labels.is_empty()
            && self.labelers.is_empty()
            && self.labeler_aggs.is_empty()
            && self.labeler_viewers.is_empty()
    }

    /// Fan-in: fold a sibling branch's state into this one, map by map. Labels merge per subject
    /// (see [Labels::merge]); every other map merges by key.
    pub fn merge(&mut self, other: HydrationState) -> &mut Self {
        self.posts.merge(other.posts);
        self.post_aggs.merge(other.post_aggs);
        self.actors.merge(other.actors);
        self.thread_contexts.merge(other.thread_contexts);
        self.labels.merge(other.labels);
        self.labelers.merge(other.labelers);
        self.labeler_aggs.merge(other.labeler_aggs);
        self.labeler_viewers.merge(other.labeler_viewers);
        self
    }
}
