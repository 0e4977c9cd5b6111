//! The data-plane boundary: the batched upstream lookups the hydration core consumes.
//!
//! Every lookup takes a batch and answers positionally, one slot per input item, with `None`
//! for items the backend has nothing for. Implementations own transport, retries and
//! pagination; the core only reshapes what comes back and propagates any error unchanged.
//!
//! [memory::MemoryDataPlane] is the in-process implementation used by tests and the CLI.

pub mod memory;

use serde::{Deserialize, Serialize};
use std::{future::Future, sync::Arc};

use crate::{
    error::HydrationError,
    properties::{AtUri, Did, ItemRef, Labeler, RawLabel},
};

pub use memory::MemoryDataPlane;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetLabelsRequest {
    pub subjects: Vec<String>,
    pub issuers: Vec<Did>,
    /// Maximum number of subject patterns the backend should consider.
    pub limit: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetLabelsResponse {
    pub labels: Vec<RawLabel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetRecordsResponse {
    pub records: Vec<Option<Labeler>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetLikesResponse {
    pub uris: Vec<Option<String>>,
}

/// Positional interaction counters, one slot per requested ref in each vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionCounts {
    pub likes: Vec<Option<u64>>,
    pub reposts: Vec<Option<u64>>,
    pub replies: Vec<Option<u64>>,
    pub quotes: Vec<Option<u64>>,
}

impl InteractionCounts {
    pub fn likes_at(&self, idx: usize) -> Option<u64> {
        self.likes.get(idx).copied().flatten()
    }
}

pub trait DataPlane: Sync {
    /// Labels on any of `subjects` issued by any of `issuers`, in backend order.
    fn get_labels(
        &self,
        req: GetLabelsRequest,
    ) -> impl Future<Output = Result<GetLabelsResponse, HydrationError>> + Send;

    /// Labeler service records, positionally aligned with `uris`.
    fn get_labeler_records(
        &self,
        uris: Vec<AtUri>,
    ) -> impl Future<Output = Result<GetRecordsResponse, HydrationError>> + Send;

    /// The like record `actor` holds on each ref, positionally aligned with `refs`.
    fn get_likes_by_actor_and_subjects(
        &self,
        actor: Did,
        refs: Vec<ItemRef>,
    ) -> impl Future<Output = Result<GetLikesResponse, HydrationError>> + Send;

    /// Interaction counters for each ref, positionally aligned with `refs`.
    fn get_interaction_counts(
        &self,
        refs: Vec<ItemRef>,
    ) -> impl Future<Output = Result<InteractionCounts, HydrationError>> + Send;
}

impl<D: DataPlane> DataPlane for &D {
    async fn get_labels(&self, req: GetLabelsRequest) -> Result<GetLabelsResponse, HydrationError> {
        (**self).get_labels(req).await
    }

    async fn get_labeler_records(
        &self,
        uris: Vec<AtUri>,
    ) -> Result<GetRecordsResponse, HydrationError> {
        (**self).get_labeler_records(uris).await
    }

    async fn get_likes_by_actor_and_subjects(
        &self,
        actor: Did,
        refs: Vec<ItemRef>,
    ) -> Result<GetLikesResponse, HydrationError> {
        (**self).get_likes_by_actor_and_subjects(actor, refs).await
    }

    async fn get_interaction_counts(
        &self,
        refs: Vec<ItemRef>,
    ) -> Result<InteractionCounts, HydrationError> {
        (**self).get_interaction_counts(refs).await
    }
}

impl<D: DataPlane + Send> DataPlane for Arc<D> {
    async fn get_labels(&self, req: GetLabelsRequest) -> Result<GetLabelsResponse, HydrationError> {
        self.as_ref().get_labels(req).await
    }

    async fn get_labeler_records(
        &self,
        uris: Vec<AtUri>,
    ) -> Result<GetRecordsResponse, HydrationError> {
        self.as_ref().get_labeler_records(uris).await
    }

    async fn get_likes_by_actor_and_subjects(
        &self,
        actor: Did,
        refs: Vec<ItemRef>,
    ) -> Result<GetLikesResponse, HydrationError> {
        self.as_ref()
            .get_likes_by_actor_and_subjects(actor, refs)
            .await
    }

    async fn get_interaction_counts(
        &self,
        refs: Vec<ItemRef>,
    ) -> Result<InteractionCounts, HydrationError> {
        self.as_ref().get_interaction_counts(refs).await
    }
}
