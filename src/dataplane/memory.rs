use parking_lot::{Mutex, RwLock};
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use crate::{
    config::MAX_LABEL_PAGE_SIZE,
    dataplane::{
        DataPlane, GetLabelsRequest, GetLabelsResponse, GetLikesResponse, GetRecordsResponse,
        InteractionCounts,
    },
    error::HydrationError,
    properties::{AtUri, Did, ItemRef, Labeler, PostAgg, RawLabel},
};

#[derive(Debug, Default)]
struct MemoryData {
    labels: Vec<RawLabel>,
    records: BTreeMap<String, Labeler>,
    // (actor did, subject uri) -> like record uri
    likes: BTreeMap<(String, String), String>,
    counts: BTreeMap<String, PostAgg>,
}

/// In-process [DataPlane] answering from seeded data.
///
/// Every call, successful or not, increments [MemoryDataPlane::call_count]. Once
/// [MemoryDataPlane::fail_with] is set, every call returns that error. The most recent label
/// query is kept as sent, see [MemoryDataPlane::last_labels_request].
#[derive(Debug, Default)]
pub struct MemoryDataPlane {
    data: RwLock<MemoryData>,
    calls: AtomicUsize,
    failure: Mutex<Option<HydrationError>>,
    last_labels_request: Mutex<Option<GetLabelsRequest>>,
}

impl MemoryDataPlane {
    pub fn new() -> Self {
        MemoryDataPlane::default()
    }

    pub fn add_label(&self, label: impl Into<RawLabel>) {
        self.data.write().labels.push(label.into());
    }

    pub fn add_labels<I, L>(&self, labels: I)
    where
        I: IntoIterator<Item = L>,
        L: Into<RawLabel>,
    {
        self.data
            .write()
            .labels
            .extend(labels.into_iter().map(Into::into));
    }

    pub fn put_record(&self, uri: &AtUri, record: Labeler) {
        self.data.write().records.insert(uri.to_string(), record);
    }

    pub fn put_like(&self, actor: &Did, subject: &AtUri, like_uri: impl Into<String>) {
        self.data.write().likes.insert(
            (actor.to_string(), subject.to_string()),
            like_uri.into(),
        );
    }

    pub fn put_counts(&self, subject: &AtUri, counts: PostAgg) {
        self.data.write().counts.insert(subject.to_string(), counts);
    }

    pub fn fail_with(&self, err: HydrationError) {
        *self.failure.lock() = Some(err);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_labels_request(&self) -> Option<GetLabelsRequest> {
        self.last_labels_request.lock().clone()
    }

    fn begin_call(&self) -> Result<(), HydrationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure.lock().as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// A subject pattern is either an exact URI or a prefix ending in `*`.
fn subject_matches(pattern: &str, uri: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => uri.starts_with(prefix),
        None => pattern == uri,
    }
}

impl DataPlane for MemoryDataPlane {
    async fn get_labels(&self, req: GetLabelsRequest) -> Result<GetLabelsResponse, HydrationError> {
        *self.last_labels_request.lock() = Some(req.clone());
        self.begin_call()?;
        let cap = req.limit.clamp(1, MAX_LABEL_PAGE_SIZE);
        let mut subjects = req.subjects;
        if subjects.len() > cap {
            tracing::warn!(
                "[MemoryDataPlane::get_labels] {} subject patterns requested, only the first {} are queried",
                subjects.len(),
                cap
            );
            subjects.truncate(cap);
        }
        let data = self.data.read();
        let labels = data
            .labels
            .iter()
            .filter(|raw| {
                req.issuers.iter().any(|did| did.as_str() == raw.label.src)
                    && subjects
                        .iter()
                        .any(|pattern| subject_matches(pattern, &raw.label.uri))
            })
            .cloned()
            .collect();
        Ok(GetLabelsResponse { labels })
    }

    async fn get_labeler_records(
        &self,
        uris: Vec<AtUri>,
    ) -> Result<GetRecordsResponse, HydrationError> {
        self.begin_call()?;
        let data = self.data.read();
        let records = uris
            .iter()
            .map(|uri| data.records.get(&uri.to_string()).cloned())
            .collect();
        Ok(GetRecordsResponse { records })
    }

    async fn get_likes_by_actor_and_subjects(
        &self,
        actor: Did,
        refs: Vec<ItemRef>,
    ) -> Result<GetLikesResponse, HydrationError> {
        self.begin_call()?;
        let data = self.data.read();
        let uris = refs
            .into_iter()
            .map(|item| data.likes.get(&(actor.to_string(), item.uri)).cloned())
            .collect();
        Ok(GetLikesResponse { uris })
    }

    async fn get_interaction_counts(
        &self,
        refs: Vec<ItemRef>,
    ) -> Result<InteractionCounts, HydrationError> {
        self.begin_call()?;
        let data = self.data.read();
        let mut counts = InteractionCounts::default();
        for item in refs.iter() {
            let agg = data.counts.get(&item.uri).cloned().unwrap_or_default();
            counts.likes.push(agg.likes);
            counts.reposts.push(agg.reposts);
            counts.replies.push(agg.replies);
            counts.quotes.push(agg.quotes);
        }
        Ok(counts)
    }
}
