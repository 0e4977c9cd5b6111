//! Label hydration: folding flat label lists into per-subject moderation views, and the
//! labeler-service lookups (records, viewer likes, like counts).
//!
//! Moderation flags are scoped to the redaction authority set of the request: a `!takedown`
//! from a labeler the caller merely subscribes to is shown as a label but takes nothing down.

use serde::Serialize;
use std::{
    collections::BTreeSet,
    ops::{Deref, DerefMut},
};

use crate::{
    config::{HydrationConfig, LabelPolicy},
    dataplane::{DataPlane, GetLabelsRequest},
    error::HydrationResult,
    hydration::{HydrationMap, HydrationState},
    properties::{
        AtUri, Did, ItemRef, Label, Labeler, LabelerAgg, LabelerViewerState, ParsedLabelers,
        RawLabel,
    },
};

pub type Labelers = HydrationMap<Did, Labeler>;
pub type LabelerAggs = HydrationMap<Did, LabelerAgg>;
pub type LabelerViewerStates = HydrationMap<Did, LabelerViewerState>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectLabels {
    pub is_takendown: bool,
    pub needs_review: bool,
    /// Keyed by [Label::key].
    pub labels: HydrationMap<String, Label>,
}

/// Per-subject label state, keyed by subject URI (or DID for account-level labels).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Labels(HydrationMap<String, SubjectLabels>);

impl Deref for Labels {
    type Target = HydrationMap<String, SubjectLabels>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Labels {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Labels {
    pub fn new() -> Self {
        Labels::default()
    }

    pub fn key(label: &Label) -> String {
        label.key()
    }

    /// Fold a flat label list, in arrival order, into per-subject state.
    ///
    /// - Negation labels are dropped. They do not retract a live label folded earlier.
    /// - A needs-review label from a redacting labeler marks the subject `needs_review` and,
    ///   while [LabelPolicy::withhold_needs_review] is set, is kept out of the visible labels.
    /// - Every other label is stored under `src::val`, replacing any earlier one.
    /// - A takedown value from a redacting labeler marks the subject `is_takendown`.
    pub fn fold<I, L>(labels: I, labelers: &ParsedLabelers, policy: &LabelPolicy) -> Labels
    where
        I: IntoIterator<Item = L>,
        L: Into<RawLabel>,
    {
        let mut acc = Labels::new();
        for raw in labels {
            let label = Label::from(raw.into());
            if label.neg {
                continue;
            }
            let can_redact = labelers.can_redact(&label.src);
            let actionable_review = can_redact && policy.is_needs_review(&label.val);
            let takedown = can_redact && policy.is_takedown(&label.val);

            let entry = acc
                .0
                .get_or_insert_with(label.uri.clone(), SubjectLabels::default);
            if takedown {
                entry.is_takendown = true;
            }
            if actionable_review {
                entry.needs_review = true;
            }
            if !(actionable_review && policy.withhold_needs_review) {
                entry.labels.set(label.key(), Some(label));
            }
        }
        acc
    }

    /// Merge another snapshot in. Subjects new to `self` are adopted as-is; shared subjects OR
    /// their flags together and merge their label maps.
    pub fn merge(&mut self, other: Labels) -> &mut Self {
        for (subject, theirs) in other.0 {
            let Some(theirs) = theirs else {
                continue;
            };
            match self.0.get_mut(&subject) {
                Some(mine) => {
                    mine.is_takendown = mine.is_takendown || theirs.is_takendown;
                    mine.needs_review = mine.needs_review || theirs.needs_review;
                    mine.labels.merge(theirs.labels);
                }
                None => {
                    self.0.set(subject, Some(theirs));
                }
            }
        }
        self
    }

    /// Visible labels on `subject`, in the order they were first folded.
    pub fn get_by_subject(&self, subject: &str) -> Vec<Label> {
        self.0
            .get_value(subject)
            .map(|entry| entry.labels.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_takendown(&self, subject: &str) -> bool {
        self.0
            .get_value(subject)
            .is_some_and(|entry| entry.is_takendown)
    }

    pub fn needs_review(&self, subject: &str) -> bool {
        self.0
            .get_value(subject)
            .is_some_and(|entry| entry.needs_review)
    }
}

/// Order-preserving de-duplication.
fn dedupe<T: Ord + Clone>(items: &[T]) -> Vec<T> {
    let mut seen = BTreeSet::new();
    items
        .iter()
        .filter(|item| seen.insert((*item).clone()))
        .cloned()
        .collect()
}

fn warn_on_misaligned(op: &str, expected: usize, got: usize) {
    if expected != got {
        tracing::warn!(
            "[LabelHydrator::{op}] data plane returned {got} entries for {expected} inputs"
        );
    }
}

/// Issues the label and labeler lookups against a [DataPlane], one batched call per
/// operation, and reshapes positional responses into DID-keyed maps.
#[derive(Debug, Clone)]
pub struct LabelHydrator<D> {
    dataplane: D,
    config: HydrationConfig,
}

impl<D: DataPlane> LabelHydrator<D> {
    pub fn new(dataplane: D, config: HydrationConfig) -> Self {
        LabelHydrator { dataplane, config }
    }

    pub fn dataplane(&self) -> &D {
        &self.dataplane
    }

    pub fn config(&self) -> &HydrationConfig {
        &self.config
    }

    pub async fn get_labels_for_subjects(
        &self,
        subjects: &[String],
        labelers: &ParsedLabelers,
    ) -> HydrationResult<Labels> {
        if subjects.is_empty() || labelers.dids.is_empty() {
            return Ok(Labels::new());
        }
        let subjects = dedupe(subjects);
        let issuers = dedupe(&labelers.dids);
        let limit = self.config.label_limit();
        if subjects.len() > limit {
            tracing::warn!(
                "[LabelHydrator::get_labels_for_subjects] {} subjects exceed the page size of {}",
                subjects.len(),
                limit
            );
        }
        let res = self
            .dataplane
            .get_labels(GetLabelsRequest {
                subjects,
                issuers,
                limit,
            })
            .await?;
        let labels = Labels::fold(res.labels, labelers, &self.config.labels);
        tracing::debug!(
            "[LabelHydrator::get_labels_for_subjects] folded labels for {} subjects",
            labels.len()
        );
        Ok(labels)
    }

    /// Labeler service records, one slot per input DID. A DID without a record gets a
    /// tombstone, as does a taken-down record unless `include_takedowns` is set.
    pub async fn get_labelers(
        &self,
        dids: &[Did],
        include_takedowns: bool,
    ) -> HydrationResult<Labelers> {
        let mut labelers = Labelers::new();
        if dids.is_empty() {
            return Ok(labelers);
        }
        let uris = dids.iter().map(AtUri::labeler_service).collect::<Vec<_>>();
        let res = self.dataplane.get_labeler_records(uris).await?;
        warn_on_misaligned("get_labelers", dids.len(), res.records.len());
        for (idx, did) in dids.iter().enumerate() {
            let record = res
                .records
                .get(idx)
                .cloned()
                .flatten()
                .filter(|record| include_takedowns || record.takedown_ref.is_none());
            labelers.set(did.clone(), record);
        }
        Ok(labelers)
    }

    /// The viewer's like on each labeler service, if any.
    pub async fn get_labeler_viewer_states(
        &self,
        dids: &[Did],
        viewer: &Did,
    ) -> HydrationResult<LabelerViewerStates> {
        let mut states = LabelerViewerStates::new();
        if dids.is_empty() {
            return Ok(states);
        }
        let refs = dids
            .iter()
            .map(|did| ItemRef::from(&AtUri::labeler_service(did)))
            .collect::<Vec<_>>();
        let likes = self
            .dataplane
            .get_likes_by_actor_and_subjects(viewer.clone(), refs)
            .await?;
        warn_on_misaligned("get_labeler_viewer_states", dids.len(), likes.uris.len());
        for (idx, did) in dids.iter().enumerate() {
            let like = likes
                .uris
                .get(idx)
                .cloned()
                .flatten()
                .filter(|uri| !uri.is_empty());
            states.set(did.clone(), Some(LabelerViewerState { like }));
        }
        Ok(states)
    }

    /// Like counts per labeler service. A count the data plane leaves unset falls back to an
    /// aggregate already hydrated into `state`, and then to zero; this view never reports
    /// "unset".
    pub async fn get_labeler_aggregates(
        &self,
        dids: &[Did],
        state: &HydrationState,
    ) -> HydrationResult<LabelerAggs> {
        let mut aggs = LabelerAggs::new();
        if dids.is_empty() {
            return Ok(aggs);
        }
        let refs = dids
            .iter()
            .map(|did| ItemRef::from(&AtUri::labeler_service(did)))
            .collect::<Vec<_>>();
        let counts = self.dataplane.get_interaction_counts(refs).await?;
        warn_on_misaligned("get_labeler_aggregates", dids.len(), counts.likes.len());
        for (idx, did) in dids.iter().enumerate() {
            let likes = counts
                .likes_at(idx)
                .or_else(|| state.labeler_aggs.get_value(did).map(|agg| agg.likes))
                .unwrap_or(0);
            aggs.set(did.clone(), Some(LabelerAgg { likes }));
        }
        Ok(aggs)
    }
}
