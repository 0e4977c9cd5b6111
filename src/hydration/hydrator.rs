//! Request-level hydration. Each sub-hydration fills its own [HydrationState] and the branches
//! are merged once they have all completed; the first failing branch fails the request.

use serde::Serialize;
use serde_json::Value;

use crate::{
    config::HydrationConfig,
    dataplane::DataPlane,
    error::{HydrationError, HydrationResult},
    hydration::{EntityExtractor, HydrationState, LabelHydrator},
    properties::{Did, ParsedLabelers},
};

/// Per-request hydration context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HydrateCtx {
    pub labelers: ParsedLabelers,
    pub viewer: Option<Did>,
    pub include_takedowns: bool,
}

impl HydrateCtx {
    pub fn new(labelers: ParsedLabelers) -> Self {
        HydrateCtx {
            labelers,
            ..Default::default()
        }
    }

    pub fn with_viewer(mut self, viewer: Did) -> Self {
        self.viewer = Some(viewer);
        self
    }

    pub fn with_takedowns(mut self, include_takedowns: bool) -> Self {
        self.include_takedowns = include_takedowns;
        self
    }
}

/// Result of [Hydrator::hydrate_payload].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HydratedPayload {
    /// Post URIs found in the payload, in pre-order.
    pub uris: Vec<String>,
    pub state: HydrationState,
}

#[derive(Debug, Clone)]
pub struct Hydrator<D> {
    labels: LabelHydrator<D>,
    extractor: EntityExtractor,
}

impl<D: DataPlane> Hydrator<D> {
    pub fn new(dataplane: D, config: HydrationConfig) -> Self {
        let extractor = EntityExtractor::from_config(&config);
        Hydrator {
            labels: LabelHydrator::new(dataplane, config),
            extractor,
        }
    }

    pub fn label_hydrator(&self) -> &LabelHydrator<D> {
        &self.labels
    }

    pub fn extractor(&self) -> &EntityExtractor {
        &self.extractor
    }

    /// Records, aggregates, labels and (with a viewer) viewer states for a set of labeler
    /// services, fetched concurrently.
    pub async fn hydrate_labelers(
        &self,
        dids: &[Did],
        ctx: &HydrateCtx,
    ) -> HydrationResult<HydrationState> {
        if dids.is_empty() {
            return Ok(HydrationState::new());
        }
        let subjects = dids.iter().map(Did::to_string).collect::<Vec<_>>();

        let records = async {
            let mut branch = HydrationState::new();
            branch.labelers = self
                .labels
                .get_labelers(dids, ctx.include_takedowns)
                .await?;
            Ok::<_, HydrationError>(branch)
        };
        let viewers = async {
            let mut branch = HydrationState::new();
            if let Some(viewer) = &ctx.viewer {
                branch.labeler_viewers = self
                    .labels
                    .get_labeler_viewer_states(dids, viewer)
                    .await?;
            }
            Ok::<_, HydrationError>(branch)
        };
        let aggs = async {
            let mut branch = HydrationState::new();
            branch.labeler_aggs = self
                .labels
                .get_labeler_aggregates(dids, &HydrationState::new())
                .await?;
            Ok::<_, HydrationError>(branch)
        };
        let labels = async {
            let mut branch = HydrationState::new();
            branch.labels = self
                .labels
                .get_labels_for_subjects(&subjects, &ctx.labelers)
                .await?;
            Ok::<_, HydrationError>(branch)
        };

        let (mut state, viewers, aggs, labels) = tokio::try_join!(records, viewers, aggs, labels)?;
        state.merge(viewers).merge(aggs).merge(labels);
        tracing::debug!(
            "[Hydrator::hydrate_labelers] hydrated {} labelers",
            state.labelers.len()
        );
        Ok(state)
    }

    /// Extract every entity in `payload`, then label the discovered posts and actors.
    pub async fn hydrate_payload(
        &self,
        payload: &Value,
        ctx: &HydrateCtx,
    ) -> HydrationResult<HydratedPayload> {
        let mut state = HydrationState::new();
        let uris = self.extractor.extract(payload, &mut state);

        let mut subjects = uris.clone();
        subjects.extend(
            state
                .actors
                .iter()
                .filter(|(_, actor)| actor.is_some())
                .map(|(did, _)| did.to_string()),
        );
        let labels = self
            .labels
            .get_labels_for_subjects(&subjects, &ctx.labelers)
            .await?;
        state.labels.merge(labels);

        Ok(HydratedPayload { uris, state })
    }
}
