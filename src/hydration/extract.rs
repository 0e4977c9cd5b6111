//! EntityExtractor: walks untyped data-plane payloads and files every post, actor, counter and
//! thread-context entity it recognizes into a [HydrationState].
//!
//! Each JSON object is first checked for actor fields, then classified once into a
//! [PayloadShape]; a post view that also carries `did` and `handle` stores both. The walk itself
//! is the same for every object: descend into child objects and into object elements of child
//! arrays, skipping the raw record body of a post.
//!
//! Payloads are expected to be trees (JSON cannot express back-references), but the walk still
//! stops descending at [EntityExtractor::max_depth] so hostile nesting cannot exhaust the stack.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::{
    config::HydrationConfig,
    hydration::HydrationState,
    properties::{Actor, Did, Post, PostAgg, RecordInfo, ThreadContext},
};

pub const PROFILE_NSID: &str = "app.bsky.actor.profile";

/// The payload shapes the extractor knows about.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadShape<'a> {
    /// `{uri, notFound: true}`: the subject is confirmed missing.
    NotFound { uri: &'a str },
    /// `{uri, record: {..}}` or `{uri, value: {..}}` plus view fields (cid, counts, ...).
    PostRecord {
        uri: &'a str,
        record_key: &'a str,
        record: &'a Value,
    },
    /// `{did, handle, ..}`: a profile view.
    Actor { did: Did, handle: &'a str },
    /// Anything else; only its children matter.
    Container,
}

impl<'a> PayloadShape<'a> {
    /// Classify one object for the record slot: a not-found leaf, a post record, or, failing
    /// both, a profile view. An object can be a post and carry actor fields at the same time;
    /// [PayloadShape::actor] reports those independently of the shape returned here.
    pub fn classify(obj: &'a Map<String, Value>) -> PayloadShape<'a> {
        if let Some(uri) = obj.get("uri").and_then(Value::as_str) {
            if obj.get("notFound").and_then(Value::as_bool) == Some(true) {
                return PayloadShape::NotFound { uri };
            }
            for record_key in ["record", "value"] {
                if let Some(record) = obj.get(record_key).filter(|v| v.is_object()) {
                    return PayloadShape::PostRecord {
                        uri,
                        record_key,
                        record,
                    };
                }
            }
        }
        match PayloadShape::actor(obj) {
            Some((did, handle)) => PayloadShape::Actor { did, handle },
            None => PayloadShape::Container,
        }
    }

    /// The `did` and `handle` of an object that carries both, whatever its record shape.
    pub fn actor(obj: &'a Map<String, Value>) -> Option<(Did, &'a str)> {
        let did = obj
            .get("did")
            .and_then(Value::as_str)
            .and_then(|did| Did::try_from(did).ok())?;
        let handle = obj.get("handle").and_then(Value::as_str)?;
        Some((did, handle))
    }

    /// Child key that holds raw record data and must not be walked.
    fn opaque_key(&self) -> Option<&'a str> {
        match self {
            PayloadShape::PostRecord { record_key, .. } => Some(*record_key),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityExtractor {
    max_depth: usize,
}

impl Default for EntityExtractor {
    fn default() -> Self {
        EntityExtractor::from_config(&HydrationConfig::default())
    }
}

impl EntityExtractor {
    pub fn new(max_depth: usize) -> Self {
        EntityExtractor { max_depth }
    }

    pub fn from_config(config: &HydrationConfig) -> Self {
        EntityExtractor::new(config.max_extract_depth)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Extract entities from `payload` into `state`, returning the URI of every post record
    /// found, in depth-first pre-order. Not-found subjects become tombstones and are not
    /// returned.
    pub fn extract(&self, payload: &Value, state: &mut HydrationState) -> Vec<String> {
        let mut uris = Vec::new();
        match payload {
            Value::Object(obj) => self.visit(obj, 0, state, &mut uris),
            Value::Array(items) => self.visit_items(items, 0, state, &mut uris),
            _ => {}
        }
        tracing::debug!(
            "[EntityExtractor::extract] {} posts, {} actors, {} thread contexts in state",
            state.posts.len(),
            state.actors.len(),
            state.thread_contexts.len()
        );
        uris
    }

    fn visit(
        &self,
        obj: &Map<String, Value>,
        depth: usize,
        state: &mut HydrationState,
        uris: &mut Vec<String>,
    ) {
        if let Some((did, handle)) = PayloadShape::actor(obj) {
            let actor = actor_from_view(did.clone(), handle, obj);
            state.actors.set(did, Some(actor));
        }

        let shape = PayloadShape::classify(obj);
        match &shape {
            PayloadShape::NotFound { uri } => {
                state.posts.set(uri.to_string(), None);
            }
            PayloadShape::PostRecord { uri, record, .. } => {
                uris.push(uri.to_string());
                state
                    .posts
                    .set(uri.to_string(), Some(post_from_view(obj, record)));
                state
                    .post_aggs
                    .set(uri.to_string(), Some(post_agg_from_view(obj)));
            }
            PayloadShape::Actor { .. } | PayloadShape::Container => {}
        }

        if let Some((uri, ctx)) = thread_context_from_view(obj) {
            state.thread_contexts.set(uri.to_string(), Some(ctx));
        }

        if depth >= self.max_depth {
            if !obj.values().any(|v| v.is_object() || v.is_array()) {
                return;
            }
            tracing::warn!(
                "[EntityExtractor::visit] Depth limit {} reached, not descending further",
                self.max_depth
            );
            return;
        }

        let opaque = shape.opaque_key();
        for (key, child) in obj.iter() {
            if Some(key.as_str()) == opaque {
                continue;
            }
            match child {
                Value::Object(child_obj) => self.visit(child_obj, depth + 1, state, uris),
                Value::Array(items) => self.visit_items(items, depth + 1, state, uris),
                _ => {}
            }
        }
    }

    fn visit_items(
        &self,
        items: &[Value],
        depth: usize,
        state: &mut HydrationState,
        uris: &mut Vec<String>,
    ) {
        for item in items.iter() {
            if let Value::Object(obj) = item {
                self.visit(obj, depth, state, uris);
            }
        }
    }
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn count_field(obj: &Map<String, Value>, key: &str) -> Option<u64> {
    obj.get(key).and_then(Value::as_u64)
}

fn timestamp_field(obj: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    str_field(obj, key)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|ts| ts.with_timezone(&Utc))
}

fn post_from_view(view: &Map<String, Value>, record: &Value) -> Post {
    let indexed_at = timestamp_field(view, "indexedAt").unwrap_or_default();
    let sorted_at = timestamp_field(view, "sortedAt").unwrap_or(indexed_at);
    Post {
        info: RecordInfo {
            record: record.clone(),
            cid: str_field(view, "cid").unwrap_or_default().to_string(),
            sorted_at,
            indexed_at,
            takedown_ref: str_field(view, "takedownRef").map(str::to_string),
        },
        violates_thread_gate: bool_field(view, "violatesThreadGate"),
        violates_embedding_rules: bool_field(view, "violatesEmbeddingRules"),
        has_thread_gate: bool_field(view, "hasThreadGate")
            || view.get("threadgate").is_some_and(Value::is_object),
        has_post_gate: bool_field(view, "hasPostGate"),
    }
}

fn post_agg_from_view(view: &Map<String, Value>) -> PostAgg {
    PostAgg {
        likes: count_field(view, "likeCount"),
        reposts: count_field(view, "repostCount"),
        replies: count_field(view, "replyCount"),
        quotes: count_field(view, "quoteCount"),
    }
}

/// Recover a blob identifier from a CDN media address such as
/// `https://cdn.example/img/avatar/plain/{did}/{cid}@jpeg`: the path segment after the DID,
/// with any `@format` or `?query` suffix removed.
pub fn media_cid(url: &str, did: &Did) -> Option<String> {
    let (_, after) = url.split_once(did.as_str())?;
    let segment = after.trim_start_matches('/').split('/').next()?;
    let cid = segment.split(['@', '?', '#']).next()?;
    if cid.is_empty() {
        None
    } else {
        Some(cid.to_string())
    }
}

fn blob_ref(cid: &str) -> Value {
    json!({ "$type": "blob", "ref": { "$link": cid } })
}

fn actor_from_view(did: Did, handle: &str, view: &Map<String, Value>) -> Actor {
    let avatar_cid = str_field(view, "avatar").and_then(|url| media_cid(url, &did));
    let banner_cid = str_field(view, "banner").and_then(|url| media_cid(url, &did));

    let mut profile = Map::new();
    profile.insert("$type".to_string(), Value::from(PROFILE_NSID));
    for key in ["displayName", "description", "createdAt"] {
        if let Some(value) = view.get(key).filter(|v| v.is_string()) {
            profile.insert(key.to_string(), value.clone());
        }
    }
    if let Some(cid) = &avatar_cid {
        profile.insert("avatar".to_string(), blob_ref(cid));
    }
    if let Some(cid) = &banner_cid {
        profile.insert("banner".to_string(), blob_ref(cid));
    }

    let is_labeler = view
        .get("associated")
        .and_then(|associated| associated.get("labeler"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Actor {
        did,
        handle: handle.to_string(),
        profile: Value::Object(profile),
        avatar_cid,
        is_labeler,
        priority_notifications: bool_field(view, "priorityNotifications"),
    }
}

/// `{threadContext: {rootAuthorLike}}` attached to a post view (keyed by its `uri`) or to a
/// thread item wrapping one (keyed by `post.uri`).
fn thread_context_from_view(view: &Map<String, Value>) -> Option<(&str, ThreadContext)> {
    let like = view
        .get("threadContext")?
        .get("rootAuthorLike")?
        .as_str()?;
    let uri = str_field(view, "uri")
        .or_else(|| view.get("post")?.get("uri")?.as_str())?;
    Some((
        uri,
        ThreadContext {
            like: Some(like.to_string()),
        },
    ))
}
