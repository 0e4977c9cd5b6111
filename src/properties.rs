/// [crate::properties] contains the identifiers and entity values that populate a
/// [crate::hydration::HydrationState].
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    borrow::Borrow,
    collections::BTreeSet,
    fmt::{Display, Formatter},
};

use crate::error::HydrationError;

pub const AT_URI_SCHEME: &str = "at://";
pub const LABELER_SERVICE_NSID: &str = "app.bsky.labeler.service";
pub const LABELER_SERVICE_RKEY: &str = "self";

/// Untyped record body, exactly as the data plane returned it.
pub type RecordPayload = Value;

/// Timestamp used for any record timestamp the data plane left out.
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// A decentralized identifier (`did:<method>:<id>`) naming an actor or service.
#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The DID method, e.g. `plc` for `did:plc:abc`.
    pub fn method(&self) -> &str {
        self.0
            .strip_prefix("did:")
            .and_then(|rest| rest.split_once(':'))
            .map(|(method, _)| method)
            .unwrap_or_default()
    }
}

impl TryFrom<&str> for Did {
    type Error = HydrationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let invalid = || HydrationError::InvalidIdentifier(format!("'{value}' is not a DID"));
        let (method, id) = value
            .strip_prefix("did:")
            .and_then(|rest| rest.split_once(':'))
            .ok_or_else(invalid)?;
        let method_ok = !method.is_empty()
            && method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        let id_ok = !id.is_empty()
            && !id.ends_with(':')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '%' | '-'));
        if method_ok && id_ok {
            Ok(Did(value.to_string()))
        } else {
            Err(invalid())
        }
    }
}

impl TryFrom<String> for Did {
    type Error = HydrationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Did::try_from(value.as_str())
    }
}

impl Display for Did {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> String {
        did.0
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Ord on Did is the derived Ord of its inner String, so str lookups stay consistent.
impl Borrow<str> for Did {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// An `at://authority/collection/rkey` address. Collection and record key are optional so that
/// repository-level and collection-level addresses can be represented too.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AtUri {
    authority: String,
    collection: Option<String>,
    rkey: Option<String>,
}

impl AtUri {
    pub fn make(authority: impl Into<String>, collection: Option<&str>, rkey: Option<&str>) -> AtUri {
        let collection = collection.filter(|c| !c.is_empty()).map(str::to_string);
        let rkey = if collection.is_some() {
            rkey.filter(|r| !r.is_empty()).map(str::to_string)
        } else {
            None
        };
        AtUri {
            authority: authority.into(),
            collection,
            rkey,
        }
    }

    /// Address of a labeling service's declaration record: `at://{did}/app.bsky.labeler.service/self`.
    pub fn labeler_service(did: &Did) -> AtUri {
        AtUri::make(
            did.as_str(),
            Some(LABELER_SERVICE_NSID),
            Some(LABELER_SERVICE_RKEY),
        )
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn rkey(&self) -> Option<&str> {
        self.rkey.as_deref()
    }

    /// The authority as a DID, if it is one (it may also be a handle).
    pub fn did(&self) -> Option<Did> {
        Did::try_from(self.authority.as_str()).ok()
    }
}

impl TryFrom<&str> for AtUri {
    type Error = HydrationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let rest = value.strip_prefix(AT_URI_SCHEME).ok_or_else(|| {
            HydrationError::InvalidIdentifier(format!("'{value}' is missing the at:// scheme"))
        })?;
        let rest = rest.split(['?', '#']).next().unwrap_or_default();
        let mut segments = rest.trim_end_matches('/').split('/');
        let authority = segments.next().unwrap_or_default();
        if authority.is_empty() {
            return Err(HydrationError::InvalidIdentifier(format!(
                "'{value}' has an empty authority"
            )));
        }
        let collection = segments.next();
        let rkey = segments.next();
        if segments.next().is_some() {
            return Err(HydrationError::InvalidIdentifier(format!(
                "'{value}' has too many path segments"
            )));
        }
        Ok(AtUri::make(authority, collection, rkey))
    }
}

impl TryFrom<String> for AtUri {
    type Error = HydrationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        AtUri::try_from(value.as_str())
    }
}

impl Display for AtUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{AT_URI_SCHEME}{}", self.authority)?;
        if let Some(collection) = &self.collection {
            write!(f, "/{collection}")?;
            if let Some(rkey) = &self.rkey {
                write!(f, "/{rkey}")?;
            }
        }
        Ok(())
    }
}

impl From<AtUri> for String {
    fn from(uri: AtUri) -> String {
        uri.to_string()
    }
}

/// Reference to a record, as sent to batched data-plane lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
}

impl From<&AtUri> for ItemRef {
    fn from(uri: &AtUri) -> Self {
        ItemRef {
            uri: uri.to_string(),
            cid: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInfo<T> {
    pub record: T,
    #[serde(default)]
    pub cid: String,
    #[serde(default = "epoch")]
    pub sorted_at: DateTime<Utc>,
    #[serde(default = "epoch")]
    pub indexed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub takedown_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(flatten)]
    pub info: RecordInfo<RecordPayload>,
    #[serde(default)]
    pub violates_thread_gate: bool,
    #[serde(default)]
    pub violates_embedding_rules: bool,
    #[serde(default)]
    pub has_thread_gate: bool,
    #[serde(default)]
    pub has_post_gate: bool,
}

/// Interaction counters for a post. Unset counts stay `None` at this layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostAgg {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reposts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quotes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub did: Did,
    pub handle: String,
    pub profile: RecordPayload,
    /// Blob identifier of the profile avatar, recovered from the avatar CDN address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_cid: Option<String>,
    #[serde(default)]
    pub is_labeler: bool,
    #[serde(default)]
    pub priority_notifications: bool,
}

/// Thread-root author context for a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like: Option<String>,
}

/// A moderation label. The wire signature never reaches this type, see [RawLabel].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ver: Option<u64>,
    pub src: String,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    pub val: String,
    #[serde(default)]
    pub neg: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<String>,
}

impl Label {
    /// One live label per (issuer, category) pair: `src::val`.
    pub fn key(&self) -> String {
        format!("{}::{}", self.src, self.val)
    }
}

/// A label as it arrives from the data plane, signature included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLabel {
    #[serde(flatten)]
    pub label: Label,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<Value>,
}

impl From<RawLabel> for Label {
    fn from(raw: RawLabel) -> Label {
        raw.label
    }
}

impl From<Label> for RawLabel {
    fn from(label: Label) -> RawLabel {
        RawLabel { label, sig: None }
    }
}

pub type Labeler = RecordInfo<RecordPayload>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelerAgg {
    pub likes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelerViewerState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like: Option<String>,
}

/// Labelers whose labels the caller accepts, and the subset with redaction authority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLabelers {
    pub dids: Vec<Did>,
    pub redact: BTreeSet<Did>,
}

impl ParsedLabelers {
    pub fn new(dids: Vec<Did>, redact: BTreeSet<Did>) -> Self {
        ParsedLabelers { dids, redact }
    }

    /// Parse the labelers-accept header format: `did:plc:a;redact, did:plc:b`.
    ///
    /// Entries that are not DIDs are skipped. A repeated DID keeps its first position, and is
    /// redacting if any of its occurrences carries the `redact` parameter.
    pub fn parse_header(header: &str) -> Self {
        let mut parsed = ParsedLabelers::default();
        for entry in header.split(',') {
            let mut parts = entry.split(';').map(str::trim);
            let Some(did) = parts.next().and_then(|did| Did::try_from(did).ok()) else {
                if !entry.trim().is_empty() {
                    tracing::debug!("[ParsedLabelers::parse_header] skipping '{}'", entry.trim());
                }
                continue;
            };
            let redact = parts.any(|param| param.eq_ignore_ascii_case("redact"));
            if !parsed.dids.contains(&did) {
                parsed.dids.push(did.clone());
            }
            if redact {
                parsed.redact.insert(did);
            }
        }
        parsed
    }

    pub fn is_empty(&self) -> bool {
        self.dids.is_empty()
    }

    pub fn can_redact(&self, src: &str) -> bool {
        self.redact.contains(src)
    }
}

impl Display for ParsedLabelers {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let entries = self
            .dids
            .iter()
            .map(|did| {
                if self.redact.contains(did) {
                    format!("{did};redact")
                } else {
                    did.to_string()
                }
            })
            .collect::<Vec<String>>();
        write!(f, "{}", entries.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_did_parsing() {
        let did = Did::try_from("did:plc:z72i7hdynmk6r22z27h6tvur").unwrap();
        assert_eq!(did.method(), "plc");
        assert!(Did::try_from("did:web:example.com").is_ok());
        assert!(Did::try_from("plc:abc").is_err());
        assert!(Did::try_from("did:PLC:abc").is_err());
        assert!(Did::try_from("did:plc:").is_err());
        assert!(Did::try_from("did:plc:abc/def").is_err());
    }

    #[test]
    fn test_labeler_service_uri() {
        let did = Did::try_from("did:plc:labeler").unwrap();
        assert_eq!(
            AtUri::labeler_service(&did).to_string(),
            "at://did:plc:labeler/app.bsky.labeler.service/self"
        );
    }

    #[test]
    fn test_at_uri_parse() {
        let uri = AtUri::try_from("at://did:plc:abc/app.bsky.feed.post/3k2a").unwrap();
        assert_eq!(uri.authority(), "did:plc:abc");
        assert_eq!(uri.collection(), Some("app.bsky.feed.post"));
        assert_eq!(uri.rkey(), Some("3k2a"));
        assert_eq!(uri.did().map(String::from), Some("did:plc:abc".to_string()));
        assert_eq!(uri.to_string(), "at://did:plc:abc/app.bsky.feed.post/3k2a");

        let repo = AtUri::try_from("at://alice.test").unwrap();
        assert_eq!(repo.collection(), None);
        assert!(repo.did().is_none());

        assert!(AtUri::try_from("https://example.com").is_err());
        assert!(AtUri::try_from("at:///app.bsky.feed.post").is_err());
        assert!(AtUri::try_from("at://a/b/c/d").is_err());
    }

    #[test]
    fn test_parse_labelers_header() {
        let parsed =
            ParsedLabelers::parse_header("did:plc:mod;redact, did:plc:other ,nonsense, did:plc:mod");
        let names = parsed.dids.iter().map(Did::as_str).collect::<Vec<_>>();
        assert_eq!(names, vec!["did:plc:mod", "did:plc:other"]);
        assert!(parsed.can_redact("did:plc:mod"));
        assert!(!parsed.can_redact("did:plc:other"));
        assert_eq!(parsed.to_string(), "did:plc:mod;redact,did:plc:other");
        assert!(ParsedLabelers::parse_header("").is_empty());
    }

    #[test]
    fn test_raw_label_drops_signature() {
        let raw: RawLabel = serde_json::from_value(serde_json::json!({
            "src": "did:plc:mod",
            "uri": "at://did:plc:abc/app.bsky.feed.post/1",
            "val": "porn",
            "cts": "2024-01-01T00:00:00Z",
            "sig": {"$bytes": "c2lnbmF0dXJl"}
        }))
        .unwrap();
        assert!(raw.sig.is_some());
        let label = Label::from(raw);
        assert!(!label.neg);
        assert_eq!(label.key(), "did:plc:mod::porn");
        let json = serde_json::to_value(&label).unwrap();
        assert!(json.get("sig").is_none());
    }
}
