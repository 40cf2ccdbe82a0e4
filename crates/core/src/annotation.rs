//! Annotation data model
//!
//! Records as the annotation API returns them. Everything except `body` is
//! fixed once the server has created the record: the motivation decides which
//! bucket owns it and the targets decide which parents index it.

use crate::error::{CoreError, CoreResult};
use crate::reference::ParentRef;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Opaque server-assigned identifier, unique within a bucket
pub type AnnotationId = String;

/// Category of an annotation; one store bucket per variant
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum Motivation {
    #[serde(rename = "commenting")]
    Comment,
    #[serde(rename = "replying")]
    Reply,
    #[serde(rename = "scholarly")]
    Scholarly,
    #[serde(rename = "tagging")]
    Tag,
    #[serde(rename = "upvoting")]
    Upvote,
    #[serde(rename = "flagging")]
    Flag,
    #[serde(rename = "linking")]
    Link,
    #[serde(rename = "external_reference")]
    ExternalReference,
}

impl Motivation {
    /// Number of buckets
    pub const COUNT: usize = 8;

    /// Every motivation, in bucket order
    pub const ALL: [Motivation; Self::COUNT] = [
        Motivation::Comment,
        Motivation::Reply,
        Motivation::Scholarly,
        Motivation::Tag,
        Motivation::Upvote,
        Motivation::Flag,
        Motivation::Link,
        Motivation::ExternalReference,
    ];

    /// Wire name used by the annotation API
    pub fn as_str(&self) -> &'static str {
        match self {
            Motivation::Comment => "commenting",
            Motivation::Reply => "replying",
            Motivation::Scholarly => "scholarly",
            Motivation::Tag => "tagging",
            Motivation::Upvote => "upvoting",
            Motivation::Flag => "flagging",
            Motivation::Link => "linking",
            Motivation::ExternalReference => "external_reference",
        }
    }

    /// Whether a new annotation of this kind must carry a character range
    pub fn requires_range(&self) -> bool {
        matches!(self, Motivation::Comment)
    }
}

impl fmt::Display for Motivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Motivation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Motivation::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Motivation::ALL.iter().map(|m| m.as_str()).collect();
                CoreError::validation(format!(
                    "unknown motivation '{s}', expected one of: {}",
                    valid.join(", ")
                ))
            })
    }
}

/// Identity summary of whoever created an annotation
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Creator {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Content payload
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnnotationBody {
    #[serde(rename = "type", default = "default_body_type")]
    pub kind: String,

    /// Opaque text, or a serialized [`LinkBody`] for link annotations
    #[serde(default)]
    pub value: String,

    #[serde(default)]
    pub format: String,

    #[serde(default)]
    pub language: String,
}

fn default_body_type() -> String {
    "TextualBody".to_string()
}

impl AnnotationBody {
    /// Plain HTML text body
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: default_body_type(),
            value: value.into(),
            format: "text/html".to_string(),
            language: "en".to_string(),
        }
    }

    /// Body carrying a serialized link object
    pub fn link(link: &LinkBody) -> CoreResult<Self> {
        Ok(Self {
            kind: default_body_type(),
            value: serde_json::to_string(link)?,
            format: "application/json".to_string(),
            language: "en".to_string(),
        })
    }

    /// Parse the value as a link object
    pub fn as_link(&self) -> CoreResult<LinkBody> {
        let link: LinkBody = serde_json::from_str(&self.value)?;
        if link.url.trim().is_empty() {
            return Err(CoreError::validation("link body has an empty url"));
        }
        Ok(link)
    }
}

/// Payload of a `linking` annotation
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LinkBody {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub url: String,
}

/// Half-open `[start, end)` range of UTF-16 code units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    /// Range `[start, end)`; callers check the order
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of code units covered, zero for inverted ranges
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Covers no characters
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `start <= end`
    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }

    /// Ordered and within `[0, text_len]`
    pub fn fits(&self, text_len: usize) -> bool {
        self.is_ordered() && self.end <= text_len
    }
}

/// Character range within the parent's plain text, with the quoted text it
/// covered when it was captured
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Selector {
    #[serde(default)]
    pub value: String,

    pub refined_by: TextRange,
}

impl Selector {
    /// Selector quoting `quote` at `[start, end)`
    pub fn new(quote: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            value: quote.into(),
            refined_by: TextRange::new(start, end),
        }
    }
}

/// One thing an annotation points at
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Target {
    pub source: ParentRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<Selector>,
}

impl Target {
    /// Target covering the whole parent
    pub fn whole(source: ParentRef) -> Self {
        Self {
            source,
            selector: None,
        }
    }

    /// Target narrowed to a character range
    pub fn with_selector(source: ParentRef, selector: Selector) -> Self {
        Self {
            source,
            selector: Some(selector),
        }
    }

    /// Character range of the selector, if any
    pub fn range(&self) -> Option<TextRange> {
        self.selector.as_ref().map(|s| s.refined_by)
    }
}

/// A server-side annotation record
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub creator: Creator,
    pub motivation: Motivation,
    pub body: AnnotationBody,
    pub target: Vec<Target>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Annotation {
    /// Every parent this record is indexed under
    pub fn parents(&self) -> impl Iterator<Item = &ParentRef> {
        self.target.iter().map(|t| &t.source)
    }

    /// Targets pointing at a specific parent
    pub fn targets_on<'a>(&'a self, parent: &'a ParentRef) -> impl Iterator<Item = &'a Target> {
        self.target.iter().filter(move |t| &t.source == parent)
    }

    /// Whether any target points at `parent`
    pub fn targets(&self, parent: &ParentRef) -> bool {
        self.parents().any(|p| p == parent)
    }

    /// Ordering used by every listing: oldest first, ties broken by id
    pub fn sort_key(&self) -> (DateTime<Utc>, &str) {
        (self.created, self.id.as_str())
    }
}

/// What the client posts to create an annotation
///
/// No id or timestamps: the server assigns both and the store only ever
/// holds the canonical record it returns.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnnotationDraft {
    pub motivation: Motivation,
    pub body: AnnotationBody,
    pub target: Vec<Target>,
}

impl AnnotationDraft {
    /// Draft with no targets yet
    pub fn new(motivation: Motivation, body: AnnotationBody) -> Self {
        Self {
            motivation,
            body,
            target: Vec::new(),
        }
    }

    /// Add a target
    pub fn with_target(mut self, target: Target) -> Self {
        self.target.push(target);
        self
    }

    /// Client-side checks run before any request is sent
    pub fn validate(&self) -> CoreResult<()> {
        if self.target.is_empty() {
            return Err(CoreError::validation(format!(
                "{} draft has no target",
                self.motivation
            )));
        }

        for target in &self.target {
            if let Some(range) = target.range() {
                if !range.is_ordered() {
                    return Err(CoreError::validation(format!(
                        "range [{}, {}) on {} is inverted",
                        range.start, range.end, target.source
                    )));
                }
            }
        }

        if self.motivation.requires_range() && self.target.iter().all(|t| t.selector.is_none()) {
            return Err(CoreError::validation(format!(
                "{} draft needs a character range",
                self.motivation
            )));
        }

        if self.motivation == Motivation::Link {
            self.body.as_link()?;
        }

        Ok(())
    }
}

/// Partial update sent with `PATCH`; only the body is editable
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnnotationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<AnnotationBody>,
}

impl AnnotationPatch {
    /// Patch that replaces the body
    pub fn body(body: AnnotationBody) -> Self {
        Self { body: Some(body) }
    }

    /// Nothing to change
    pub fn is_empty(&self) -> bool {
        self.body.is_none()
    }
}
