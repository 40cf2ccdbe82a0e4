//! Parent references
//!
//! A target's `source` points either at a document element
//! (`DocumentElements/<id>`) or at another annotation (`Annotation/<id>`).
//! The latter is what turns replies and tags into a tree.

use crate::error::CoreError;
use std::fmt;
use std::str::FromStr;

const DOCUMENT_ELEMENT_PREFIX: &str = "DocumentElements/";
const ANNOTATION_PREFIX: &str = "Annotation/";

/// Typed form of a target source string
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum ParentRef {
    /// A paragraph or other rendered element of a document
    DocumentElement(String),

    /// Another annotation (reply, tag, upvote on an annotation)
    Annotation(String),
}

impl ParentRef {
    /// Reference to a document element
    pub fn element(id: impl Into<String>) -> Self {
        ParentRef::DocumentElement(id.into())
    }

    /// Reference to an annotation
    pub fn annotation(id: impl Into<String>) -> Self {
        ParentRef::Annotation(id.into())
    }

    /// The bare id without its prefix
    pub fn id(&self) -> &str {
        match self {
            ParentRef::DocumentElement(id) | ParentRef::Annotation(id) => id,
        }
    }

    /// Targets a document element
    pub fn is_document_element(&self) -> bool {
        matches!(self, ParentRef::DocumentElement(_))
    }

    /// Targets another annotation
    pub fn is_annotation(&self) -> bool {
        matches!(self, ParentRef::Annotation(_))
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentRef::DocumentElement(id) => write!(f, "{DOCUMENT_ELEMENT_PREFIX}{id}"),
            ParentRef::Annotation(id) => write!(f, "{ANNOTATION_PREFIX}{id}"),
        }
    }
}

impl FromStr for ParentRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = if let Some(id) = s.strip_prefix(DOCUMENT_ELEMENT_PREFIX) {
            ParentRef::DocumentElement(id.to_string())
        } else if let Some(id) = s.strip_prefix(ANNOTATION_PREFIX) {
            ParentRef::Annotation(id.to_string())
        } else {
            return Err(CoreError::InvalidReference(s.to_string()));
        };

        if parsed.id().is_empty() || parsed.id().contains('/') {
            return Err(CoreError::InvalidReference(s.to_string()));
        }
        Ok(parsed)
    }
}

impl TryFrom<String> for ParentRef {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ParentRef> for String {
    fn from(value: ParentRef) -> Self {
        value.to_string()
    }
}
