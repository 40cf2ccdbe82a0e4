//! Capturing text selections as annotation targets
//!
//! A selection is made over the rendered plain text of one paragraph. The
//! selection mechanism reports anchor and focus positions as UTF-16 offsets;
//! capturing normalizes them, records the quoted text, and produces the
//! selector a draft is posted with.

use crate::annotation::{AnnotationBody, AnnotationDraft, Motivation, Selector, Target, TextRange};
use crate::error::{CoreError, CoreResult};
use crate::reference::ParentRef;
use crate::utf16::{utf16_len, utf16_slice};

/// A finished selection within one paragraph
#[derive(Debug, Clone, PartialEq)]
pub struct TextSelection {
    /// Paragraph the selection was made in
    pub parent: ParentRef,

    /// Normalized range, `start <= end`
    pub range: TextRange,

    /// Text covered by the range
    pub quote: String,
}

impl TextSelection {
    /// Capture a selection from anchor/focus UTF-16 offsets
    ///
    /// Backwards selections (focus before anchor) are normalized. Offsets past
    /// the end of the text or inside a surrogate pair are rejected.
    pub fn capture(parent: ParentRef, text: &str, anchor: usize, focus: usize) -> CoreResult<Self> {
        let range = TextRange::new(anchor.min(focus), anchor.max(focus));
        let quote = utf16_slice(text, range).ok_or_else(|| {
            CoreError::validation(format!(
                "selection [{}, {}) does not fit text of {} code units",
                range.start,
                range.end,
                utf16_len(text)
            ))
        })?;

        Ok(Self {
            parent,
            range,
            quote: quote.to_string(),
        })
    }

    /// Collapsed selections carry no range worth annotating
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Selector carrying the quote and range
    pub fn to_selector(&self) -> Selector {
        Selector {
            value: self.quote.clone(),
            refined_by: self.range,
        }
    }

    /// Target on the selection's paragraph
    pub fn to_target(&self) -> Target {
        Target::with_selector(self.parent.clone(), self.to_selector())
    }

    /// Start a draft targeting this selection
    pub fn draft(&self, motivation: Motivation, body: AnnotationBody) -> AnnotationDraft {
        AnnotationDraft::new(motivation, body).with_target(self.to_target())
    }
}

/// Whether a selector's quoted text still matches the paragraph
///
/// Selectors without a recorded quote always match.
pub fn quote_matches(text: &str, selector: &Selector) -> bool {
    if selector.value.is_empty() {
        return true;
    }
    utf16_slice(text, selector.refined_by) == Some(selector.value.as_str())
}
