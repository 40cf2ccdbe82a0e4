//! Range geometry resolver
//!
//! One pass takes a paragraph's text, its live layout and the ranges
//! annotations hold on it, and produces container-relative rectangles per
//! annotation. A bad range never aborts the pass: it is logged and left out.

use crate::error::{GeometryError, GeometryResult};
use crate::geometry::Rect;
use crate::layout::TextLayout;
use marginalia_core::{quote_matches, utf16_len, Annotation, AnnotationId, ParentRef, Selector, TextRange};
use std::collections::BTreeMap;

/// Rectangles per annotation for one paragraph
pub type RangeGeometry = BTreeMap<AnnotationId, Vec<Rect>>;

/// A character range one annotation holds on a paragraph
#[derive(Debug, Clone, PartialEq)]
pub struct RangeRequest {
    pub annotation_id: AnnotationId,
    pub range: TextRange,
    /// Quoted text recorded at capture time, empty if unknown
    pub quote: String,
}

impl RangeRequest {
    /// Request for `[start, end)`
    pub fn new(annotation_id: impl Into<AnnotationId>, start: usize, end: usize) -> Self {
        Self {
            annotation_id: annotation_id.into(),
            range: TextRange::new(start, end),
            quote: String::new(),
        }
    }

    /// Request from a target selector
    pub fn from_selector(annotation_id: impl Into<AnnotationId>, selector: &Selector) -> Self {
        Self {
            annotation_id: annotation_id.into(),
            range: selector.refined_by,
            quote: selector.value.clone(),
        }
    }
}

/// Requests for every ranged target on `parent`
///
/// Only document-element parents have rendered text; annotation-sourced
/// targets (replies, tags on annotations) never produce requests.
pub fn requests_for_paragraph(parent: &ParentRef, annotations: &[Annotation]) -> Vec<RangeRequest> {
    if !parent.is_document_element() {
        return Vec::new();
    }
    annotations
        .iter()
        .flat_map(|annotation| {
            annotation
                .targets_on(parent)
                .filter_map(|target| target.selector.as_ref())
                .map(|selector| RangeRequest::from_selector(annotation.id.clone(), selector))
        })
        .collect()
}

/// Stateless; kept as a type so views can hold one next to their layouts
#[derive(Debug, Default, Clone, Copy)]
pub struct RangeGeometryResolver;

impl RangeGeometryResolver {
    /// Resolver with no state
    pub fn new() -> Self {
        Self
    }

    /// Resolve every request against `layout`
    ///
    /// Multiple ranges of one annotation on the same paragraph accumulate
    /// under its id. Annotations whose every range was rejected are absent.
    pub fn resolve(&self, text: &str, layout: &dyn TextLayout, requests: &[RangeRequest]) -> RangeGeometry {
        let text_len = utf16_len(text);
        let mut geometry = RangeGeometry::new();

        for request in requests {
            match self.resolve_one(text, text_len, layout, request) {
                Ok(rects) => geometry
                    .entry(request.annotation_id.clone())
                    .or_default()
                    .extend(rects),
                Err(err) => tracing::warn!(
                    annotation = %request.annotation_id,
                    start = request.range.start,
                    end = request.range.end,
                    error = %err,
                    "skipping highlight range"
                ),
            }
        }

        tracing::debug!(
            requests = requests.len(),
            positioned = geometry.len(),
            "resolved paragraph geometry"
        );
        geometry
    }

    fn resolve_one(
        &self,
        text: &str,
        text_len: usize,
        layout: &dyn TextLayout,
        request: &RangeRequest,
    ) -> GeometryResult<Vec<Rect>> {
        let range = request.range;
        if !range.is_ordered() {
            return Err(GeometryError::InvertedRange(range));
        }
        if !range.fits(text_len) {
            return Err(GeometryError::OutOfBounds { range, len: text_len });
        }
        if !layout.is_attached() {
            return Err(GeometryError::Detached);
        }

        let selector = Selector {
            value: request.quote.clone(),
            refined_by: range,
        };
        if !quote_matches(text, &selector) {
            tracing::debug!(
                annotation = %request.annotation_id,
                quote = %request.quote,
                "quoted text no longer matches paragraph"
            );
        }

        let origin = layout.container_origin();
        let rects: Vec<Rect> = layout
            .client_rects(range.start, range.end)?
            .into_iter()
            .filter(Rect::has_area)
            .map(|rect| rect.relative_to(origin))
            .collect();

        if rects.is_empty() {
            return Err(GeometryError::Empty);
        }
        Ok(rects)
    }
}
