//! Text layout engines
//!
//! The resolver never measures text itself; it asks a [`TextLayout`] for the
//! client rectangles of a character range, one per line fragment, the way a
//! browser answers `Range::getClientRects`.

use crate::error::{GeometryError, GeometryResult};
use crate::geometry::{Point, Rect};
use marginalia_core::TextRange;

/// Live layout of one rendered paragraph
pub trait TextLayout {
    /// Whether the paragraph is still part of the view
    fn is_attached(&self) -> bool {
        true
    }

    /// Top-left of the paragraph container in client coordinates
    fn container_origin(&self) -> Point;

    /// Client rectangles for `[start, end)` in UTF-16 code units
    fn client_rects(&self, start: usize, end: usize) -> GeometryResult<Vec<Rect>>;
}

/// Fixed-advance layout with greedy word wrapping
///
/// Every character advances by the same width; surrogate pairs count as one
/// character. Words that do not fit on a line of their own are broken.
#[derive(Debug, Clone)]
pub struct MonospaceLayout {
    origin: Point,
    width: f32,
    char_width: f32,
    line_height: f32,
    attached: bool,
    /// UTF-16 offset where each char starts, plus one entry for the end
    char_offsets: Vec<usize>,
    is_space: Vec<bool>,
    /// Char index ranges, one per visual line
    lines: Vec<(usize, usize)>,
}

impl MonospaceLayout {
    /// Default advance per character, in pixels
    pub const DEFAULT_CHAR_WIDTH: f32 = 8.0;
    /// Default line height, in pixels
    pub const DEFAULT_LINE_HEIGHT: f32 = 20.0;

    /// Lay out `text` in a container `width` pixels wide at the client origin
    pub fn new(text: &str, width: f32) -> Self {
        let mut char_offsets = Vec::with_capacity(text.len() + 1);
        let mut is_space = Vec::with_capacity(text.len());
        let mut units = 0;
        for ch in text.chars() {
            char_offsets.push(units);
            is_space.push(ch.is_whitespace());
            units += ch.len_utf16();
        }
        char_offsets.push(units);

        let mut layout = Self {
            origin: Point::default(),
            width,
            char_width: Self::DEFAULT_CHAR_WIDTH,
            line_height: Self::DEFAULT_LINE_HEIGHT,
            attached: true,
            char_offsets,
            is_space,
            lines: Vec::new(),
        };
        layout.rewrap();
        layout
    }

    /// Place the paragraph container at `origin`
    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    /// Override the character advance and line height
    pub fn with_metrics(mut self, char_width: f32, line_height: f32) -> Self {
        self.char_width = char_width;
        self.line_height = line_height;
        self.rewrap();
        self
    }

    /// Re-wrap for a new container width
    pub fn set_width(&mut self, width: f32) {
        self.width = width;
        self.rewrap();
    }

    /// Simulate the paragraph leaving the view
    pub fn detach(&mut self) {
        self.attached = false;
    }

    /// Container width used for wrapping
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Number of wrapped lines
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Visual lines as UTF-16 ranges
    pub fn lines(&self) -> Vec<TextRange> {
        self.lines
            .iter()
            .map(|&(start, end)| TextRange::new(self.char_offsets[start], self.char_offsets[end]))
            .collect()
    }

    /// Bounds of the whole paragraph in client coordinates
    pub fn container_rect(&self) -> Rect {
        Rect::new(
            self.origin.x,
            self.origin.y,
            self.width,
            self.lines.len() as f32 * self.line_height,
        )
    }

    fn text_len(&self) -> usize {
        self.char_offsets.last().copied().unwrap_or(0)
    }

    fn char_index(&self, offset: usize) -> usize {
        self.char_offsets.partition_point(|&units| units < offset)
    }

    fn chars_per_line(&self) -> usize {
        if self.char_width > 0.0 {
            ((self.width / self.char_width).floor() as usize).max(1)
        } else {
            usize::MAX
        }
    }

    fn rewrap(&mut self) {
        self.lines = wrap(&self.is_space, self.chars_per_line());
    }
}

impl TextLayout for MonospaceLayout {
    fn is_attached(&self) -> bool {
        self.attached
    }

    fn container_origin(&self) -> Point {
        self.origin
    }

    fn client_rects(&self, start: usize, end: usize) -> GeometryResult<Vec<Rect>> {
        if !self.attached {
            return Err(GeometryError::Detached);
        }
        let range = TextRange::new(start, end);
        if !range.is_ordered() {
            return Err(GeometryError::InvertedRange(range));
        }
        if end > self.text_len() {
            return Err(GeometryError::OutOfBounds {
                range,
                len: self.text_len(),
            });
        }

        let (first, last) = (self.char_index(start), self.char_index(end));
        let rects = self
            .lines
            .iter()
            .enumerate()
            .filter_map(|(row, &(line_start, line_end))| {
                let from = first.max(line_start);
                let to = last.min(line_end);
                (from < to).then(|| {
                    Rect::new(
                        self.origin.x + (from - line_start) as f32 * self.char_width,
                        self.origin.y + row as f32 * self.line_height,
                        (to - from) as f32 * self.char_width,
                        self.line_height,
                    )
                })
            })
            .collect();
        Ok(rects)
    }
}

/// Greedy word wrap over char indices
///
/// Whitespace between two words that end up on different lines belongs to
/// neither line.
fn wrap(is_space: &[bool], chars_per_line: usize) -> Vec<(usize, usize)> {
    let mut lines = Vec::new();
    let mut current: Option<(usize, usize)> = None;

    for (word_start, word_end) in words(is_space) {
        if let Some((line_start, _)) = current {
            if word_end - line_start <= chars_per_line {
                current = Some((line_start, word_end));
                continue;
            }
            lines.extend(current.take());
        }

        // Word is too long, split it
        let mut start = word_start;
        while word_end - start > chars_per_line {
            lines.push((start, start + chars_per_line));
            start += chars_per_line;
        }
        current = Some((start, word_end));
    }
    lines.extend(current);

    if lines.is_empty() {
        lines.push((0, 0));
    }
    lines
}

fn words(is_space: &[bool]) -> Vec<(usize, usize)> {
    let mut words = Vec::new();
    let mut start = None;
    for (i, &space) in is_space.iter().enumerate() {
        match (space, start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                words.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        words.push((s, is_space.len()));
    }
    words
}
