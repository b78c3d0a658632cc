//! Brace-balanced block location in build-script text
//!
//! Build scripts are handled line by line. A block starts at a line whose
//! trimmed text begins with a marker (e.g. `dependencies`) and ends at the line
//! where the brace depth, counted from that start, returns to zero.
//!
//! # Limitation
//!
//! Braces are counted textually. A `{` or `}` inside a string literal or a
//! comment corrupts the depth count. Callers relying on exact blocks must keep
//! such characters out of the scanned region.

use tracing::debug;

/// Inclusive line range `[begin, end]` of a located block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub begin: usize,
    pub end: usize,
}

/// Result of a block search over a borrowed line sequence
///
/// A `Position` without a span is the "not found" sentinel: nothing is matched
/// and every line counts as "before".
#[derive(Debug, Clone, Copy)]
pub struct Position<'a> {
    lines: &'a [String],
    span: Option<Span>,
}

impl<'a> Position<'a> {
    /// Build a position for an already known range
    ///
    /// Returns the not-found sentinel when the range is empty or out of bounds.
    pub fn new(lines: &'a [String], begin: usize, end: usize) -> Self {
        if begin > end || end >= lines.len() {
            return Self::not_found(lines);
        }
        Self {
            lines,
            span: Some(Span { begin, end }),
        }
    }

    /// The "nothing matched" sentinel for `lines`
    pub fn not_found(lines: &'a [String]) -> Self {
        Self { lines, span: None }
    }

    /// Locate the block introduced by `marker`, degrading to [`Position::not_found`]
    pub fn locate(marker: &str, lines: &'a [String]) -> Self {
        find_block(marker, lines).unwrap_or_else(|| Self::not_found(lines))
    }

    pub fn is_found(&self) -> bool {
        self.span.is_some()
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }

    /// Lines of the block, including the marker and the closing line
    pub fn matched_lines(&self) -> &'a [String] {
        match self.span {
            Some(Span { begin, end }) => &self.lines[begin..=end],
            None => &[],
        }
    }

    /// Lines before the block; the whole input when nothing was found
    pub fn lines_before(&self) -> &'a [String] {
        match self.span {
            Some(Span { begin, .. }) => &self.lines[..begin],
            None => self.lines,
        }
    }

    /// Lines after the block; empty when nothing was found
    pub fn lines_after(&self) -> &'a [String] {
        match self.span {
            Some(Span { end, .. }) => &self.lines[end + 1..],
            None => &[],
        }
    }

    /// Everything outside the block, in original order
    pub fn non_matched_lines(&self) -> Vec<String> {
        self.lines_before()
            .iter()
            .chain(self.lines_after())
            .cloned()
            .collect()
    }
}

/// Find the first brace-balanced block whose start line begins with `marker`
///
/// While the depth is zero every marker line overwrites the candidate start, so
/// of several marker lines preceding the first balanced block the last one
/// wins. Returns `None` when no candidate start exists or the block never
/// closes.
pub fn find_block<'a>(marker: &str, lines: &'a [String]) -> Option<Position<'a>> {
    let mut start: Option<usize> = None;
    let mut depth: usize = 0;
    let mut opened = false;

    for (index, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if depth == 0 && trimmed.starts_with(marker) {
            start = Some(index);
            opened = false;
        }
        let Some(begin) = start else {
            continue;
        };

        let opens = trimmed.matches('{').count();
        let closes = trimmed.matches('}').count();
        if opens > 0 {
            opened = true;
        }
        depth = (depth + opens).saturating_sub(closes);

        if opened && depth == 0 {
            debug!(marker, begin, end = index, "located block");
            return Some(Position::new(lines, begin, index));
        }
    }

    debug!(marker, "no balanced block found");
    None
}
