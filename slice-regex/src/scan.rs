use std::iter::FusedIterator;

use crate::{engine::Program, exec::Executed, CompiledPattern, MatchResult, Slice};

/// A piece of a [`ScanResult`].
#[derive(Clone, Debug)]
pub enum Segment<'h> {
    /// Unmatched text before, between or after matches. May be empty.
    Gap(Slice<'h>),
    /// A match and its capture groups.
    Match(MatchResult<'h>),
}

impl<'h> Segment<'h> {
    pub fn is_gap(&self) -> bool {
        matches!(self, Segment::Gap(_))
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Segment::Match(_))
    }

    pub fn as_gap(&self) -> Option<Slice<'h>> {
        match self {
            Segment::Gap(gap) => Some(*gap),
            Segment::Match(_) => None,
        }
    }

    pub fn as_match(&self) -> Option<&MatchResult<'h>> {
        match self {
            Segment::Gap(_) => None,
            Segment::Match(m) => Some(m),
        }
    }

    /// The part of the input this segment covers: the gap, or the whole match.
    pub fn span(&self) -> Slice<'h> {
        match self {
            Segment::Gap(gap) => *gap,
            Segment::Match(m) => m.whole(),
        }
    }

    /// A gap as a one-element list, a match as its slices.
    pub fn into_slices(self) -> Vec<Slice<'h>> {
        match self {
            Segment::Gap(gap) => vec![gap],
            Segment::Match(m) => m.into_vec(),
        }
    }
}

/// All matches of a pattern from a start offset, interleaved with the text between them.
///
/// Segments alternate `gap, match, gap, ..., match, gap`: there is always one
/// more gap than there are matches, and the spans of all segments, in order,
/// cover the scanned part of the input exactly once.
///
/// ## Example
/// ```
/// use slice_regex::PatternCache;
///
/// let pattern = PatternCache::new().get_or_compile("[0-9]+", Default::default()).unwrap();
/// let scan = pattern.scan_all("a12b345c", 0, None);
/// let spans: Vec<_> = scan.iter().map(|s| s.span().as_str().unwrap()).collect();
/// assert_eq!(spans, ["a", "12", "b", "345", "c"]);
///
/// let scan = pattern.scan_all("a12b345c", 0, Some(1));
/// let spans: Vec<_> = scan.iter().map(|s| s.span().as_str().unwrap()).collect();
/// assert_eq!(spans, ["a", "12", "b345c"]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ScanResult<'h> {
    segments: Vec<Segment<'h>>,
}

impl<'h> ScanResult<'h> {
    pub fn segments(&self) -> &[Segment<'h>] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment<'h>> {
        self.segments.iter()
    }

    /// Number of segments, i.e. `2 * match_count() + 1`.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn matches(&self) -> impl Iterator<Item = &MatchResult<'h>> + '_ {
        self.segments.iter().filter_map(Segment::as_match)
    }

    pub fn gaps(&self) -> impl Iterator<Item = Slice<'h>> + '_ {
        self.segments.iter().filter_map(Segment::as_gap)
    }

    pub fn match_count(&self) -> usize {
        self.matches().count()
    }

    /// Flattens into one list per segment: `[gap]`, `[whole, group1, ...]`, `[gap]`, ...
    pub fn into_lists(self) -> Vec<Vec<Slice<'h>>> {
        self.segments.into_iter().map(Segment::into_slices).collect()
    }

    pub fn into_vec(self) -> Vec<Segment<'h>> {
        self.segments
    }
}

impl<'h> FromIterator<Segment<'h>> for ScanResult<'h> {
    fn from_iter<T: IntoIterator<Item = Segment<'h>>>(iter: T) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

impl<'h> IntoIterator for ScanResult<'h> {
    type Item = Segment<'h>;
    type IntoIter = std::vec::IntoIter<Segment<'h>>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}

impl<'a, 'h> IntoIterator for &'a ScanResult<'h> {
    type Item = &'a Segment<'h>;
    type IntoIter = std::slice::Iter<'a, Segment<'h>>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

/// A lazy scan over the matches of a pattern. See [`CompiledPattern::scan`].
///
/// Yields the same segments as [`CompiledPattern::scan_all`], one at a time.
#[derive(Debug)]
pub struct Scanner<'p, 'h, P> {
    pattern: &'p CompiledPattern<P>,
    input: &'h str,
    /// Where the next search starts.
    pos: usize,
    /// End of the last match, i.e. start of the next gap.
    gap_start: usize,
    remaining: usize,
    pending: Option<MatchResult<'h>>,
    done: bool,
}

impl<'p, 'h, P: Program> Scanner<'p, 'h, P> {
    fn new(pattern: &'p CompiledPattern<P>, input: &'h str, start: usize) -> Self {
        let start = start.min(input.len());
        Self {
            pattern,
            input,
            pos: start,
            gap_start: start,
            remaining: usize::MAX,
            pending: None,
            done: false,
        }
    }

    /// Stop after at most `n` matches. The rest of the input becomes the trailing gap.
    pub fn limit(mut self, n: usize) -> Self {
        self.remaining = n;
        self
    }

    /// Number of matches that can still be yielded.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    fn gap(&self, end: usize) -> Slice<'h> {
        Slice::new(self.input, self.gap_start, end - self.gap_start)
    }

    /// Byte offset of the character after `pos`.
    fn next_char(&self, pos: usize) -> usize {
        pos + self
            .input
            .get(pos..)
            .and_then(|rest| rest.chars().next())
            .map_or(1, char::len_utf8)
    }

    fn advance(&mut self, executed: &Executed<'h>) {
        let end = executed.start + executed.result.whole().len();
        // A match that consumed nothing would be found again at the same position
        self.pos = if executed.cursor <= self.pos || executed.cursor <= executed.start {
            self.next_char(executed.cursor.max(self.pos))
        } else {
            executed.cursor
        };
        self.gap_start = self.gap_start.max(end);
    }
}

impl<'p, 'h, P: Program> Iterator for Scanner<'p, 'h, P> {
    type Item = Segment<'h>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(m) = self.pending.take() {
            return Some(Segment::Match(m));
        }
        if self.done {
            return None;
        }

        if self.remaining > 0 {
            if let Some(executed) = self.pattern.exec(self.input, self.pos) {
                self.remaining -= 1;
                let gap = self.gap(executed.start.max(self.gap_start));
                self.advance(&executed);
                self.pending = Some(executed.result);
                return Some(Segment::Gap(gap));
            }
        }

        self.done = true;
        Some(Segment::Gap(self.gap(self.input.len())))
    }
}

impl<P: Program> FusedIterator for Scanner<'_, '_, P> {}

impl<P: Program> CompiledPattern<P> {
    /// Lazily scans `input` from byte offset `start`, yielding alternating
    /// [`Segment::Gap`] and [`Segment::Match`] segments. See [`scan_all()`](Self::scan_all).
    ///
    /// ## Example
    /// ```
    /// use slice_regex::{PatternCache, Segment};
    ///
    /// let pattern = PatternCache::new().get_or_compile(r"(\w+)=(\w+)", Default::default()).unwrap();
    /// let keys: Vec<_> = pattern
    ///     .scan("a=1, b=2", 0)
    ///     .filter_map(|s| s.as_match().and_then(|m| m.get(1).as_str()))
    ///     .collect();
    /// assert_eq!(keys, ["a", "b"]);
    /// ```
    pub fn scan<'p, 'h>(&'p self, input: &'h str, start: usize) -> Scanner<'p, 'h, P> {
        Scanner::new(self, input, start)
    }

    /// Finds all matches in `input` from byte offset `start`, at most `at_most`
    /// of them (`None` for no limit).
    ///
    /// The result alternates gaps and matches and always ends with a gap, which
    /// is empty if the last match reaches the end of `input`. Concatenating the
    /// spans of all segments gives back `input[start..]`. If `start` is past the
    /// end of `input`, the result is a single empty gap.
    ///
    /// A match that consumes nothing makes the next search start one character
    /// later, so patterns like `x*` terminate: the skipped character becomes part
    /// of the next gap. This also holds for an empty match found after the
    /// search start, so every empty match is reported exactly once: `$` on
    /// `"ab"` gives `["ab", "", ""]`, not two empty matches at offset 2.
    pub fn scan_all<'h>(
        &self,
        input: &'h str,
        start: usize,
        at_most: Option<usize>,
    ) -> ScanResult<'h> {
        self.scan(input, start)
            .limit(at_most.unwrap_or(usize::MAX))
            .collect()
    }
}
