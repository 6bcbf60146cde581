use std::{fmt, iter};

use itertools::Itertools;

use crate::{
    engine::{Found, Outcome, Program},
    CompiledPattern, Slice,
};

/// The slices of a single match: the whole match first, then every capture
/// group in declaration order (nested groups are numbered by their opening
/// parenthesis). Empty if nothing matched.
///
/// ## Example
/// ```
/// use slice_regex::PatternCache;
///
/// let pattern = PatternCache::new()
///     .get_or_compile(r"(\d+)(?:\.(\d+))?", Default::default())
///     .unwrap();
/// let m = pattern.execute("version 12", 0);
/// assert_eq!(m.whole().as_str(), Some("12"));
/// assert_eq!(m.get(1).as_str(), Some("12"));
/// assert!(!m.get(2).is_valid());
///
/// assert!(!pattern.execute("version", 0).is_match());
/// ```
#[derive(Clone, Default)]
pub struct MatchResult<'h> {
    slices: Vec<Slice<'h>>,
}

impl<'h> MatchResult<'h> {
    /// The result of a search that found nothing.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_match(&self) -> bool {
        !self.slices.is_empty()
    }

    /// The whole match, or [`Slice::Invalid`] if nothing matched.
    pub fn whole(&self) -> Slice<'h> {
        self.get(0)
    }

    /// Group `index`, `0` being the whole match.
    ///
    /// [`Slice::Invalid`] if the group did not participate or does not exist.
    pub fn get(&self, index: usize) -> Slice<'h> {
        self.slices.get(index).copied().unwrap_or_default()
    }

    /// Capture groups without the whole match.
    pub fn groups(&self) -> &[Slice<'h>] {
        self.slices.get(1..).unwrap_or_default()
    }

    /// Number of slices, i.e. `1 + group count` on a match and `0` otherwise.
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Slice<'h>> {
        self.slices.iter()
    }

    pub fn as_slices(&self) -> &[Slice<'h>] {
        &self.slices
    }

    pub fn into_vec(self) -> Vec<Slice<'h>> {
        self.slices
    }
}

impl<'h> From<Vec<Slice<'h>>> for MatchResult<'h> {
    fn from(slices: Vec<Slice<'h>>) -> Self {
        Self { slices }
    }
}

impl<'h> IntoIterator for MatchResult<'h> {
    type Item = Slice<'h>;
    type IntoIter = std::vec::IntoIter<Slice<'h>>;

    fn into_iter(self) -> Self::IntoIter {
        self.slices.into_iter()
    }
}

impl<'a, 'h> IntoIterator for &'a MatchResult<'h> {
    type Item = &'a Slice<'h>;
    type IntoIter = std::slice::Iter<'a, Slice<'h>>;

    fn into_iter(self) -> Self::IntoIter {
        self.slices.iter()
    }
}

impl fmt::Debug for MatchResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.slices).finish()
    }
}

/// `[whole, group1, ...]`, with non-participating groups shown as `_`.
impl fmt::Display for MatchResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]",
            self.slices
                .iter()
                .map(|s| s.as_str().map_or("_".to_owned(), |s| format!("{s:?}")))
                .join(", ")
        )
    }
}

/// A match together with the offsets the scanner needs.
pub(crate) struct Executed<'h> {
    pub result: MatchResult<'h>,
    /// Start of the whole match in the input.
    pub start: usize,
    /// Where the engine would resume.
    pub cursor: usize,
}

impl<P: Program> CompiledPattern<P> {
    /// Searches `input` for the leftmost match at or after byte offset `start`.
    ///
    /// Text before `start` is still visible to assertions like `^` and `\b`.
    /// Returns an empty [`MatchResult`] if there is no match, including when
    /// `start > input.len()`.
    ///
    /// ## Reduced mode
    /// If the pattern was compiled in [`Mode::Reduced`](crate::engine::Mode::Reduced),
    /// the whole match is still a view of `input`, from the reported match start
    /// to where the engine would resume, but every capture group is a
    /// fresh slice whose owner is the captured text itself: its
    /// [`offset()`](Slice::offset) is always `0` and says nothing about where the
    /// group is in `input`, and [`Slice::same_span`] will not relate it to
    /// slices of `input`.
    pub fn execute<'h>(&self, input: &'h str, start: usize) -> MatchResult<'h> {
        self.exec(input, start)
            .map(|executed| executed.result)
            .unwrap_or_default()
    }

    pub(crate) fn exec<'h>(&self, input: &'h str, start: usize) -> Option<Executed<'h>> {
        let Found { outcome, cursor } = self.program().search(input, start)?;
        let (slices, start): (Vec<_>, _) = match outcome {
            Outcome::Indices(spans) => {
                let start = spans.first()?.as_ref()?.start;
                let slices = spans
                    .into_iter()
                    .map(|span| span.map_or(Slice::Invalid, |span| Slice::from_range(input, span)))
                    .collect();
                (slices, start)
            }
            Outcome::Substrings { groups, start, .. } => {
                let start = start.min(input.len());
                let end = cursor.clamp(start, input.len());
                let slices = iter::once(Slice::new(input, start, end - start))
                    .chain(groups.into_iter().map(|group| group.map_or(Slice::Invalid, Slice::whole)))
                    .collect();
                (slices, start)
            }
        };
        Some(Executed {
            result: slices.into(),
            start,
            cursor,
        })
    }
}
