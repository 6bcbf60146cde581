/*!
The boundary between this crate and the regex engine that actually compiles and runs patterns.

An [`Engine`] compiles a pattern string into a [`Program`]. A program searches a haystack from a given start offset and reports the result as a [`Found`], whose [`Outcome`] is either per-group byte offsets ([`Mode::Full`]) or only the captured substrings ([`Mode::Reduced`]).

The default engine is [`MetaEngine`], backed by [`regex_automata::meta::Regex`].

## Custom engines
```
use slice_regex::{
    engine::{CompileError, Engine, Flags, Found, Mode, Outcome, Program},
    PatternCache,
};

/// Matches a literal string, without group offsets.
struct Literal;

struct LiteralProgram(String);

impl Program for LiteralProgram {
    fn search<'h>(&self, haystack: &'h str, start: usize) -> Option<Found<'h>> {
        let at = start + haystack.get(start..)?.find(self.0.as_str())?;
        let end = at + self.0.len();
        Some(Found {
            outcome: Outcome::Substrings { groups: Vec::new(), start: at, end },
            cursor: end,
        })
    }
}

impl Engine for Literal {
    type Program = LiteralProgram;

    fn compile(&self, source: &str, _: Flags, mode: Mode) -> Result<LiteralProgram, CompileError> {
        match mode {
            Mode::Full => Err(CompileError::Unsupported),
            Mode::Reduced => Ok(LiteralProgram(source.to_owned())),
        }
    }
}

let cache = PatternCache::builder().engine(Literal).build();
let pattern = cache.get_or_compile("ab", Default::default()).unwrap();
assert_eq!(pattern.mode(), Mode::Reduced);
assert_eq!(pattern.execute("xxab", 0).whole().as_str(), Some("ab"));
```
*/
use std::ops::Range;

use bitflags::bitflags;

mod meta;

pub use meta::{MetaEngine, MetaEngineBuilder, MetaProgram};

bitflags! {
    /// Compilation flags. Together with the pattern source they identify a
    /// [`CompiledPattern`](crate::CompiledPattern).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u8 {
        /// Letters match both upper and lower case.
        const IGNORE_CASE = 1 << 0;
        /// `^` and `$` match at line boundaries, not only at the ends of the haystack.
        const MULTI_LINE = 1 << 1;
    }
}

impl Flags {
    pub fn new(ignore_case: bool, multi_line: bool) -> Self {
        let mut flags = Flags::empty();
        flags.set(Flags::IGNORE_CASE, ignore_case);
        flags.set(Flags::MULTI_LINE, multi_line);
        flags
    }

    pub fn ignore_case(self) -> bool {
        self.contains(Flags::IGNORE_CASE)
    }

    pub fn multi_line(self) -> bool {
        self.contains(Flags::MULTI_LINE)
    }
}

/// What a compiled program reports about capture groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Byte offsets of every group.
    Full,
    /// Contents of every group, plus the offsets of the whole match only.
    Reduced,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The engine cannot compile anything in the requested [`Mode`].
    ///
    /// This is about the mode, never about the pattern.
    #[error("compilation mode is not supported by the engine")]
    Unsupported,
    /// The pattern was rejected. Carries the engine's diagnostic.
    #[error("{0}")]
    Syntax(String),
}

/// A pattern-compiling regex engine.
pub trait Engine: Send + Sync {
    type Program: Program;

    /// Compiles `source` in the given mode.
    ///
    /// Must return [`CompileError::Unsupported`] if and only if `mode` itself is
    /// unavailable, so that the caller can retry in [`Mode::Reduced`].
    fn compile(
        &self,
        source: &str,
        flags: Flags,
        mode: Mode,
    ) -> Result<Self::Program, CompileError>;
}

/// A compiled, immutable, searchable pattern.
///
/// Programs are shared between threads. Any per-search state must be kept
/// per call (or pooled), never on the program itself.
pub trait Program: Send + Sync {
    /// Searches `haystack` for the leftmost match starting at or after `start`.
    ///
    /// Text before `start` is still visible to look-around assertions like `^` and `\b`.
    /// Returns `None` if there is no match or `start > haystack.len()`.
    fn search<'h>(&self, haystack: &'h str, start: usize) -> Option<Found<'h>>;
}

/// A successful search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found<'h> {
    pub outcome: Outcome<'h>,
    /// Where the engine would resume searching, i.e. the end of the match.
    pub cursor: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<'h> {
    /// [`Mode::Full`]: one entry per group, group 0 being the whole match.
    /// `None` for groups that did not participate.
    Indices(Vec<Option<Range<usize>>>),
    /// [`Mode::Reduced`]: contents of groups 1.. (`None` if not participating),
    /// and the offsets of the whole match.
    Substrings {
        groups: Vec<Option<&'h str>>,
        start: usize,
        end: usize,
    },
}

impl Outcome<'_> {
    /// Start offset of the whole match, if reported.
    pub fn start(&self) -> Option<usize> {
        match self {
            Outcome::Indices(spans) => spans.first()?.as_ref().map(|span| span.start),
            Outcome::Substrings { start, .. } => Some(*start),
        }
    }
}
