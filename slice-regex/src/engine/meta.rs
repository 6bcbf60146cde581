use std::panic::{RefUnwindSafe, UnwindSafe};

use regex_automata::{
    meta::{BuildError, Cache, Regex},
    util::pool::Pool,
    Input,
};
use regex_syntax::{
    hir::{Capture, Class, ClassBytes, ClassUnicode, ClassUnicodeRange, Hir, HirKind, Literal, Repetition},
    Parser, ParserBuilder,
};

use super::{CompileError, Engine, Flags, Found, Mode, Outcome, Program};

/// The default [`Engine`], backed by [`regex_automata::meta::Regex`].
///
/// Supports the same syntax as the [`regex`](https://docs.rs/regex/) crate.
/// Search time is linear in the haystack, so there is no catastrophic backtracking.
///
/// ## Example
/// ```
/// use slice_regex::{engine::{MetaEngine, Mode}, PatternCache};
///
/// // An engine that behaves like a platform without group offset tracking
/// let cache = PatternCache::builder()
///     .engine(MetaEngine::builder().indices(false).build())
///     .build();
/// let pattern = cache.get_or_compile(r"(\d+)", Default::default()).unwrap();
/// assert_eq!(pattern.mode(), Mode::Reduced);
/// ```
#[derive(bon::Builder, Debug, Clone)]
pub struct MetaEngine {
    /// Whether [`Mode::Full`] is available.
    ///
    /// With `false`, every pattern is compiled in [`Mode::Reduced`] instead.
    #[builder(default = true)]
    indices: bool,
    /// Treat `\r\n` as a line terminator for `^` and `$` in multi-line mode.
    #[builder(default)]
    crlf: bool,
    /// Approximate heap limit of the compiled NFA in bytes. Patterns exceeding it are rejected.
    ///
    /// Defaults to the limit of [`regex_automata::meta::Config`].
    nfa_size_limit: Option<usize>,
}

impl Default for MetaEngine {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl MetaEngine {
    fn parser(&self, flags: Flags) -> Parser {
        ParserBuilder::new()
            .unicode(cfg!(feature = "unicode"))
            // Checked after `widen()`
            .utf8(false)
            .case_insensitive(flags.ignore_case())
            .multi_line(flags.multi_line())
            .crlf(self.crlf)
            .build()
    }
}

impl Engine for MetaEngine {
    type Program = MetaProgram;

    fn compile(
        &self,
        source: &str,
        flags: Flags,
        mode: Mode,
    ) -> Result<MetaProgram, CompileError> {
        if mode == Mode::Full && !self.indices {
            return Err(CompileError::Unsupported);
        }

        let mut config = Regex::config();
        if let Some(limit) = self.nfa_size_limit {
            config = config.nfa_size_limit(Some(limit));
        }
        let hir = self
            .parser(flags)
            .parse(source)
            .map_err(|err| CompileError::Syntax(err.to_string()))?;
        let hir = widen(hir);
        if !hir.properties().is_utf8() {
            return Err(CompileError::Syntax("pattern can match invalid UTF-8".into()));
        }
        let re = Regex::builder()
            .configure(config)
            .build_from_hir(&hir)
            .map_err(diagnostic)?;

        let pool = {
            let re = re.clone();
            let create: CachePoolFn = Box::new(move || re.create_cache());
            Pool::new(create)
        };
        Ok(MetaProgram { re, pool, mode })
    }
}

fn diagnostic(err: BuildError) -> CompileError {
    CompileError::Syntax(err.to_string())
}

/// Turns byte classes that contain every non-ASCII byte, like `.` and `[^x]`
/// outside of Unicode mode, into classes of characters.
///
/// Haystacks are always `str`, so such a class can only mean "any non-ASCII
/// character" there. Left as bytes, it could match half of a character.
fn widen(hir: Hir) -> Hir {
    match hir.into_kind() {
        HirKind::Empty => Hir::empty(),
        HirKind::Literal(Literal(bytes)) => Hir::literal(bytes),
        HirKind::Class(Class::Bytes(class)) => match widen_class(&class) {
            Some(class) => Hir::class(Class::Unicode(class)),
            None => Hir::class(Class::Bytes(class)),
        },
        HirKind::Class(class) => Hir::class(class),
        HirKind::Look(look) => Hir::look(look),
        HirKind::Repetition(rep) => Hir::repetition(Repetition {
            sub: Box::new(widen(*rep.sub)),
            ..rep
        }),
        HirKind::Capture(cap) => Hir::capture(Capture {
            sub: Box::new(widen(*cap.sub)),
            ..cap
        }),
        HirKind::Concat(subs) => Hir::concat(subs.into_iter().map(widen).collect()),
        HirKind::Alternation(subs) => Hir::alternation(subs.into_iter().map(widen).collect()),
    }
}

fn widen_class(class: &ClassBytes) -> Option<ClassUnicode> {
    let mut ranges = Vec::new();
    let mut high = Vec::new();
    for range in class.ranges() {
        if range.start() <= 0x7F {
            ranges.push(ClassUnicodeRange::new(
                char::from(range.start()),
                char::from(range.end().min(0x7F)),
            ));
        }
        if range.end() >= 0x80 {
            high.push((range.start().max(0x80), range.end()));
        }
    }
    match high[..] {
        [] => {}
        [(0x80, 0xFF)] => ranges.push(ClassUnicodeRange::new('\u{80}', char::MAX)),
        // Part of the non-ASCII bytes only, rejected by the UTF-8 check
        _ => return None,
    }
    Some(ClassUnicode::new(ranges))
}

type CachePoolFn =
    Box<dyn Fn() -> Cache + Send + Sync + UnwindSafe + RefUnwindSafe>;

/// A [`MetaEngine`] program.
///
/// Searches never share a [`Cache`]: each one plucks its own from a thread safe
/// pool, so one program can be searched from many threads at once.
pub struct MetaProgram {
    re: Regex,
    /// Kept outside of `re` so that the search start never lives on the program.
    pool: Pool<Cache, CachePoolFn>,
    mode: Mode,
}

impl MetaProgram {
    /// Number of capture groups, including the implicit group 0.
    pub fn group_len(&self) -> usize {
        self.re.group_info().group_len(regex_automata::PatternID::ZERO)
    }
}

impl std::fmt::Debug for MetaProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaProgram")
            .field("re", &self.re)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Program for MetaProgram {
    fn search<'h>(&self, haystack: &'h str, start: usize) -> Option<Found<'h>> {
        if start > haystack.len() {
            return None;
        }
        let input = Input::new(haystack).range(start..);
        let mut caps = self.re.create_captures();
        self.re
            .search_captures_with(&mut self.pool.get(), &input, &mut caps);
        let m = caps.get_match()?;

        let spans = (0..caps.group_len())
            .map(|i| caps.get_group(i).map(|span| span.range()));
        let outcome = match self.mode {
            Mode::Full => Outcome::Indices(spans.collect()),
            Mode::Reduced => Outcome::Substrings {
                groups: spans
                    .skip(1)
                    .map(|span| span.and_then(|span| haystack.get(span)))
                    .collect(),
                start: m.start(),
                end: m.end(),
            },
        };
        Some(Found { outcome, cursor: m.end() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str, flags: Flags) -> MetaProgram {
        MetaEngine::default()
            .compile(source, flags, Mode::Full)
            .unwrap()
    }

    #[test]
    fn indices() {
        let p = compile(r"(\d+)-(\d+)?", Flags::empty());
        assert_eq!(p.group_len(), 3);
        assert_eq!(
            p.search("ab12-cd", 0),
            Some(Found {
                outcome: Outcome::Indices(vec![Some(2..5), Some(2..4), None]),
                cursor: 5,
            })
        );
        assert_eq!(p.search("ab12-cd", 3).unwrap().outcome.start(), Some(3));
        assert_eq!(p.search("ab12-cd", 5), None);
        assert_eq!(p.search("ab12-cd", 100), None);
    }

    #[test]
    fn start_keeps_look_behind() {
        let p = compile(r"^a", Flags::empty());
        assert_eq!(p.search("aa", 1), None);

        let p = compile(r"\bb", Flags::empty());
        assert_eq!(p.search("ab b", 1).unwrap().cursor, 4);
    }

    #[test]
    fn flags() {
        let p = compile("abc", Flags::IGNORE_CASE);
        assert_eq!(p.search("xABC", 0).unwrap().cursor, 4);

        let p = compile("^b$", Flags::empty());
        assert_eq!(p.search("a\nb\nc", 0), None);
        let p = compile("^b$", Flags::MULTI_LINE);
        assert_eq!(p.search("a\nb\nc", 0).unwrap().cursor, 3);

        let crlf = MetaEngine::builder().crlf(true).build();
        let p = crlf.compile("^b$", Flags::MULTI_LINE, Mode::Full).unwrap();
        assert_eq!(p.search("a\r\nb\r\nc", 0).unwrap().cursor, 4);
    }

    #[test]
    fn reduced() {
        let engine = MetaEngine::builder().indices(false).build();
        assert_eq!(
            engine.compile("a", Flags::empty(), Mode::Full).unwrap_err(),
            CompileError::Unsupported
        );

        let p = engine
            .compile("(a)|(b)", Flags::empty(), Mode::Reduced)
            .unwrap();
        assert_eq!(
            p.search("xxb", 0),
            Some(Found {
                outcome: Outcome::Substrings {
                    groups: vec![None, Some("b")],
                    start: 2,
                    end: 3,
                },
                cursor: 3,
            })
        );
    }

    #[test]
    fn syntax_error() {
        let err = MetaEngine::default()
            .compile("(unclosed", Flags::empty(), Mode::Full)
            .unwrap_err();
        let CompileError::Syntax(message) = err else {
            panic!("expected a syntax error, got {err:?}");
        };
        assert!(message.contains("unclosed group"), "{message}");
    }

    #[test]
    fn byte_classes() {
        let p = compile("(?-u:.)", Flags::empty());
        assert_eq!(p.search("é", 0).unwrap().cursor, 2);
        let p = compile("(?-u:[^x])+", Flags::empty());
        assert_eq!(
            p.search("xéy", 0).unwrap().outcome,
            Outcome::Indices(vec![Some(1..4)])
        );

        let err = MetaEngine::default()
            .compile(r"(?-u:\xC3)", Flags::empty(), Mode::Full)
            .unwrap_err();
        assert_eq!(err, CompileError::Syntax("pattern can match invalid UTF-8".into()));
    }

    #[cfg(not(feature = "unicode"))]
    #[test]
    fn ascii_only() {
        let p = compile("a.c", Flags::empty());
        assert_eq!(
            p.search("xaéc", 0).unwrap().outcome,
            Outcome::Indices(vec![Some(1..5)])
        );
        let p = compile("[^x]+", Flags::empty());
        assert_eq!(
            p.search("xéy", 0).unwrap().outcome,
            Outcome::Indices(vec![Some(1..4)])
        );
        let p = compile("(?i)[^a]", Flags::empty());
        assert_eq!(p.search("Aaé", 0).unwrap().cursor, 4);

        // Perl classes and case folding stay ASCII
        let p = compile(r"\w+", Flags::empty());
        assert_eq!(p.search("éab", 0).unwrap().outcome, Outcome::Indices(vec![Some(2..4)]));
        let p = compile("é", Flags::IGNORE_CASE);
        assert_eq!(p.search("É", 0), None);
        assert!(MetaEngine::default()
            .compile(r"\pL", Flags::empty(), Mode::Full)
            .is_err());
        assert!(MetaEngine::default()
            .compile("[é]", Flags::empty(), Mode::Full)
            .is_err());
        let p = compile("(?u:[é])", Flags::empty());
        assert_eq!(p.search("eé", 0).unwrap().cursor, 3);
    }

    #[test]
    fn size_limit() {
        let engine = MetaEngine::builder().nfa_size_limit(10).build();
        let err = engine
            .compile(r"\w{100}", Flags::empty(), Mode::Full)
            .unwrap_err();
        assert!(matches!(err, CompileError::Syntax(_)));
    }
}
