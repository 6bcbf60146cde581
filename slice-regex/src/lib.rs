/*!
A regex adapter that reports matches as zero-copy string slices.

## Features
- Matches and capture groups are [`Slice`]s: views into the searched string, never copies.
- Capture groups that did not participate in a match are [`Slice::Invalid`], distinct from groups that matched the empty string.
- Compiled patterns are cached by `(source, flags)` in a [`PatternCache`], process-wide or per instance.
- [`scan_all()`](CompiledPattern::scan_all) splits the input into alternating gaps and matches that cover it exactly once, and always terminates, even for patterns that match the empty string.
- Pluggable [engines](engine). The default one is [`regex-automata`](https://docs.rs/regex-automata/)'s meta regex, with the same syntax as the [`regex`](https://docs.rs/regex/) crate.
  Engines that cannot report group offsets are supported in a [reduced mode](engine::Mode::Reduced).
*/
//! ## Usage
//! ```
//! use slice_regex::{engine::Flags, PatternCache, Segment};
//!
//! let pattern = PatternCache::global()
//!     .get_or_compile(r"(\d+)(?:\.(\d+))?", Flags::empty())
//!     .unwrap();
//!
//! let m = pattern.execute("v12 and v3.4", 0);
//! assert_eq!(m.whole().as_str(), Some("12"));
//! assert!(!m.get(2).is_valid());
//!
//! let scan = pattern.scan_all("v12 and v3.4", 0, None);
//! let spans: Vec<_> = scan.iter().map(|s| s.span().as_str().unwrap()).collect();
//! assert_eq!(spans, ["v", "12", " and v", "3.4", ""]);
//! ```
//!
//! Slices borrow the searched string, so they cannot outlive it:
//! ```compile_fail
//! use slice_regex::PatternCache;
//!
//! let pattern = PatternCache::new().get_or_compile("a", Default::default()).unwrap();
//! let m = {
//!     let input = String::from("a");
//!     pattern.execute(&input, 0)
//! };
//! m.whole();
//! ```
//!
//! ## Logging
//! Compilation, reduced mode fallbacks and rejected patterns are logged with
//! [`tracing`](https://docs.rs/tracing/) at `debug` level, cache hits at `trace` level.
//!
//! ## Crate features
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![cfg_attr(feature = "doc", doc = document_features::document_features!())]

use std::sync::Arc;

mod cache;
pub mod engine;
mod error;
mod exec;
mod scan;
mod slice;

pub use cache::{CompiledPattern, PatternCache, PatternCacheBuilder};
pub use error::InvalidPatternError;
pub use exec::MatchResult;
pub use scan::{ScanResult, Scanner, Segment};
pub use slice::Slice;

/// Compiles a pattern with the [global cache](PatternCache::global).
///
/// Equivalent to `PatternCache::global().get_or_compile(source, Flags::new(ignore_case, multi_line))`.
pub fn get_or_compile(
    source: &str,
    ignore_case: bool,
    multi_line: bool,
) -> Result<Arc<CompiledPattern>, InvalidPatternError> {
    PatternCache::global().get_or_compile(source, engine::Flags::new(ignore_case, multi_line))
}
