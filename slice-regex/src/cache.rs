use std::{
    collections::HashMap,
    sync::{Arc, Mutex, OnceLock, PoisonError, RwLock},
};

use bon::bon;
use tracing::{debug, trace};

use crate::{
    engine::{CompileError, Engine, Flags, MetaEngine, MetaProgram, Mode, Program},
    InvalidPatternError,
};

/// A pattern compiled by a [`PatternCache`].
///
/// Identified by its source and [`Flags`]. Immutable, and shared as
/// `Arc<CompiledPattern>` between every caller that asked for the same key.
#[derive(Debug)]
pub struct CompiledPattern<P = MetaProgram> {
    source: Box<str>,
    flags: Flags,
    mode: Mode,
    program: P,
}

impl<P: Program> CompiledPattern<P> {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// The mode the pattern ended up compiled in.
    ///
    /// In [`Mode::Reduced`], capture groups reported by [`execute()`](Self::execute)
    /// are views of the captured text only, not of the searched string.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn program(&self) -> &P {
        &self.program
    }
}

/// One key of a [`PatternCache`]. `compiling` is held while the key is compiled,
/// `pattern` is set once that succeeds.
struct Slot<P> {
    pattern: OnceLock<Arc<CompiledPattern<P>>>,
    compiling: Mutex<()>,
}

impl<P> Default for Slot<P> {
    fn default() -> Self {
        Self {
            pattern: OnceLock::new(),
            compiling: Mutex::new(()),
        }
    }
}

type PatternMap<P> = HashMap<Flags, HashMap<Box<str>, Arc<Slot<P>>>>;

/// Compiles patterns and memoizes them by `(source, flags)`.
///
/// Compiled patterns are never evicted: they live as long as the cache, and
/// the [global cache](PatternCache::global) lives as long as the process.
///
/// ## Example
/// ```
/// use std::sync::Arc;
/// use slice_regex::{engine::Flags, PatternCache};
///
/// let cache = PatternCache::new();
/// let a = cache.get_or_compile(r"\d+", Flags::IGNORE_CASE).unwrap();
/// let b = cache.get_or_compile(r"\d+", Flags::IGNORE_CASE).unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// let c = cache.get_or_compile(r"\d+", Flags::empty()).unwrap();
/// assert!(!Arc::ptr_eq(&a, &c));
/// ```
///
/// ## Concurrency
/// Every key has its own slot. Lookups only take a read lock on the map. A miss
/// compiles while holding the lock of its slot, so concurrent callers asking
/// for the same new key wait for a single compilation and all observe the same
/// instance, while other keys are looked up and compiled in the meantime.
pub struct PatternCache<E: Engine = MetaEngine> {
    engine: E,
    capacity: usize,
    patterns: RwLock<PatternMap<E::Program>>,
}

#[bon]
impl<E: Engine> PatternCache<E> {
    /// Return a builder for a cache over a custom [`Engine`].
    #[builder(builder_type = PatternCacheBuilder, finish_fn = build)]
    pub fn builder(
        /// The engine patterns are compiled with.
        engine: E,
        /// Initial number of patterns to allocate room for, per [`Flags`] value.
        #[builder(default)]
        capacity: usize,
    ) -> Self {
        Self {
            engine,
            capacity,
            patterns: RwLock::new(PatternMap::new()),
        }
    }
}

impl PatternCache<MetaEngine> {
    /// An empty cache over the default [`MetaEngine`].
    pub fn new() -> Self {
        Self::builder().engine(MetaEngine::default()).build()
    }

    /// The process-wide cache over the default [`MetaEngine`].
    ///
    /// Created on first use and never torn down. Tests and libraries that need
    /// isolation should construct their own cache with [`PatternCache::new`].
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<PatternCache> = OnceLock::new();
        GLOBAL.get_or_init(PatternCache::new)
    }
}

impl Default for PatternCache<MetaEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Engine> PatternCache<E> {
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Returns the pattern compiled for `(source, flags)`, compiling it on first use.
    ///
    /// Compilation tries [`Mode::Full`] first. If the engine reports the mode as
    /// unsupported, it is retried once in [`Mode::Reduced`]. Any other failure
    /// is returned as is and not cached, so a later call will try again.
    pub fn get_or_compile(
        &self,
        source: &str,
        flags: Flags,
    ) -> Result<Arc<CompiledPattern<E::Program>>, InvalidPatternError> {
        if let Some(pattern) = self.get(source, flags) {
            trace!(source, ?flags, "pattern cache hit");
            return Ok(pattern);
        }

        let slot = self.slot(source, flags);
        // Slots only ever hold fully compiled patterns, so poisoned locks are still consistent
        let _compiling = slot.compiling.lock().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have compiled it while we were waiting for the lock
        if let Some(pattern) = slot.pattern.get() {
            return Ok(pattern.clone());
        }
        let pattern = Arc::new(self.compile(source, flags)?);
        Ok(slot.pattern.get_or_init(|| pattern).clone())
    }

    fn slot(&self, source: &str, flags: Flags) -> Arc<Slot<E::Program>> {
        {
            let patterns = self.patterns.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = patterns.get(&flags).and_then(|by_source| by_source.get(source)) {
                return slot.clone();
            }
        }
        let mut patterns = self.patterns.write().unwrap_or_else(PoisonError::into_inner);
        patterns
            .entry(flags)
            .or_insert_with(|| HashMap::with_capacity(self.capacity))
            .entry(source.into())
            .or_default()
            .clone()
    }

    /// Returns the pattern for `(source, flags)` if it has already been compiled.
    pub fn get(&self, source: &str, flags: Flags) -> Option<Arc<CompiledPattern<E::Program>>> {
        let patterns = self.patterns.read().unwrap_or_else(PoisonError::into_inner);
        patterns.get(&flags)?.get(source)?.pattern.get().cloned()
    }

    pub fn contains(&self, source: &str, flags: Flags) -> bool {
        self.get(source, flags).is_some()
    }

    /// Number of compiled patterns.
    pub fn len(&self) -> usize {
        let patterns = self.patterns.read().unwrap_or_else(PoisonError::into_inner);
        patterns
            .values()
            .flat_map(HashMap::values)
            .filter(|slot| slot.pattern.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn compile(
        &self,
        source: &str,
        flags: Flags,
    ) -> Result<CompiledPattern<E::Program>, InvalidPatternError> {
        let reject = |err: CompileError| {
            debug!(source, ?flags, %err, "rejected pattern");
            InvalidPatternError::new(source, err.to_string())
        };

        let (program, mode) = match self.engine.compile(source, flags, Mode::Full) {
            Ok(program) => (program, Mode::Full),
            Err(CompileError::Unsupported) => {
                debug!(source, ?flags, "group offsets unsupported, falling back to reduced mode");
                let program = self
                    .engine
                    .compile(source, flags, Mode::Reduced)
                    .map_err(reject)?;
                (program, Mode::Reduced)
            }
            Err(err) => return Err(reject(err)),
        };
        debug!(source, ?flags, ?mode, "compiled pattern");

        Ok(CompiledPattern {
            source: source.into(),
            flags,
            mode,
            program,
        })
    }
}

impl<E: Engine + std::fmt::Debug> std::fmt::Debug for PatternCache<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternCache")
            .field("engine", &self.engine)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Barrier,
        },
        thread,
    };

    use crate::engine::{Found, Outcome};

    use super::*;

    /// Counts compilations and can be told to lack [`Mode::Full`].
    #[derive(Default)]
    struct CountingEngine {
        inner: MetaEngine,
        full_unsupported: bool,
        reduced_unsupported: bool,
        compiled: AtomicUsize,
    }

    impl Engine for CountingEngine {
        type Program = MetaProgram;

        fn compile(
            &self,
            source: &str,
            flags: Flags,
            mode: Mode,
        ) -> Result<MetaProgram, CompileError> {
            self.compiled.fetch_add(1, Ordering::SeqCst);
            match mode {
                Mode::Full if self.full_unsupported => Err(CompileError::Unsupported),
                Mode::Reduced if self.reduced_unsupported => Err(CompileError::Unsupported),
                _ => self.inner.compile(source, flags, mode),
            }
        }
    }

    #[test]
    fn idempotent() {
        let cache = PatternCache::new();
        assert!(cache.is_empty());

        let a = cache.get_or_compile("a+", Flags::empty()).unwrap();
        let b = cache.get_or_compile("a+", Flags::empty()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.source(), "a+");
        assert_eq!(a.flags(), Flags::empty());
        assert_eq!(a.mode(), Mode::Full);

        for flags in [Flags::IGNORE_CASE, Flags::MULTI_LINE, Flags::all()] {
            let c = cache.get_or_compile("a+", flags).unwrap();
            assert!(!Arc::ptr_eq(&a, &c));
            assert!(Arc::ptr_eq(&c, &cache.get_or_compile("a+", flags).unwrap()));
        }
        assert_eq!(cache.len(), 4);
        assert!(cache.contains("a+", Flags::all()));
        assert!(!cache.contains("a*", Flags::empty()));
    }

    #[test]
    fn global() {
        let a = PatternCache::global()
            .get_or_compile("global-[0-9]", Flags::empty())
            .unwrap();
        let b = PatternCache::global()
            .get_or_compile("global-[0-9]", Flags::empty())
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(std::ptr::eq(PatternCache::global(), PatternCache::global()));
    }

    #[test]
    fn invalid_pattern() {
        let engine = CountingEngine::default();
        let cache = PatternCache::builder().engine(engine).build();

        let err = cache.get_or_compile("(a", Flags::empty()).unwrap_err();
        assert_eq!(err.pattern, "(a");
        assert!(err.message.contains("unclosed group"), "{}", err.message);
        // Not retried in reduced mode
        assert_eq!(cache.engine().compiled.load(Ordering::SeqCst), 1);
        // Not cached
        assert!(cache.is_empty());
        cache.get_or_compile("(a", Flags::empty()).unwrap_err();
        assert_eq!(cache.engine().compiled.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn fallback() {
        let engine = CountingEngine {
            full_unsupported: true,
            ..Default::default()
        };
        let cache = PatternCache::builder().engine(engine).capacity(8).build();

        let pattern = cache.get_or_compile("(a)|(b)", Flags::empty()).unwrap();
        assert_eq!(pattern.mode(), Mode::Reduced);
        assert_eq!(cache.engine().compiled.load(Ordering::SeqCst), 2);
        assert!(matches!(
            pattern.program().search("b", 0),
            Some(Found { outcome: Outcome::Substrings { .. }, .. })
        ));

        // Cached in its reduced form
        let again = cache.get_or_compile("(a)|(b)", Flags::empty()).unwrap();
        assert!(Arc::ptr_eq(&pattern, &again));
        assert_eq!(cache.engine().compiled.load(Ordering::SeqCst), 2);

        // Syntax errors still surface after the fallback
        let err = cache.get_or_compile("(a", Flags::empty()).unwrap_err();
        assert!(err.message.contains("unclosed group"), "{}", err.message);
    }

    #[test]
    fn fallback_unsupported() {
        let engine = CountingEngine {
            full_unsupported: true,
            reduced_unsupported: true,
            ..Default::default()
        };
        let cache = PatternCache::builder().engine(engine).build();
        let err = cache.get_or_compile("a", Flags::empty()).unwrap_err();
        assert_eq!(err, InvalidPatternError::new("a", CompileError::Unsupported.to_string()));
        assert_eq!(cache.engine().compiled.load(Ordering::SeqCst), 2);
    }

    /// Blocks compiling `slow` until told to go on.
    struct Gated {
        inner: MetaEngine,
        started: Barrier,
        release: Barrier,
    }

    impl Engine for Gated {
        type Program = MetaProgram;

        fn compile(
            &self,
            source: &str,
            flags: Flags,
            mode: Mode,
        ) -> Result<MetaProgram, CompileError> {
            if source == "slow" {
                self.started.wait();
                self.release.wait();
            }
            self.inner.compile(source, flags, mode)
        }
    }

    #[test]
    fn compile_does_not_block_other_keys() {
        let cache = PatternCache::builder()
            .engine(Gated {
                inner: MetaEngine::default(),
                started: Barrier::new(2),
                release: Barrier::new(2),
            })
            .build();
        let hit = cache.get_or_compile("a", Flags::empty()).unwrap();

        thread::scope(|s| {
            let slow = s.spawn(|| cache.get_or_compile("slow", Flags::empty()).unwrap());
            cache.engine().started.wait();

            // `slow` is being compiled
            assert!(!cache.contains("slow", Flags::empty()));
            assert_eq!(cache.len(), 1);
            let again = cache.get_or_compile("a", Flags::empty()).unwrap();
            assert!(Arc::ptr_eq(&hit, &again));
            cache.get_or_compile("fast", Flags::empty()).unwrap();
            cache.get_or_compile("fast", Flags::IGNORE_CASE).unwrap();

            cache.engine().release.wait();
            let slow = slow.join().unwrap();
            assert_eq!(slow.execute("so slow", 0).whole().range(), Some(3..7));
        });
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn concurrent_materialization() {
        const THREADS: usize = 8;

        let cache = PatternCache::builder()
            .engine(CountingEngine::default())
            .build();
        let barrier = Barrier::new(THREADS);
        let patterns: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        cache.get_or_compile(r"(\w+)@(\w+)", Flags::empty()).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(cache.engine().compiled.load(Ordering::SeqCst), 1);
        assert!(patterns.iter().all(|p| Arc::ptr_eq(p, &patterns[0])));
    }
}
