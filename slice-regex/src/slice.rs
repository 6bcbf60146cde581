use std::{fmt, ops::Range};

/// A zero-copy view into a string, or the [`Slice::Invalid`] sentinel.
///
/// Capture groups that did not participate in a match are reported as
/// [`Slice::Invalid`], which is different from a participating group that
/// matched the empty string (a valid slice with `len() == 0`).
///
/// `Slice` intentionally does not implement `PartialEq`: two views are only
/// compared when asked to, either by span with [`Slice::same_span`] or by
/// content with [`Slice::as_str`].
///
/// ## Example
/// ```
/// use slice_regex::Slice;
///
/// let s = Slice::new("hello world", 6, 5);
/// assert_eq!(s.as_str(), Some("world"));
/// assert_eq!(s.range(), Some(6..11));
///
/// assert!(!Slice::Invalid.is_valid());
/// assert_eq!(Slice::Invalid.as_str(), None);
/// ```
#[derive(Clone, Copy)]
pub enum Slice<'h> {
    Span {
        owner: &'h str,
        offset: usize,
        len: usize,
    },
    Invalid,
}

impl<'h> Slice<'h> {
    /// Creates a view of `len` bytes of `owner` starting at `offset`.
    ///
    /// This is constant time and does not validate its arguments:
    /// `offset + len <= owner.len()` (on char boundaries) is up to the caller.
    #[inline]
    pub fn new(owner: &'h str, offset: usize, len: usize) -> Self {
        debug_assert!(offset + len <= owner.len());
        Slice::Span { owner, offset, len }
    }

    /// A view of the whole `owner`.
    #[inline]
    pub fn whole(owner: &'h str) -> Self {
        Slice::Span { owner, offset: 0, len: owner.len() }
    }

    /// A view of `owner[range]`.
    #[inline]
    pub fn from_range(owner: &'h str, range: Range<usize>) -> Self {
        Self::new(owner, range.start, range.end - range.start)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self, Slice::Span { .. })
    }

    pub fn owner(&self) -> Option<&'h str> {
        match *self {
            Slice::Span { owner, .. } => Some(owner),
            Slice::Invalid => None,
        }
    }

    /// Byte offset into the owner. `0` for [`Slice::Invalid`].
    pub fn offset(&self) -> usize {
        match *self {
            Slice::Span { offset, .. } => offset,
            Slice::Invalid => 0,
        }
    }

    /// Length in bytes. `0` for [`Slice::Invalid`].
    pub fn len(&self) -> usize {
        match *self {
            Slice::Span { len, .. } => len,
            Slice::Invalid => 0,
        }
    }

    /// Whether the slice covers no text. Also `true` for [`Slice::Invalid`].
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `offset + len`, i.e. the end of the view in the owner.
    pub fn end(&self) -> usize {
        self.offset() + self.len()
    }

    pub fn range(&self) -> Option<Range<usize>> {
        match *self {
            Slice::Span { offset, len, .. } => Some(offset..offset + len),
            Slice::Invalid => None,
        }
    }

    /// The text this slice views, borrowed from the owner.
    pub fn as_str(&self) -> Option<&'h str> {
        match *self {
            Slice::Span { owner, offset, len } => owner.get(offset..offset + len),
            Slice::Invalid => None,
        }
    }

    /// Whether both slices view the same span of the same owner.
    ///
    /// Owners are compared by address, not by content. Two invalid slices are
    /// the same span.
    pub fn same_span(&self, other: &Slice<'_>) -> bool {
        match (self, other) {
            (
                Slice::Span { owner: a, offset: ao, len: al },
                Slice::Span { owner: b, offset: bo, len: bl },
            ) => std::ptr::eq(a.as_ptr(), b.as_ptr()) && a.len() == b.len() && ao == bo && al == bl,
            (Slice::Invalid, Slice::Invalid) => true,
            _ => false,
        }
    }
}

impl Default for Slice<'_> {
    fn default() -> Self {
        Slice::Invalid
    }
}

impl fmt::Debug for Slice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slice::Span { offset, len, .. } => f
                .debug_struct("Slice")
                .field("offset", offset)
                .field("len", len)
                .field("text", &self.as_str().unwrap_or_default())
                .finish(),
            Slice::Invalid => f.write_str("Invalid"),
        }
    }
}

/// Renders the viewed text. [`Slice::Invalid`] renders as nothing.
impl fmt::Display for Slice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or_default())
    }
}
