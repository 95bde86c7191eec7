//! Scan Cursor Iterator
//!
//! Turns an engine iterator into the resumable key sequence returned by
//! `Scan`. Each call is one bounded read transaction; paging works by
//! passing the last returned key back as the next cursor (the seek is
//! inclusive, so that key comes back first).

use crate::engine::{IteratorOptions, StoreIterator};
use crate::error::{Result, TallyError};

/// Default read-ahead hint for scans
pub const DEFAULT_PREFETCH_SIZE: usize = 100;

/// Options for a `Scan` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Only keys starting with this prefix (empty = all keys)
    pub prefix: Vec<u8>,
    /// Walk keys in descending order
    pub reverse: bool,
    /// Return values interleaved with keys
    pub include_values: bool,
    /// Advisory read-ahead hint
    pub prefetch_size: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            prefix: Vec::new(),
            reverse: false,
            include_values: false,
            prefetch_size: DEFAULT_PREFETCH_SIZE,
        }
    }
}

impl ScanOptions {
    /// Only keys starting with `prefix`
    pub fn with_prefix(mut self, prefix: impl Into<Vec<u8>>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Descending key order
    pub fn with_reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// Include values in the result
    pub fn with_values(mut self) -> Self {
        self.include_values = true;
        self
    }

    /// Parse the option tokens that follow the cursor:
    /// `[PREFIX p] [WITH_REVERSE] [WITH_VALUE]`, case-insensitive.
    ///
    /// Unknown tokens are skipped.
    pub fn from_args(args: &[Vec<u8>]) -> Result<Self> {
        let mut options = Self::default();
        let mut tokens = args.iter();

        while let Some(token) = tokens.next() {
            if token.eq_ignore_ascii_case(b"PREFIX") {
                let prefix = tokens.next().ok_or_else(|| TallyError::wrong_arity("Scan"))?;
                options.prefix = prefix.clone();
            } else if token.eq_ignore_ascii_case(b"WITH_REVERSE") {
                options.reverse = true;
            } else if token.eq_ignore_ascii_case(b"WITH_VALUE") {
                options.include_values = true;
            }
        }

        Ok(options)
    }

    /// Engine iterator options for this scan
    pub fn iterator_options(&self) -> IteratorOptions {
        IteratorOptions {
            prefix: self.prefix.clone(),
            reverse: self.reverse,
            prefetch_values: self.include_values,
            prefetch_size: self.prefetch_size,
        }
    }
}

/// One scanned key, with its value when requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanItem {
    pub key: Vec<u8>,
    pub value: Option<Vec<u8>>,
}

/// Iterator yielding scan results until the engine iterator runs out or
/// the next key leaves the prefix
pub struct ScanIter<'a> {
    inner: StoreIterator<'a>,
    prefix: Vec<u8>,
    include_values: bool,
}

impl<'a> ScanIter<'a> {
    /// Position `inner` at `cursor` (or the start of the range when empty)
    pub fn new(mut inner: StoreIterator<'a>, cursor: &[u8], options: &ScanOptions) -> Result<Self> {
        if cursor.is_empty() {
            inner.rewind()?;
        } else {
            inner.seek(cursor)?;
        }

        Ok(Self {
            inner,
            prefix: options.prefix.clone(),
            include_values: options.include_values,
        })
    }
}

impl Iterator for ScanIter<'_> {
    type Item = ScanItem;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.inner.valid_for_prefix(&self.prefix) {
            return None;
        }

        let item = self.inner.item().map(|item| ScanItem {
            key: item.key.clone(),
            value: self.include_values.then(|| item.value.clone()),
        });
        self.inner.next();
        item
    }
}

/// Reply layout: keys only, or key / value pairs interleaved
pub fn flatten(items: Vec<ScanItem>) -> Vec<Vec<u8>> {
    let mut out = Vec::with_capacity(items.len() * 2);
    for item in items {
        out.push(item.key);
        if let Some(value) = item.value {
            out.push(value);
        }
    }
    out
}
