//! String interner for identifier storage.
//!
//! Equal text always yields the same [`Name`], so identifier equality
//! anywhere in the front end is a handle comparison. The table has a fixed
//! bucket count chosen at construction and never rehashes; each bucket is a
//! singly-linked chain of entries, newest first.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default number of hash buckets.
pub const DEFAULT_BUCKETS: usize = 1024;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// 32-bit FNV-1a hash.
pub fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &b| {
        (hash ^ u32::from(b)).wrapping_mul(FNV_PRIME)
    })
}

/// Handle to an interned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Name(u32);

impl Name {
    /// The pre-interned empty string.
    pub const EMPTY: Name = Name(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

#[derive(Debug, Clone)]
struct InternEntry {
    start: usize,
    len: usize,
    next: Option<Name>,
}

/// Fixed-capacity interner with chained buckets.
#[derive(Debug, Clone)]
pub struct Interner {
    buckets: Box<[Option<Name>]>,
    entries: Vec<InternEntry>,
    /// Append-only backing store; entries index into it.
    storage: String,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS)
    }

    pub fn with_buckets(buckets: usize) -> Self {
        let mut interner = Self {
            buckets: vec![None; buckets.max(1)].into_boxed_slice(),
            entries: Vec::new(),
            storage: String::new(),
        };
        let empty = interner.intern("");
        debug_assert_eq!(empty, Name::EMPTY);
        interner
    }

    fn bucket_of(&self, text: &str) -> usize {
        fnv1a(text.as_bytes()) as usize % self.buckets.len()
    }

    fn find(&self, bucket: usize, text: &str) -> Option<Name> {
        let mut cursor = self.buckets[bucket];
        while let Some(name) = cursor {
            let entry = &self.entries[name.index()];
            if entry.len == text.len() && &self.storage[entry.start..entry.start + entry.len] == text {
                return Some(name);
            }
            cursor = entry.next;
        }
        None
    }

    /// Intern `text`, returning its canonical handle.
    pub fn intern(&mut self, text: &str) -> Name {
        let bucket = self.bucket_of(text);
        if let Some(name) = self.find(bucket, text) {
            return name;
        }

        let name = Name(self.entries.len() as u32);
        let start = self.storage.len();
        self.storage.push_str(text);
        self.entries.push(InternEntry {
            start,
            len: text.len(),
            next: self.buckets[bucket],
        });
        self.buckets[bucket] = Some(name);
        name
    }

    /// Look up `text` without interning it.
    pub fn get(&self, text: &str) -> Option<Name> {
        self.find(self.bucket_of(text), text)
    }

    /// Text of an interned name.
    pub fn resolve(&self, name: Name) -> &str {
        let entry = &self.entries[name.index()];
        &self.storage[entry.start..entry.start + entry.len]
    }

    /// Number of distinct strings, including the empty string.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
