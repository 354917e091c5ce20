//! String interner built on `FibSet`.
//!
//! Parsers intern recurring names (property keys, tags, ids) so equal strings
//! share one allocation. Interned strings compare by pointer via
//! [`Interned::same_as`]; the `Eq` impl compares contents.

use crate::entry::{Entry, EntryRef};
use crate::fib_set::FibSet;
use crate::strength::Strength;
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

/// A shared, deduplicated string.
#[derive(Clone)]
pub struct Interned(EntryRef<String, ()>);

impl Interned {
    pub fn as_str(&self) -> &str {
        self.0.key()
    }

    /// True if both handles point at the same interned allocation.
    pub fn same_as(&self, other: &Interned) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for Interned {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for Interned {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for Interned {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq for Interned {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other) || self.as_str() == other.as_str()
    }
}

impl Eq for Interned {}

impl PartialEq<str> for Interned {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Interned {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl Hash for Interned {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Debug for Interned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for Interned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct StringCache {
    set: FibSet<String, ()>,
    // Handed out for "", never stored in the set.
    empty: Interned,
}

impl StringCache {
    pub fn new() -> Self {
        Self {
            set: FibSet::new(|_: &String| ()),
            empty: Interned(Arc::new(Entry::new(String::new(), 0, ()))),
        }
    }

    /// Process-wide cache, created on first use.
    pub fn global() -> &'static StringCache {
        static GLOBAL: OnceLock<StringCache> = OnceLock::new();
        GLOBAL.get_or_init(StringCache::new)
    }

    /// Interns `s`, keeping it until removed.
    pub fn intern(&self, s: &str) -> Interned {
        self.intern_with(s, Strength::Strong)
    }

    /// Interns `s`, keeping it until the next memory-pressure release.
    pub fn intern_soft(&self, s: &str) -> Interned {
        self.intern_with(s, Strength::Soft)
    }

    /// Interns `s` only for as long as some `Interned` for it is alive.
    pub fn intern_weak(&self, s: &str) -> Interned {
        self.intern_with(s, Strength::Weak)
    }

    pub fn intern_with(&self, s: &str, strength: Strength) -> Interned {
        if s.is_empty() {
            return self.empty.clone();
        }
        Interned(self.set.put_with(s, strength))
    }

    /// Looks `s` up without interning it.
    pub fn get(&self, s: &str) -> Option<Interned> {
        if s.is_empty() {
            return Some(self.empty.clone());
        }
        self.set.get(s).map(Interned)
    }

    /// Drops the cache's binding for `s`. Outstanding `Interned` handles stay
    /// valid; a later `intern` creates a fresh allocation.
    pub fn remove(&self, s: &str) -> bool {
        !s.is_empty() && self.set.remove(s).is_some()
    }

    /// Best-effort number of interned strings (see [`FibSet::len`]).
    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn relieve_memory_pressure(&self) -> usize {
        self.set.relieve_memory_pressure()
    }
}

impl Default for StringCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StringCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringCache").field("len", &self.len()).finish()
    }
}
