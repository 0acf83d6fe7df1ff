//! String interner implementation backing [`Symbol`](super::Symbol).
//!
//! The fast path (string already interned) is a single lock-free DashMap
//! lookup. The slow path takes the reverse-table lock, re-checks under it so
//! racing threads agree on one index, leaks the string to `'static`, and
//! publishes it in both directions.

use std::sync::{LazyLock, RwLock};

use dashmap::DashMap;

/// Global string table, initialized on first use.
pub(super) static STRING_TABLE: LazyLock<StringTable> = LazyLock::new(StringTable::new);

pub(super) struct StringTable {
    /// string -> index, for interning.
    map: DashMap<&'static str, u32, ahash::RandomState>,
    /// index -> string, for `Symbol::as_str`.
    strings: RwLock<Vec<&'static str>>,
}

impl StringTable {
    fn new() -> Self {
        Self {
            map: DashMap::with_capacity_and_hasher(256, ahash::RandomState::new()),
            strings: RwLock::new(Vec::with_capacity(256)),
        }
    }

    pub(super) fn intern(&self, string: &str) -> u32 {
        if let Some(index) = self.map.get(string) {
            return *index;
        }

        let mut strings = self.strings.write().expect("interner lock poisoned");
        // Re-check under the lock: another thread may have won the race.
        if let Some(index) = self.map.get(string) {
            return *index;
        }

        let leaked: &'static str = Box::leak(string.to_owned().into_boxed_str());
        let index = u32::try_from(strings.len()).expect("interner overflow");
        strings.push(leaked);
        self.map.insert(leaked, index);
        index
    }

    pub(super) fn resolve(&self, index: u32) -> &'static str {
        self.strings.read().expect("interner lock poisoned")[index as usize]
    }
}
