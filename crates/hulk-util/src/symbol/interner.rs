//! String interner backed by an `RwLock<HashMap>`.
//!
//! `hulk-sem`'s pipeline is single-threaded (spec.md §5), so this trades
//! the teacher's lock-free `DashMap` design for a plain `RwLock` over an
//! `FxHashMap` — same O(1) intern/lookup contract, one fewer dependency.

use rustc_hash::FxHashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{LazyLock, RwLock};

use super::{InternerStats, Symbol};

pub static STRING_TABLE: LazyLock<StringTable> = LazyLock::new(|| {
    let table = StringTable::new();
    table.initialize_known_symbols();
    table
});

const RESERVED_SYMBOLS_END: u32 = 512;

struct Entry {
    string: &'static str,
    index: u32,
}

pub struct StringTable {
    map: RwLock<FxHashMap<u64, Vec<Entry>>>,
    next_index: AtomicU32,
    hits: AtomicU32,
    misses: AtomicU32,
}

impl StringTable {
    fn new() -> Self {
        Self {
            map: RwLock::new(FxHashMap::default()),
            next_index: AtomicU32::new(RESERVED_SYMBOLS_END),
            hits: AtomicU32::new(0),
            misses: AtomicU32::new(0),
        }
    }

    fn initialize_known_symbols(&self) {
        for (idx, s) in super::KNOWN_SYMBOLS.iter().enumerate() {
            let idx = idx as u32;
            if idx < RESERVED_SYMBOLS_END {
                self.insert_raw(s, idx);
            }
        }
    }

    fn insert_raw(&self, string: &str, index: u32) {
        let interned: &'static str = Box::leak(string.to_string().into_boxed_str());
        let hash = Self::hash_string(string);
        self.map
            .write()
            .unwrap()
            .entry(hash)
            .or_default()
            .push(Entry {
                string: interned,
                index,
            });
    }

    pub fn intern(&self, string: &str) -> Symbol {
        let hash = Self::hash_string(string);

        if let Some(entries) = self.map.read().unwrap().get(&hash) {
            if let Some(entry) = entries.iter().find(|e| e.string == string) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Symbol { index: entry.index };
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let mut map = self.map.write().unwrap();
        let entries = map.entry(hash).or_default();
        if let Some(entry) = entries.iter().find(|e| e.string == string) {
            return Symbol { index: entry.index };
        }
        let interned: &'static str = Box::leak(string.to_string().into_boxed_str());
        let idx = self.next_index.fetch_add(1, Ordering::Relaxed);
        entries.push(Entry {
            string: interned,
            index: idx,
        });
        Symbol { index: idx }
    }

    pub fn get(&self, symbol: Symbol) -> Option<&'static str> {
        self.map
            .read()
            .unwrap()
            .values()
            .flatten()
            .find(|e| e.index == symbol.index)
            .map(|e| e.string)
    }

    fn hash_string(string: &str) -> u64 {
        let mut hasher = rustc_hash::FxHasher::default();
        string.hash(&mut hasher);
        hasher.finish()
    }

    pub fn stats(&self) -> InternerStats {
        let map = self.map.read().unwrap();
        let count = map.values().map(|v| v.len()).sum();
        InternerStats {
            count,
            capacity: map.capacity(),
            hits: self.hits.load(Ordering::Relaxed) as usize,
            misses: self.misses.load(Ordering::Relaxed) as usize,
        }
    }

    #[cfg(test)]
    pub(crate) fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_same_string_same_symbol() {
        let a = STRING_TABLE.intern("an_interner_test_token");
        let b = STRING_TABLE.intern("an_interner_test_token");
        assert_eq!(a, b);
    }

    #[test]
    fn intern_different_strings_different_symbols() {
        let a = STRING_TABLE.intern("interner_test_alpha");
        let b = STRING_TABLE.intern("interner_test_beta");
        assert_ne!(a, b);
    }

    #[test]
    fn get_roundtrips() {
        let sym = STRING_TABLE.intern("interner_test_roundtrip");
        assert_eq!(STRING_TABLE.get(sym), Some("interner_test_roundtrip"));
    }

    #[test]
    fn stats_track_hits_and_misses() {
        STRING_TABLE.reset_stats();
        let _ = STRING_TABLE.intern("interner_test_stats_unique");
        let stats = STRING_TABLE.stats();
        assert!(stats.misses >= 1);
        let _ = STRING_TABLE.intern("interner_test_stats_unique");
        let stats = STRING_TABLE.stats();
        assert!(stats.hits >= 1);
    }

    #[test]
    fn empty_string_interns() {
        let s = STRING_TABLE.intern("");
        assert_eq!(STRING_TABLE.get(s), Some(""));
    }

    #[test]
    fn unicode_strings() {
        for s in ["HULK", "тест", "🦀"] {
            let sym = STRING_TABLE.intern(s);
            assert_eq!(STRING_TABLE.get(sym), Some(s));
        }
    }
}
