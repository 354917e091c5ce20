//! fibset: a concurrent hash-trie set of identity-stable entries, each held
//! by the set at a chosen reference strength.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a thread-safe keyed cache where a key maps to exactly one shared
//!   `Entry` at any time, and the set itself decides how long it keeps that
//!   entry alive.
//! - Layers:
//!   - `hashing`: Fibonacci mixing of a 64-bit hash and per-level slot
//!     indices.
//!   - `LinearProbeTable`: flat overflow storage for keys whose hashes
//!     agree on every trie level consumed.
//!   - `FibSet<K, V, S>`: the trie controller and public API; one
//!     `execute(op, key, strength)` entry point plus convenience wrappers.
//!   - `StringCache`: a string interner on top of `FibSet`.
//!
//! Reference strengths
//! - `Strong`: the set owns an `Arc` to the entry; only REMOVE frees it.
//! - `Soft`: the set owns a `Weak` plus a pin in its `SoftRetainer`. The pin
//!   keeps the entry alive until `relieve_memory_pressure` drains the
//!   retainer, after which the binding behaves as weak.
//! - `Weak`: the set owns a `Weak`; the entry lives while callers hold it.
//! - PUT never downgrades and always returns the same allocation for an
//!   existing key, so upgrading WEAK → SOFT → STRONG preserves identity.
//!
//! Constraints
//! - Thread-safe: `FibSet` is `Send + Sync` when `K` and `V` are.
//! - Linearizable per key: every operation on a key is serialized by the
//!   write lock of the one trie node or overflow table that owns its slot.
//! - Progress: each operation terminates after at most `max_depth` node
//!   visits plus one table probe; no global lock exists.
//! - `len()` is best effort. A soft or weak binding that cleared is still
//!   counted until an operation visits its slot and purges it.
//!
//! Reentrancy policy
//! - The entry factory runs with no lock held. A PUT that needs a new entry
//!   releases its lock, builds a candidate and installs it only if the slot
//!   is still free; a slow factory therefore never stalls other keys, and it
//!   may call back into the set.
//! - `K: Eq` runs while a node or table lock is held. Calling back into the
//!   same set from it would deadlock; debug builds detect this with a
//!   per-thread guard and panic instead.
//! - `Drop` of keys and values never runs under a lock: every reference the
//!   set lets go of during an operation is dropped after the locks are
//!   released, so `Drop` may reenter safely.
//!
//! Hasher and rehashing invariants
//! - Each slot stores the precomputed `u64` hash; splits and table growth
//!   reuse it. `K: Hash` is called once per operation, before any lock.
//!
//! Notes and non-goals
//! - Trie nodes are never removed or shrunk; removal only empties slots.
//! - No iteration guarantees: `entries()` is a point-in-time snapshot that
//!   may miss concurrent insertions.
//! - No persistence and no ordering of keys.

mod config;
mod entry;
mod error;
mod fib_set;
mod hashing;
mod probe_table;
mod reentrancy;
mod strength;
mod string_cache;

// Public surface
pub use config::{FibSetBuilder, FibSetConfig, TableGrowth};
pub use entry::{Entry, EntryRef};
pub use error::ConfigError;
pub use fib_set::{FibSet, Op};
pub use strength::Strength;
pub use string_cache::{Interned, StringCache};
