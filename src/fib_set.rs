//! FibSet: the hash-trie controller.
//!
//! A key's hash is consumed `W` bits per level (see `hashing`). Each trie node
//! is a `2^W` wide array of slots, every slot being empty, a single binding, a
//! sub-node, or an overflow table. A collision between two different keys in
//! a binding slot pushes the resident binding one level down into a fresh
//! node; once the depth limit is reached the slot is flattened into a
//! `LinearProbeTable` that compares keys directly.
//!
//! Locking: every node has its own `RwLock`. Lookups that need no mutation run
//! under the read lock. Slot creation, upgrade, removal, purging a cleared
//! handle, and splitting take that node's write lock and re-inspect the slot.
//! Sub-nodes and tables are never removed once installed, so a thread may
//! release the parent lock before descending into them.
//!
//! The factory never runs under a lock. A PUT that finds no slot for its key
//! gives up every lock, builds a candidate entry and descends again. The
//! candidate is installed only if the slot is still free; otherwise the
//! entry that won is returned and the candidate is dropped after unlocking.
//!
//! Cleared soft/weak handles are healed lazily: the next operation that
//! visits the slot clears it and decrements the live count.

use crate::config::FibSetConfig;
use crate::entry::{Entry, EntryRef};
use crate::hashing;
use crate::probe_table::{Bucket, LinearProbeTable};
use crate::reentrancy::DebugReentrancy;
use crate::strength::{Binding, SoftRetainer, Strength};
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Operation passed to [`FibSet::execute`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Op {
    Get,
    Put,
    Remove,
}

impl Op {
    pub fn is_read_only(self) -> bool {
        matches!(self, Op::Get)
    }
}

type Factory<K, V> = Box<dyn Fn(&K) -> V + Send + Sync>;

/// State shared by the trie and its overflow tables.
pub(crate) struct Core<K, V> {
    pub(crate) config: FibSetConfig,
    pub(crate) retainer: SoftRetainer<K, V>,
    size: AtomicUsize,
    factory: Factory<K, V>,
}

impl<K, V> Core<K, V> {
    pub(crate) fn new<F>(config: FibSetConfig, factory: F) -> Self
    where
        F: Fn(&K) -> V + Send + Sync + 'static,
    {
        Self {
            config,
            retainer: SoftRetainer::new(),
            size: AtomicUsize::new(0),
            factory: Box::new(factory),
        }
    }

    /// Materialises the key and runs the factory. Called with no lock held.
    pub(crate) fn create<Q>(&self, q: &Q, hash: u64) -> EntryRef<K, V>
    where
        Q: ?Sized + ToOwned<Owned = K>,
    {
        let key = q.to_owned();
        let value = (self.factory)(&key);
        Arc::new(Entry::new(key, hash, value))
    }

    pub(crate) fn bound(&self) {
        self.size.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn unbound(&self, n: usize) {
        if n > 0 {
            self.size.fetch_sub(n, Ordering::Relaxed);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }
}

enum Slot<K, V> {
    Empty,
    Bound(Bucket<K, V>),
    Node(Arc<Node<K, V>>),
    Table(Arc<LinearProbeTable<K, V>>),
}

/// Outcome of inspecting one slot.
enum Step<K, V> {
    Done(Option<EntryRef<K, V>>),
    Descend(Arc<Node<K, V>>),
    Delegate(Arc<LinearProbeTable<K, V>>),
    NeedsWrite,
    Create,
}

/// Outcome of one descent.
pub(crate) enum Outcome<K, V> {
    Done(Option<EntryRef<K, V>>),
    /// A PUT reached a free slot without a candidate entry. Every lock has
    /// been released; the caller builds one and descends again.
    Create,
}

struct Node<K, V> {
    slots: RwLock<Box<[Slot<K, V>]>>,
}

impl<K, V> Node<K, V> {
    fn new(width: usize) -> Self {
        Self {
            slots: RwLock::new((0..width).map(|_| Slot::Empty).collect()),
        }
    }

    fn with_bucket(width: usize, index: usize, bucket: Bucket<K, V>) -> Self {
        let mut slots: Box<[Slot<K, V>]> = (0..width).map(|_| Slot::Empty).collect();
        slots[index] = Slot::Bound(bucket);
        Self {
            slots: RwLock::new(slots),
        }
    }

    /// Read-locked inspection. Returns `NeedsWrite` when the operation has to
    /// mutate the slot or a cleared handle has to be purged.
    #[allow(clippy::too_many_arguments)]
    fn read_step<Q>(
        &self,
        index: usize,
        op: Op,
        q: &Q,
        hash: u64,
        strength: Strength,
        core: &Core<K, V>,
        released: &mut Vec<EntryRef<K, V>>,
    ) -> Step<K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let slots = self.slots.read();
        let miss = if op == Op::Put {
            Step::NeedsWrite
        } else {
            Step::Done(None)
        };
        match &slots[index] {
            Slot::Empty => miss,
            Slot::Node(child) => Step::Descend(Arc::clone(child)),
            Slot::Table(table) => Step::Delegate(Arc::clone(table)),
            Slot::Bound(bucket) => {
                if !bucket.binding.is_live() {
                    return Step::NeedsWrite;
                }
                if bucket.hash != hash {
                    return miss;
                }
                match bucket.binding.resolve() {
                    None => Step::NeedsWrite,
                    Some(entry) if entry.key().borrow() == q => {
                        let settled = op.is_read_only()
                            || (op == Op::Put
                                && !bucket.binding.needs_upgrade(strength, &core.retainer));
                        if settled {
                            Step::Done(Some(entry))
                        } else {
                            released.push(entry);
                            Step::NeedsWrite
                        }
                    }
                    Some(entry) => {
                        released.push(entry);
                        miss
                    }
                }
            }
        }
    }

    /// Write-locked inspection and mutation of one slot at `depth`. A free
    /// slot takes `candidate` if there is one and asks for it otherwise.
    #[allow(clippy::too_many_arguments)]
    fn write_step<Q>(
        &self,
        index: usize,
        depth: u32,
        op: Op,
        q: &Q,
        hash: u64,
        strength: Strength,
        core: &Core<K, V>,
        candidate: &mut Option<EntryRef<K, V>>,
        released: &mut Vec<EntryRef<K, V>>,
    ) -> Step<K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let mut slots = self.slots.write();
        let slot = &mut slots[index];

        let resolved = match &*slot {
            Slot::Node(child) => return Step::Descend(Arc::clone(child)),
            Slot::Table(table) => return Step::Delegate(Arc::clone(table)),
            Slot::Empty => None,
            Slot::Bound(bucket) => Some(bucket.binding.resolve()),
        };
        let existing = match resolved {
            Some(Some(entry)) => Some(entry),
            Some(None) => {
                if let Slot::Bound(bucket) = std::mem::replace(slot, Slot::Empty) {
                    released.extend(bucket.binding.release(&core.retainer));
                }
                core.unbound(1);
                tracing::trace!(depth, index, "purged cleared binding");
                None
            }
            None => None,
        };

        match existing {
            None => {
                if op != Op::Put {
                    return Step::Done(None);
                }
                let Some(entry) = candidate.take() else {
                    return Step::Create;
                };
                *slot = Slot::Bound(Bucket {
                    hash,
                    binding: Binding::new(&entry, strength, &core.retainer),
                });
                core.bound();
                Step::Done(Some(entry))
            }
            Some(entry) if entry.hash() == hash && entry.key().borrow() == q => {
                match op {
                    Op::Get => {}
                    Op::Put => {
                        if let Slot::Bound(bucket) = slot {
                            released.extend(bucket.binding.upgrade(
                                &entry,
                                strength,
                                &core.retainer,
                            ));
                        }
                    }
                    Op::Remove => {
                        if let Slot::Bound(bucket) = std::mem::replace(slot, Slot::Empty) {
                            released.extend(bucket.binding.release(&core.retainer));
                        }
                        core.unbound(1);
                    }
                }
                Step::Done(Some(entry))
            }
            Some(other) => {
                released.push(other);
                if op != Op::Put {
                    return Step::Done(None);
                }
                match std::mem::replace(slot, Slot::Empty) {
                    Slot::Bound(bucket) => split(slot, bucket, index, depth, core),
                    unchanged => {
                        *slot = unchanged;
                        Step::NeedsWrite
                    }
                }
            }
        }
    }

    fn collect_live(&self, out: &mut Vec<EntryRef<K, V>>, pending: &mut Vec<Arc<Node<K, V>>>) {
        let slots = self.slots.read();
        for slot in slots.iter() {
            match slot {
                Slot::Empty => {}
                Slot::Bound(bucket) => out.extend(bucket.binding.resolve()),
                Slot::Node(child) => pending.push(Arc::clone(child)),
                Slot::Table(table) => table.collect_live(out),
            }
        }
    }
}

/// Replaces a colliding binding slot with a deeper node, or with an overflow
/// table once the next level would exceed the depth limit.
fn split<K, V>(
    slot: &mut Slot<K, V>,
    resident: Bucket<K, V>,
    index: usize,
    depth: u32,
    core: &Core<K, V>,
) -> Step<K, V> {
    let config = &core.config;
    if depth + 1 < config.max_depth() {
        let child_index = hashing::index_of(resident.hash, config.segment_bits(), depth + 1);
        let child = Arc::new(Node::with_bucket(config.node_width(), child_index, resident));
        *slot = Slot::Node(Arc::clone(&child));
        tracing::trace!(depth, index, "split binding into sub-node");
        Step::Descend(child)
    } else {
        let table = Arc::new(LinearProbeTable::with_bucket(
            config.table_capacity(),
            config.table_growth(),
            resident,
        ));
        *slot = Slot::Table(Arc::clone(&table));
        tracing::trace!(depth, index, "flattened binding into overflow table");
        Step::Delegate(table)
    }
}

/// A concurrent hash-trie set of entries, each bound at a [`Strength`].
///
/// Entries are created by the factory on first PUT and are identity-stable:
/// every later PUT or GET for the key returns the same `EntryRef` until the
/// binding is removed or its soft/weak handle clears. Callers mutate values in
/// place through the entry.
///
/// ```
/// use fibset::{FibSet, Strength};
///
/// let set: FibSet<String, u32> = FibSet::new(|_key: &String| 0);
/// let weak = set.put_weak("tile/12/2200/1343");
/// *weak.write() = 7;
///
/// // Pin the hot entry; identity is preserved.
/// let pinned = set.put_with("tile/12/2200/1343", Strength::Strong);
/// assert!(std::sync::Arc::ptr_eq(&weak, &pinned));
/// drop((weak, pinned));
/// assert_eq!(set.get("tile/12/2200/1343").map(|e| e.get()), Some(7));
/// ```
pub struct FibSet<K, V, S = DefaultHashBuilder> {
    root: Arc<Node<K, V>>,
    core: Core<K, V>,
    hasher: S,
    reentrancy: DebugReentrancy,
}

impl<K, V> FibSet<K, V>
where
    K: Eq + Hash,
{
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&K) -> V + Send + Sync + 'static,
    {
        Self::with_hasher(factory, DefaultHashBuilder::default())
    }
}

impl<K, V, S> FibSet<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher<F>(factory: F, hasher: S) -> Self
    where
        F: Fn(&K) -> V + Send + Sync + 'static,
    {
        Self::with_config(FibSetConfig::default(), hasher, factory)
    }

    pub fn with_config<F>(config: FibSetConfig, hasher: S, factory: F) -> Self
    where
        F: Fn(&K) -> V + Send + Sync + 'static,
    {
        Self {
            root: Arc::new(Node::new(config.node_width())),
            core: Core::new(config, factory),
            hasher,
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn config(&self) -> &FibSetConfig {
        &self.core.config
    }

    /// Best-effort count of bindings. May overcount soft/weak bindings that
    /// cleared since their slot was last visited.
    pub fn len(&self) -> usize {
        self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `op` for `key`.
    ///
    /// - `Get`: the live entry, or `None` (purging a cleared handle on the way).
    /// - `Put`: the existing or new entry, now bound at least as strongly as
    ///   `strength`. Never downgrades.
    /// - `Remove`: the removed entry, or `None`. `strength` is ignored.
    pub fn execute<Q>(&self, op: Op, key: &Q, strength: Strength) -> Option<EntryRef<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq + ToOwned<Owned = K>,
    {
        self.run(op, key, strength, |q, hash| Some(self.core.create(q, hash)))
    }

    /// GET or REMOVE; never needs to materialise a key.
    fn lookup<Q>(&self, op: Op, key: &Q) -> Option<EntryRef<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        debug_assert!(op != Op::Put);
        self.run(op, key, Strength::Weak, |_, _| None)
    }

    fn run<Q, M>(&self, op: Op, key: &Q, strength: Strength, make: M) -> Option<EntryRef<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        M: Fn(&Q, u64) -> Option<EntryRef<K, V>>,
    {
        let hash = self.hasher.hash_one(key);
        let mut released = Vec::new();
        let mut candidate = None;
        let result = loop {
            let outcome = {
                let _g = self.reentrancy.enter();
                self.descend(op, key, hash, strength, &mut candidate, &mut released)
            };
            match outcome {
                Outcome::Done(result) => break result,
                // Outside every lock and the guard: the factory may block or
                // call back into this set.
                Outcome::Create => match make(key, hash) {
                    Some(entry) => candidate = Some(entry),
                    None => break None,
                },
            }
        };
        // A candidate that lost to a concurrent PUT is still here.
        released.extend(candidate);
        // Displaced references may run user `Drop`; no lock is held here.
        drop(released);
        result
    }

    fn descend<Q>(
        &self,
        op: Op,
        q: &Q,
        hash: u64,
        strength: Strength,
        candidate: &mut Option<EntryRef<K, V>>,
        released: &mut Vec<EntryRef<K, V>>,
    ) -> Outcome<K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let bits = self.core.config.segment_bits();
        let mut node = Arc::clone(&self.root);
        let mut depth = 0;
        loop {
            let index = hashing::index_of(hash, bits, depth);
            let mut step = node.read_step(index, op, q, hash, strength, &self.core, released);
            if let Step::NeedsWrite = step {
                step = node.write_step(
                    index, depth, op, q, hash, strength, &self.core, candidate, released,
                );
            }
            match step {
                Step::Done(result) => return Outcome::Done(result),
                Step::Create => return Outcome::Create,
                Step::Descend(child) => {
                    node = child;
                    depth += 1;
                }
                Step::Delegate(table) => {
                    return table.execute(op, q, hash, strength, &self.core, candidate, released);
                }
                Step::NeedsWrite => {}
            }
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<EntryRef<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.lookup(Op::Get, key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(key).is_some()
    }

    /// PUT at `strength`; returns the entry for `key`, creating it if needed.
    pub fn put_with<Q>(&self, key: &Q, strength: Strength) -> EntryRef<K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq + ToOwned<Owned = K>,
    {
        self.execute(Op::Put, key, strength)
            .expect("PUT must always yield an entry")
    }

    pub fn put<Q>(&self, key: &Q) -> EntryRef<K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq + ToOwned<Owned = K>,
    {
        self.put_with(key, Strength::Strong)
    }

    pub fn put_soft<Q>(&self, key: &Q) -> EntryRef<K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq + ToOwned<Owned = K>,
    {
        self.put_with(key, Strength::Soft)
    }

    pub fn put_weak<Q>(&self, key: &Q) -> EntryRef<K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq + ToOwned<Owned = K>,
    {
        self.put_with(key, Strength::Weak)
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<EntryRef<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.lookup(Op::Remove, key)
    }

    /// Snapshot of every binding that currently resolves. Read-only: cleared
    /// handles are skipped, not purged.
    pub fn entries(&self) -> Vec<EntryRef<K, V>> {
        let mut out = Vec::with_capacity(self.len());
        let mut pending = vec![Arc::clone(&self.root)];
        while let Some(node) = pending.pop() {
            node.collect_live(&mut out, &mut pending);
        }
        out
    }

    /// Memory-pressure hook: releases every soft pin at once and returns how
    /// many were released. Soft bindings then behave like weak ones; entries
    /// nobody else holds are freed here and their slots heal on next visit.
    pub fn relieve_memory_pressure(&self) -> usize {
        let released = self.core.retainer.release_all();
        let count = released.len();
        drop(released);
        tracing::debug!(released = count, "relieved memory pressure");
        count
    }
}

impl<K, V, S> fmt::Debug for FibSet<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FibSet")
            .field("len", &self.core.len())
            .field("config", &self.core.config)
            .field("retainer", &self.core.retainer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableGrowth;
    use core::hash::Hasher;

    /// Hashes a `u64` key to itself.
    #[derive(Clone, Default)]
    struct IdentityBuildHasher;
    struct IdentityHasher(u64);
    impl BuildHasher for IdentityBuildHasher {
        type Hasher = IdentityHasher;
        fn build_hasher(&self) -> Self::Hasher {
            IdentityHasher(0)
        }
    }
    impl Hasher for IdentityHasher {
        fn write(&mut self, bytes: &[u8]) {
            for b in bytes {
                self.0 = (self.0 << 8) | u64::from(*b);
            }
        }
        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }
        fn finish(&self) -> u64 {
            self.0
        }
    }

    /// Sends every key down the same trie path.
    #[derive(Clone, Default)]
    struct ConstBuildHasher;
    struct ConstHasher;
    impl BuildHasher for ConstBuildHasher {
        type Hasher = ConstHasher;
        fn build_hasher(&self) -> Self::Hasher {
            ConstHasher
        }
    }
    impl Hasher for ConstHasher {
        fn write(&mut self, _bytes: &[u8]) {}
        fn finish(&self) -> u64 {
            0
        }
    }

    fn shape<K, V>(node: &Node<K, V>) -> (usize, usize, usize) {
        let slots = node.slots.read();
        let mut bound = 0;
        let mut nodes = 0;
        let mut tables = 0;
        for slot in slots.iter() {
            match slot {
                Slot::Empty => {}
                Slot::Bound(_) => bound += 1,
                Slot::Node(child) => {
                    nodes += 1;
                    let (b, n, t) = shape(child);
                    bound += b;
                    nodes += n;
                    tables += t;
                }
                Slot::Table(_) => tables += 1,
            }
        }
        (bound, nodes, tables)
    }

    #[test]
    fn identical_hashes_end_in_one_overflow_table() {
        let set: FibSet<String, usize, _> = FibSet::with_hasher(|k: &String| k.len(), ConstBuildHasher);
        for i in 0..40 {
            set.put(&format!("key-{i}"));
        }
        assert_eq!(set.len(), 40);
        let (bound, nodes, tables) = shape(&set.root);
        assert_eq!(bound, 0);
        assert_eq!(tables, 1);
        // One node per level below the root until the hash is exhausted.
        assert_eq!(nodes as u32, set.config().max_depth() - 1);
        for i in 0..40 {
            let key = format!("key-{i}");
            assert_eq!(set.get(&key).map(|e| e.key().clone()), Some(key));
        }
    }

    #[test]
    fn depth_limit_flattens_early() {
        let config = FibSetConfig::new(4, Some(1), 2, TableGrowth::Factor(2)).unwrap();
        let set = FibSet::with_config(config, ConstBuildHasher, |k: &u32| *k);
        for k in 0..9u32 {
            set.put(&k);
        }
        let (bound, nodes, tables) = shape(&set.root);
        assert_eq!((bound, nodes, tables), (0, 0, 1));
        for k in 0..9u32 {
            assert_eq!(set.get(&k).map(|e| e.get()), Some(k));
        }
    }

    #[test]
    fn distinct_hashes_split_into_sub_nodes() {
        let set = FibSet::with_hasher(|k: &u64| *k, IdentityBuildHasher);
        // Find two hashes sharing the root index but not the next one.
        let bits = set.config().segment_bits();
        let a = 1u64;
        let b = (2u64..)
            .find(|&h| {
                hashing::index_of(h, bits, 0) == hashing::index_of(a, bits, 0)
                    && hashing::index_of(h, bits, 1) != hashing::index_of(a, bits, 1)
            })
            .unwrap();
        set.put(&a);
        set.put(&b);
        assert_eq!(shape(&set.root), (2, 1, 0));
        assert!(set.get(&a).is_some());
        assert!(set.get(&b).is_some());
    }

    #[test]
    fn remove_from_split_path_keeps_sibling() {
        let set: FibSet<String, (), _> = FibSet::with_hasher(|_: &String| (), ConstBuildHasher);
        set.put("a");
        set.put("b");
        assert!(set.remove("a").is_some());
        assert!(set.get("a").is_none());
        assert!(set.get("b").is_some());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn cleared_root_binding_is_healed_by_put_of_other_key() {
        let set = FibSet::with_hasher(|k: &u64| *k, IdentityBuildHasher);
        let e = set.put_weak(&5u64);
        drop(e);
        assert_eq!(set.len(), 1);
        // Same slot, different key: the cleared binding is purged instead of split.
        let bits = set.config().segment_bits();
        let other = (6u64..)
            .find(|&h| hashing::index_of(h, bits, 0) == hashing::index_of(5, bits, 0))
            .unwrap();
        let _held = set.put(&other);
        assert_eq!(set.len(), 1);
        assert_eq!(shape(&set.root), (1, 0, 0));
    }

    #[test]
    fn entries_skip_cleared_bindings() {
        let set: FibSet<String, (), _> = FibSet::with_hasher(|_: &String| (), ConstBuildHasher);
        let _a = set.put("a");
        let b = set.put_weak("b");
        let _c = set.put_soft("c");
        drop(b);
        let mut keys: Vec<_> = set.entries().iter().map(|e| e.key().clone()).collect();
        keys.sort();
        assert_eq!(keys, ["a", "c"]);
        // Snapshot does not heal.
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn put_builds_its_entry_outside_the_node_lock() {
        let set: FibSet<u64, u64> = FibSet::new(|k: &u64| *k);
        let hash = set.hasher.hash_one(1u64);
        let mut candidate = None;
        let mut released = Vec::new();
        let outcome = set.descend(
            Op::Put,
            &1u64,
            hash,
            Strength::Strong,
            &mut candidate,
            &mut released,
        );
        assert!(matches!(outcome, Outcome::Create));
        assert!(set.root.slots.try_write().is_some());
        assert!(set.is_empty());

        // Another PUT installs the key before the candidate is offered.
        let winner = set.put(&1u64);
        candidate = Some(set.core.create(&1u64, hash));
        let outcome = set.descend(
            Op::Put,
            &1u64,
            hash,
            Strength::Strong,
            &mut candidate,
            &mut released,
        );
        match outcome {
            Outcome::Done(Some(found)) => assert!(Arc::ptr_eq(&found, &winner)),
            _ => panic!("expected the installed entry"),
        }
        // The losing candidate is left to the caller, which drops it unlocked.
        assert!(candidate.is_some_and(|c| !Arc::ptr_eq(&c, &winner)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn op_read_only_flag() {
        assert!(Op::Get.is_read_only());
        assert!(!Op::Put.is_read_only());
        assert!(!Op::Remove.is_read_only());
    }
}
