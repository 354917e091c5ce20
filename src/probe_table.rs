//! LinearProbeTable: flat overflow storage for trie positions that ran out of
//! hash bits (or hit the configured depth limit).
//!
//! Buckets are probed from `hash % capacity` forward with wraparound. A probe
//! stops at a matching key, an empty bucket, or after visiting every bucket.
//! Removal and purge use backward-shift deletion, so occupied runs stay
//! contiguous and stopping at the first empty bucket is always sound.
//!
//! Lock discipline: a read lock serves lookups that need no mutation. Any
//! slot change (creation, upgrade, removal, purging a cleared handle, growth)
//! retakes the table under its write lock and re-probes. A PUT that reaches a
//! vacant bucket without a candidate entry returns `Outcome::Create` with the
//! lock released, so the factory never runs under it.

use crate::config::TableGrowth;
use crate::entry::EntryRef;
use crate::fib_set::{Core, Op, Outcome};
use crate::strength::{Binding, Strength};
use core::borrow::Borrow;
use parking_lot::RwLock;
use std::fmt;

/// A binding together with the hash of its key, so rehashing never has to
/// resolve the entry or call `K: Hash` again.
pub(crate) struct Bucket<K, V> {
    pub(crate) hash: u64,
    pub(crate) binding: Binding<K, V>,
}

enum Probe<K, V> {
    Found(usize, EntryRef<K, V>),
    Cleared(usize),
    Vacant(usize),
    Full,
}

pub(crate) struct LinearProbeTable<K, V> {
    buckets: RwLock<Box<[Option<Bucket<K, V>>]>>,
    growth: TableGrowth,
}

impl<K, V> LinearProbeTable<K, V> {
    pub(crate) fn new(capacity: usize, growth: TableGrowth) -> Self {
        debug_assert!(capacity > 0);
        Self {
            buckets: RwLock::new(empty_buckets(capacity)),
            growth,
        }
    }

    /// A table seeded with the binding that previously occupied a trie slot.
    pub(crate) fn with_bucket(capacity: usize, growth: TableGrowth, bucket: Bucket<K, V>) -> Self {
        let mut table = Self::new(capacity, growth);
        place(&mut table.buckets.get_mut()[..], bucket);
        table
    }

    pub(crate) fn capacity(&self) -> usize {
        self.buckets.read().len()
    }

    /// Occupied buckets, including cleared handles not yet purged.
    pub(crate) fn occupied(&self) -> usize {
        self.buckets.read().iter().filter(|b| b.is_some()).count()
    }

    /// Appends every binding that currently resolves. Does not purge.
    pub(crate) fn collect_live(&self, out: &mut Vec<EntryRef<K, V>>) {
        let buckets = self.buckets.read();
        out.extend(
            buckets
                .iter()
                .flatten()
                .filter_map(|bucket| bucket.binding.resolve()),
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn execute<Q>(
        &self,
        op: Op,
        q: &Q,
        hash: u64,
        strength: Strength,
        core: &Core<K, V>,
        candidate: &mut Option<EntryRef<K, V>>,
        released: &mut Vec<EntryRef<K, V>>,
    ) -> Outcome<K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        {
            let buckets = self.buckets.read();
            match probe(&buckets[..], q, hash, released) {
                Probe::Found(i, entry) => {
                    let settled = op.is_read_only()
                        || (op == Op::Put
                            && buckets[i].as_ref().is_some_and(|b| {
                                !b.binding.needs_upgrade(strength, &core.retainer)
                            }));
                    if settled {
                        return Outcome::Done(Some(entry));
                    }
                    released.push(entry);
                }
                Probe::Vacant(_) | Probe::Full if op != Op::Put => return Outcome::Done(None),
                _ => {}
            }
        }

        let mut buckets = self.buckets.write();
        loop {
            match probe(&buckets[..], q, hash, released) {
                Probe::Cleared(i) => {
                    if let Some(bucket) = vacate(&mut buckets[..], i) {
                        released.extend(bucket.binding.release(&core.retainer));
                        core.unbound(1);
                        tracing::trace!(index = i, "purged cleared overflow bucket");
                    }
                }
                Probe::Found(i, entry) => {
                    match op {
                        Op::Get => {}
                        Op::Put => {
                            if let Some(bucket) = buckets[i].as_mut() {
                                released.extend(bucket.binding.upgrade(
                                    &entry,
                                    strength,
                                    &core.retainer,
                                ));
                            }
                        }
                        Op::Remove => {
                            if let Some(bucket) = vacate(&mut buckets[..], i) {
                                released.extend(bucket.binding.release(&core.retainer));
                                core.unbound(1);
                            }
                        }
                    }
                    return Outcome::Done(Some(entry));
                }
                Probe::Vacant(i) => {
                    if op != Op::Put {
                        return Outcome::Done(None);
                    }
                    let Some(entry) = candidate.take() else {
                        return Outcome::Create;
                    };
                    buckets[i] = Some(Bucket {
                        hash,
                        binding: Binding::new(&entry, strength, &core.retainer),
                    });
                    core.bound();
                    return Outcome::Done(Some(entry));
                }
                Probe::Full => {
                    if op != Op::Put {
                        return Outcome::Done(None);
                    }
                    self.grow(&mut buckets, core, released);
                }
            }
        }
    }

    /// Rebuilds the table, dropping cleared bindings. Grows only if every
    /// bucket is still live.
    fn grow(
        &self,
        buckets: &mut Box<[Option<Bucket<K, V>>]>,
        core: &Core<K, V>,
        released: &mut Vec<EntryRef<K, V>>,
    ) {
        let capacity = buckets.len();
        let mut live = Vec::with_capacity(capacity);
        let mut purged = 0;
        for bucket in buckets.iter_mut().filter_map(Option::take) {
            if bucket.binding.is_live() {
                live.push(bucket);
            } else {
                released.extend(bucket.binding.release(&core.retainer));
                purged += 1;
            }
        }
        core.unbound(purged);

        let next = if live.len() < capacity {
            capacity
        } else {
            self.growth.next_capacity(capacity)
        };
        let mut rebuilt = empty_buckets(next);
        for bucket in live {
            place(&mut rebuilt, bucket);
        }
        *buckets = rebuilt;
        tracing::debug!(from = capacity, to = next, purged, "rebuilt overflow table");
    }

    #[cfg(test)]
    pub(crate) fn key_at(&self, index: usize) -> Option<K>
    where
        K: Clone,
    {
        let buckets = self.buckets.read();
        let bucket = buckets.get(index)?.as_ref()?;
        bucket.binding.resolve().map(|e| e.key().clone())
    }
}

impl<K, V> fmt::Debug for LinearProbeTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearProbeTable")
            .field("capacity", &self.capacity())
            .field("occupied", &self.occupied())
            .finish()
    }
}

fn empty_buckets<K, V>(capacity: usize) -> Box<[Option<Bucket<K, V>>]> {
    (0..capacity).map(|_| None).collect()
}

#[inline]
fn home(hash: u64, capacity: usize) -> usize {
    (hash % capacity as u64) as usize
}

/// Mismatched entries resolved during the probe are pushed to `released`, so
/// a concurrent drop of their last outside holder never runs under our lock.
fn probe<K, V, Q>(
    buckets: &[Option<Bucket<K, V>>],
    q: &Q,
    hash: u64,
    released: &mut Vec<EntryRef<K, V>>,
) -> Probe<K, V>
where
    K: Borrow<Q>,
    Q: ?Sized + Eq,
{
    let capacity = buckets.len();
    let start = home(hash, capacity);
    for n in 0..capacity {
        let i = (start + n) % capacity;
        let Some(bucket) = &buckets[i] else {
            return Probe::Vacant(i);
        };
        if !bucket.binding.is_live() {
            return Probe::Cleared(i);
        }
        if bucket.hash != hash {
            continue;
        }
        match bucket.binding.resolve() {
            None => return Probe::Cleared(i),
            Some(entry) if entry.key().borrow() == q => return Probe::Found(i, entry),
            Some(entry) => released.push(entry),
        }
    }
    Probe::Full
}

/// Inserts into the first empty bucket of the probe sequence. The caller
/// guarantees one exists.
fn place<K, V>(buckets: &mut [Option<Bucket<K, V>>], bucket: Bucket<K, V>) {
    let capacity = buckets.len();
    let start = home(bucket.hash, capacity);
    let slot = (0..capacity)
        .map(|n| (start + n) % capacity)
        .find(|&i| buckets[i].is_none());
    debug_assert!(slot.is_some(), "place called on a full table");
    if let Some(i) = slot {
        buckets[i] = Some(bucket);
    }
}

/// Empties bucket `hole` and shifts later members of the run back so that
/// every remaining bucket stays reachable from its home index.
fn vacate<K, V>(buckets: &mut [Option<Bucket<K, V>>], mut hole: usize) -> Option<Bucket<K, V>> {
    let capacity = buckets.len();
    let removed = buckets[hole].take();
    let mut i = hole;
    loop {
        i = (i + 1) % capacity;
        let home = match &buckets[i] {
            None => break,
            Some(bucket) => home(bucket.hash, capacity),
        };
        // Stays put iff its home lies cyclically within (hole, i].
        let stays = if hole <= i {
            hole < home && home <= i
        } else {
            hole < home || home <= i
        };
        if !stays {
            buckets[hole] = buckets[i].take();
            hole = i;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FibSetConfig;
    use std::sync::Arc;

    fn core() -> Core<u64, u64> {
        Core::new(FibSetConfig::default(), |k: &u64| *k * 10)
    }

    fn run(
        table: &LinearProbeTable<u64, u64>,
        core: &Core<u64, u64>,
        op: Op,
        key: u64,
        hash: u64,
        strength: Strength,
    ) -> Option<EntryRef<u64, u64>> {
        let mut released = Vec::new();
        let mut candidate = None;
        loop {
            match table.execute(op, &key, hash, strength, core, &mut candidate, &mut released) {
                Outcome::Done(result) => return result,
                Outcome::Create => candidate = Some(core.create(&key, hash)),
            }
        }
    }

    /// Invariant: without collisions, strong sequential inserts fill buckets in
    /// arrival order; each full table grows by exactly one chunk, ending at a
    /// capacity of exactly N with every key retrievable at its value.
    #[test]
    fn sequential_inserts_fill_in_order_and_grow_exactly() {
        let core = core();
        let table = LinearProbeTable::new(16, TableGrowth::Chunk(16));
        let n = 100 * 16;
        for k in 0..n {
            let e = run(&table, &core, Op::Put, k, k, Strength::Strong).unwrap();
            assert_eq!(*e.key(), k);
        }
        assert_eq!(core.len(), n as usize);
        assert_eq!(table.capacity(), n as usize);
        assert_eq!(table.occupied(), n as usize);
        for k in 0..n {
            assert_eq!(table.key_at(k as usize), Some(k));
            let e = run(&table, &core, Op::Get, k, k, Strength::Strong).unwrap();
            assert_eq!(e.get(), k * 10);
        }
    }

    #[test]
    fn factor_growth_doubles() {
        let core = core();
        let table = LinearProbeTable::new(4, TableGrowth::Factor(2));
        for k in 0..5 {
            run(&table, &core, Op::Put, k, k, Strength::Strong).unwrap();
        }
        assert_eq!(table.capacity(), 8);
    }

    /// Invariant: equal hashes are resolved by key comparison, and removing
    /// from the middle of a run keeps later members reachable.
    #[test]
    fn full_collisions_resolve_by_key_and_survive_removal() {
        let core = core();
        let table = LinearProbeTable::new(4, TableGrowth::Chunk(4));
        for k in 0..10 {
            run(&table, &core, Op::Put, k, 7, Strength::Strong).unwrap();
        }
        assert_eq!(table.capacity(), 12);

        let removed = run(&table, &core, Op::Remove, 3, 7, Strength::Strong).unwrap();
        assert_eq!(*removed.key(), 3);
        assert!(run(&table, &core, Op::Get, 3, 7, Strength::Strong).is_none());
        for k in (0..10).filter(|&k| k != 3) {
            let e = run(&table, &core, Op::Get, k, 7, Strength::Strong).unwrap();
            assert_eq!(*e.key(), k);
        }
        assert_eq!(core.len(), 9);
    }

    #[test]
    fn wraparound_runs_are_compacted_on_remove() {
        let core = core();
        let table = LinearProbeTable::new(4, TableGrowth::Chunk(4));
        // Homes 3, 3, 0 occupy buckets 3, 0, 1.
        run(&table, &core, Op::Put, 30, 3, Strength::Strong).unwrap();
        run(&table, &core, Op::Put, 31, 3, Strength::Strong).unwrap();
        run(&table, &core, Op::Put, 40, 0, Strength::Strong).unwrap();
        assert_eq!(table.key_at(3), Some(30));
        assert_eq!(table.key_at(0), Some(31));
        assert_eq!(table.key_at(1), Some(40));

        run(&table, &core, Op::Remove, 30, 3, Strength::Strong).unwrap();
        assert_eq!(table.key_at(3), Some(31));
        assert_eq!(table.key_at(0), Some(40));
        assert_eq!(table.key_at(1), None);
        assert!(run(&table, &core, Op::Get, 40, 0, Strength::Strong).is_some());
        assert!(run(&table, &core, Op::Get, 31, 3, Strength::Strong).is_some());
    }

    #[test]
    fn remove_absent_leaves_count_unchanged() {
        let core = core();
        let table = LinearProbeTable::new(4, TableGrowth::Chunk(4));
        run(&table, &core, Op::Put, 1, 1, Strength::Strong).unwrap();
        assert!(run(&table, &core, Op::Remove, 2, 1, Strength::Strong).is_none());
        assert!(run(&table, &core, Op::Remove, 5, 5, Strength::Strong).is_none());
        assert_eq!(core.len(), 1);
    }

    /// Invariant: a cleared weak binding is counted until the slot is visited,
    /// then purged with the counter corrected.
    #[test]
    fn cleared_weak_bucket_is_healed_on_visit() {
        let core = core();
        let table = LinearProbeTable::new(4, TableGrowth::Chunk(4));
        let e = run(&table, &core, Op::Put, 1, 1, Strength::Weak).unwrap();
        assert_eq!(core.len(), 1);
        drop(e);
        assert_eq!(core.len(), 1);
        assert_eq!(table.occupied(), 1);

        assert!(run(&table, &core, Op::Get, 1, 1, Strength::Strong).is_none());
        assert_eq!(core.len(), 0);
        assert_eq!(table.occupied(), 0);
    }

    #[test]
    fn growth_purges_cleared_buckets_instead_of_growing() {
        let core = core();
        let table = LinearProbeTable::new(4, TableGrowth::Chunk(4));
        let held: Vec<_> = (0..4)
            .map(|k| run(&table, &core, Op::Put, k, k, Strength::Weak).unwrap())
            .collect();
        // Keep keys 0 and 2 alive.
        let kept: Vec<_> = held.iter().step_by(2).map(Arc::clone).collect();
        drop(held);

        // Home 0 is a live entry with another key; the probe reaches bucket 1,
        // which is cleared and gets purged in place.
        run(&table, &core, Op::Put, 9, 0, Strength::Strong).unwrap();
        assert_eq!(table.capacity(), 4);
        assert!(core.len() <= 4);
        for e in &kept {
            let k = *e.key();
            let found = run(&table, &core, Op::Get, k, k, Strength::Strong).unwrap();
            assert!(Arc::ptr_eq(&found, e));
        }
        assert!(run(&table, &core, Op::Get, 9, 0, Strength::Strong).is_some());
    }

    #[test]
    fn seeded_table_holds_previous_binding() {
        let core = core();
        let e = core.create(&5u64, 5);
        core.bound();
        let bucket = Bucket {
            hash: 5,
            binding: Binding::new(&e, Strength::Strong, &core.retainer),
        };
        let table = LinearProbeTable::with_bucket(4, TableGrowth::Chunk(4), bucket);
        let found = run(&table, &core, Op::Get, 5, 5, Strength::Strong).unwrap();
        assert!(Arc::ptr_eq(&found, &e));
    }

    /// Invariant: a PUT into a vacant bucket asks for its entry with the table
    /// unlocked, and a candidate that arrives after another PUT won is not
    /// installed.
    #[test]
    fn vacant_put_asks_for_an_entry_outside_the_lock() {
        let core = core();
        let table = LinearProbeTable::new(4, TableGrowth::Chunk(4));
        let mut candidate = None;
        let mut released = Vec::new();
        let mut put = |candidate: &mut Option<EntryRef<u64, u64>>| {
            table.execute(Op::Put, &3u64, 3, Strength::Strong, &core, candidate, &mut released)
        };
        let outcome = put(&mut candidate);
        assert!(matches!(outcome, Outcome::Create));
        assert!(table.buckets.try_write().is_some());
        assert_eq!(core.len(), 0);

        let winner = run(&table, &core, Op::Put, 3, 3, Strength::Strong).unwrap();
        candidate = Some(core.create(&3u64, 3));
        match put(&mut candidate) {
            Outcome::Done(Some(found)) => assert!(Arc::ptr_eq(&found, &winner)),
            _ => panic!("expected the installed entry"),
        }
        assert!(candidate.is_some());
        assert_eq!(core.len(), 1);
        assert_eq!(table.occupied(), 1);
    }
}
