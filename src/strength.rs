//! Reference strengths and the per-slot binding wrapper.
//!
//! Without a tracing collector the three strengths map onto ownership:
//! - `Strong`: the slot owns an `Arc` to the entry.
//! - `Weak`: the slot owns a `Weak`; it clears once no caller holds the entry.
//! - `Soft`: the slot owns a `Weak` plus a pin in the set's `SoftRetainer`.
//!   The pin keeps the entry alive until a memory-pressure release drains
//!   the retainer, after which the binding behaves like a weak one.
//!
//! Releasing a binding never drops an entry in place; whatever `Arc` it held
//! is handed back so the caller can drop it after its locks are released.

use crate::entry::{Entry, EntryRef};
use parking_lot::Mutex;
use slotmap::{DefaultKey, SlotMap};
use std::fmt;
use std::sync::{Arc, Weak};

/// How strongly a slot retains its entry. Ordered `Weak < Soft < Strong`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Strength {
    /// Cleared as soon as no caller holds the entry.
    Weak,
    /// Kept alive by the set until memory pressure is relieved.
    Soft,
    /// Kept until removed explicitly.
    Strong,
}

/// Generational key of a soft pin. A pin released by a pressure event stays
/// invalid even after its storage slot is reused.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct SoftPin(DefaultKey);

/// Owner of the strong references behind soft bindings.
pub(crate) struct SoftRetainer<K, V> {
    pins: Mutex<SlotMap<DefaultKey, EntryRef<K, V>>>,
}

impl<K, V> SoftRetainer<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            pins: Mutex::new(SlotMap::with_key()),
        }
    }

    pub(crate) fn pin(&self, entry: &EntryRef<K, V>) -> SoftPin {
        SoftPin(self.pins.lock().insert(Arc::clone(entry)))
    }

    pub(crate) fn is_pinned(&self, pin: SoftPin) -> bool {
        self.pins.lock().contains_key(pin.0)
    }

    /// Returns the pinned reference so it can be dropped outside any lock.
    pub(crate) fn unpin(&self, pin: SoftPin) -> Option<EntryRef<K, V>> {
        self.pins.lock().remove(pin.0)
    }

    /// Drains every pin. The caller drops the returned references.
    pub(crate) fn release_all(&self) -> Vec<EntryRef<K, V>> {
        self.pins.lock().drain().map(|(_, e)| e).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.pins.lock().len()
    }
}

impl<K, V> fmt::Debug for SoftRetainer<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftRetainer")
            .field("pins", &self.len())
            .finish()
    }
}

/// What a slot holds for one key.
pub(crate) enum Binding<K, V> {
    Strong(EntryRef<K, V>),
    Soft {
        entry: Weak<Entry<K, V>>,
        pin: SoftPin,
    },
    Weak(Weak<Entry<K, V>>),
}

impl<K, V> Binding<K, V> {
    pub(crate) fn new(
        entry: &EntryRef<K, V>,
        strength: Strength,
        retainer: &SoftRetainer<K, V>,
    ) -> Self {
        match strength {
            Strength::Strong => Binding::Strong(Arc::clone(entry)),
            Strength::Soft => Binding::Soft {
                entry: Arc::downgrade(entry),
                pin: retainer.pin(entry),
            },
            Strength::Weak => Binding::Weak(Arc::downgrade(entry)),
        }
    }

    pub(crate) fn strength(&self) -> Strength {
        match self {
            Binding::Strong(_) => Strength::Strong,
            Binding::Soft { .. } => Strength::Soft,
            Binding::Weak(_) => Strength::Weak,
        }
    }

    /// `None` once a soft or weak handle has been cleared.
    pub(crate) fn resolve(&self) -> Option<EntryRef<K, V>> {
        match self {
            Binding::Strong(e) => Some(Arc::clone(e)),
            Binding::Soft { entry, .. } | Binding::Weak(entry) => entry.upgrade(),
        }
    }

    /// Liveness check that never materialises a strong reference.
    pub(crate) fn is_live(&self) -> bool {
        match self {
            Binding::Strong(_) => true,
            Binding::Soft { entry, .. } | Binding::Weak(entry) => entry.strong_count() > 0,
        }
    }

    /// Whether a PUT at `to` has to rewrap this binding. A soft binding whose
    /// pin was released by a pressure event is re-pinned.
    pub(crate) fn needs_upgrade(&self, to: Strength, retainer: &SoftRetainer<K, V>) -> bool {
        match self {
            Binding::Soft { pin, .. } if to == Strength::Soft => !retainer.is_pinned(*pin),
            _ => to > self.strength(),
        }
    }

    /// Rewraps the same entry at `to` if that is stronger; never downgrades.
    /// Returns a displaced reference for the caller to drop after unlocking.
    pub(crate) fn upgrade(
        &mut self,
        entry: &EntryRef<K, V>,
        to: Strength,
        retainer: &SoftRetainer<K, V>,
    ) -> Option<EntryRef<K, V>> {
        if !self.needs_upgrade(to, retainer) {
            return None;
        }
        let old = std::mem::replace(self, Binding::new(entry, to, retainer));
        old.release(retainer)
    }

    /// Gives up the binding, handing back any strong reference it owned.
    pub(crate) fn release(self, retainer: &SoftRetainer<K, V>) -> Option<EntryRef<K, V>> {
        match self {
            Binding::Strong(e) => Some(e),
            Binding::Soft { pin, .. } => retainer.unpin(pin),
            Binding::Weak(_) => None,
        }
    }
}
