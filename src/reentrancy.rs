//! Debug-only reentrancy guard.
//!
//! A set calls `K: Eq` while it holds node or table locks. Re-entering the
//! same set from there on the same thread would deadlock, so debug builds
//! record which sets the current thread is inside and panic on a nested
//! entry instead. Release builds compile this to a zero-cost no-op. Other
//! threads and other sets are unaffected.

#[cfg(debug_assertions)]
use std::cell::RefCell;
use std::marker::PhantomData;

#[cfg(debug_assertions)]
std::thread_local! {
    static ENTERED: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Per-instance reentrancy tracker. Embed this in structs to guard public
/// entry-points with `let _g = self.reentrancy.enter();`.
///
/// The tracker is identified by its own address, so it must not move while a
/// guard is alive (guaranteed by the guard borrowing it).
#[derive(Debug)]
pub struct DebugReentrancy {
    // Non-zero-sized so distinct instances have distinct addresses.
    _id: u8,
}

impl DebugReentrancy {
    pub const fn new() -> Self {
        Self { _id: 0 }
    }

    /// Enter a guarded section. In debug builds, panics if this thread is
    /// already inside a section of the same instance.
    #[inline]
    pub fn enter(&self) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            let id = self as *const Self as usize;
            ENTERED.with(|entered| {
                let mut entered = entered.borrow_mut();
                assert!(
                    !entered.contains(&id),
                    "reentrancy detected: nested entry into data structure"
                );
                entered.push(id);
            });
            ReentrancyGuard {
                id,
                _owner: PhantomData,
            }
        }

        #[cfg(not(debug_assertions))]
        {
            ReentrancyGuard {
                _owner: PhantomData,
            }
        }
    }
}

impl Default for DebugReentrancy {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard returned by `DebugReentrancy::enter`.
pub struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    id: usize,
    _owner: PhantomData<&'a DebugReentrancy>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        ENTERED.with(|entered| {
            let mut entered = entered.borrow_mut();
            let pos = entered.iter().rposition(|&id| id == self.id);
            debug_assert!(pos.is_some());
            if let Some(pos) = pos {
                entered.remove(pos);
            }
        });
    }
}
