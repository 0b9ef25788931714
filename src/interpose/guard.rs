//! Per-thread reentrancy guard.
//!
//! Policy evaluation does file I/O of its own. If that I/O comes back
//! through an intercepted symbol on the same thread, the nested call must
//! go straight to the real implementation.

use std::cell::Cell;
use std::marker::PhantomData;

thread_local! {
    static IN_POLICY: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as busy evaluating policy until dropped.
pub struct ReentrancyGuard {
    // Must be dropped on the thread that created it.
    _not_send: PhantomData<*const ()>,
}

impl ReentrancyGuard {
    /// Set the flag, or `None` when this thread already holds it.
    ///
    /// Also `None` once thread-local storage is being torn down, so calls
    /// made from TLS destructors pass straight through.
    pub fn enter() -> Option<Self> {
        IN_POLICY
            .try_with(|flag| {
                if flag.replace(true) {
                    None
                } else {
                    Some(Self {
                        _not_send: PhantomData,
                    })
                }
            })
            .ok()
            .flatten()
    }

    /// Whether the current thread is inside policy evaluation.
    pub fn is_active() -> bool {
        IN_POLICY.try_with(Cell::get).unwrap_or(true)
    }
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        let _ = IN_POLICY.try_with(|flag| flag.set(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_enter_is_refused() {
        assert!(!ReentrancyGuard::is_active());
        let outer = ReentrancyGuard::enter().expect("first enter succeeds");
        assert!(ReentrancyGuard::is_active());
        assert!(ReentrancyGuard::enter().is_none());
        drop(outer);
        assert!(!ReentrancyGuard::is_active());
        assert!(ReentrancyGuard::enter().is_some());
    }

    #[test]
    fn guard_is_per_thread() {
        let _held = ReentrancyGuard::enter().unwrap();
        let other = std::thread::spawn(|| {
            let inner = ReentrancyGuard::enter();
            inner.is_some()
        })
        .join()
        .unwrap();
        assert!(other);
        assert!(ReentrancyGuard::is_active());
    }
}
