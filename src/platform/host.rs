//! Shared per-instance host state
//!
//! Browser callbacks (rAF, observers, timers, pointer hooks) reach the
//! instance through a [`WeakHost`] and borrow it for the length of the
//! callback. A dispose that arrives while such a borrow is held is recorded
//! and carried out as soon as the callback returns.

use std::cell::{Cell, RefCell, RefMut};
use std::rc::{Rc, Weak};

/// Final cleanup for a hosted value; runs at most once
pub trait Teardown {
    fn teardown(&mut self);
}

#[derive(Debug, Default)]
struct Flags {
    requested: Cell<bool>,
    done: Cell<bool>,
}

/// Owning handle to the hosted value
pub struct SharedHost<T> {
    cell: Rc<RefCell<T>>,
    flags: Rc<Flags>,
}

/// Non-owning handle held by callbacks
pub struct WeakHost<T> {
    cell: Weak<RefCell<T>>,
    flags: Rc<Flags>,
}

impl<T> Clone for WeakHost<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            flags: self.flags.clone(),
        }
    }
}

fn finish<T: Teardown>(value: &mut T, flags: &Flags) {
    if flags.requested.get() && !flags.done.get() {
        flags.done.set(true);
        value.teardown();
    }
}

impl<T: Teardown> SharedHost<T> {
    pub fn new(value: T) -> Self {
        Self {
            cell: Rc::new(RefCell::new(value)),
            flags: Rc::new(Flags::default()),
        }
    }

    pub fn downgrade(&self) -> WeakHost<T> {
        WeakHost {
            cell: Rc::downgrade(&self.cell),
            flags: self.flags.clone(),
        }
    }

    /// Mutable access for synchronous calls from the page
    ///
    /// `None` while a callback holds the value.
    pub fn try_borrow_mut(&self) -> Option<RefMut<'_, T>> {
        self.cell.try_borrow_mut().ok()
    }

    pub fn is_disposed(&self) -> bool {
        self.flags.done.get()
    }

    /// Tear the value down now, or once the running callback returns
    ///
    /// Returns true when teardown happened immediately.
    pub fn dispose(&self) -> bool {
        if self.flags.done.get() {
            return false;
        }
        self.flags.requested.set(true);
        match self.cell.try_borrow_mut() {
            Ok(mut value) => {
                finish(&mut *value, &self.flags);
                true
            }
            Err(_) => {
                log::debug!("instance busy; teardown deferred to end of callback");
                false
            }
        }
    }
}

impl<T: Teardown> WeakHost<T> {
    /// Run `f` on the live value; skipped after teardown or when re-entered
    pub fn with(&self, f: impl FnOnce(&mut T)) {
        if self.flags.done.get() {
            return;
        }
        let Some(cell) = self.cell.upgrade() else {
            return;
        };
        let Ok(mut value) = cell.try_borrow_mut() else {
            return;
        };
        if !self.flags.requested.get() {
            f(&mut value);
        }
        finish(&mut *value, &self.flags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        calls: usize,
        teardowns: usize,
    }

    impl Teardown for Counter {
        fn teardown(&mut self) {
            self.teardowns += 1;
        }
    }

    fn teardowns(host: &SharedHost<Counter>) -> usize {
        host.try_borrow_mut().map(|p| p.teardowns).unwrap_or(usize::MAX)
    }

    #[test]
    fn test_dispose_when_idle_is_immediate_and_once() {
        let host = SharedHost::new(Counter::default());
        assert!(host.dispose());
        assert!(host.is_disposed());
        assert!(!host.dispose());
        assert_eq!(teardowns(&host), 1);
    }

    #[test]
    fn test_dispose_inside_callback_runs_when_it_returns() {
        let host = Rc::new(SharedHost::new(Counter::default()));
        let weak = host.downgrade();

        let inner_host = host.clone();
        weak.with(|counter| {
            counter.calls += 1;
            assert!(!inner_host.dispose());
            assert!(!inner_host.is_disposed());
            assert_eq!(counter.teardowns, 0);
        });

        assert!(host.is_disposed());
        assert_eq!(teardowns(&host), 1);
    }

    #[test]
    fn test_callbacks_skipped_after_dispose() {
        let host = SharedHost::new(Counter::default());
        let weak = host.downgrade();
        weak.with(|counter| counter.calls += 1);
        host.dispose();
        weak.with(|counter| counter.calls += 1);
        assert_eq!(host.try_borrow_mut().map(|p| p.calls), Some(1));
    }

    #[test]
    fn test_reentrant_callback_skipped() {
        let host = SharedHost::new(Counter::default());
        let weak = host.downgrade();
        let nested = weak.clone();
        weak.with(|counter| {
            counter.calls += 1;
            nested.with(|counter| counter.calls += 100);
        });
        assert_eq!(host.try_borrow_mut().map(|p| p.calls), Some(1));
    }

    #[test]
    fn test_dropped_host_ignores_callbacks() {
        let host = SharedHost::new(Counter::default());
        let weak = host.downgrade();
        drop(host);
        weak.with(|_| panic!("value already dropped"));
    }
}
