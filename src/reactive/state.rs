//! Observable state cell
//!
//! A `StateCell` holds a single value plus a list of change subscribers.
//! Handles are cheap to clone and all clones share the same value.
//!
//! Writes that compare equal to the current value are no-ops: nothing is
//! stored and no subscriber runs. Subscribers run synchronously on the
//! writing thread, after the value lock has been released, so a subscriber
//! may read the cell it was notified by.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct CellInner<T> {
    key: String,
    value: Mutex<T>,
    subscribers: Mutex<Vec<Subscriber<T>>>,
}

/// A single observable value with change notification
pub struct StateCell<T> {
    inner: Arc<CellInner<T>>,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCell")
            .field("key", &self.inner.key)
            .field("value", &*self.inner.value.lock())
            .finish()
    }
}

impl<T> StateCell<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    /// Create a cell with an identity key and initial value
    pub fn new(key: impl Into<String>, initial: T) -> Self {
        Self {
            inner: Arc::new(CellInner {
                key: key.into(),
                value: Mutex::new(initial),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Identity key this cell was created with
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Clone of the current value
    pub fn get(&self) -> T {
        self.inner.value.lock().clone()
    }

    /// Borrow the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.lock())
    }

    /// Store `value` and notify subscribers, unless it equals the current value.
    ///
    /// Returns `true` when the value changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.inner.value.lock();
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        self.notify(&value);
        true
    }

    /// Mutate the value in place under the cell lock.
    ///
    /// The equality check runs against the value before `f`, so a mutation
    /// that leaves the value unchanged notifies nobody.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let changed = {
            let mut current = self.inner.value.lock();
            let mut next = current.clone();
            f(&mut next);
            if *current == next {
                None
            } else {
                *current = next.clone();
                Some(next)
            }
        };

        match changed {
            Some(value) => {
                self.notify(&value);
                true
            }
            None => false,
        }
    }

    /// Register a change subscriber
    pub fn subscribe(&self, subscriber: impl Fn(&T) + Send + Sync + 'static) {
        self.inner.subscribers.lock().push(Arc::new(subscriber));
    }

    /// Whether two handles point at the same cell
    pub fn same_cell(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn notify(&self, value: &T) {
        // Snapshot so subscribers can subscribe/set without deadlocking
        let subscribers: Vec<Subscriber<T>> = self.inner.subscribers.lock().clone();
        for subscriber in &subscribers {
            subscriber(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counted(cell: &StateCell<i32>) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        cell.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        calls
    }

    #[test]
    fn test_equal_write_is_noop() {
        let cell = StateCell::new("count", 5);
        let calls = counted(&cell);

        assert!(!cell.set(5));
        assert!(!cell.set(5));
        assert!(!cell.set(5));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(cell.get(), 5);
    }

    #[test]
    fn test_changed_write_notifies_with_new_value() {
        let cell = StateCell::new("count", 0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        cell.subscribe(move |v| s.lock().push(*v));

        assert!(cell.set(1));
        assert!(cell.set(2));
        assert!(!cell.set(2));

        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[test]
    fn test_update_only_notifies_on_change() {
        let cell = StateCell::new("text", String::from("ab"));
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        cell.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(cell.update(|s| s.push('c')));
        assert!(!cell.update(|s| s.truncate(3)));

        assert_eq!(cell.get(), "abc");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clones_share_value() {
        let a = StateCell::new("shared", 1);
        let b = a.clone();
        b.set(9);
        assert_eq!(a.get(), 9);
        assert!(a.same_cell(&b));
        assert_eq!(a.key(), "shared");
    }

    #[test]
    fn test_subscriber_may_read_cell() {
        let cell = StateCell::new("reentrant", 0);
        let reader = cell.clone();
        let seen = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&seen);
        cell.subscribe(move |_| {
            s.store(reader.get() as usize, Ordering::SeqCst);
        });

        cell.set(7);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }
}
