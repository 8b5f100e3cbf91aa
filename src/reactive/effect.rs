//! Effect hook
//!
//! An effect is a keyed action guarded by a dependency value. The action runs
//! the first time a key is seen and afterwards only when the dependencies
//! differ from the ones recorded at the previous run. `Vec` and tuple
//! dependencies compare element-wise, so a length change counts as a change.
//!
//! Effects are synchronous. Failures (returned errors and panics) are logged
//! and swallowed so an effect can never take down the render path.

use crate::util::{contain_panic, panic_message};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;

/// Per-component store of effect dependencies
pub struct EffectRegistry {
    owner: String,
    deps: Mutex<HashMap<String, Box<dyn Any + Send>>>,
}

impl EffectRegistry {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            deps: Mutex::new(HashMap::new()),
        }
    }

    /// Run `action` if `deps` differ from the last run under `key`.
    ///
    /// Returns `true` when the action was executed (whether or not it failed).
    /// Dependencies of a different type than last time count as changed.
    pub fn run<D, F>(&self, key: &str, deps: D, action: F) -> bool
    where
        D: PartialEq + Send + 'static,
        F: FnOnce() -> anyhow::Result<()>,
    {
        {
            let mut stored = self.deps.lock();
            let unchanged = stored
                .get(key)
                .and_then(|prev| prev.downcast_ref::<D>())
                .is_some_and(|prev| *prev == deps);
            if unchanged {
                return false;
            }
            stored.insert(key.to_string(), Box::new(deps));
        }

        // Lock released: the action may register further effects
        match contain_panic(action) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!("Effect '{}' of {} failed: {:#}", key, self.owner, e);
            }
            Err(payload) => {
                tracing::error!(
                    "Effect '{}' of {} panicked: {}",
                    key,
                    self.owner,
                    panic_message(payload.as_ref())
                );
            }
        }
        true
    }

    /// Forget all recorded dependencies; every effect runs again on next call
    pub fn clear(&self) {
        self.deps.lock().clear();
    }

    /// Number of registered effect keys
    pub fn len(&self) -> usize {
        self.deps.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_identical_deps_run_once() {
        let effects = EffectRegistry::new("test");
        let runs = Cell::new(0);

        effects.run("load", vec![1], || {
            runs.set(runs.get() + 1);
            Ok(())
        });
        effects.run("load", vec![1], || {
            runs.set(runs.get() + 1);
            Ok(())
        });

        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_different_deps_run_twice() {
        let effects = EffectRegistry::new("test");
        let runs = Cell::new(0);

        assert!(effects.run("load", vec![1], || {
            runs.set(runs.get() + 1);
            Ok(())
        }));
        assert!(effects.run("load", vec![2], || {
            runs.set(runs.get() + 1);
            Ok(())
        }));

        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_length_change_reruns() {
        let effects = EffectRegistry::new("test");
        assert!(effects.run("k", vec![1, 2], || Ok(())));
        assert!(effects.run("k", vec![1, 2, 3], || Ok(())));
        assert!(!effects.run("k", vec![1, 2, 3], || Ok(())));
    }

    #[test]
    fn test_keys_are_independent() {
        let effects = EffectRegistry::new("test");
        assert!(effects.run("a", 1u32, || Ok(())));
        assert!(effects.run("b", 1u32, || Ok(())));
        assert!(!effects.run("a", 1u32, || Ok(())));
        assert_eq!(effects.len(), 2);
    }

    #[test]
    fn test_failures_are_contained() {
        let effects = EffectRegistry::new("test");
        assert!(effects.run("err", 1, || anyhow::bail!("boom")));
        assert!(effects.run("panic", 1, || panic!("kaboom")));
        // Deps were still recorded, so neither reruns with the same input
        assert!(!effects.run("err", 1, || Ok(())));
        assert!(!effects.run("panic", 1, || Ok(())));
    }

    #[test]
    fn test_clear_forces_rerun() {
        let effects = EffectRegistry::new("test");
        effects.run("k", "x", || Ok(()));
        effects.clear();
        assert!(effects.is_empty());
        assert!(effects.run("k", "x", || Ok(())));
    }
}
