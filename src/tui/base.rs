//! Component base: identity plus hook-style state and effects
//!
//! Concrete components embed a `ComponentBase` and delegate `id()` to it.
//! The base is constructed with the application's [`StateCoordinator`], so
//! every state cell it hands out reports writes to the coordinator without
//! any global listener registry.
//!
//! Hooks are keyed explicitly: `use_state("draft", ...)` returns the same
//! cell on every call with that key (and value type).

use crate::reactive::{EffectRegistry, StateCell, StateCoordinator};
use crate::tui::traits::ComponentId;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct ComponentBase {
    id: ComponentId,
    name: String,
    coordinator: Arc<StateCoordinator>,
    states: Mutex<HashMap<(String, TypeId), Box<dyn Any + Send + Sync>>>,
    effects: EffectRegistry,
    /// Cleared on dispose; cell subscribers stop notifying after that
    alive: Arc<AtomicBool>,
    mounted: AtomicBool,
}

impl ComponentBase {
    pub fn new(name: impl Into<String>, coordinator: Arc<StateCoordinator>) -> Self {
        let name = name.into();
        Self {
            id: ComponentId::next(),
            effects: EffectRegistry::new(name.clone()),
            name,
            coordinator,
            states: Mutex::new(HashMap::new()),
            alive: Arc::new(AtomicBool::new(true)),
            mounted: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coordinator(&self) -> &Arc<StateCoordinator> {
        &self.coordinator
    }

    /// Get (or create on first access) the state cell for `key`.
    ///
    /// `initial` is only used the first time the key is seen.
    pub fn use_state<T>(&self, key: &str, initial: T) -> StateCell<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let slot = (key.to_string(), TypeId::of::<T>());
        let mut states = self.states.lock();

        if let Some(existing) = states
            .get(&slot)
            .and_then(|cell| cell.downcast_ref::<StateCell<T>>())
        {
            return existing.clone();
        }

        let cell = StateCell::new(format!("{}.{}", self.name, key), initial);
        let coordinator = Arc::clone(&self.coordinator);
        let alive = Arc::clone(&self.alive);
        let id = self.id;
        cell.subscribe(move |_| {
            if alive.load(Ordering::Acquire) {
                coordinator.notify_changed(id);
            }
        });

        states.insert(slot, Box::new(cell.clone()));
        cell
    }

    /// Run `action` on first call for `key` and whenever `deps` change
    pub fn use_effect<D, F>(&self, key: &str, deps: D, action: F) -> bool
    where
        D: PartialEq + Send + 'static,
        F: FnOnce() -> anyhow::Result<()>,
    {
        self.effects.run(key, deps, action)
    }

    /// Ask for a redraw without touching a state cell
    pub fn request_render(&self) {
        if self.alive.load(Ordering::Acquire) {
            self.coordinator.notify_changed(self.id);
        }
    }

    pub fn set_mounted(&self, mounted: bool) {
        self.mounted.store(mounted, Ordering::Release);
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    pub fn is_disposed(&self) -> bool {
        !self.alive.load(Ordering::Acquire)
    }

    /// Detach all hooks. Idempotent.
    pub fn dispose(&self) {
        if self.alive.swap(false, Ordering::AcqRel) {
            self.mounted.store(false, Ordering::Release);
            self.effects.clear();
            self.states.lock().clear();
            tracing::debug!("Disposed component {} ({})", self.name, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_use_state_returns_same_cell() {
        let coordinator = StateCoordinator::new(Duration::from_millis(10));
        let base = ComponentBase::new("widget", coordinator);

        let a = base.use_state("count", 1u32);
        let b = base.use_state("count", 99u32);
        assert!(a.same_cell(&b));
        assert_eq!(b.get(), 1);

        // Same key, different type is a different cell
        let c = base.use_state("count", String::from("x"));
        assert_eq!(c.get(), "x");
    }

    #[tokio::test]
    async fn test_state_writes_reach_coordinator() {
        let coordinator = StateCoordinator::new(Duration::from_millis(10));
        let base = ComponentBase::new("widget", Arc::clone(&coordinator));
        let cell = base.use_state("count", 0u32);

        cell.set(0);
        assert!(!coordinator.has_pending());

        cell.set(1);
        assert!(coordinator.has_pending_for(base.id()));
    }

    #[tokio::test]
    async fn test_disposed_base_stops_notifying() {
        let coordinator = StateCoordinator::new(Duration::from_millis(10));
        let base = ComponentBase::new("widget", Arc::clone(&coordinator));
        let cell = base.use_state("count", 0u32);

        base.dispose();
        base.dispose();
        assert!(base.is_disposed());

        cell.set(5);
        base.request_render();
        assert!(!coordinator.has_pending());
    }

    #[tokio::test]
    async fn test_use_effect_gates_on_deps() {
        let coordinator = StateCoordinator::new(Duration::from_millis(10));
        let base = ComponentBase::new("widget", coordinator);
        let mut runs = 0;

        base.use_effect("fetch", vec![1], || {
            runs += 1;
            Ok(())
        });
        base.use_effect("fetch", vec![1], || {
            runs += 1;
            Ok(())
        });
        base.use_effect("fetch", vec![2], || {
            runs += 1;
            Ok(())
        });

        assert_eq!(runs, 2);
    }
}
