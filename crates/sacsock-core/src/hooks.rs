//! Single-slot connect and disconnect callbacks.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A lifecycle callback.
pub type LifecycleHook = Arc<dyn Fn() + Send + Sync>;

/// One replaceable callback.
#[derive(Default)]
struct Slot(RwLock<Option<LifecycleHook>>);

impl Slot {
    fn set(&self, hook: LifecycleHook) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }

    fn get(&self) -> Option<LifecycleHook> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn fire(&self) -> bool {
        // Clone out first so the hook may replace itself.
        match self.get() {
            Some(hook) => {
                hook();
                true
            }
            None => false,
        }
    }
}

/// The connect and disconnect callbacks of a client.
///
/// Setting a callback replaces the previous one.
#[derive(Default)]
pub struct LifecycleHooks {
    connect: Slot,
    disconnect: Slot,
}

impl LifecycleHooks {
    /// Create hooks with no callbacks set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect callback.
    pub fn on_connect<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.connect.set(Arc::new(hook));
    }

    /// Set the disconnect callback.
    pub fn on_disconnect<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.disconnect.set(Arc::new(hook));
    }

    /// Run the connect callback, if set.
    pub fn fire_connect(&self) -> bool {
        self.connect.fire()
    }

    /// Run the disconnect callback, if set.
    pub fn fire_disconnect(&self) -> bool {
        self.disconnect.fire()
    }
}

impl fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("connect", &self.connect.get().is_some())
            .field("disconnect", &self.disconnect.get().is_some())
            .finish()
    }
}
