use std::sync::Arc;

use parking_lot::RwLock;

/// Consumer of scalar values, rendered on the UI execution context.
pub trait DisplaySurface: Send + Sync + 'static {
    fn update_value(&self, value: f32);
}

/// Slot holding the currently attached display surface, if any.
///
/// Cheap to clone; all clones share the slot. Attach and detach take effect for
/// the next dispatch that reads the slot.
#[derive(Clone, Default)]
pub struct ViewSlot {
    inner: Arc<RwLock<Option<Arc<dyn DisplaySurface>>>>,
}

impl ViewSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `surface`, returning the previously attached one.
    pub fn attach(&self, surface: Arc<dyn DisplaySurface>) -> Option<Arc<dyn DisplaySurface>> {
        self.inner.write().replace(surface)
    }

    /// Detaches the current surface, returning it.
    pub fn detach(&self) -> Option<Arc<dyn DisplaySurface>> {
        self.inner.write().take()
    }

    pub fn get(&self) -> Option<Arc<dyn DisplaySurface>> {
        self.inner.read().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.read().is_some()
    }
}

impl std::fmt::Debug for ViewSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewSlot")
            .field("attached", &self.is_attached())
            .finish()
    }
}
