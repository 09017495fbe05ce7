//! Process-wide table of named viewports.
//!
//! The app owns exactly one registry. A name maps to at most one live
//! viewport; asking for an existing name returns the same instance and never
//! builds a second surface for it. Nothing is disposed implicitly: views that
//! are retired for good go through [`ViewportRegistry::dispose`].

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::config::ViewerConfig;
use crate::error::ViewportError;
use crate::viewport::surface::{Container, Surface};
use crate::viewport::Viewport;

/// Shared handle to a registered viewport. Each call through [`Self::with`] is a
/// critical section; a reentrant call reports [`ViewportError::Busy`] instead of
/// touching state mid-operation.
pub struct ViewportHandle<S: Surface>(Rc<RefCell<Viewport<S>>>);

impl<S: Surface> Clone for ViewportHandle<S> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<S: Surface> ViewportHandle<S> {
    pub fn with<R>(&self, f: impl FnOnce(&mut Viewport<S>) -> R) -> Result<R, ViewportError> {
        let mut viewport = self.0.try_borrow_mut().map_err(|_| ViewportError::Busy)?;
        Ok(f(&mut viewport))
    }

    /// Like [`Self::with`] for operations that already return a viewport result.
    pub fn try_with<R>(
        &self,
        f: impl FnOnce(&mut Viewport<S>) -> Result<R, ViewportError>,
    ) -> Result<R, ViewportError> {
        self.with(f)?
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

pub struct ViewportRegistry<S: Surface> {
    config: ViewerConfig,
    viewports: BTreeMap<String, ViewportHandle<S>>,
}

impl<S: Surface> ViewportRegistry<S> {
    pub fn new(config: ViewerConfig) -> Self {
        Self { config, viewports: BTreeMap::new() }
    }

    /// Returns the viewport registered as `name`, creating it first if needed.
    /// `make_surface` runs only when a new viewport is built. A failed creation
    /// leaves nothing registered, so the caller can retry later.
    pub fn get_or_create(
        &mut self,
        name: &str,
        container: Rc<dyn Container>,
        make_surface: impl FnOnce() -> Result<S, ViewportError>,
    ) -> Result<ViewportHandle<S>, ViewportError> {
        if let Some(existing) = self.viewports.get(name) {
            log::trace!("viewport '{name}' already exists");
            return Ok(existing.clone());
        }
        let viewport = Viewport::create(name, container, make_surface()?, self.config.clone())?;
        let handle = ViewportHandle(Rc::new(RefCell::new(viewport)));
        self.viewports.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    pub fn get(&self, name: &str) -> Option<ViewportHandle<S>> {
        self.viewports.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.viewports.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.viewports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.viewports.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.viewports.keys().map(String::as_str)
    }

    pub fn handles(&self) -> impl Iterator<Item = (&str, &ViewportHandle<S>)> {
        self.viewports.iter().map(|(name, handle)| (name.as_str(), handle))
    }

    /// Disposes and unregisters `name`. Returns `false` if no such viewport.
    pub fn dispose(&mut self, name: &str) -> Result<bool, ViewportError> {
        let Some(handle) = self.viewports.remove(name) else {
            return Ok(false);
        };
        match handle.try_with(|vp| vp.dispose()) {
            Ok(()) => Ok(true),
            Err(ViewportError::Busy) => {
                // Put it back so the caller can retry once the operation ends.
                self.viewports.insert(name.to_string(), handle);
                Err(ViewportError::Busy)
            }
            Err(e) => Err(e),
        }
    }

    pub fn dispose_all(&mut self) {
        let names: Vec<String> = self.viewports.keys().cloned().collect();
        for name in names {
            if let Err(e) = self.dispose(&name) {
                log::warn!("disposing viewport '{name}': {e}");
            }
        }
    }
}

impl<S: Surface> Drop for ViewportRegistry<S> {
    fn drop(&mut self) {
        self.dispose_all();
    }
}
