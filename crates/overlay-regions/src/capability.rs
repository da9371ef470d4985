use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::target::RenderTarget;
use crate::{Category, Region};

#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The renderer was handed a shape it does not draw.
    UnsupportedShape(&'static str),
    Failed(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::UnsupportedShape(what) => write!(f, "unsupported shape for {}", what),
            RenderError::Failed(msg) => write!(f, "render failed: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

pub type RenderFn =
    Arc<dyn Fn(&mut RenderTarget, &Region) -> Result<(), RenderError> + Send + Sync>;

/// What a category can draw: `render` runs on any thread, `render_sync`
/// only on the frame thread.
#[derive(Clone)]
pub struct Capability {
    render: RenderFn,
    render_sync: Option<RenderFn>,
}

impl Capability {
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(&mut RenderTarget, &Region) -> Result<(), RenderError> + Send + Sync + 'static,
    {
        Self {
            render: Arc::new(render),
            render_sync: None,
        }
    }

    pub fn with_sync<F>(mut self, render_sync: F) -> Self
    where
        F: Fn(&mut RenderTarget, &Region) -> Result<(), RenderError> + Send + Sync + 'static,
    {
        self.render_sync = Some(Arc::new(render_sync));
        self
    }

    #[inline]
    pub fn render(&self, target: &mut RenderTarget, region: &Region) -> Result<(), RenderError> {
        (self.render)(target, region)
    }

    /// No-op for capabilities without a synchronous half.
    #[inline]
    pub fn render_sync(
        &self,
        target: &mut RenderTarget,
        region: &Region,
    ) -> Result<(), RenderError> {
        match &self.render_sync {
            Some(f) => f(target, region),
            None => Ok(()),
        }
    }

    #[inline]
    pub fn has_sync(&self) -> bool {
        self.render_sync.is_some()
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("has_sync", &self.has_sync())
            .finish()
    }
}

#[derive(Clone, Debug, Default)]
pub struct CapabilityTable {
    entries: HashMap<Category, Capability>,
    /// Used for structure categories that were not registered by name.
    structure_fallback: Option<Capability>,
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, category: Category, capability: Capability) {
        if self.entries.insert(category.clone(), capability).is_some() {
            log::debug!("replaced renderer for {}", category);
        }
    }

    pub fn remove(&mut self, category: &Category) -> Option<Capability> {
        self.entries.remove(category)
    }

    pub fn set_structure_fallback(&mut self, capability: Capability) {
        self.structure_fallback = Some(capability);
    }

    /// `None` means the category is unregistered; callers skip such regions.
    pub fn get(&self, category: &Category) -> Option<&Capability> {
        match self.entries.get(category) {
            Some(cap) => Some(cap),
            None if matches!(category, Category::Structure(_)) => {
                self.structure_fallback.as_ref()
            }
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
