use super::{InvalidRedirectTarget, RedirectTarget};
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

type TargetMap = HashMap<String, Arc<RedirectTarget>>;

/// Registry of named [`RedirectTarget`]s.
///
/// Clones share the same registry. Targets can be added, replaced and removed
/// at any time, also while requests are being redirected: lookups always
/// observe either the previous or the new target of a name, never a mix.
#[derive(Debug, Clone, Default)]
pub struct RedirectTargets {
    targets: Arc<ArcSwap<TargetMap>>,
}

impl RedirectTargets {
    /// Create a new, empty, [`RedirectTargets`] registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `target` and register it under `name`,
    /// replacing the target previously registered under that name.
    ///
    /// The registry is left untouched when `target` is not a valid [`RedirectTarget`].
    pub fn put(
        &self,
        name: impl Into<String>,
        target: &str,
    ) -> Result<&Self, InvalidRedirectTarget> {
        let target: RedirectTarget = target.parse()?;
        Ok(self.insert(name, target))
    }

    /// Register an already parsed `target` under `name`,
    /// replacing the target previously registered under that name.
    pub fn insert(&self, name: impl Into<String>, target: RedirectTarget) -> &Self {
        let name = name.into();
        let target = Arc::new(target);
        self.targets.rcu(|current| {
            let mut targets = TargetMap::clone(current);
            targets.insert(name.clone(), target.clone());
            targets
        });
        self
    }

    /// Remove the target registered under `name`, if any.
    pub fn remove(&self, name: &str) -> &Self {
        if self.targets.load().contains_key(name) {
            self.targets.rcu(|current| {
                let mut targets = TargetMap::clone(current);
                targets.remove(name);
                targets
            });
        }
        self
    }

    /// Remove all registered targets.
    pub fn clear(&self) -> &Self {
        self.targets.store(Arc::default());
        self
    }

    /// Look up the target registered under `name`.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Arc<RedirectTarget>> {
        self.targets.load().get(name).cloned()
    }

    /// Returns true if a target is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.targets.load().contains_key(name)
    }

    /// Amount of registered targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.load().len()
    }

    /// Returns true if no targets are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.load().is_empty()
    }
}
