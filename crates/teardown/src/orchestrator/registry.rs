//! Recipe trait and the kind → recipe registry

use super::context::{RemovalContext, RemovalOptions, Target};
use super::error::RemovalError;
use super::recipes;
use super::report::RemovalOutcome;
use async_trait::async_trait;
use std::collections::HashMap;
use teardown_common::{ResourceKind, ResourceType};

/// Whether a recipe continues after its pre-steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop here with the given outcome (e.g. the resource is already gone)
    Stop(RemovalOutcome),
}

/// Per-type removal procedure.
///
/// The orchestrator calls `skip_reason`, removes locks, then runs
/// `pre_steps`, `remove_step` and `post_wait` in order. Any error aborts the
/// remaining steps; nothing is rolled back.
#[async_trait]
pub trait Recipe: Send + Sync {
    fn name(&self) -> &'static str;

    /// Decided from the target and options alone, before any provider call
    fn skip_reason(&self, _target: &Target, _options: &RemovalOptions) -> Option<String> {
        None
    }

    /// Mutations that must happen before the delete
    async fn pre_steps(&self, _ctx: &mut RemovalContext<'_>) -> Result<Flow, RemovalError> {
        Ok(Flow::Continue)
    }

    async fn remove_step(&self, ctx: &mut RemovalContext<'_>) -> Result<(), RemovalError>;

    /// Wait for the provider to finish an asynchronous delete
    async fn post_wait(&self, _ctx: &mut RemovalContext<'_>) -> Result<(), RemovalError> {
        Ok(())
    }
}

/// Maps resource kinds to their recipe; everything else gets the default
pub struct RecipeRegistry {
    recipes: HashMap<ResourceKind, Box<dyn Recipe>>,
    fallback: Box<dyn Recipe>,
}

impl RecipeRegistry {
    /// Registry with no specific recipes: everything is a generic delete
    pub fn empty() -> Self {
        Self {
            recipes: HashMap::new(),
            fallback: Box::new(recipes::DefaultRecipe),
        }
    }

    /// Registry with a recipe for every known kind
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        recipes::register_builtin(&mut registry);
        registry
    }

    pub fn register(&mut self, kind: ResourceKind, recipe: Box<dyn Recipe>) -> &mut Self {
        self.recipes.insert(kind, recipe);
        self
    }

    pub fn recipe_for(&self, resource_type: &ResourceType) -> &dyn Recipe {
        resource_type
            .kind()
            .and_then(|kind| self.recipes.get(&kind))
            .map_or(self.fallback.as_ref(), |r| r.as_ref())
    }

    pub fn is_registered(&self, kind: ResourceKind) -> bool {
        self.recipes.contains_key(&kind)
    }
}

impl Default for RecipeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_every_kind() {
        let registry = RecipeRegistry::builtin();
        for kind in ResourceKind::ALL {
            assert!(registry.is_registered(kind), "{kind} has no recipe");
        }
    }

    #[test]
    fn test_unknown_type_falls_back() {
        let registry = RecipeRegistry::builtin();
        let recipe = registry.recipe_for(&ResourceType::parse("Microsoft.Storage/storageAccounts"));
        assert_eq!(recipe.name(), "default");
    }

    #[test]
    fn test_dispatch_is_case_insensitive() {
        let registry = RecipeRegistry::builtin();
        let recipe =
            registry.recipe_for(&ResourceType::parse("microsoft.insights/DIAGNOSTICSETTINGS"));
        assert_eq!(recipe.name(), "diagnostic-setting");
    }
}
