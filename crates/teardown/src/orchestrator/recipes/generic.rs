//! Generic delete, explicit no-ops, lock and namespace-rule recipes

use crate::locks::LockTarget;
use crate::orchestrator::context::{RemovalContext, RemovalOptions, Target};
use crate::orchestrator::error::RemovalError;
use crate::orchestrator::registry::Recipe;
use crate::orchestrator::report::RemovalOutcome;
use async_trait::async_trait;
use teardown_common::defaults::ROOT_AUTHORIZATION_RULE;

/// Forced delete by id, resolving the API version from provider metadata
pub async fn forced_delete(ctx: &mut RemovalContext<'_>) -> Result<(), RemovalError> {
    let action = format!("delete {} '{}'", ctx.target.resource_type, ctx.target.id);
    if !ctx.proceed(action)? {
        return Ok(());
    }
    let removed = ctx
        .service
        .delete_resource(&ctx.target.id, &ctx.target.resource_type)
        .await
        .map_err(ctx.target.fail("delete resource"))?;
    if !removed {
        ctx.set_outcome(RemovalOutcome::AlreadyAbsent);
    }
    Ok(())
}

/// Types without a specific recipe
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRecipe;

#[async_trait]
impl Recipe for DefaultRecipe {
    fn name(&self) -> &'static str {
        "default"
    }

    async fn remove_step(&self, ctx: &mut RemovalContext<'_>) -> Result<(), RemovalError> {
        forced_delete(ctx).await
    }
}

/// Types that are removed implicitly with their parent
#[derive(Debug, Clone, Copy)]
pub struct NoopRecipe {
    reason: &'static str,
}

impl NoopRecipe {
    pub const fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

#[async_trait]
impl Recipe for NoopRecipe {
    fn name(&self) -> &'static str {
        "no-op"
    }

    fn skip_reason(&self, _target: &Target, _options: &RemovalOptions) -> Option<String> {
        Some(self.reason.to_string())
    }

    async fn remove_step(&self, _ctx: &mut RemovalContext<'_>) -> Result<(), RemovalError> {
        Ok(())
    }
}

/// Messaging namespace authorization rules. The root rule exists for the
/// namespace's lifetime and cannot be deleted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NamespaceRuleRecipe;

#[async_trait]
impl Recipe for NamespaceRuleRecipe {
    fn name(&self) -> &'static str {
        "namespace-authorization-rule"
    }

    fn skip_reason(&self, target: &Target, _options: &RemovalOptions) -> Option<String> {
        target
            .id
            .name()
            .eq_ignore_ascii_case(ROOT_AUTHORIZATION_RULE)
            .then(|| format!("'{}' is managed by the namespace", ROOT_AUTHORIZATION_RULE))
    }

    async fn remove_step(&self, ctx: &mut RemovalContext<'_>) -> Result<(), RemovalError> {
        forced_delete(ctx).await
    }
}

/// Lock resources are handed to the lock remover
#[derive(Debug, Default, Clone, Copy)]
pub struct LockRecipe;

#[async_trait]
impl Recipe for LockRecipe {
    fn name(&self) -> &'static str {
        "management-lock"
    }

    async fn remove_step(&self, ctx: &mut RemovalContext<'_>) -> Result<(), RemovalError> {
        let target = LockTarget::Lock(ctx.target.id.clone());
        let removed = ctx.unlock(&target, "remove lock").await?;
        // The lock usually went in the pre-dispatch sweep already
        if removed.is_empty() && ctx.removed_locks().is_empty() {
            ctx.set_outcome(RemovalOutcome::AlreadyAbsent);
        }
        ctx.record_locks(removed);
        Ok(())
    }
}
