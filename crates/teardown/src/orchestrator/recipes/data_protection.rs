use super::generic::forced_delete;
use crate::arm::types::GenericResource;
use crate::orchestrator::context::RemovalContext;
use crate::orchestrator::error::RemovalError;
use crate::orchestrator::registry::{Flow, Recipe};
use crate::orchestrator::report::RemovalOutcome;
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

/// Data Protection backup vaults. The order is strict: immutability, soft
/// delete, undelete, instances, policies, vault. Each step is refused by the
/// provider while the previous one is still in effect, so accepted
/// operations are awaited before moving on.
#[derive(Debug, Default, Clone, Copy)]
pub struct BackupVaultRecipe;

impl BackupVaultRecipe {
    async fn delete_children(
        ctx: &mut RemovalContext<'_>,
        children: &[GenericResource],
        what: &str,
    ) -> Result<(), RemovalError> {
        for child in children {
            if ctx.proceed(format!("delete {} '{}'", what, child.name))? {
                let step = format!("delete {}", what);
                let completion = ctx
                    .service
                    .delete_backup_vault_child(&child.id)
                    .await
                    .map_err(ctx.target.fail(&step))?;
                ctx.await_completion(completion, &step).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Recipe for BackupVaultRecipe {
    fn name(&self) -> &'static str {
        "backup-vault"
    }

    async fn pre_steps(&self, ctx: &mut RemovalContext<'_>) -> Result<Flow, RemovalError> {
        let Some(vault) = ctx
            .service
            .get_backup_vault(&ctx.target.id)
            .await
            .map_err(ctx.target.fail("read backup vault"))?
        else {
            debug!(resource_id = %ctx.target.id, "Backup vault already gone");
            return Ok(Flow::Stop(RemovalOutcome::AlreadyAbsent));
        };

        if vault.immutability_enabled()
            && ctx.proceed(format!("disable immutability on '{}'", ctx.target.id))?
        {
            ctx.service
                .update_backup_vault_security(
                    &ctx.target.id,
                    json!({"immutabilitySettings": {"state": "Disabled"}}),
                )
                .await
                .map_err(ctx.target.fail("disable immutability"))?;
        }

        if vault.soft_delete_enabled()
            && ctx.proceed(format!("disable soft delete on '{}'", ctx.target.id))?
        {
            ctx.service
                .update_backup_vault_security(
                    &ctx.target.id,
                    json!({"softDeleteSettings": {"state": "Off", "retentionDurationInDays": 14}}),
                )
                .await
                .map_err(ctx.target.fail("disable soft delete"))?;
        }

        let deleted = ctx
            .service
            .list_deleted_backup_instances(&ctx.target.id)
            .await
            .map_err(ctx.target.fail("list deleted backup instances"))?;
        for instance in &deleted {
            if ctx.proceed(format!("undelete backup instance '{}'", instance.name))? {
                let completion = ctx
                    .service
                    .undelete_backup_instance(&instance.id)
                    .await
                    .map_err(ctx.target.fail("undelete backup instance"))?;
                ctx.await_completion(completion, "undelete backup instance")
                    .await?;
            }
        }

        let instances = ctx
            .service
            .list_backup_instances(&ctx.target.id)
            .await
            .map_err(ctx.target.fail("list backup instances"))?;
        Self::delete_children(ctx, &instances, "backup instance").await?;

        let policies = ctx
            .service
            .list_backup_policies(&ctx.target.id)
            .await
            .map_err(ctx.target.fail("list backup policies"))?;
        Self::delete_children(ctx, &policies, "backup policy").await?;

        Ok(Flow::Continue)
    }

    async fn remove_step(&self, ctx: &mut RemovalContext<'_>) -> Result<(), RemovalError> {
        forced_delete(ctx).await
    }
}
