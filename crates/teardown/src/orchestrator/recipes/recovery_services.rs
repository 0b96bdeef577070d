use super::generic::forced_delete;
use crate::arm::types::DeleteState;
use crate::orchestrator::context::RemovalContext;
use crate::orchestrator::error::RemovalError;
use crate::orchestrator::registry::{Flow, Recipe};
use crate::orchestrator::report::RemovalOutcome;
use async_trait::async_trait;
use tracing::{debug, info};

/// Recovery Services vaults refuse deletion while they hold protected items,
/// including soft-deleted ones. Soft delete is switched off, soft-deleted
/// items are rehydrated and every item's protection is removed together with
/// its recovery points.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecoveryVaultRecipe;

#[async_trait]
impl Recipe for RecoveryVaultRecipe {
    fn name(&self) -> &'static str {
        "recovery-services-vault"
    }

    async fn pre_steps(&self, ctx: &mut RemovalContext<'_>) -> Result<Flow, RemovalError> {
        let soft_delete = match ctx
            .service
            .get_recovery_vault_soft_delete(&ctx.target.id)
            .await
        {
            Ok(state) => state,
            Err(e) if e.is_not_found() => {
                debug!(resource_id = %ctx.target.id, "Vault already gone");
                return Ok(Flow::Stop(RemovalOutcome::AlreadyAbsent));
            }
            Err(e) => return Err(ctx.target.fail("read vault soft delete state")(e)),
        };

        if soft_delete.is_enabled()
            && ctx.proceed(format!("disable soft delete on vault '{}'", ctx.target.id))?
        {
            ctx.service
                .disable_recovery_vault_soft_delete(&ctx.target.id)
                .await
                .map_err(ctx.target.fail("disable soft delete"))?;
        }

        let items = ctx
            .service
            .list_backup_items(&ctx.target.id)
            .await
            .map_err(ctx.target.fail("list backup items"))?;
        info!(resource_id = %ctx.target.id, count = items.len(), "Found backup items");

        for item in items
            .iter()
            .filter(|item| item.delete_state() == DeleteState::ToBeDeleted)
        {
            if ctx.proceed(format!("undo deletion of backup item '{}'", item.name))? {
                let completion = ctx
                    .service
                    .undo_backup_item_deletion(item)
                    .await
                    .map_err(ctx.target.fail("undo backup item deletion"))?;
                ctx.await_completion(completion, "undo backup item deletion")
                    .await?;
            }
        }

        for item in &items {
            if ctx.proceed(format!(
                "disable protection and delete recovery points of backup item '{}'",
                item.name
            ))? {
                let completion = ctx
                    .service
                    .disable_backup_protection(item)
                    .await
                    .map_err(ctx.target.fail("disable backup protection"))?;
                ctx.await_completion(completion, "disable backup protection")
                    .await?;
            }
        }

        Ok(Flow::Continue)
    }

    async fn remove_step(&self, ctx: &mut RemovalContext<'_>) -> Result<(), RemovalError> {
        forced_delete(ctx).await
    }
}
