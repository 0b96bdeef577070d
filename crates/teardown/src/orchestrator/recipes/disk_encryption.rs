use super::generic::forced_delete;
use crate::orchestrator::context::RemovalContext;
use crate::orchestrator::error::RemovalError;
use crate::orchestrator::registry::{Flow, Recipe};
use crate::orchestrator::report::RemovalOutcome;
use async_trait::async_trait;
use tracing::debug;

/// Disk encryption sets hold an access-policy grant on their key vault. The
/// grant is revoked first so the vault is left clean.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskEncryptionSetRecipe;

#[async_trait]
impl Recipe for DiskEncryptionSetRecipe {
    fn name(&self) -> &'static str {
        "disk-encryption-set"
    }

    async fn pre_steps(&self, ctx: &mut RemovalContext<'_>) -> Result<Flow, RemovalError> {
        let Some(set) = ctx
            .service
            .get_disk_encryption_set(&ctx.target.id)
            .await
            .map_err(ctx.target.fail("read disk encryption set"))?
        else {
            debug!(resource_id = %ctx.target.id, "Disk encryption set already gone");
            return Ok(Flow::Stop(RemovalOutcome::AlreadyAbsent));
        };

        let vault_id = set
            .key_vault_id()
            .ok_or_else(|| ctx.target.precondition("read disk encryption set", "no active key vault"))?;
        let (Some(principal_id), Some(tenant_id)) = (set.principal_id(), set.tenant_id()) else {
            return Err(ctx
                .target
                .precondition("read disk encryption set", "no managed identity"));
        };

        if ctx.proceed(format!(
            "remove access policy of principal '{}' from key vault '{}'",
            principal_id, vault_id
        ))? {
            ctx.service
                .remove_key_vault_access_policy(vault_id, tenant_id, principal_id)
                .await
                .map_err(ctx.target.fail("remove key vault access policy"))?;
        }
        Ok(Flow::Continue)
    }

    async fn remove_step(&self, ctx: &mut RemovalContext<'_>) -> Result<(), RemovalError> {
        forced_delete(ctx).await
    }
}
