use crate::orchestrator::context::RemovalContext;
use crate::orchestrator::error::RemovalError;
use crate::orchestrator::registry::{Flow, Recipe};
use crate::orchestrator::report::RemovalOutcome;
use crate::wait::{Poll, PollOutcome};
use async_trait::async_trait;
use tracing::debug;

/// Log Analytics workspaces. Replication can only be disabled once it is at
/// least an hour old, and the workspace cannot be deleted until replication
/// is off. The delete is permanent (no recycle bin).
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAnalyticsWorkspaceRecipe;

#[async_trait]
impl Recipe for LogAnalyticsWorkspaceRecipe {
    fn name(&self) -> &'static str {
        "log-analytics-workspace"
    }

    async fn pre_steps(&self, ctx: &mut RemovalContext<'_>) -> Result<Flow, RemovalError> {
        let Some(workspace) = ctx
            .service
            .get_workspace(&ctx.target.id)
            .await
            .map_err(ctx.target.fail("read workspace"))?
        else {
            debug!(resource_id = %ctx.target.id, "Workspace already gone");
            return Ok(Flow::Stop(RemovalOutcome::AlreadyAbsent));
        };

        if !workspace.replication_enabled() {
            return Ok(Flow::Continue);
        }

        let cooldown = chrono::Duration::from_std(ctx.options.replication_cooldown)
            .unwrap_or(chrono::Duration::MAX);
        if let Some(ready_at) = workspace
            .replication_created()
            .and_then(|created| created.checked_add_signed(cooldown))
        {
            let remaining = (ready_at - ctx.clock.now()).to_std().unwrap_or_default();
            ctx.wait(
                remaining,
                "replication must be enabled for an hour before it can be disabled",
            )
            .await?;
        }

        let location = workspace
            .location
            .clone()
            .ok_or_else(|| ctx.target.precondition("read workspace", "no location"))?;
        if ctx.proceed(format!("disable replication on workspace '{}'", ctx.target.id))? {
            ctx.service
                .disable_workspace_replication(&ctx.target.id, &location)
                .await
                .map_err(ctx.target.fail("disable replication"))?;
        }

        let service = ctx.service;
        let snapshot = ctx.target.clone();
        let target = &snapshot;
        let policy = ctx.options.poll;
        let outcome = ctx
            .poll(&policy, "replication disabled", |_| async move {
                let workspace = service
                    .get_workspace(&target.id)
                    .await
                    .map_err(target.fail("read workspace"))?;
                Ok(match workspace {
                    None => Poll::Ready,
                    Some(ws) if !ws.replication_enabled() && ws.provisioning_succeeded() => {
                        Poll::Ready
                    }
                    Some(_) => Poll::Pending,
                })
            })
            .await?;
        if let PollOutcome::Exhausted { attempts } = outcome {
            debug!(resource_id = %ctx.target.id, attempts, "Replication still reported, deleting anyway");
        }

        Ok(Flow::Continue)
    }

    async fn remove_step(&self, ctx: &mut RemovalContext<'_>) -> Result<(), RemovalError> {
        if !ctx.proceed(format!("permanently delete workspace '{}'", ctx.target.id))? {
            return Ok(());
        }
        let removed = ctx
            .service
            .delete_workspace_permanently(&ctx.target.id)
            .await
            .map_err(ctx.target.fail("delete workspace"))?;
        if !removed {
            ctx.set_outcome(RemovalOutcome::AlreadyAbsent);
        }
        Ok(())
    }
}
