use crate::orchestrator::context::RemovalContext;
use crate::orchestrator::error::RemovalError;
use crate::orchestrator::registry::Recipe;
use crate::orchestrator::report::RemovalOutcome;
use crate::wait::{Poll, PollOutcome};
use async_trait::async_trait;

const WORKSPACE_TYPE: &str = "Microsoft.MachineLearningServices/workspaces";

/// Machine Learning workspaces are purged rather than soft-deleted, then the
/// resource group listing is polled until the workspace drops out of it.
#[derive(Debug, Default, Clone, Copy)]
pub struct MachineLearningWorkspaceRecipe;

#[async_trait]
impl Recipe for MachineLearningWorkspaceRecipe {
    fn name(&self) -> &'static str {
        "machine-learning-workspace"
    }

    async fn remove_step(&self, ctx: &mut RemovalContext<'_>) -> Result<(), RemovalError> {
        if !ctx.proceed(format!("purge machine learning workspace '{}'", ctx.target.id))? {
            return Ok(());
        }
        let removed = ctx
            .service
            .purge_ml_workspace(&ctx.target.id)
            .await
            .map_err(ctx.target.fail("purge workspace"))?;
        if !removed {
            ctx.set_outcome(RemovalOutcome::AlreadyAbsent);
        }
        Ok(())
    }

    async fn post_wait(&self, ctx: &mut RemovalContext<'_>) -> Result<(), RemovalError> {
        if ctx.already_absent() {
            return Ok(());
        }

        let subscription = ctx.target.id.subscription_id()?.to_string();
        let resource_group = ctx.target.id.resource_group()?.to_string();
        let (subscription, resource_group) = (&subscription, &resource_group);
        let service = ctx.service;
        let snapshot = ctx.target.clone();
        let target = &snapshot;
        let policy = ctx.options.poll;
        let outcome = ctx
            .poll(&policy, "workspace purged", |_| async move {
                let remaining = service
                    .list_resources_in_group(subscription, resource_group, WORKSPACE_TYPE)
                    .await
                    .map_err(target.fail("wait for workspace purge"))?;
                let present = remaining
                    .iter()
                    .any(|r| r.id.eq_ignore_ascii_case(target.id.as_str()));
                Ok(if present { Poll::Pending } else { Poll::Ready })
            })
            .await?;

        if let PollOutcome::Exhausted { attempts } = outcome {
            ctx.warn(format!(
                "workspace still listed after {} checks, continuing",
                attempts
            ));
        }
        Ok(())
    }
}
