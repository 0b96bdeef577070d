use crate::orchestrator::context::{RemovalContext, RemovalOptions, Target};
use crate::orchestrator::error::RemovalError;
use crate::orchestrator::registry::Recipe;
use crate::orchestrator::report::RemovalOutcome;
use async_trait::async_trait;
use tracing::{debug, info};

/// Subscriptions created by test runs are never deleted outright: they are
/// emptied of the network watcher group, parked in the decommission
/// management group and disabled. Only aliases matching the name guard are
/// touched.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubscriptionAliasRecipe;

#[async_trait]
impl Recipe for SubscriptionAliasRecipe {
    fn name(&self) -> &'static str {
        "subscription-alias"
    }

    fn skip_reason(&self, target: &Target, options: &RemovalOptions) -> Option<String> {
        let guard = &options.subscription.name_guard;
        (!target.id.name().contains(guard.as_str()))
            .then(|| format!("alias name does not contain '{}'", guard))
    }

    async fn remove_step(&self, ctx: &mut RemovalContext<'_>) -> Result<(), RemovalError> {
        let alias_name = ctx.target.id.name().to_string();
        let Some(alias) = ctx
            .service
            .get_subscription_alias(&alias_name)
            .await
            .map_err(ctx.target.fail("read subscription alias"))?
        else {
            debug!(alias = %alias_name, "Subscription alias not found");
            ctx.set_outcome(RemovalOutcome::AlreadyAbsent);
            return Ok(());
        };
        let subscription_id = alias
            .properties
            .subscription_id
            .ok_or_else(|| ctx.target.precondition("read subscription alias", "no subscription id"))?;
        let options = ctx.options;
        let settings = &options.subscription;
        info!(alias = %alias_name, subscription_id = %subscription_id, "Decommissioning subscription");

        let network_watcher = settings.network_watcher_group.as_str();
        let has_network_watcher = ctx
            .service
            .resource_group_exists(&subscription_id, network_watcher)
            .await
            .map_err(ctx.target.fail("read network watcher resource group"))?;
        if has_network_watcher
            && ctx.proceed(format!(
                "delete resource group '{}' in subscription '{}'",
                network_watcher, subscription_id
            ))?
        {
            ctx.service
                .delete_resource_group(&subscription_id, network_watcher)
                .await
                .map_err(ctx.target.fail("delete network watcher resource group"))?;
        }

        let management_group = settings.management_group.as_str();
        let already_parked = ctx
            .service
            .subscription_in_management_group(management_group, &subscription_id)
            .await
            .map_err(ctx.target.fail("read management group membership"))?;
        if !already_parked
            && ctx.proceed(format!(
                "move subscription '{}' to management group '{}'",
                subscription_id, management_group
            ))?
        {
            ctx.service
                .move_subscription_to_management_group(management_group, &subscription_id)
                .await
                .map_err(ctx.target.fail("move subscription"))?;
        }

        let state = ctx
            .service
            .get_subscription_state(&subscription_id)
            .await
            .map_err(ctx.target.fail("read subscription state"))?;
        let enabled = state
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("Enabled"));
        if enabled && ctx.proceed(format!("disable subscription '{}'", subscription_id))? {
            ctx.service
                .disable_subscription(&subscription_id)
                .await
                .map_err(ctx.target.fail("disable subscription"))?;
        }
        Ok(())
    }
}
