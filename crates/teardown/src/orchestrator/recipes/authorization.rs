use crate::orchestrator::context::RemovalContext;
use crate::orchestrator::error::RemovalError;
use crate::orchestrator::registry::Recipe;
use crate::orchestrator::report::RemovalOutcome;
use async_trait::async_trait;
use serde_json::json;
use teardown_common::ResourceId;
use teardown_common::defaults::api_versions;
use tracing::debug;
use uuid::Uuid;

/// `.../providers/Microsoft.Authorization/<collection>/<name>` sits four
/// segments below the scope it applies to
const SCOPE_DEPTH: usize = 4;

fn scope_of(ctx: &RemovalContext<'_>) -> Result<ResourceId, RemovalError> {
    Ok(ctx.target.id.parent_scope(SCOPE_DEPTH)?)
}

/// Role assignments are deleted at their scope
#[derive(Debug, Default, Clone, Copy)]
pub struct RoleAssignmentRecipe;

#[async_trait]
impl Recipe for RoleAssignmentRecipe {
    fn name(&self) -> &'static str {
        "role-assignment"
    }

    async fn remove_step(&self, ctx: &mut RemovalContext<'_>) -> Result<(), RemovalError> {
        let scope = scope_of(ctx)?;
        let assignments = match ctx.service.list_role_assignments(&scope).await {
            Ok(assignments) => assignments,
            Err(e) if e.is_not_found() => {
                debug!(resource_id = %ctx.target.id, scope = %scope, "Scope already gone");
                ctx.set_outcome(RemovalOutcome::AlreadyAbsent);
                return Ok(());
            }
            Err(e) => return Err(ctx.target.fail("list role assignments")(e)),
        };

        let Some(assignment) = assignments
            .into_iter()
            .find(|a| a.id.eq_ignore_ascii_case(ctx.target.id.as_str()))
        else {
            debug!(resource_id = %ctx.target.id, scope = %scope, "Role assignment not found at scope");
            ctx.set_outcome(RemovalOutcome::AlreadyAbsent);
            return Ok(());
        };

        if ctx.proceed(format!(
            "delete role assignment '{}' at scope '{}'",
            assignment.name, scope
        ))? {
            ctx.service
                .delete_at(&assignment.id, api_versions::ROLE_ASSIGNMENTS)
                .await
                .map_err(ctx.target.fail("delete role assignment"))?;
        }
        Ok(())
    }
}

/// PIM schedule requests cannot be deleted. They are revoked by filing a new
/// `AdminRemove` request for the same principal and role, which the provider
/// only accepts some minutes after the original was created.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleRequestRecipe {
    collection: &'static str,
}

impl ScheduleRequestRecipe {
    pub const fn eligibility() -> Self {
        Self {
            collection: "roleEligibilityScheduleRequests",
        }
    }

    pub const fn assignment() -> Self {
        Self {
            collection: "roleAssignmentScheduleRequests",
        }
    }
}

#[async_trait]
impl Recipe for ScheduleRequestRecipe {
    fn name(&self) -> &'static str {
        "role-schedule-request"
    }

    async fn remove_step(&self, ctx: &mut RemovalContext<'_>) -> Result<(), RemovalError> {
        let scope = scope_of(ctx)?;
        let Some(original) = ctx
            .service
            .get_role_schedule_request(&ctx.target.id)
            .await
            .map_err(ctx.target.fail("read schedule request"))?
        else {
            debug!(resource_id = %ctx.target.id, "Schedule request not found");
            ctx.set_outcome(RemovalOutcome::AlreadyAbsent);
            return Ok(());
        };

        let cooldown = ctx.options.schedule_request_cooldown;
        debug!(
            resource_id = %ctx.target.id,
            created_on = ?original.properties.created_on,
            cooldown_secs = cooldown.as_secs(),
            "Schedule request found"
        );
        ctx.wait(cooldown, "schedule requests cannot be revoked right after creation")
            .await?;

        let name = Uuid::new_v4().to_string();
        if ctx.proceed(format!(
            "file AdminRemove request '{}' for principal '{}' at scope '{}'",
            name, original.properties.principal_id, scope
        ))? {
            let properties = json!({
                "principalId": original.properties.principal_id,
                "roleDefinitionId": original.properties.role_definition_id,
                "requestType": "AdminRemove",
                "justification": "Removed by teardown",
            });
            ctx.service
                .create_role_schedule_request(&scope, self.collection, &name, properties)
                .await
                .map_err(ctx.target.fail("create AdminRemove request"))?;
        }
        Ok(())
    }
}
