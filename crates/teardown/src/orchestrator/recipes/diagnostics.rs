use crate::orchestrator::context::RemovalContext;
use crate::orchestrator::error::RemovalError;
use crate::orchestrator::registry::Recipe;
use crate::orchestrator::report::RemovalOutcome;
use async_trait::async_trait;

const DIAGNOSTIC_SETTINGS_TYPE: &str = "Microsoft.Insights/diagnosticSettings";

/// Diagnostic settings are extension resources: they are deleted through
/// their parent resource and setting name, not by their own id.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiagnosticSettingRecipe;

#[async_trait]
impl Recipe for DiagnosticSettingRecipe {
    fn name(&self) -> &'static str {
        "diagnostic-setting"
    }

    async fn remove_step(&self, ctx: &mut RemovalContext<'_>) -> Result<(), RemovalError> {
        let parent = ctx
            .target
            .id
            .strip_provider_suffix(DIAGNOSTIC_SETTINGS_TYPE)?;
        let name = ctx.target.id.name().to_string();

        if !ctx.proceed(format!(
            "delete diagnostic setting '{}' of '{}'",
            name, parent
        ))? {
            return Ok(());
        }

        let removed = ctx
            .service
            .delete_diagnostic_setting(&parent, &name)
            .await
            .map_err(ctx.target.fail("delete diagnostic setting"))?;
        if !removed {
            ctx.set_outcome(RemovalOutcome::AlreadyAbsent);
        }
        Ok(())
    }
}
