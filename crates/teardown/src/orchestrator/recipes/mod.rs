//! Per-type removal recipes
//!
//! Each recipe encodes the preconditions a resource type needs before the
//! provider accepts its delete. Types without a recipe get [`DefaultRecipe`].

mod authorization;
mod data_protection;
mod diagnostics;
mod disk_encryption;
mod generic;
mod image_templates;
mod log_analytics;
mod machine_learning;
mod recovery_services;
mod subscription;

pub use authorization::{RoleAssignmentRecipe, ScheduleRequestRecipe};
pub use data_protection::BackupVaultRecipe;
pub use diagnostics::DiagnosticSettingRecipe;
pub use disk_encryption::DiskEncryptionSetRecipe;
pub use generic::{DefaultRecipe, LockRecipe, NamespaceRuleRecipe, NoopRecipe, forced_delete};
pub use image_templates::ImageTemplateRecipe;
pub use log_analytics::LogAnalyticsWorkspaceRecipe;
pub use machine_learning::MachineLearningWorkspaceRecipe;
pub use recovery_services::RecoveryVaultRecipe;
pub use subscription::SubscriptionAliasRecipe;

use super::registry::RecipeRegistry;
use teardown_common::ResourceKind;

pub(crate) fn register_builtin(registry: &mut RecipeRegistry) {
    use ResourceKind::*;

    registry
        .register(DiagnosticSetting, Box::new(DiagnosticSettingRecipe))
        .register(ManagementLock, Box::new(LockRecipe))
        .register(
            KeyVaultKey,
            Box::new(NoopRecipe::new("key vault keys are removed with their vault")),
        )
        .register(
            KeyVaultAccessPolicy,
            Box::new(NoopRecipe::new(
                "access policies are removed with their vault",
            )),
        )
        .register(NamespaceAuthorizationRule, Box::new(NamespaceRuleRecipe))
        .register(DiskEncryptionSet, Box::new(DiskEncryptionSetRecipe))
        .register(RecoveryServicesVault, Box::new(RecoveryVaultRecipe))
        .register(BackupVault, Box::new(BackupVaultRecipe))
        .register(LogAnalyticsWorkspace, Box::new(LogAnalyticsWorkspaceRecipe))
        .register(ImageTemplate, Box::new(ImageTemplateRecipe))
        .register(
            MachineLearningWorkspace,
            Box::new(MachineLearningWorkspaceRecipe),
        )
        .register(RoleAssignment, Box::new(RoleAssignmentRecipe))
        .register(
            RoleEligibilityScheduleRequest,
            Box::new(ScheduleRequestRecipe::eligibility()),
        )
        .register(
            RoleAssignmentScheduleRequest,
            Box::new(ScheduleRequestRecipe::assignment()),
        )
        .register(SubscriptionAlias, Box::new(SubscriptionAliasRecipe));
}
