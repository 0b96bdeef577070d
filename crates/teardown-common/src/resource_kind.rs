//! Resource kinds with a dedicated removal recipe
//!
//! ARM type strings are matched case-insensitively. Anything not listed here
//! is still a valid [`ResourceType`], it simply has no [`ResourceKind`] and is
//! removed by the generic recipe.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource types the orchestrator knows a specialised recipe for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Diagnostic setting attached to an arbitrary parent resource
    DiagnosticSetting,
    /// Administrative management lock
    ManagementLock,
    /// Key Vault key (owned by a higher-level recipe)
    KeyVaultKey,
    /// Key Vault access policy (owned by a higher-level recipe)
    KeyVaultAccessPolicy,
    /// Event Hub / Service Bus / Relay namespace authorization rule
    NamespaceAuthorizationRule,
    /// Disk encryption set (holds an access policy on its key vault)
    DiskEncryptionSet,
    /// Recovery Services vault (soft-deleted backup items block deletion)
    RecoveryServicesVault,
    /// Data Protection backup vault (immutability, soft delete, instances, policies)
    BackupVault,
    /// Log Analytics workspace (replication cool-down, permanent delete)
    LogAnalyticsWorkspace,
    /// Azure Image Builder template (asynchronous delete)
    ImageTemplate,
    /// Machine Learning workspace (must be purged)
    MachineLearningWorkspace,
    /// Role assignment
    RoleAssignment,
    /// PIM eligibility schedule request
    RoleEligibilityScheduleRequest,
    /// PIM assignment schedule request
    RoleAssignmentScheduleRequest,
    /// Subscription alias (test-fixture subscriptions only)
    SubscriptionAlias,
}

/// ARM type strings mapped to their kind. Several namespaces share a kind.
const TYPE_TABLE: &[(&str, ResourceKind)] = &[
    (
        "Microsoft.Insights/diagnosticSettings",
        ResourceKind::DiagnosticSetting,
    ),
    ("Microsoft.Authorization/locks", ResourceKind::ManagementLock),
    ("Microsoft.KeyVault/vaults/keys", ResourceKind::KeyVaultKey),
    (
        "Microsoft.KeyVault/vaults/accessPolicies",
        ResourceKind::KeyVaultAccessPolicy,
    ),
    (
        "Microsoft.EventHub/namespaces/authorizationRules",
        ResourceKind::NamespaceAuthorizationRule,
    ),
    (
        "Microsoft.ServiceBus/namespaces/authorizationRules",
        ResourceKind::NamespaceAuthorizationRule,
    ),
    (
        "Microsoft.Relay/namespaces/authorizationRules",
        ResourceKind::NamespaceAuthorizationRule,
    ),
    (
        "Microsoft.Compute/diskEncryptionSets",
        ResourceKind::DiskEncryptionSet,
    ),
    (
        "Microsoft.RecoveryServices/vaults",
        ResourceKind::RecoveryServicesVault,
    ),
    ("Microsoft.DataProtection/backupVaults", ResourceKind::BackupVault),
    (
        "Microsoft.OperationalInsights/workspaces",
        ResourceKind::LogAnalyticsWorkspace,
    ),
    (
        "Microsoft.VirtualMachineImages/imageTemplates",
        ResourceKind::ImageTemplate,
    ),
    (
        "Microsoft.MachineLearningServices/workspaces",
        ResourceKind::MachineLearningWorkspace,
    ),
    (
        "Microsoft.Authorization/roleAssignments",
        ResourceKind::RoleAssignment,
    ),
    (
        "Microsoft.Authorization/roleEligibilityScheduleRequests",
        ResourceKind::RoleEligibilityScheduleRequest,
    ),
    (
        "Microsoft.Authorization/roleAssignmentScheduleRequests",
        ResourceKind::RoleAssignmentScheduleRequest,
    ),
    ("Microsoft.Subscription/aliases", ResourceKind::SubscriptionAlias),
];

impl ResourceKind {
    /// Every kind, in registry order
    pub const ALL: [ResourceKind; 15] = [
        ResourceKind::DiagnosticSetting,
        ResourceKind::ManagementLock,
        ResourceKind::KeyVaultKey,
        ResourceKind::KeyVaultAccessPolicy,
        ResourceKind::NamespaceAuthorizationRule,
        ResourceKind::DiskEncryptionSet,
        ResourceKind::RecoveryServicesVault,
        ResourceKind::BackupVault,
        ResourceKind::LogAnalyticsWorkspace,
        ResourceKind::ImageTemplate,
        ResourceKind::MachineLearningWorkspace,
        ResourceKind::RoleAssignment,
        ResourceKind::RoleEligibilityScheduleRequest,
        ResourceKind::RoleAssignmentScheduleRequest,
        ResourceKind::SubscriptionAlias,
    ];

    /// Look up the kind for an ARM type string (case-insensitive)
    pub fn from_type(resource_type: &str) -> Option<Self> {
        let resource_type = resource_type.trim();
        TYPE_TABLE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(resource_type))
            .map(|(_, kind)| *kind)
    }

    /// Canonical ARM type string (first entry in the type table)
    pub fn as_str(self) -> &'static str {
        TYPE_TABLE
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ARM resource type string, with its recipe kind when one exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceType {
    raw: String,
    kind: Option<ResourceKind>,
}

impl ResourceType {
    pub fn parse(resource_type: &str) -> Self {
        Self {
            raw: resource_type.trim().to_string(),
            kind: ResourceKind::from_type(resource_type),
        }
    }

    /// The kind this type dispatches to, `None` for the generic recipe
    pub fn kind(&self) -> Option<ResourceKind> {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Provider namespace, e.g. `Microsoft.Compute`
    pub fn namespace(&self) -> Option<&str> {
        self.raw.split_once('/').map(|(ns, _)| ns)
    }

    /// Type path below the namespace, e.g. `virtualMachines/extensions`
    pub fn type_path(&self) -> Option<&str> {
        self.raw.split_once('/').map(|(_, path)| path)
    }
}

impl From<ResourceKind> for ResourceType {
    fn from(kind: ResourceKind) -> Self {
        Self {
            raw: kind.as_str().to_string(),
            kind: Some(kind),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_round_trips_through_its_type_string() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_type(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(
            ResourceKind::from_type("microsoft.insights/DIAGNOSTICSETTINGS"),
            Some(ResourceKind::DiagnosticSetting)
        );
    }

    #[test]
    fn test_namespace_rules_share_a_kind() {
        for ty in [
            "Microsoft.EventHub/namespaces/authorizationRules",
            "Microsoft.ServiceBus/namespaces/authorizationRules",
        ] {
            assert_eq!(
                ResourceKind::from_type(ty),
                Some(ResourceKind::NamespaceAuthorizationRule)
            );
        }
    }

    #[test]
    fn test_unknown_type_has_no_kind() {
        let ty = ResourceType::parse("Microsoft.Network/virtualNetworks");
        assert_eq!(ty.kind(), None);
        assert_eq!(ty.namespace(), Some("Microsoft.Network"));
        assert_eq!(ty.type_path(), Some("virtualNetworks"));
    }
}
