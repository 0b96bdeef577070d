//! Typed ARM payloads read by the removal recipes
//!
//! Only the fields the recipes depend on are modelled; everything else in
//! the provider response is ignored.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// One page of an ARM list response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    pub next_link: Option<String>,
}

/// Minimal view of any ARM resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenericResource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub resource_type: String,
}

/// Administrative lock on a scope
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManagementLock {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: LockProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LockProperties {
    /// `CanNotDelete` or `ReadOnly`
    #[serde(default)]
    pub level: String,
}

/// Provider metadata used to resolve API versions for the generic recipe
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
    #[serde(default)]
    pub resource_types: Vec<ProviderResourceType>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResourceType {
    pub resource_type: String,
    #[serde(default)]
    pub api_versions: Vec<String>,
}

impl ProviderMetadata {
    /// Newest stable API version for a type path, falling back to the newest preview
    pub fn api_version_for(&self, type_path: &str) -> Option<String> {
        let entry = self
            .resource_types
            .iter()
            .find(|t| t.resource_type.eq_ignore_ascii_case(type_path))?;
        // ARM lists versions newest first
        entry
            .api_versions
            .iter()
            .find(|v| !v.contains("preview"))
            .or_else(|| entry.api_versions.first())
            .cloned()
    }
}

/// Disk encryption set fields needed to revoke its key vault grant
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskEncryptionSet {
    pub id: String,
    #[serde(default)]
    pub identity: Option<ManagedIdentity>,
    #[serde(default)]
    pub properties: DiskEncryptionSetProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedIdentity {
    pub principal_id: Option<String>,
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskEncryptionSetProperties {
    pub active_key: Option<KeyForDiskEncryptionSet>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyForDiskEncryptionSet {
    pub source_vault: Option<SourceVault>,
    pub key_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceVault {
    pub id: String,
}

impl DiskEncryptionSet {
    /// Key vault holding the active key
    pub fn key_vault_id(&self) -> Option<&str> {
        self.properties
            .active_key
            .as_ref()
            .and_then(|k| k.source_vault.as_ref())
            .map(|v| v.id.as_str())
    }

    pub fn principal_id(&self) -> Option<&str> {
        self.identity.as_ref().and_then(|i| i.principal_id.as_deref())
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.identity.as_ref().and_then(|i| i.tenant_id.as_deref())
    }
}

/// Soft-delete state of a Recovery Services vault
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftDeleteFeatureState {
    Enabled,
    Disabled,
    AlwaysOn,
    Other(String),
}

impl SoftDeleteFeatureState {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "enabled" => Self::Enabled,
            "disabled" => Self::Disabled,
            "alwayson" => Self::AlwaysOn,
            _ => Self::Other(value.to_string()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

/// Protected item in a Recovery Services vault
#[derive(Debug, Clone, Deserialize)]
pub struct BackupItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: Value,
}

/// Deletion state of a backup item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteState {
    NotDeleted,
    /// Soft-deleted, waiting for the retention window to lapse
    ToBeDeleted,
}

impl BackupItem {
    pub fn delete_state(&self) -> DeleteState {
        let deferred = self
            .properties
            .get("isScheduledForDeferredDelete")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if deferred {
            DeleteState::ToBeDeleted
        } else {
            DeleteState::NotDeleted
        }
    }
}

/// Data Protection backup vault security settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupVault {
    pub id: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub properties: BackupVaultProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupVaultProperties {
    #[serde(default)]
    pub security_settings: Option<SecuritySettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySettings {
    pub immutability_settings: Option<StateSetting>,
    pub soft_delete_settings: Option<StateSetting>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateSetting {
    #[serde(default)]
    pub state: Option<String>,
}

impl BackupVault {
    fn settings(&self) -> Option<&SecuritySettings> {
        self.properties.security_settings.as_ref()
    }

    /// Immutability is on unless explicitly `Disabled`
    pub fn immutability_enabled(&self) -> bool {
        self.settings()
            .and_then(|s| s.immutability_settings.as_ref())
            .and_then(|s| s.state.as_deref())
            .is_some_and(|state| !state.eq_ignore_ascii_case("disabled"))
    }

    /// Soft delete is on unless explicitly `Off`
    pub fn soft_delete_enabled(&self) -> bool {
        self.settings()
            .and_then(|s| s.soft_delete_settings.as_ref())
            .and_then(|s| s.state.as_deref())
            .is_some_and(|state| !state.eq_ignore_ascii_case("off"))
    }
}

/// Log Analytics workspace fields read while disabling replication
#[derive(Debug, Clone, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub properties: WorkspaceProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub replication: Option<WorkspaceReplication>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceReplication {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub created_date: Option<String>,
}

impl Workspace {
    pub fn replication_enabled(&self) -> bool {
        self.properties
            .replication
            .as_ref()
            .is_some_and(|r| r.enabled)
    }

    /// When replication was switched on. Timestamps without an offset are UTC.
    pub fn replication_created(&self) -> Option<DateTime<Utc>> {
        let raw = self.properties.replication.as_ref()?.created_date.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .or_else(|_| {
                chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .map(|t| t.and_utc())
            })
            .ok()
    }

    pub fn provisioning_succeeded(&self) -> bool {
        self.properties
            .provisioning_state
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("Succeeded"))
    }
}

/// Role assignment at a scope
#[derive(Debug, Clone, Deserialize)]
pub struct RoleAssignment {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// PIM eligibility or assignment schedule request
#[derive(Debug, Clone, Deserialize)]
pub struct RoleScheduleRequest {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub properties: RoleScheduleRequestProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleScheduleRequestProperties {
    pub principal_id: String,
    pub role_definition_id: String,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
}

/// Subscription alias
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionAlias {
    pub name: String,
    pub properties: SubscriptionAliasProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionAliasProperties {
    pub subscription_id: Option<String>,
}

/// Result of a mutation the provider may finish asynchronously
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The target was already absent
    Absent,
    Done,
    /// Accepted; progress is reported at this operation URL
    Accepted(String),
}

/// Progress of a long-running operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Running,
    Succeeded,
}

impl OperationState {
    /// Map an `Azure-AsyncOperation` status. `None` for terminal failures.
    pub fn parse(status: &str) -> Option<Self> {
        match status.to_ascii_lowercase().as_str() {
            "succeeded" => Some(OperationState::Succeeded),
            "failed" | "canceled" | "cancelled" => None,
            _ => Some(OperationState::Running),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_api_version_prefers_stable() {
        let meta: ProviderMetadata = serde_json::from_value(json!({
            "resourceTypes": [
                {"resourceType": "storageAccounts", "apiVersions": ["2024-01-01-preview", "2023-05-01", "2022-09-01"]}
            ]
        }))
        .unwrap();
        assert_eq!(
            meta.api_version_for("StorageAccounts").as_deref(),
            Some("2023-05-01")
        );
        assert!(meta.api_version_for("blobServices").is_none());
    }

    #[test]
    fn test_disk_encryption_set_accessors() {
        let des: DiskEncryptionSet = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/diskEncryptionSets/des",
            "identity": {"type": "SystemAssigned", "principalId": "p-1", "tenantId": "t-1"},
            "properties": {"activeKey": {"sourceVault": {"id": "/kv"}, "keyUrl": "https://kv/keys/k"}}
        }))
        .unwrap();
        assert_eq!(des.key_vault_id(), Some("/kv"));
        assert_eq!(des.principal_id(), Some("p-1"));
        assert_eq!(des.tenant_id(), Some("t-1"));
    }

    #[test]
    fn test_backup_item_delete_state() {
        let item: BackupItem = serde_json::from_value(json!({
            "id": "/item",
            "properties": {"isScheduledForDeferredDelete": true}
        }))
        .unwrap();
        assert_eq!(item.delete_state(), DeleteState::ToBeDeleted);

        let item: BackupItem = serde_json::from_value(json!({"id": "/item"})).unwrap();
        assert_eq!(item.delete_state(), DeleteState::NotDeleted);
    }

    #[test]
    fn test_backup_vault_security_states() {
        let vault: BackupVault = serde_json::from_value(json!({
            "id": "/bv",
            "properties": {"securitySettings": {
                "immutabilitySettings": {"state": "Unlocked"},
                "softDeleteSettings": {"state": "Off"}
            }}
        }))
        .unwrap();
        assert!(vault.immutability_enabled());
        assert!(!vault.soft_delete_enabled());
    }

    #[test]
    fn test_workspace_replication() {
        let ws: Workspace = serde_json::from_value(json!({
            "location": "westeurope",
            "properties": {
                "provisioningState": "Succeeded",
                "replication": {"enabled": true, "createdDate": "2024-03-01T10:00:00.1234567"}
            }
        }))
        .unwrap();
        assert!(ws.replication_enabled());
        assert!(ws.provisioning_succeeded());
        assert_eq!(
            ws.replication_created(),
            Some(
                Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
                    + chrono::Duration::nanoseconds(123_456_700)
            )
        );

        let ws: Workspace = serde_json::from_value(json!({"properties": {}})).unwrap();
        assert!(!ws.replication_enabled());
        assert!(ws.replication_created().is_none());
    }

    #[test]
    fn test_soft_delete_feature_state() {
        assert!(SoftDeleteFeatureState::parse("Enabled").is_enabled());
        assert!(SoftDeleteFeatureState::parse("AlwaysON").is_enabled());
        assert!(!SoftDeleteFeatureState::parse("Disabled").is_enabled());
    }

    #[test]
    fn test_schedule_request_creation_time() {
        let request: RoleScheduleRequest = serde_json::from_value(json!({
            "id": "/r1",
            "properties": {
                "principalId": "p-1",
                "roleDefinitionId": "/rd-1",
                "createdOn": "2024-06-01T11:58:00Z"
            }
        }))
        .unwrap();
        assert_eq!(
            request.properties.created_on,
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 11, 58, 0).unwrap())
        );
    }

    #[test]
    fn test_operation_status_mapping() {
        assert_eq!(OperationState::parse("Succeeded"), Some(OperationState::Succeeded));
        assert_eq!(OperationState::parse("InProgress"), Some(OperationState::Running));
        assert_eq!(OperationState::parse("Accepted"), Some(OperationState::Running));
        assert!(OperationState::parse("Failed").is_none());
        assert!(OperationState::parse("Canceled").is_none());
    }
}
