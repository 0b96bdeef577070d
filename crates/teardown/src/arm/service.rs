//! Remote resource service abstraction
//!
//! [`ResourceService::send`] is the only required method. The typed
//! operations the recipes use are default methods layered on top of it, so
//! a real client and a scripted test double share one REST mapping.

use super::error::{ProviderError, error_details};
use super::request::{ArmRequest, ArmResponse, Method, decode};
use super::types::{
    BackupItem, BackupVault, Completion, DiskEncryptionSet, GenericResource, ManagementLock,
    OperationState, Page, ProviderMetadata, RoleAssignment, RoleScheduleRequest,
    SoftDeleteFeatureState, SubscriptionAlias, Workspace,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use teardown_common::defaults::api_versions;
use teardown_common::{ResourceId, ResourceType};
use tracing::debug;

/// Trait for Resource Manager operations that can be scripted in tests.
#[async_trait]
pub trait ResourceService: Send + Sync {
    /// Issue a raw versioned request. HTTP statuses are data; only transport
    /// and credential failures are errors.
    async fn send(&self, request: ArmRequest) -> Result<ArmResponse, ProviderError>;

    // ── Generic helpers ────────────────────────────────────────────────

    /// Send and require a 2xx response
    async fn execute(&self, request: ArmRequest) -> Result<Value, ProviderError> {
        let path = request.path.clone();
        self.send(request).await?.into_result(&path)
    }

    /// Send a GET and map 404 to `None`
    async fn get_optional(&self, request: ArmRequest) -> Result<Option<Value>, ProviderError> {
        let path = request.path.clone();
        self.send(request).await?.into_optional(&path)
    }

    /// Send a DELETE. Returns `false` when the resource was already absent.
    async fn delete_at(&self, path: &str, api_version: &str) -> Result<bool, ProviderError> {
        self.send_delete(ArmRequest::delete(path, api_version))
            .await
    }

    /// Send a prepared DELETE. Returns `false` when the resource was already absent.
    async fn send_delete(&self, request: ArmRequest) -> Result<bool, ProviderError> {
        let path = request.path.clone();
        let response = self.send(request).await?;
        if response.is_not_found() {
            debug!(path = %path, "Already deleted");
            return Ok(false);
        }
        response.into_result(&path)?;
        Ok(true)
    }

    /// Send a mutation the provider may accept asynchronously. 404 means
    /// the target was already absent.
    async fn send_tracked(&self, request: ArmRequest) -> Result<Completion, ProviderError> {
        let path = request.path.clone();
        let response = self.send(request).await?;
        if response.is_not_found() {
            debug!(path = %path, "Already absent");
            return Ok(Completion::Absent);
        }
        let operation = response.pending_operation().map(str::to_string);
        response.into_result(&path)?;
        Ok(match operation {
            Some(url) => {
                debug!(path = %path, operation = %url, "Accepted, tracking operation");
                Completion::Accepted(url)
            }
            None => Completion::Done,
        })
    }

    /// Check a long-running operation once.
    ///
    /// `Azure-AsyncOperation` URLs report a `status` field; `Location` URLs
    /// answer 202 while running and any other success once done. A failed or
    /// cancelled operation is an error carrying the provider's code.
    async fn operation_state(&self, operation_url: &str) -> Result<OperationState, ProviderError> {
        let request = request_from_link(operation_url)
            .ok_or_else(|| ProviderError::OperationUrl(operation_url.to_string()))?;
        let path = request.path.clone();
        let response = self.send(request).await?;
        if response.status == 202 {
            return Ok(OperationState::Running);
        }
        let body = response.into_result(&path)?;
        let Some(status) = body.get("status").and_then(Value::as_str) else {
            return Ok(OperationState::Succeeded);
        };
        OperationState::parse(status).ok_or_else(|| {
            let (code, message) = error_details(&body);
            ProviderError::OperationFailed {
                path,
                status: status.to_string(),
                code: code.unwrap_or_else(|| status.to_string()),
                message: message.unwrap_or_else(|| "No error message in response".to_string()),
            }
        })
    }

    /// Collect every item of a paged list, following `nextLink`
    async fn list_values(&self, request: ArmRequest) -> Result<Vec<Value>, ProviderError> {
        let mut items = Vec::new();
        let mut next = Some(request);
        while let Some(request) = next.take() {
            let path = request.path.clone();
            let page: Page<Value> = decode(self.execute(request).await?, &path)?;
            items.extend(page.value);
            next = page.next_link.as_deref().and_then(request_from_link);
        }
        Ok(items)
    }

    /// Fetch any resource by id with an explicit API version
    async fn get_resource(
        &self,
        resource_id: &str,
        api_version: &str,
    ) -> Result<Option<Value>, ProviderError> {
        self.get_optional(ArmRequest::get(resource_id, api_version))
            .await
    }

    /// Newest API version the provider publishes for a resource type
    async fn resolve_api_version(
        &self,
        resource_id: &ResourceId,
        resource_type: &ResourceType,
    ) -> Result<String, ProviderError> {
        let (Some(namespace), Some(type_path)) =
            (resource_type.namespace(), resource_type.type_path())
        else {
            return Err(ProviderError::MissingField {
                path: resource_type.to_string(),
                field: "provider namespace",
            });
        };
        let path = match resource_id.subscription_id() {
            Ok(sub) => format!("/subscriptions/{}/providers/{}", sub, namespace),
            Err(_) => format!("/providers/{}", namespace),
        };
        let body = self
            .execute(ArmRequest::get(&path, api_versions::PROVIDERS))
            .await?;
        let metadata: ProviderMetadata = decode(body, &path)?;
        metadata
            .api_version_for(type_path)
            .ok_or(ProviderError::MissingField {
                path,
                field: "apiVersions",
            })
    }

    /// Generic delete by id. Returns `false` when already absent.
    async fn delete_resource(
        &self,
        resource_id: &ResourceId,
        resource_type: &ResourceType,
    ) -> Result<bool, ProviderError> {
        let api_version = self.resolve_api_version(resource_id, resource_type).await?;
        self.delete_at(resource_id.as_str(), &api_version).await
    }

    /// Resources of one type inside a resource group
    async fn list_resources_in_group(
        &self,
        subscription_id: &str,
        resource_group: &str,
        resource_type: &str,
    ) -> Result<Vec<GenericResource>, ProviderError> {
        let path = format!(
            "/subscriptions/{}/resourceGroups/{}/resources",
            subscription_id, resource_group
        );
        let request = ArmRequest::get(&path, api_versions::RESOURCES)
            .with_query("$filter", format!("resourceType eq '{}'", resource_type));
        decode_all(self.list_values(request).await?, &path)
    }

    // ── Diagnostic settings ────────────────────────────────────────────

    /// Delete a diagnostic setting by parent resource and setting name
    async fn delete_diagnostic_setting(
        &self,
        parent_id: &ResourceId,
        name: &str,
    ) -> Result<bool, ProviderError> {
        let path = parent_id.join(&format!(
            "providers/Microsoft.Insights/diagnosticSettings/{}",
            name
        ));
        self.delete_at(&path, api_versions::DIAGNOSTIC_SETTINGS)
            .await
    }

    // ── Locks ──────────────────────────────────────────────────────────

    /// Locks applying to a scope (including those inherited from parents)
    async fn list_locks(&self, scope: &ResourceId) -> Result<Vec<ManagementLock>, ProviderError> {
        let path = scope.join("providers/Microsoft.Authorization/locks");
        let response = self
            .send(ArmRequest::get(&path, api_versions::LOCKS))
            .await?;
        if response.is_not_found() {
            return Ok(Vec::new());
        }
        let page: Page<ManagementLock> = decode(response.into_result(&path)?, &path)?;
        Ok(page.value)
    }

    async fn delete_lock(&self, lock_id: &str) -> Result<bool, ProviderError> {
        self.delete_at(lock_id, api_versions::LOCKS).await
    }

    // ── Disk encryption sets / Key Vault ───────────────────────────────

    async fn get_disk_encryption_set(
        &self,
        resource_id: &ResourceId,
    ) -> Result<Option<DiskEncryptionSet>, ProviderError> {
        let path = resource_id.as_str();
        match self
            .get_resource(path, api_versions::DISK_ENCRYPTION_SETS)
            .await?
        {
            Some(body) => Ok(Some(decode(body, path)?)),
            None => Ok(None),
        }
    }

    /// Remove one principal's access-policy entry from a vault
    async fn remove_key_vault_access_policy(
        &self,
        vault_id: &str,
        tenant_id: &str,
        object_id: &str,
    ) -> Result<(), ProviderError> {
        let path = format!("{}/accessPolicies/remove", vault_id);
        let body = json!({
            "properties": {
                "accessPolicies": [{
                    "tenantId": tenant_id,
                    "objectId": object_id,
                    "permissions": {"keys": [], "secrets": [], "certificates": []}
                }]
            }
        });
        self.execute(ArmRequest::put(&path, api_versions::KEY_VAULT, body))
            .await?;
        Ok(())
    }

    // ── Recovery Services ──────────────────────────────────────────────

    async fn get_recovery_vault_soft_delete(
        &self,
        vault_id: &ResourceId,
    ) -> Result<SoftDeleteFeatureState, ProviderError> {
        let path = vault_id.join("backupconfig/vaultconfig");
        let body = self
            .execute(ArmRequest::get(&path, api_versions::RECOVERY_SERVICES))
            .await?;
        let state = body
            .pointer("/properties/softDeleteFeatureState")
            .and_then(Value::as_str)
            .ok_or(ProviderError::MissingField {
                path,
                field: "properties.softDeleteFeatureState",
            })?;
        Ok(SoftDeleteFeatureState::parse(state))
    }

    async fn disable_recovery_vault_soft_delete(
        &self,
        vault_id: &ResourceId,
    ) -> Result<(), ProviderError> {
        let path = vault_id.join("backupconfig/vaultconfig");
        let body = json!({"properties": {"softDeleteFeatureState": "Disabled"}});
        self.execute(ArmRequest::patch(
            &path,
            api_versions::RECOVERY_SERVICES,
            body,
        ))
        .await?;
        Ok(())
    }

    async fn list_backup_items(
        &self,
        vault_id: &ResourceId,
    ) -> Result<Vec<BackupItem>, ProviderError> {
        let path = vault_id.join("backupProtectedItems");
        let request = ArmRequest::get(&path, api_versions::RECOVERY_SERVICES)
            .with_query("$filter", "backupManagementType eq 'AzureIaasVM'");
        decode_all(self.list_values(request).await?, &path)
    }

    /// Rehydrate a soft-deleted backup item
    async fn undo_backup_item_deletion(
        &self,
        item: &BackupItem,
    ) -> Result<Completion, ProviderError> {
        let mut properties = serde_json::Map::new();
        for key in ["protectedItemType", "sourceResourceId", "policyId"] {
            if let Some(value) = item.properties.get(key) {
                properties.insert(key.to_string(), value.clone());
            }
        }
        properties.insert("isRehydrate".to_string(), Value::Bool(true));
        let body = json!({"properties": properties});
        self.send_tracked(ArmRequest::put(
            &item.id,
            api_versions::RECOVERY_SERVICES,
            body,
        ))
        .await
    }

    /// Stop protection and delete all recovery points of a backup item
    async fn disable_backup_protection(
        &self,
        item: &BackupItem,
    ) -> Result<Completion, ProviderError> {
        self.send_tracked(ArmRequest::delete(
            &item.id,
            api_versions::RECOVERY_SERVICES,
        ))
        .await
    }

    // ── Data Protection ────────────────────────────────────────────────

    async fn get_backup_vault(
        &self,
        vault_id: &ResourceId,
    ) -> Result<Option<BackupVault>, ProviderError> {
        let path = vault_id.as_str();
        match self
            .get_resource(path, api_versions::DATA_PROTECTION)
            .await?
        {
            Some(body) => Ok(Some(decode(body, path)?)),
            None => Ok(None),
        }
    }

    /// Patch a backup vault's security settings
    async fn update_backup_vault_security(
        &self,
        vault_id: &ResourceId,
        settings: Value,
    ) -> Result<(), ProviderError> {
        let body = json!({"properties": {"securitySettings": settings}});
        self.execute(ArmRequest::patch(
            vault_id.as_str(),
            api_versions::DATA_PROTECTION,
            body,
        ))
        .await?;
        Ok(())
    }

    async fn list_deleted_backup_instances(
        &self,
        vault_id: &ResourceId,
    ) -> Result<Vec<GenericResource>, ProviderError> {
        self.list_vault_children(vault_id, "deletedBackupInstances")
            .await
    }

    async fn undelete_backup_instance(
        &self,
        deleted_id: &str,
    ) -> Result<Completion, ProviderError> {
        let path = format!("{}/undelete", deleted_id);
        self.send_tracked(ArmRequest::post(&path, api_versions::DATA_PROTECTION))
            .await
    }

    /// Delete a backup instance or policy of a backup vault
    async fn delete_backup_vault_child(&self, child_id: &str) -> Result<Completion, ProviderError> {
        self.send_tracked(ArmRequest::delete(child_id, api_versions::DATA_PROTECTION))
            .await
    }

    async fn list_backup_instances(
        &self,
        vault_id: &ResourceId,
    ) -> Result<Vec<GenericResource>, ProviderError> {
        self.list_vault_children(vault_id, "backupInstances").await
    }

    async fn list_backup_policies(
        &self,
        vault_id: &ResourceId,
    ) -> Result<Vec<GenericResource>, ProviderError> {
        self.list_vault_children(vault_id, "backupPolicies").await
    }

    async fn list_vault_children(
        &self,
        vault_id: &ResourceId,
        collection: &str,
    ) -> Result<Vec<GenericResource>, ProviderError> {
        let path = vault_id.join(collection);
        let request = ArmRequest::get(&path, api_versions::DATA_PROTECTION);
        decode_all(self.list_values(request).await?, &path)
    }

    // ── Log Analytics ──────────────────────────────────────────────────

    async fn get_workspace(
        &self,
        workspace_id: &ResourceId,
    ) -> Result<Option<Workspace>, ProviderError> {
        let path = workspace_id.as_str();
        match self
            .get_resource(path, api_versions::OPERATIONAL_INSIGHTS)
            .await?
        {
            Some(body) => Ok(Some(decode(body, path)?)),
            None => Ok(None),
        }
    }

    /// Turn workspace replication off. The provider requires the location in the body.
    async fn disable_workspace_replication(
        &self,
        workspace_id: &ResourceId,
        location: &str,
    ) -> Result<(), ProviderError> {
        let body = json!({
            "location": location,
            "properties": {"replication": {"enabled": false}}
        });
        self.execute(ArmRequest::put(
            workspace_id.as_str(),
            api_versions::OPERATIONAL_INSIGHTS,
            body,
        ))
        .await?;
        Ok(())
    }

    /// Permanent delete, bypassing the workspace recycle bin
    async fn delete_workspace_permanently(
        &self,
        workspace_id: &ResourceId,
    ) -> Result<bool, ProviderError> {
        let request = ArmRequest::delete(workspace_id.as_str(), api_versions::OPERATIONAL_INSIGHTS)
            .with_query("force", "true");
        self.send_delete(request).await
    }

    // ── Image templates ────────────────────────────────────────────────

    /// Raw delete of an image template; the caller inspects the status
    async fn request_image_template_deletion(
        &self,
        template_id: &ResourceId,
    ) -> Result<ArmResponse, ProviderError> {
        self.send(ArmRequest::delete(
            template_id.as_str(),
            api_versions::IMAGE_TEMPLATES,
        ))
        .await
    }

    /// Raw read of an image template; the caller inspects the status
    async fn probe_image_template(
        &self,
        template_id: &ResourceId,
    ) -> Result<ArmResponse, ProviderError> {
        self.send(ArmRequest::get(
            template_id.as_str(),
            api_versions::IMAGE_TEMPLATES,
        ))
        .await
    }

    // ── Machine Learning ───────────────────────────────────────────────

    /// Delete a workspace and purge it from soft-delete in one call
    async fn purge_ml_workspace(&self, workspace_id: &ResourceId) -> Result<bool, ProviderError> {
        let request = ArmRequest::delete(workspace_id.as_str(), api_versions::MACHINE_LEARNING)
            .with_query("forceToPurge", "true");
        self.send_delete(request).await
    }

    // ── Authorization ──────────────────────────────────────────────────

    async fn list_role_assignments(
        &self,
        scope: &ResourceId,
    ) -> Result<Vec<RoleAssignment>, ProviderError> {
        let path = scope.join("providers/Microsoft.Authorization/roleAssignments");
        let request = ArmRequest::get(&path, api_versions::ROLE_ASSIGNMENTS)
            .with_query("$filter", "atScope()");
        decode_all(self.list_values(request).await?, &path)
    }

    async fn get_role_schedule_request(
        &self,
        request_id: &ResourceId,
    ) -> Result<Option<RoleScheduleRequest>, ProviderError> {
        let path = request_id.as_str();
        match self
            .get_resource(path, api_versions::ROLE_SCHEDULE_REQUESTS)
            .await?
        {
            Some(body) => Ok(Some(decode(body, path)?)),
            None => Ok(None),
        }
    }

    /// Create a schedule request named `name` in `collection` at `scope`
    async fn create_role_schedule_request(
        &self,
        scope: &ResourceId,
        collection: &str,
        name: &str,
        properties: Value,
    ) -> Result<(), ProviderError> {
        let path = scope.join(&format!(
            "providers/Microsoft.Authorization/{}/{}",
            collection, name
        ));
        let body = json!({"properties": properties});
        self.execute(ArmRequest::put(
            &path,
            api_versions::ROLE_SCHEDULE_REQUESTS,
            body,
        ))
        .await?;
        Ok(())
    }

    // ── Subscriptions ──────────────────────────────────────────────────

    async fn get_subscription_alias(
        &self,
        alias: &str,
    ) -> Result<Option<SubscriptionAlias>, ProviderError> {
        let path = format!("/providers/Microsoft.Subscription/aliases/{}", alias);
        match self
            .get_resource(&path, api_versions::SUBSCRIPTION_ALIASES)
            .await?
        {
            Some(body) => Ok(Some(decode(body, &path)?)),
            None => Ok(None),
        }
    }

    async fn resource_group_exists(
        &self,
        subscription_id: &str,
        resource_group: &str,
    ) -> Result<bool, ProviderError> {
        let path = format!(
            "/subscriptions/{}/resourcegroups/{}",
            subscription_id, resource_group
        );
        Ok(self
            .get_resource(&path, api_versions::RESOURCES)
            .await?
            .is_some())
    }

    async fn delete_resource_group(
        &self,
        subscription_id: &str,
        resource_group: &str,
    ) -> Result<bool, ProviderError> {
        let path = format!(
            "/subscriptions/{}/resourcegroups/{}",
            subscription_id, resource_group
        );
        self.delete_at(&path, api_versions::RESOURCES).await
    }

    async fn subscription_in_management_group(
        &self,
        management_group: &str,
        subscription_id: &str,
    ) -> Result<bool, ProviderError> {
        let path = management_group_subscription_path(management_group, subscription_id);
        Ok(self
            .get_resource(&path, api_versions::MANAGEMENT_GROUPS)
            .await?
            .is_some())
    }

    async fn move_subscription_to_management_group(
        &self,
        management_group: &str,
        subscription_id: &str,
    ) -> Result<(), ProviderError> {
        let path = management_group_subscription_path(management_group, subscription_id);
        self.execute(ArmRequest::new(
            Method::Put,
            &path,
            api_versions::MANAGEMENT_GROUPS,
        ))
        .await?;
        Ok(())
    }

    /// Subscription state (`Enabled`, `Disabled`, `Warned`, ...), `None` if absent
    async fn get_subscription_state(
        &self,
        subscription_id: &str,
    ) -> Result<Option<String>, ProviderError> {
        let path = format!("/subscriptions/{}", subscription_id);
        let body = self.get_resource(&path, api_versions::SUBSCRIPTIONS).await?;
        Ok(body.and_then(|b| b.get("state").and_then(Value::as_str).map(str::to_string)))
    }

    async fn disable_subscription(&self, subscription_id: &str) -> Result<(), ProviderError> {
        let path = format!(
            "/subscriptions/{}/providers/Microsoft.Subscription/cancel",
            subscription_id
        );
        self.execute(ArmRequest::post(&path, api_versions::SUBSCRIPTION_ALIASES))
            .await?;
        Ok(())
    }
}

fn management_group_subscription_path(management_group: &str, subscription_id: &str) -> String {
    format!(
        "/providers/Microsoft.Management/managementGroups/{}/subscriptions/{}",
        management_group, subscription_id
    )
}

fn decode_all<T: DeserializeOwned>(values: Vec<Value>, path: &str) -> Result<Vec<T>, ProviderError> {
    values.into_iter().map(|v| decode(v, path)).collect()
}

/// Turn an absolute `nextLink` into a request for the next page
fn request_from_link(link: &str) -> Option<ArmRequest> {
    let url = reqwest::Url::parse(link).ok()?;
    let mut api_version = String::new();
    let mut query = Vec::new();
    for (key, value) in url.query_pairs() {
        if key == "api-version" {
            api_version = value.into_owned();
        } else {
            query.push((key.into_owned(), value.into_owned()));
        }
    }
    let mut request = ArmRequest::get(url.path(), &api_version);
    request.query = query;
    Some(request)
}
