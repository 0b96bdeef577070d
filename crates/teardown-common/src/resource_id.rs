//! Positional parsing of ARM resource identifiers
//!
//! Segments are the result of splitting the id on `/`, so the leading empty
//! segment counts: for `/subscriptions/<sub>/resourceGroups/<rg>/...` segment
//! 2 is the subscription id and segment 4 the resource group.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Resource identifier parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("resource id cannot be empty")]
    Empty,

    #[error("resource id must start with '/': {0}")]
    NotAbsolute(String),

    #[error("resource id has an empty leaf segment: {0}")]
    EmptyLeaf(String),

    #[error("resource id '{id}' has no {what} (segment {index})")]
    MissingSegment {
        id: String,
        index: usize,
        what: &'static str,
    },

    #[error("resource id '{id}' does not contain '/providers/{provider_type}/'")]
    MissingProviderSuffix { id: String, provider_type: String },

    #[error("resource id '{id}' has fewer than {count} segments to drop")]
    TooShort { id: String, count: usize },
}

/// A path-structured ARM resource identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    /// Parse an id, dropping a trailing `/` if present
    pub fn parse(id: &str) -> Result<Self, IdError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(IdError::Empty);
        }
        if !id.starts_with('/') {
            return Err(IdError::NotAbsolute(id.to_string()));
        }
        let id = id.strip_suffix('/').unwrap_or(id);
        if id.is_empty() || id.ends_with('/') {
            return Err(IdError::EmptyLeaf(id.to_string()));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// All segments, including the leading empty one
    pub fn segments(&self) -> Vec<&str> {
        self.0.split('/').collect()
    }

    fn segment(&self, index: usize, what: &'static str) -> Result<&str, IdError> {
        self.0
            .split('/')
            .nth(index)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| IdError::MissingSegment {
                id: self.0.clone(),
                index,
                what,
            })
    }

    /// Subscription id (segment 2)
    pub fn subscription_id(&self) -> Result<&str, IdError> {
        let marker = self.segment(1, "subscriptions marker")?;
        if !marker.eq_ignore_ascii_case("subscriptions") {
            return Err(IdError::MissingSegment {
                id: self.0.clone(),
                index: 2,
                what: "subscription id",
            });
        }
        self.segment(2, "subscription id")
    }

    /// Resource group name (segment 4)
    pub fn resource_group(&self) -> Result<&str, IdError> {
        self.subscription_id()?;
        let marker = self.segment(3, "resourceGroups marker")?;
        if !marker.eq_ignore_ascii_case("resourceGroups") {
            return Err(IdError::MissingSegment {
                id: self.0.clone(),
                index: 4,
                what: "resource group",
            });
        }
        self.segment(4, "resource group")
    }

    /// Leaf name (final segment)
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// Drop the trailing `count` segments. Dropping down to the root yields `/`.
    pub fn parent_scope(&self, count: usize) -> Result<ResourceId, IdError> {
        let segments = self.segments();
        // The leading empty segment is never dropped
        if count >= segments.len() {
            return Err(IdError::TooShort {
                id: self.0.clone(),
                count,
            });
        }
        let kept = segments[..segments.len() - count].join("/");
        if kept.is_empty() {
            return Ok(Self("/".to_string()));
        }
        Ok(Self(kept))
    }

    /// Strip an extension-resource suffix: for
    /// `<parent>/providers/Microsoft.Insights/diagnosticSettings/<name>` this
    /// returns `<parent>`.
    pub fn strip_provider_suffix(&self, provider_type: &str) -> Result<ResourceId, IdError> {
        let needle = format!("/providers/{}/", provider_type).to_ascii_lowercase();
        let lowered = self.0.to_ascii_lowercase();
        match lowered.rfind(&needle) {
            Some(0) | None => Err(IdError::MissingProviderSuffix {
                id: self.0.clone(),
                provider_type: provider_type.to_string(),
            }),
            Some(index) => Ok(Self(self.0[..index].to_string())),
        }
    }

    /// Append a relative path below this id
    pub fn join(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if self.0 == "/" {
            format!("/{}", path)
        } else {
            format!("{}/{}", self.0, path)
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourceId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NIC_DS: &str = "/subscriptions/sub-1/resourceGroups/rg-1/providers/Microsoft.Network/networkInterfaces/nic-01/providers/Microsoft.Insights/diagnosticSettings/nic-01-ds";

    #[test]
    fn test_positional_segments() {
        let id = ResourceId::parse(NIC_DS).unwrap();
        assert_eq!(id.subscription_id().unwrap(), "sub-1");
        assert_eq!(id.resource_group().unwrap(), "rg-1");
        assert_eq!(id.name(), "nic-01-ds");
    }

    #[test]
    fn test_strip_diagnostic_suffix() {
        let id = ResourceId::parse(NIC_DS).unwrap();
        let parent = id
            .strip_provider_suffix("Microsoft.Insights/diagnosticSettings")
            .unwrap();
        assert_eq!(
            parent.as_str(),
            "/subscriptions/sub-1/resourceGroups/rg-1/providers/Microsoft.Network/networkInterfaces/nic-01"
        );
    }

    #[test]
    fn test_strip_suffix_requires_a_parent() {
        let id =
            ResourceId::parse("/providers/Microsoft.Insights/diagnosticSettings/tenant-ds").unwrap();
        assert!(matches!(
            id.strip_provider_suffix("Microsoft.Insights/diagnosticSettings"),
            Err(IdError::MissingProviderSuffix { .. })
        ));
    }

    #[test]
    fn test_role_assignment_scope_at_tenant_root() {
        let id = ResourceId::parse(
            "/providers/Microsoft.Authorization/roleAssignments/0000-1111",
        )
        .unwrap();
        assert_eq!(id.parent_scope(4).unwrap().as_str(), "/");
    }

    #[test]
    fn test_rejects_malformed_ids() {
        assert_eq!(ResourceId::parse(""), Err(IdError::Empty));
        assert!(matches!(
            ResourceId::parse("subscriptions/x"),
            Err(IdError::NotAbsolute(_))
        ));
        assert!(matches!(
            ResourceId::parse("/subscriptions//"),
            Err(IdError::EmptyLeaf(_))
        ));
    }

    #[test]
    fn test_resource_group_missing_for_subscription_scope() {
        let id = ResourceId::parse("/subscriptions/sub-1").unwrap();
        assert_eq!(id.subscription_id().unwrap(), "sub-1");
        assert!(id.resource_group().is_err());
    }

    #[test]
    fn test_trailing_slash_is_dropped() {
        let id = ResourceId::parse("/subscriptions/sub-1/resourceGroups/rg-1/").unwrap();
        assert_eq!(id.name(), "rg-1");
    }

    proptest! {
        #[test]
        fn prop_segments_round_trip(
            sub in "[a-f0-9-]{1,36}",
            rg in "[A-Za-z0-9_.-]{1,40}",
            name in "[A-Za-z0-9-]{1,40}",
        ) {
            let raw = format!(
                "/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Storage/storageAccounts/{name}"
            );
            let id = ResourceId::parse(&raw).unwrap();
            prop_assert_eq!(id.subscription_id().unwrap(), sub.as_str());
            prop_assert_eq!(id.resource_group().unwrap(), rg.as_str());
            prop_assert_eq!(id.name(), name.as_str());
        }

        #[test]
        fn prop_role_scope_drops_four_segments(
            sub in "[a-f0-9-]{1,36}",
            rg in "[A-Za-z0-9_.-]{1,40}",
            guid in "[a-f0-9-]{36}",
        ) {
            let scope = format!("/subscriptions/{sub}/resourceGroups/{rg}");
            let raw = format!("{scope}/providers/Microsoft.Authorization/roleAssignments/{guid}");
            let id = ResourceId::parse(&raw).unwrap();
            let parent = id.parent_scope(4).unwrap();
            prop_assert_eq!(parent.as_str(), scope.as_str());
        }
    }
}
