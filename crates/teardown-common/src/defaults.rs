//! Default values shared across the orchestrator, CLI and tests
//!
//! API versions are pinned per resource type; timings match the provider's
//! documented cool-downs and the poll budgets used for asynchronous deletes.

use std::time::Duration;

/// Azure Resource Manager endpoint
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";

/// Interval between provider state polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Maximum provider state polls before the recipe gives up waiting
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 240;

/// Interval between lock-release checks
pub const DEFAULT_LOCK_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Maximum lock-release checks
pub const DEFAULT_LOCK_POLL_MAX_ATTEMPTS: u32 = 30;

/// Workspace replication cannot be disabled within this window of enabling it
pub const REPLICATION_COOLDOWN: Duration = Duration::from_secs(60 * 60);

/// PIM rejects an AdminRemove issued within this window of the original grant
pub const SCHEDULE_REQUEST_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// Namespace authorization rule the provider refuses to delete
pub const ROOT_AUTHORIZATION_RULE: &str = "RootManageSharedAccessKey";

/// Alias names containing this string are decommissioned test subscriptions
pub const DEFAULT_SUBSCRIPTION_GUARD: &str = "sub-blzv-tests";

/// Management group that decommissioned test subscriptions are moved to
pub const DEFAULT_DECOMMISSION_MANAGEMENT_GROUP: &str = "bicep-lz-vending-automation-decom";

/// Resource group auto-created by Network Watcher in new subscriptions
pub const NETWORK_WATCHER_RESOURCE_GROUP: &str = "NetworkWatcherRG";

/// Pinned API versions per provider surface
pub mod api_versions {
    pub const RESOURCES: &str = "2021-04-01";
    pub const PROVIDERS: &str = "2021-04-01";
    pub const LOCKS: &str = "2020-05-01";
    pub const DIAGNOSTIC_SETTINGS: &str = "2021-05-01-preview";
    pub const DISK_ENCRYPTION_SETS: &str = "2023-04-02";
    pub const KEY_VAULT: &str = "2022-07-01";
    pub const RECOVERY_SERVICES: &str = "2023-04-01";
    pub const DATA_PROTECTION: &str = "2023-05-01";
    pub const OPERATIONAL_INSIGHTS: &str = "2025-02-01";
    pub const IMAGE_TEMPLATES: &str = "2022-07-01";
    pub const MACHINE_LEARNING: &str = "2024-10-01";
    pub const ROLE_ASSIGNMENTS: &str = "2022-04-01";
    pub const ROLE_SCHEDULE_REQUESTS: &str = "2020-10-01";
    pub const SUBSCRIPTION_ALIASES: &str = "2021-10-01";
    pub const SUBSCRIPTIONS: &str = "2022-12-01";
    pub const MANAGEMENT_GROUPS: &str = "2020-05-01";
}
