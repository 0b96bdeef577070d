//! Per-invocation removal report

use serde::Serialize;

/// Whether an action was carried out or only planned (what-if)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Planned,
    Performed,
}

/// A mutating step of a recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRecord {
    pub description: String,
    pub status: ActionStatus,
}

/// How the removal ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum RemovalOutcome {
    /// The resource was deleted (or handed to the provider for deletion)
    Removed,
    /// The resource did not exist when the recipe reached it
    AlreadyAbsent,
    /// The recipe deliberately did nothing
    Skipped(String),
    /// What-if mode: actions were recorded, none performed
    Planned,
}

/// Report of one `remove` invocation
#[derive(Debug, Clone, Serialize)]
pub struct RemovalReport {
    pub resource_id: String,
    pub resource_type: String,
    pub recipe: &'static str,
    /// Locks removed (or that would be removed) before the recipe ran
    pub locks: Vec<String>,
    pub actions: Vec<ActionRecord>,
    pub warnings: Vec<String>,
    pub outcome: RemovalOutcome,
}

impl RemovalReport {
    pub fn new(resource_id: &str, resource_type: &str, recipe: &'static str) -> Self {
        Self {
            resource_id: resource_id.to_string(),
            resource_type: resource_type.to_string(),
            recipe,
            locks: Vec::new(),
            actions: Vec::new(),
            warnings: Vec::new(),
            outcome: RemovalOutcome::Removed,
        }
    }

    pub fn planned(&self) -> impl Iterator<Item = &str> {
        self.actions
            .iter()
            .filter(|a| a.status == ActionStatus::Planned)
            .map(|a| a.description.as_str())
    }

    pub fn performed(&self) -> impl Iterator<Item = &str> {
        self.actions
            .iter()
            .filter(|a| a.status == ActionStatus::Performed)
            .map(|a| a.description.as_str())
    }
}
