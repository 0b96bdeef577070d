//! Canned ids and responses

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use teardown::arm::ArmResponse;

pub const SUBSCRIPTION: &str = "11111111-2222-3333-4444-555555555555";
pub const RESOURCE_GROUP: &str = "rg-teardown";

/// Time every manual clock starts at
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Id of a resource directly in the test resource group
pub fn resource_id(provider_type: &str, name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/{}/{}",
        SUBSCRIPTION, RESOURCE_GROUP, provider_type, name
    )
}

pub fn ok(body: Value) -> ArmResponse {
    ArmResponse::new(200, body)
}

pub fn not_found() -> ArmResponse {
    error(404, "ResourceNotFound", "The resource was not found.")
}

pub fn error(status: u16, code: &str, message: &str) -> ArmResponse {
    ArmResponse::new(status, json!({"error": {"code": code, "message": message}}))
}

/// 202 Accepted pointing at an `Azure-AsyncOperation` status path
pub fn accepted(operation_path: &str) -> ArmResponse {
    ArmResponse::new(202, Value::Null).with_operation(format!(
        "https://management.azure.com{}?api-version=2024-04-01",
        operation_path
    ))
}

/// Body of an `Azure-AsyncOperation` status response
pub fn operation(status: &str) -> ArmResponse {
    ok(json!({"status": status}))
}

/// One-page list response
pub fn list(items: Vec<Value>) -> ArmResponse {
    ok(json!({"value": items}))
}
