//! Lock removal against a scripted Resource Manager

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use teardown::arm::Method;
use teardown::clock::ManualClock;
use teardown::locks::{ArmLockRemover, LockError, LockRemover, LockTarget};
use teardown::wait::RetryPolicy;
use teardown_common::ResourceId;
use teardown_test_utils::FakeArm;
use teardown_test_utils::fixtures::{error, list, not_found, resource_id, start_time};
use tokio_util::sync::CancellationToken;

struct Setup {
    arm: Arc<FakeArm>,
    clock: Arc<ManualClock>,
    remover: ArmLockRemover,
    scope: ResourceId,
    lock_list: String,
}

fn setup() -> Setup {
    let arm = Arc::new(FakeArm::new());
    let clock = Arc::new(ManualClock::new(start_time()));
    let remover = ArmLockRemover::new(
        arm.clone(),
        clock.clone(),
        RetryPolicy::lock_release(),
        CancellationToken::new(),
    );
    let scope = ResourceId::parse(&resource_id("Microsoft.KeyVault/vaults", "kv1")).unwrap();
    let lock_list = format!("{}/providers/Microsoft.Authorization/locks", scope);
    Setup {
        arm,
        clock,
        remover,
        scope,
        lock_list,
    }
}

fn lock(scope: &ResourceId, name: &str) -> serde_json::Value {
    json!({
        "id": format!("{}/providers/Microsoft.Authorization/locks/{}", scope, name),
        "name": name,
        "properties": {"level": "CanNotDelete"}
    })
}

#[tokio::test]
async fn test_no_locks_means_no_deletes() {
    let s = setup();

    let removed = s
        .remover
        .remove_locks(&LockTarget::Scope(s.scope.clone()), false)
        .await
        .unwrap();

    assert!(removed.is_empty());
    assert!(s.arm.mutations().is_empty());
    assert!(s.clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_locks_deleted_then_release_awaited() {
    let s = setup();
    let locks = vec![lock(&s.scope, "lk1"), lock(&s.scope, "lk2")];
    s.arm
        .on(Method::Get, &s.lock_list, list(locks.clone()))
        .on(Method::Get, &s.lock_list, list(locks))
        .on(Method::Get, &s.lock_list, list(vec![]));

    let removed = s
        .remover
        .remove_locks(&LockTarget::Scope(s.scope.clone()), false)
        .await
        .unwrap();

    assert_eq!(removed.len(), 2);
    let deletes = s.arm.calls(Method::Delete);
    assert_eq!(deletes.len(), 2);
    assert!(deletes.iter().all(|d| d.path.ends_with("lk1") || d.path.ends_with("lk2")));
    assert_eq!(s.arm.count(Method::Get, &s.lock_list), 3);
    assert_eq!(s.clock.sleeps(), vec![Duration::from_secs(10)]);
}

#[tokio::test]
async fn test_lingering_lock_exhausts_budget_without_failing() {
    let s = setup();
    s.arm
        .on(Method::Get, &s.lock_list, list(vec![lock(&s.scope, "lk1")]));

    let removed = s
        .remover
        .remove_locks(&LockTarget::Scope(s.scope.clone()), false)
        .await
        .unwrap();

    assert_eq!(removed.len(), 1);
    // One listing before removal, thirty while waiting
    assert_eq!(s.arm.count(Method::Get, &s.lock_list), 31);
    assert_eq!(s.clock.sleeps(), vec![Duration::from_secs(10); 29]);
}

#[tokio::test]
async fn test_what_if_only_lists() {
    let s = setup();
    s.arm
        .on(Method::Get, &s.lock_list, list(vec![lock(&s.scope, "lk1")]));

    let removed = s
        .remover
        .remove_locks(&LockTarget::Scope(s.scope.clone()), true)
        .await
        .unwrap();

    assert_eq!(removed.len(), 1);
    assert!(s.arm.mutations().is_empty());
    assert!(s.clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_single_lock_target() {
    let s = setup();
    let lock_id = format!("{}/lk1", s.lock_list);
    s.arm
        .on(Method::Get, &lock_id, teardown_test_utils::fixtures::ok(lock(&s.scope, "lk1")))
        .on(Method::Get, &lock_id, not_found());

    let removed = s
        .remover
        .remove_locks(&LockTarget::Lock(ResourceId::parse(&lock_id).unwrap()), false)
        .await
        .unwrap();

    assert_eq!(removed, vec![lock_id.clone()]);
    assert_eq!(s.arm.count(Method::Delete, &lock_id), 1);
    assert_eq!(s.arm.count(Method::Get, &s.lock_list), 0);
}

#[tokio::test]
async fn test_delete_failure_is_reported() {
    let s = setup();
    let lock_value = lock(&s.scope, "lk1");
    let lock_id = lock_value["id"].as_str().unwrap().to_string();
    s.arm
        .on(Method::Get, &s.lock_list, list(vec![lock_value]))
        .on(
            Method::Delete,
            &lock_id,
            error(403, "AuthorizationFailed", "Cannot delete locks."),
        );

    let err = s
        .remover
        .remove_locks(&LockTarget::Scope(s.scope.clone()), false)
        .await
        .unwrap_err();

    match err {
        LockError::Provider(e) => assert_eq!(e.code(), Some("AuthorizationFailed")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_cancelled_while_waiting_for_release() {
    let arm = Arc::new(FakeArm::new());
    let clock = Arc::new(ManualClock::new(start_time()));
    let cancel = CancellationToken::new();
    let remover = ArmLockRemover::new(
        arm.clone(),
        clock.clone(),
        RetryPolicy::lock_release(),
        cancel.clone(),
    );
    let scope = ResourceId::parse(&resource_id("Microsoft.KeyVault/vaults", "kv1")).unwrap();
    arm.on(
        Method::Get,
        &format!("{}/providers/Microsoft.Authorization/locks", scope),
        list(vec![lock(&scope, "lk1")]),
    );
    cancel.cancel();

    let err = remover
        .remove_locks(&LockTarget::Scope(scope), false)
        .await
        .unwrap_err();

    assert!(matches!(err, LockError::Cancelled(_)));
}
