use std::sync::Arc;

use serde_json::json;
use waypoint_core::test_utils::{InMemoryConnector, InMemoryRuntime};
use waypoint_core::{
    AdminMethod, ConnectionConfig, DurationMs, Instance, InterfaceInfo, NavigationError,
    NetworkId, ProvisionError, ProvisionStep, RuntimeError, SettlePolicy,
};
use waypoint_nav::ConnectionManager;

const WS: &str = "websocket-interface";

fn fast_settle(max_attempts: u32) -> SettlePolicy {
    SettlePolicy {
        max_attempts,
        initial_backoff: DurationMs::from_millis(1),
        max_backoff: DurationMs::from_millis(4),
    }
}

async fn ready(runtime: InMemoryRuntime, settle: SettlePolicy) -> (ConnectionManager, Arc<InMemoryRuntime>) {
    let runtime = Arc::new(runtime);
    let mgr = ConnectionManager::new(Arc::new(InMemoryConnector::new(Arc::clone(&runtime))));
    mgr.init(ConnectionConfig::new("mem://runtime", "n0", "dist/dna.json").settle(settle))
        .await
        .unwrap();
    (mgr, runtime)
}

fn websocket(interfaces: &[InterfaceInfo]) -> Option<&InterfaceInfo> {
    interfaces.iter().find(|i| i.id.as_str() == WS)
}

// --- Full flow ---

#[tokio::test]
async fn clone_register_start_then_jump_back() {
    let (mgr, runtime) = ready(InMemoryRuntime::with_root("i0", "n0", "alice"), fast_settle(4)).await;
    let provisioner = mgr.provisioner();

    let outcome = provisioner
        .clone_network(&"n1".into(), json!({"name": "reading group"}))
        .await
        .unwrap();
    assert!(outcome.success);

    provisioner
        .register_network(&"alice".into(), &"n1".into(), &"i1".into(), websocket)
        .await
        .unwrap();
    assert!(mgr.registry().is_member(&"i1".into()));
    assert!(runtime.interface_serves(&WS.into(), &"i1".into()));
    // Registration alone does not navigate.
    assert_eq!(mgr.trail(), vec![NetworkId::new("n0")]);

    provisioner
        .start_network(&"n1".into(), &"i1".into())
        .await
        .unwrap();
    assert!(runtime.is_running(&"i1".into()));
    assert_eq!(mgr.trail(), vec![NetworkId::new("n0"), NetworkId::new("n1")]);
    assert_eq!(mgr.current_network(), Some("n1".into()));

    let reply = mgr.call("profiles", "get_my_profile", json!({})).await.unwrap();
    assert_eq!(reply["instance"], "i1");

    mgr.jump_to(&"n0".into()).unwrap();
    assert_eq!(mgr.trail(), vec![NetworkId::new("n0")]);
    let reply = mgr.call("profiles", "get_my_profile", json!({})).await.unwrap();
    assert_eq!(reply["instance"], "i0");
}

#[tokio::test]
async fn start_skips_already_running_instance() {
    let (mgr, runtime) = ready(
        InMemoryRuntime::with_root("i0", "n0", "alice")
            .with_running(Instance::new("i1", "n1", "alice")),
        fast_settle(4),
    )
    .await;

    mgr.provisioner()
        .start_network(&"n1".into(), &"i1".into())
        .await
        .unwrap();
    assert_eq!(runtime.admin_count(AdminMethod::RunningInstances), 1);
    assert_eq!(runtime.admin_count(AdminMethod::StartInstance), 0);
    assert_eq!(mgr.current_instance(), Some("i1".into()));
}

#[tokio::test]
async fn start_unknown_instance_rereads_inventory_once() {
    let (mgr, runtime) = ready(InMemoryRuntime::with_root("i0", "n0", "alice"), fast_settle(4)).await;
    let lists_before = runtime.admin_count(AdminMethod::ListInstances);

    let err = mgr
        .provisioner()
        .start_network(&"n7".into(), &"i7".into())
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisionError::UnknownInstance(ref i) if i.as_str() == "i7"));
    assert_eq!(runtime.admin_count(AdminMethod::ListInstances), lists_before + 1);
    assert_eq!(runtime.admin_count(AdminMethod::StartInstance), 0);
    assert_eq!(mgr.trail(), vec![NetworkId::new("n0")]);
}

#[tokio::test]
async fn failed_start_leaves_trail_unchanged() {
    let (mgr, runtime) = ready(
        InMemoryRuntime::with_root("i0", "n0", "alice")
            .with_instance(Instance::new("i1", "n1", "alice")),
        fast_settle(4),
    )
    .await;
    runtime.fail(
        AdminMethod::StartInstance,
        RuntimeError::Transport("connection reset".into()),
    );

    let err = mgr
        .provisioner()
        .start_network(&"n1".into(), &"i1".into())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProvisionError::Step {
            step: ProvisionStep::Start,
            ..
        }
    ));
    assert_eq!(mgr.trail(), vec![NetworkId::new("n0")]);
    assert_eq!(mgr.current_instance(), Some("i0".into()));
}

// --- Register failures ---

async fn cloned(runtime: InMemoryRuntime) -> (ConnectionManager, Arc<InMemoryRuntime>) {
    let (mgr, runtime) = ready(runtime, fast_settle(4)).await;
    mgr.provisioner()
        .clone_network(&"n1".into(), json!({}))
        .await
        .unwrap();
    (mgr, runtime)
}

#[tokio::test]
async fn register_failing_at_interface_list_mutates_nothing_local() {
    let (mgr, runtime) = cloned(InMemoryRuntime::with_root("i0", "n0", "alice")).await;
    runtime.fail(
        AdminMethod::ListInterfaces,
        RuntimeError::Timeout {
            method: "admin/interface/list".into(),
        },
    );
    let snapshot = mgr.registry().snapshot();
    let position = mgr.position();

    let err = mgr
        .provisioner()
        .register_network(&"alice".into(), &"n1".into(), &"i1".into(), websocket)
        .await
        .unwrap_err();
    match err {
        ProvisionError::Step { step, source } => {
            assert_eq!(step, ProvisionStep::ListInterfaces);
            assert!(source.is_timeout());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(mgr.registry().generation(), snapshot.generation());
    assert!(!mgr.registry().is_member(&"i1".into()));
    assert_eq!(mgr.position(), position);
}

#[tokio::test]
async fn register_failing_at_bind_mutates_nothing_local() {
    let (mgr, runtime) = cloned(InMemoryRuntime::with_root("i0", "n0", "alice")).await;
    runtime.fail(
        AdminMethod::AddInstanceToInterface,
        RuntimeError::Transport("connection reset".into()),
    );
    let generation = mgr.registry().generation();
    let position = mgr.position();

    let err = mgr
        .provisioner()
        .register_network(&"alice".into(), &"n1".into(), &"i1".into(), websocket)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProvisionError::Step {
            step: ProvisionStep::BindInterface,
            ..
        }
    ));
    assert_eq!(mgr.registry().generation(), generation);
    assert_eq!(mgr.position(), position);
    assert_eq!(runtime.admin_count(AdminMethod::ListInstances), 1);
}

#[tokio::test]
async fn chooser_selecting_nothing_is_reported() {
    let (mgr, runtime) = cloned(InMemoryRuntime::with_root("i0", "n0", "alice")).await;
    let err = mgr
        .provisioner()
        .register_network(&"alice".into(), &"n1".into(), &"i1".into(), |_| None)
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisionError::NoInterface(_)));
    assert_eq!(runtime.admin_count(AdminMethod::AddInstanceToInterface), 0);
}

#[tokio::test]
async fn register_into_unknown_network_fails_first_step() {
    let (mgr, _) = ready(InMemoryRuntime::with_root("i0", "n0", "alice"), fast_settle(4)).await;
    let err = mgr
        .provisioner()
        .register_network(&"alice".into(), &"n5".into(), &"i5".into(), websocket)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProvisionError::Step {
            step: ProvisionStep::AddInstance,
            source: RuntimeError::Remote(_),
        }
    ));
}

// --- Settling ---

#[tokio::test]
async fn register_polls_until_instance_is_listed() {
    let (mgr, runtime) = cloned(InMemoryRuntime::with_root("i0", "n0", "alice").with_settle_lag(3)).await;
    let before = runtime.admin_count(AdminMethod::ListInstances);

    mgr.provisioner()
        .register_network(&"alice".into(), &"n1".into(), &"i1".into(), websocket)
        .await
        .unwrap();
    assert_eq!(runtime.admin_count(AdminMethod::ListInstances) - before, 4);
    assert_eq!(mgr.registry().network_of(&"i1".into()), Some("n1".into()));
}

#[tokio::test]
async fn register_gives_up_after_max_attempts() {
    let (mgr, runtime) = ready(
        InMemoryRuntime::with_root("i0", "n0", "alice").with_settle_lag(10),
        fast_settle(3),
    )
    .await;
    mgr.provisioner()
        .clone_network(&"n1".into(), json!({}))
        .await
        .unwrap();
    let generation = mgr.registry().generation();

    let err = mgr
        .provisioner()
        .register_network(&"alice".into(), &"n1".into(), &"i1".into(), websocket)
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisionError::NotSettled { attempts: 3, .. }));
    assert_eq!(runtime.admin_count(AdminMethod::ListInstances), 1 + 3);
    // The last authoritative listing still lands in the registry.
    assert_eq!(mgr.registry().generation(), generation + 1);
    assert!(!mgr.registry().is_member(&"i1".into()));
}

#[tokio::test]
async fn jump_to_network_without_instance_is_refused() {
    let (mgr, _) = ready(
        InMemoryRuntime::with_root("i0", "n0", "alice")
            .with_running(Instance::new("i1", "n1", "alice")),
        fast_settle(4),
    )
    .await;
    mgr.provisioner()
        .start_network(&"n1".into(), &"i1".into())
        .await
        .unwrap();
    // The runtime later stops reporting the root instance.
    mgr.registry().refresh(vec![Instance::new("i1", "n1", "alice")]);
    let before = mgr.position();

    let err = mgr.jump_to(&"n0".into()).unwrap_err();
    assert_eq!(err, NavigationError::NoInstance("n0".into()));
    assert_eq!(mgr.trail(), before.map(|p| p.trail.trail().to_vec()).unwrap());
}
