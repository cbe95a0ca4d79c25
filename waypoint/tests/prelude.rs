//! The prelude is enough to drive a manager end to end.

use std::sync::Arc;

use waypoint::prelude::*;
use waypoint_core::test_utils::{InMemoryConnector, InMemoryRuntime};

#[tokio::test]
async fn prelude_drives_a_session() {
    let runtime = Arc::new(InMemoryRuntime::with_root("i0", "n0", "alice"));
    let connector: Arc<dyn Connector> = Arc::new(InMemoryConnector::new(runtime));
    let manager = ConnectionManager::new(connector);

    manager
        .init(ConnectionConfig::new("mem://", "n0", "dist/dna.json"))
        .await
        .unwrap();
    assert_eq!(manager.connection_state(), ConnectionState::Ready);

    let position: Position = manager.position().unwrap();
    assert_eq!(position.current_instance, InstanceId::new("i0"));
}

#[test]
fn config_defaults_are_exposed() {
    let config = ConnectionConfig::new("http://localhost:3000", "n0", "dist/dna.json");
    assert_eq!(config.handshake_timeout, DurationMs::from_secs(10));
    assert_eq!(config.settle, SettlePolicy::default());
}
