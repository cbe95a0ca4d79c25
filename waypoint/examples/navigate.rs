//! Example: clone a network from the template, enter it, and jump back.
//!
//! Runs against the in-memory runtime, so no runtime process is needed.
//!
//! Run with: `RUST_LOG=debug cargo run --example navigate -p waypoint --features test-utils`

use std::sync::Arc;

use serde_json::json;
use tracing_subscriber::EnvFilter;
use waypoint::prelude::*;
use waypoint::waypoint_core::test_utils::{InMemoryConnector, InMemoryRuntime};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let runtime = Arc::new(
        InMemoryRuntime::with_root("root-instance", "root-network", "alice")
            .with_template("dist/dna.json"),
    );
    let manager = ConnectionManager::new(Arc::new(InMemoryConnector::new(runtime)));

    let config = ConnectionConfig::new("mem://demo", "root-network", "dist/dna.json");
    manager.init(config).await?;
    println!("connected: {}", manager.connection_state());

    let team = NetworkId::new("reading-group");
    let team_instance = InstanceId::new("reading-group-instance");
    let provisioner = manager.provisioner();

    let outcome = provisioner
        .clone_network(&team, json!({"name": "Reading group"}))
        .await?;
    println!("installed {team} as {}", outcome.dna_hash);

    provisioner
        .register_network(&AgentId::new("alice"), &team, &team_instance, |interfaces| {
            interfaces.iter().find(|i| !i.admin)
        })
        .await?;
    provisioner.start_network(&team, &team_instance).await?;

    let reply = manager
        .call("profiles", "get_my_profile", serde_json::Value::Null)
        .await?;
    println!("trail: {:?}", manager.trail());
    println!("call routed to {}", reply["instance"]);

    manager.jump_to(&NetworkId::new("root-network"))?;
    println!("back at: {:?}", manager.trail());

    if let Some(position) = manager.position() {
        println!("position: {}", serde_json::to_string(&position)?);
    }
    Ok(())
}
