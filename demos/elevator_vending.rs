//! Elevator and Vending Machine
//!
//! Two machines running concurrently. The elevator is loaded from JSON, the
//! vending machine is built in code. Entering `Emergency` makes the elevator
//! forward `lockdown` to the vending machine, which locks until a
//! technician (a registered guard) clears it.
//!
//! Run with: RUST_LOG=info cargo run --example elevator_vending

use statewire::builder::{guarded_rule, timed_rule, TableBuilder};
use statewire::config::{EngineConfig, TransitionConfig};
use statewire::core::GuardRegistry;
use statewire::runtime::Orchestrator;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

const ELEVATOR: &str = r#"{
    "initial_state": "Idle",
    "transitions": {
        "Idle": {"up": "MovingUp", "down": "MovingDown", "emergency_trigger": "Emergency"},
        "MovingUp": {"stop": "Idle", "emergency_trigger": "Emergency"},
        "MovingDown": {"stop": "Idle", "emergency_trigger": "Emergency"},
        "Emergency": {"reset": "Idle"}
    },
    "communications": {
        "Emergency": {"emergency_trigger": {"event": "lockdown", "machine": "vending"}}
    },
    "event_sequence": ["up", "stop", "down", "emergency_trigger"]
}"#;

fn vending_machine() -> Result<TransitionConfig, Box<dyn std::error::Error>> {
    let builder = TableBuilder::new()
        .initial("Idle")
        .transition("Idle", "coin", "Ready")
        .transition("Idle", "lockdown", "Locked")
        .transition("Ready", "lockdown", "Locked")
        .transition("Dispensing", "done", "Idle")
        .add_rule(guarded_rule("Ready", "select_item", "Dispensing", "has_stock"))
        .add_rule(timed_rule("Ready", "timeout", "Idle", Duration::from_millis(250)))
        .add_rule(guarded_rule("Locked", "unlock", "Idle", "is_technician"));

    // Fail early on a bad table before handing the config over.
    let config = builder.config().clone();
    builder.build()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    println!("=== Elevator and Vending Machine ===\n");

    let guards = GuardRegistry::new()
        .with("has_stock", || true)
        .with("is_technician", || true);

    let mut orchestrator = Orchestrator::new(EngineConfig::default(), Arc::new(guards));
    let elevator = TransitionConfig::from_json_str(ELEVATOR)?;
    let sequence = elevator.run_sequence().to_vec();
    orchestrator.load("elevator", elevator)?;
    orchestrator.load("vending", vending_machine()?)?;
    orchestrator.wire("elevator", "vending")?;

    println!("Run: {}", orchestrator.run_id());
    let handle = orchestrator.start();

    handle.seed("vending", ["coin", "select_item", "done", "coin"])?;
    handle.wait_for_state("vending", "Ready").await?;
    println!("vending: waiting for a selection");

    // No selection arrives, so the vending machine times out back to Idle.
    tokio::time::sleep(Duration::from_millis(300)).await;
    if let Some(snapshot) = handle.snapshot("vending") {
        println!("vending: after timeout -> {}", snapshot.current_state);
    }

    handle.seed("elevator", sequence)?;
    let locked = handle.wait_for_state("vending", "Locked").await?;
    println!("vending: locked by elevator emergency ({} entries)", locked.history.len());

    handle.send("vending", "unlock")?;
    handle.send("elevator", "reset")?;
    handle.wait_for_state("vending", "Idle").await?;

    handle.stop_all();
    for report in handle.await_all().await? {
        let path: Vec<&str> = report.history.path().map(|s| s.as_str()).collect();
        println!(
            "\n{}: final state {} after {} transitions ({} timeouts)",
            report.machine, report.final_state, report.applied, report.timeouts
        );
        println!("  path: {}", path.join(" -> "));
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
