//! berth integration tests.
//!
//! Each test drives the whole pipeline the way an executor does: raw
//! assignment bytes in, decoded task, resolved instance config, bound
//! port map out. Nothing here touches the network or spawns processes.
//!
//!   cargo test --test integration

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use berth_core::wire::AssignedTask;
use berth_task::{assigned_task_from_bytes, bind_ports, resolve, InstanceConfig, PortBinding};
use serde_json::{json, Value};

mod migration;
mod pipeline;
mod ports;

// ── Harness ───────────────────────────────────────────────────────────────────

/// A job template the way a current scheduler ships it.
pub fn hello_world_job() -> Value {
    json!({
        "name": "hello_world",
        "role": "www-data",
        "environment": "prod",
        "cluster": "west",
        "instances": 3,
        "task": {
            "name": "hello_world-{{mesos.instance}}",
            "processes": [{
                "name": "server",
                "cmdline": "serve --port={{thermos.ports[http]}} --task={{thermos.task_id}}",
            }],
        },
        "announce": {
            "primary_port": "http",
            "portmap": {"admin": "http", "aurora": "health"},
        },
    })
}

/// Encode `blob` as an assignment for `instance`.
pub fn assignment(blob: &Value, instance: u32) -> Vec<u8> {
    AssignedTask::new(blob.to_string(), instance)
        .encode()
        .expect("test templates fit the length field")
        .to_vec()
}

/// Scheduler port allocation from literal pairs.
pub fn allocation(entries: &[(&str, u16)]) -> BTreeMap<String, u16> {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Decode and resolve raw bytes.
pub fn resolve_bytes(raw: &[u8]) -> Result<InstanceConfig> {
    let assigned = assigned_task_from_bytes(raw).context("decode failed")?;
    resolve(&assigned).context("resolve failed")
}

/// The executor's full path: decode, resolve, bind.
pub fn launch(raw: &[u8], ports: &BTreeMap<String, u16>) -> Result<(InstanceConfig, PortBinding)> {
    let config = resolve_bytes(raw)?;
    let binding = bind_ports(&config, ports);
    Ok((config, binding))
}
