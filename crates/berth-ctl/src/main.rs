//! berth-ctl — inspect and resolve scheduler assignments from the command line.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use berth_core::config::BerthConfig;
use berth_core::wire::AssignedTask;
use berth_task::{bind_ports, InstanceConfig, Resolver};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn read_assignment(path: &str, config: &BerthConfig) -> Result<(Vec<u8>, AssignedTask)> {
    let raw = std::fs::read(path).with_context(|| format!("failed to read {path}"))?;
    let assigned = AssignedTask::decode_bounded(&raw, config.decoder.max_template_bytes)
        .with_context(|| format!("could not deserialize assignment in {path}"))?;
    Ok((raw, assigned))
}

fn resolve_assignment(path: &str, config: &BerthConfig) -> Result<InstanceConfig> {
    let (_, assigned) = read_assignment(path, config)?;
    Resolver::new()
        .resolve(&assigned)
        .with_context(|| format!("could not resolve task config in {path}"))
}

fn parse_port(spec: &str) -> Result<(String, u16)> {
    let (name, port) = spec
        .split_once('=')
        .with_context(|| format!("expected name=port, got {spec:?}"))?;
    let port = port
        .parse()
        .with_context(|| format!("port for {name:?} must be a number 0-65535"))?;
    Ok((name.to_string(), port))
}

// ── Subcommand handlers ───────────────────────────────────────────────────────

fn cmd_encode(template: &str, instance: &str, out: &str) -> Result<()> {
    let text = std::fs::read_to_string(template)
        .with_context(|| format!("failed to read {template}"))?;
    let instance_id: u32 = instance.parse().context("instance must be a number")?;

    let raw = AssignedTask::new(text, instance_id)
        .encode()
        .with_context(|| format!("cannot frame {template}"))?;
    std::fs::write(Path::new(out), &raw).with_context(|| format!("failed to write {out}"))?;

    tracing::info!(instance_id, bytes = raw.len(), out, "assignment written");
    Ok(())
}

fn cmd_decode(path: &str, config: &BerthConfig) -> Result<()> {
    let (raw, assigned) = read_assignment(path, config)?;

    println!("═══════════════════════════════════════");
    println!("  Assignment {path}");
    println!("═══════════════════════════════════════");
    println!("  Instance       : {}", assigned.instance_id);
    println!("  Template bytes : {}", assigned.task.len());
    println!("  Content hash   : {}…", hex::encode(&raw[..8]));

    Ok(())
}

fn cmd_resolve(path: &str, config: &BerthConfig) -> Result<()> {
    let resolved = resolve_assignment(path, config)?;
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}

fn cmd_ports(path: &str, specs: &[&str], config: &BerthConfig) -> Result<()> {
    let resolved = resolve_assignment(path, config)?;
    let assigned = specs
        .iter()
        .map(|spec| parse_port(spec))
        .collect::<Result<BTreeMap<_, _>>>()?;

    let binding = bind_ports(&resolved, &assigned);
    println!("{}", serde_json::to_string_pretty(&binding.ports)?);

    if !binding.unmapped.is_empty() {
        eprintln!("{} unmapped port(s) dropped", binding.unmapped.len());
    }
    Ok(())
}

fn print_usage() {
    println!("berth-ctl — scheduler assignment tool");
    println!();
    println!("Usage:");
    println!("  berth-ctl encode <template.json> <instance> <out>");
    println!("  berth-ctl decode <assignment>");
    println!("  berth-ctl resolve <assignment>");
    println!("  berth-ctl ports <assignment> [name=port ...]");
    println!("  berth-ctl help");
    println!();
    println!("Logging follows RUST_LOG, else [log] filter in the berth config.");
}

fn main() -> Result<()> {
    let (config, config_err) = match BerthConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (BerthConfig::default(), Some(e)),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(e) = config_err {
        tracing::warn!(error = %e, "failed to load config, using defaults");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        ["encode", template, instance, out] => cmd_encode(template, instance, out),
        ["decode", path]                    => cmd_decode(path, &config),
        ["resolve", path]                   => cmd_resolve(path, &config),
        ["ports", path, specs @ ..]         => cmd_ports(path, specs, &config),
        ["help"] | ["--help"] | ["-h"] | [] => { print_usage(); Ok(()) }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
