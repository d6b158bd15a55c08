//! Port binder — final port name → number map for the runner and discovery.
//!
//! The task announces its own ports, possibly as aliases of each other; the
//! scheduler assigns concrete numbers at launch. The scheduler wins on
//! conflicts. Anything still an alias after resolution is dropped and
//! reported, never treated as an error: a missing port only disables one
//! discovery entry.

use std::collections::{BTreeMap, BTreeSet};

use crate::schema::{InstanceConfig, PortValue};

// ── Alias resolution ──────────────────────────────────────────────────────────

/// Substitutes alias entries with the value they point at, as far as possible.
pub trait AliasResolver: Send + Sync {
    fn resolve(&self, mapping: BTreeMap<String, PortValue>) -> BTreeMap<String, PortValue>;
}

/// Follows alias chains until a number is reached.
///
/// Cycles and dangling aliases leave the entry's original alias in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainResolver;

impl AliasResolver for ChainResolver {
    fn resolve(&self, mapping: BTreeMap<String, PortValue>) -> BTreeMap<String, PortValue> {
        let mut resolved = BTreeMap::new();

        for (name, value) in &mapping {
            let PortValue::Alias(target) = value else {
                resolved.insert(name.clone(), value.clone());
                continue;
            };

            let mut visited = BTreeSet::from([name.as_str()]);
            let mut current = target;
            let port = loop {
                if !visited.insert(current.as_str()) {
                    break None;
                }
                match mapping.get(current) {
                    Some(PortValue::Number(port)) => break Some(*port),
                    Some(PortValue::Alias(next)) => current = next,
                    None => break None,
                }
            };

            let value = match port {
                Some(port) => PortValue::Number(port),
                None => value.clone(),
            };
            resolved.insert(name.clone(), value);
        }

        resolved
    }
}

// ── Binding ───────────────────────────────────────────────────────────────────

/// A port that did not resolve to a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappedPort {
    pub name: String,
    pub target: String,
}

/// Result of binding: the usable ports plus what was dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortBinding {
    pub ports: BTreeMap<String, u16>,
    pub unmapped: Vec<UnmappedPort>,
}

impl PortBinding {
    /// Number of the announced primary port, if it was bound.
    pub fn primary(&self, config: &InstanceConfig) -> Option<u16> {
        let announce = config.announce.as_ref()?;
        self.ports.get(&announce.primary_port).copied()
    }
}

/// Bind ports with the stock `ChainResolver`.
pub fn bind_ports(config: &InstanceConfig, assigned: &BTreeMap<String, u16>) -> PortBinding {
    bind_ports_with(&ChainResolver, config, assigned)
}

/// Merge the task's declared ports with the scheduler's allocation and
/// keep only entries that end up numeric.
pub fn bind_ports_with(
    resolver: &dyn AliasResolver,
    config: &InstanceConfig,
    assigned: &BTreeMap<String, u16>,
) -> PortBinding {
    let mut merged = config
        .announce
        .as_ref()
        .map(|announce| announce.portmap.clone())
        .unwrap_or_default();

    for (name, &port) in assigned {
        if let Some(PortValue::Number(declared)) = merged.get(name) {
            if *declared != port {
                tracing::debug!(
                    port = %name,
                    declared,
                    assigned = port,
                    "scheduler overrides declared port"
                );
            }
        }
        merged.insert(name.clone(), PortValue::Number(port));
    }

    let mut binding = PortBinding::default();
    for (name, value) in resolver.resolve(merged) {
        match value {
            PortValue::Number(port) if !name.is_empty() => {
                binding.ports.insert(name, port);
            }
            PortValue::Number(port) => {
                tracing::warn!(port, "task has unnamed port");
                binding.unmapped.push(UnmappedPort {
                    name,
                    target: port.to_string(),
                });
            }
            PortValue::Alias(target) => {
                tracing::warn!(port = %name, %target, "task has unmapped port");
                binding.unmapped.push(UnmappedPort { name, target });
            }
        }
    }

    binding
}
