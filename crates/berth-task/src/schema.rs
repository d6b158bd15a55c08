//! Task template schema — the two shapes a scheduler may send.
//!
//! Older schedulers ship an already-instantiated `InstanceConfig`; newer
//! ones ship the whole `JobTemplate` and leave instantiation to the
//! executor. Both shapes are JSON objects and the only reliable way to
//! tell them apart is the top-level `instance` key.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Announcement ──────────────────────────────────────────────────────────────

/// A port declared by the task: either a number or the name of another port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(u16),
    Alias(String),
}

/// Service-discovery section of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announce {
    /// Port advertised as the service endpoint.
    #[serde(default = "default_primary_port")]
    pub primary_port: String,

    /// Self-declared ports. Values may alias other entries.
    #[serde(default)]
    pub portmap: BTreeMap<String, PortValue>,
}

fn default_primary_port() -> String {
    "http".to_string()
}

// ── Job template ──────────────────────────────────────────────────────────────

/// Job-wide template covering every instance. May contain `{{...}}` refs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobTemplate {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub role: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,

    /// Number of instances in the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<u32>,

    /// The process tree handed to the task runner. Opaque to berth.
    pub task: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announce: Option<Announce>,

    /// Keys berth does not interpret, carried through instantiation.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Instance config ───────────────────────────────────────────────────────────

/// Configuration of a single instance, ready for the task runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub instance: u32,

    #[serde(default)]
    pub role: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    pub task: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announce: Option<Announce>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InstanceConfig {
    /// Narrow a (bound) job template to one instance.
    ///
    /// Job-only keys (`name`, `cluster`, `instances`) are dropped.
    pub fn from_job(job: JobTemplate, instance: u32) -> Self {
        Self {
            instance,
            role: job.role,
            environment: job.environment,
            task: job.task,
            announce: job.announce,
            extra: job.extra,
        }
    }
}

// ── Variant classification ────────────────────────────────────────────────────

/// Which schema a template blob follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Job,
    Instance,
}

impl Variant {
    /// Classify a parsed blob. The `instance` key is authoritative.
    pub fn classify(blob: &Map<String, Value>) -> Self {
        if blob.contains_key("instance") {
            Self::Instance
        } else {
            Self::Job
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Job => "job",
            Self::Instance => "instance",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A blob that was classified but does not fit its schema.
#[derive(Debug, thiserror::Error)]
#[error("task template does not match the {variant} schema: {source}")]
pub struct SchemaError {
    pub variant: Variant,
    #[source]
    pub source: serde_json::Error,
}

/// A decoded task template, tagged by schema.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskTemplate {
    Job(JobTemplate),
    Instance(InstanceConfig),
}

impl TaskTemplate {
    /// Classify, then decode into the matching schema.
    pub fn from_object(blob: Map<String, Value>) -> Result<Self, SchemaError> {
        let variant = Variant::classify(&blob);
        let value = Value::Object(blob);
        let decoded = match variant {
            Variant::Instance => serde_json::from_value(value).map(Self::Instance),
            Variant::Job => serde_json::from_value(value).map(Self::Job),
        };
        decoded.map_err(|source| SchemaError { variant, source })
    }

    pub fn variant(&self) -> Variant {
        match self {
            Self::Job(_) => Variant::Job,
            Self::Instance(_) => Variant::Instance,
        }
    }
}
