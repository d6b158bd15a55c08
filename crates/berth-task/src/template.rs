//! Template instantiation — binding a job template to one instance.
//!
//! The resolver only depends on the `Instantiate` trait. `MustacheBinder`
//! is the stock engine: it substitutes `{{ref}}` placeholders from the
//! `mesos.*` scope and reports every ref it could not bind.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::refs::{Ref, RefError};
use crate::schema::{InstanceConfig, JobTemplate, SchemaError, Variant};

/// Produces a per-instance config from a job template.
///
/// Returns the instantiated config and the refs left unbound, in order of
/// first appearance with no duplicates.
pub trait Instantiate: Send + Sync {
    fn instantiate(
        &self,
        job: &JobTemplate,
        instance: u32,
    ) -> Result<(InstanceConfig, Vec<Ref>), TemplateError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("bad placeholder: {0}")]
    InvalidRef(#[from] RefError),

    #[error("bound {0}")]
    Schema(#[from] SchemaError),

    #[error("failed to serialize job template: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// `{{ref}}` substitution over every string value of the job.
#[derive(Debug, Clone, Copy, Default)]
pub struct MustacheBinder;

type Bindings = HashMap<Ref, Value>;

impl MustacheBinder {
    fn bindings(job: &JobTemplate, instance: u32) -> Result<Bindings, RefError> {
        let mut scope = vec![
            ("mesos.instance", Value::from(instance)),
            ("mesos.role", Value::from(job.role.as_str())),
            ("mesos.job", Value::from(job.name.as_str())),
        ];
        if let Some(environment) = &job.environment {
            scope.push(("mesos.environment", Value::from(environment.as_str())));
        }
        if let Some(cluster) = &job.cluster {
            scope.push(("mesos.cluster", Value::from(cluster.as_str())));
        }

        scope
            .into_iter()
            .map(|(address, value)| Ok((Ref::from_address(address)?, value)))
            .collect()
    }
}

impl Instantiate for MustacheBinder {
    fn instantiate(
        &self,
        job: &JobTemplate,
        instance: u32,
    ) -> Result<(InstanceConfig, Vec<Ref>), TemplateError> {
        let bindings = Self::bindings(job, instance)?;
        let raw = serde_json::to_value(job).map_err(TemplateError::Serialize)?;

        let mut unbound = Vec::new();
        let mut bound = bind_value(raw, &bindings, &mut unbound)?;
        stringify_text_fields(&mut bound);
        let bound: JobTemplate = serde_json::from_value(bound).map_err(|source| SchemaError {
            variant: Variant::Job,
            source,
        })?;

        tracing::trace!(instance, unbound = unbound.len(), "instantiated job template");
        Ok((InstanceConfig::from_job(bound, instance), unbound))
    }
}

/// Job fields the schema types as strings.
const TEXT_FIELDS: &[&str] = &[
    "/name",
    "/role",
    "/environment",
    "/cluster",
    "/announce/primary_port",
];

/// Render numbers bound into string-typed fields back as text.
fn stringify_text_fields(bound: &mut Value) {
    for pointer in TEXT_FIELDS {
        if let Some(field @ Value::Number(_)) = bound.pointer_mut(pointer) {
            *field = Value::String(field.to_string());
        }
    }
}

fn bind_value(
    value: Value,
    bindings: &Bindings,
    unbound: &mut Vec<Ref>,
) -> Result<Value, TemplateError> {
    match value {
        Value::String(s) => bind_str(&s, bindings, unbound),
        Value::Array(items) => items
            .into_iter()
            .map(|item| bind_value(item, bindings, unbound))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .into_iter()
            .map(|(key, item)| Ok((key, bind_value(item, bindings, unbound)?)))
            .collect::<Result<Map<_, _>, TemplateError>>()
            .map(Value::Object),
        other => Ok(other),
    }
}

/// Substitute placeholders in one string.
///
/// A string that is exactly one bound placeholder takes the bound value
/// as-is, so `"{{mesos.instance}}"` becomes a number. Fields that must
/// stay strings are fixed up afterwards by `stringify_text_fields`.
fn bind_str(s: &str, bindings: &Bindings, unbound: &mut Vec<Ref>) -> Result<Value, TemplateError> {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        let placeholder = &rest[start..start + 2 + end + 2];
        let tail = &after[end + 2..];
        let reference = Ref::from_address(&after[..end])?;

        match bindings.get(&reference) {
            Some(value) if placeholder.len() == s.len() => return Ok(value.clone()),
            Some(Value::String(text)) => {
                out.push_str(&rest[..start]);
                out.push_str(text);
            }
            Some(other) => {
                out.push_str(&rest[..start]);
                out.push_str(&other.to_string());
            }
            None => {
                out.push_str(&rest[..start]);
                out.push_str(placeholder);
                if !unbound.contains(&reference) {
                    unbound.push(reference);
                }
            }
        }
        rest = tail;
    }

    out.push_str(rest);
    Ok(Value::String(out))
}
