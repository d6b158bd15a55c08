//! Task configuration resolver — assignment in, bound instance config out.
//!
//! Two schema shapes are accepted while schedulers migrate from sending a
//! pre-instantiated `InstanceConfig` to sending the whole `JobTemplate`.
//! Job templates are instantiated here and must come out fully bound,
//! apart from the refs in `DEFERRED_REFS` that the task runner fills in at
//! launch.

use serde_json::{Map, Value};

use berth_core::wire::{AssignedTask, DecodeError};

use crate::refs::Ref;
use crate::schema::{InstanceConfig, JobTemplate, SchemaError, TaskTemplate};
use crate::template::{Instantiate, MustacheBinder, TemplateError};

// ── Template extraction ───────────────────────────────────────────────────────

/// Pulls the JSON template text out of an assignment.
pub trait TemplateSource: Send + Sync {
    fn extract<'a>(&self, assigned: &'a AssignedTask) -> Option<&'a str>;
}

/// The blob carried in `AssignedTask::task`, if it is not empty.
///
/// Whitespace is passed through; a blank blob fails as invalid JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedTemplate;

impl TemplateSource for EmbeddedTemplate {
    fn extract<'a>(&self, assigned: &'a AssignedTask) -> Option<&'a str> {
        (!assigned.task.is_empty()).then_some(assigned.task.as_str())
    }
}

// ── Deferred refs ─────────────────────────────────────────────────────────────

/// How a deferred pattern is compared against an unbound ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredMatch {
    /// Same address.
    Exact,
    /// Anywhere strictly under the address.
    Subscope,
}

/// Refs allowed to survive instantiation.
pub const DEFERRED_REFS: &[(DeferredMatch, &str)] = &[
    // bound by the task runner
    (DeferredMatch::Exact, "thermos.task_id"),
    (DeferredMatch::Subscope, "thermos.ports"),
    // legacy, ignored
    (DeferredMatch::Exact, "thermos.user"),
];

/// True if `reference` matches an entry of `DEFERRED_REFS`.
pub fn is_deferred(reference: &Ref) -> bool {
    DEFERRED_REFS.iter().any(|(kind, address)| {
        let Ok(pattern) = Ref::from_address(address) else {
            return false;
        };
        match kind {
            DeferredMatch::Exact => *reference == pattern,
            DeferredMatch::Subscope => reference.is_subscope_of(&pattern),
        }
    })
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("could not deserialize assignment: {0}")]
    Decode(#[from] DecodeError),

    #[error("assignment did not carry a task template")]
    MissingConfig,

    #[error("could not deserialize task template: {0}")]
    MalformedConfig(#[source] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("instantiation failed: {0}")]
    Instantiate(#[from] TemplateError),

    #[error("unexpected unbound refs for instance {instance}: {}", join_refs(.refs))]
    UnboundReference { instance: u32, refs: Vec<Ref> },
}

fn join_refs(refs: &[Ref]) -> String {
    refs.iter()
        .map(Ref::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Resolver ──────────────────────────────────────────────────────────────────

/// Resolves assignments using an injected template source and engine.
#[derive(Debug, Clone, Default)]
pub struct Resolver<S = EmbeddedTemplate, E = MustacheBinder> {
    source: S,
    engine: E,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: TemplateSource, E: Instantiate> Resolver<S, E> {
    pub fn with_parts(source: S, engine: E) -> Self {
        Self { source, engine }
    }

    /// Resolve an assignment into the config for its instance.
    ///
    /// An `InstanceConfig` blob is returned as decoded, with no
    /// instantiation and no ref checks.
    pub fn resolve(&self, assigned: &AssignedTask) -> Result<InstanceConfig, ResolveError> {
        let instance = assigned.instance_id;

        let job = match self.parse(assigned)? {
            TaskTemplate::Instance(config) => {
                tracing::debug!(
                    instance,
                    variant = "instance",
                    "task template already instantiated"
                );
                return Ok(config);
            }
            TaskTemplate::Job(job) => job,
        };

        tracing::debug!(
            instance,
            variant = "job",
            job = %job.name,
            "instantiating job template"
        );
        let (config, unbound) = self.engine.instantiate(&job, instance)?;

        let (deferred, offending): (Vec<Ref>, Vec<Ref>) =
            unbound.into_iter().partition(is_deferred);

        if !offending.is_empty() {
            return Err(ResolveError::UnboundReference {
                instance,
                refs: offending,
            });
        }
        if !deferred.is_empty() {
            tracing::debug!(
                instance,
                refs = %join_refs(&deferred),
                "refs deferred to task runner"
            );
        }

        Ok(config)
    }

    /// The job-level template behind an assignment.
    ///
    /// `None` when the assignment carries an instance config, no template,
    /// or text that does not parse as JSON. Valid JSON that is not an
    /// object is `MalformedConfig`.
    pub fn job_template(
        &self,
        assigned: &AssignedTask,
    ) -> Result<Option<JobTemplate>, ResolveError> {
        let Some(text) = self.source.extract(assigned) else {
            return Ok(None);
        };
        let Ok(value) = serde_json::from_str::<Value>(text) else {
            return Ok(None);
        };
        let blob: Map<String, Value> =
            serde_json::from_value(value).map_err(ResolveError::MalformedConfig)?;
        match TaskTemplate::from_object(blob)? {
            TaskTemplate::Job(job) => Ok(Some(job)),
            TaskTemplate::Instance(_) => Ok(None),
        }
    }

    fn parse(&self, assigned: &AssignedTask) -> Result<TaskTemplate, ResolveError> {
        let text = self
            .source
            .extract(assigned)
            .ok_or(ResolveError::MissingConfig)?;
        let blob: Map<String, Value> =
            serde_json::from_str(text).map_err(ResolveError::MalformedConfig)?;
        Ok(TaskTemplate::from_object(blob)?)
    }
}

/// Decode raw assignment bytes.
pub fn assigned_task_from_bytes(raw: &[u8]) -> Result<AssignedTask, ResolveError> {
    Ok(AssignedTask::decode(raw)?)
}

/// Resolve with the stock template source and engine.
pub fn resolve(assigned: &AssignedTask) -> Result<InstanceConfig, ResolveError> {
    Resolver::new().resolve(assigned)
}
