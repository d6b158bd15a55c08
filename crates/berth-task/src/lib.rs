//! berth-task — turns a decoded assignment into a bound instance config
//! and a final port map.
//!
//! Pipeline: `berth_core::wire` decodes the bytes, `resolver` picks the
//! schema variant and instantiates job templates through `template`, and
//! `ports` merges declared and scheduler-assigned ports.

pub mod ports;
pub mod refs;
pub mod resolver;
pub mod schema;
pub mod template;

pub use ports::{
    bind_ports, bind_ports_with, AliasResolver, ChainResolver, PortBinding, UnmappedPort,
};
pub use refs::Ref;
pub use resolver::{
    assigned_task_from_bytes, resolve, EmbeddedTemplate, ResolveError, Resolver, TemplateSource,
};
pub use schema::{Announce, InstanceConfig, JobTemplate, PortValue, TaskTemplate, Variant};
pub use template::{Instantiate, MustacheBinder, TemplateError};
