use crate::*;

use berth_task::Resolver;

/// Pre-instantiated configs are taken as-is, placeholders and all.
#[test]
fn test_instance_config_passes_through() -> Result<()> {
    let blob = json!({
        "instance": 0,
        "role": "www-data",
        "task": {"cmdline": "run {{whatever.we.like}}"},
    });
    let config = resolve_bytes(&assignment(&blob, 0))?;
    assert_eq!(config.task["cmdline"], json!("run {{whatever.we.like}}"));
    assert!(config.announce.is_none());
    Ok(())
}

/// Re-sending a resolved config resolves to the same value.
#[test]
fn test_resolving_resolved_output_is_a_no_op() -> Result<()> {
    let first = resolve_bytes(&assignment(&hello_world_job(), 1))?;
    let resent = serde_json::to_value(&first)?;
    let second = resolve_bytes(&assignment(&resent, 1))?;
    assert_eq!(second, first);
    Ok(())
}

/// Both schema shapes describing the same instance bind the same ports.
#[test]
fn test_both_shapes_bind_alike() -> Result<()> {
    let ports = allocation(&[("http", 8080), ("health", 8081)]);

    let (from_job, job_binding) = launch(&assignment(&hello_world_job(), 0), &ports)?;
    let instance_blob = serde_json::to_value(&from_job)?;
    let (_, instance_binding) = launch(&assignment(&instance_blob, 0), &ports)?;

    assert_eq!(job_binding, instance_binding);
    Ok(())
}

#[test]
fn test_job_view_only_for_job_templates() -> Result<()> {
    let resolver = Resolver::new();

    let job = AssignedTask::decode(&assignment(&hello_world_job(), 0))?;
    let view = resolver.job_template(&job)?.context("expected a job template")?;
    assert_eq!(view.name, "hello_world");
    assert_eq!(view.instances, Some(3));

    let resolved = serde_json::to_value(resolve(&job)?)?;
    let instance = AssignedTask::decode(&assignment(&resolved, 0))?;
    assert!(resolver.job_template(&instance)?.is_none());
    Ok(())
}
