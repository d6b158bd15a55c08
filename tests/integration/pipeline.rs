use crate::*;

use berth_core::DecodeError;
use berth_task::ResolveError;

/// Job template through decode, instantiation and port binding.
#[test]
fn test_job_template_launch() -> Result<()> {
    let raw = assignment(&hello_world_job(), 2);
    let (config, binding) = launch(&raw, &allocation(&[("http", 31000), ("health", 31001)]))?;

    assert_eq!(config.instance, 2);
    assert_eq!(config.role, "www-data");
    assert_eq!(config.task["name"], json!("hello_world-2"));
    // runner-owned refs survive verbatim
    assert_eq!(
        config.task["processes"][0]["cmdline"],
        json!("serve --port={{thermos.ports[http]}} --task={{thermos.task_id}}")
    );

    assert_eq!(
        binding.ports,
        allocation(&[("admin", 31000), ("aurora", 31001), ("health", 31001), ("http", 31000)])
    );
    assert!(binding.unmapped.is_empty());
    assert_eq!(binding.primary(&config), Some(31000));
    Ok(())
}

/// Encode then decode preserves the instance and blob exactly.
#[test]
fn test_assignment_round_trip() -> Result<()> {
    for (blob, instance) in [("{}", 0), ("{\"task\": \"ü\"}", 17), ("", u32::MAX)] {
        let original = AssignedTask::new(blob, instance);
        let decoded = AssignedTask::decode(&original.encode()?)?;
        assert_eq!(decoded, original);
    }
    Ok(())
}

/// Truncated bytes are rejected before any JSON is looked at.
#[test]
fn test_truncated_assignment_rejected() {
    let raw = assignment(&hello_world_job(), 0);
    let err = assigned_task_from_bytes(&raw[..raw.len() - 1]).unwrap_err();
    assert!(
        matches!(err, ResolveError::Decode(DecodeError::Truncated { .. })),
        "got {err:?}"
    );
}

#[test]
fn test_malformed_json_rejected() {
    let raw = AssignedTask::new("{not json", 0).encode().unwrap();
    let assigned = assigned_task_from_bytes(&raw).expect("bytes are well framed");
    let err = resolve(&assigned).unwrap_err();
    assert!(matches!(err, ResolveError::MalformedConfig(_)), "got {err:?}");
}

#[test]
fn test_missing_template_rejected() {
    let raw = AssignedTask::new("", 4).encode().unwrap();
    let err = resolve(&assigned_task_from_bytes(&raw).unwrap()).unwrap_err();
    assert!(matches!(err, ResolveError::MissingConfig), "got {err:?}");
}

/// Anything outside the deferred set fails, naming only the offenders.
#[test]
fn test_unexpected_refs_fail_launch() {
    let mut job = hello_world_job();
    job["task"]["user"] = json!("{{thermos.user}}");
    job["task"]["secret"] = json!("{{foo.bar}}");
    job["task"]["mount"] = json!("/data/{{volumes.scratch}}/{{foo.bar}}");

    let assigned = assigned_task_from_bytes(&assignment(&job, 1)).unwrap();
    match resolve(&assigned).unwrap_err() {
        ResolveError::UnboundReference { instance, refs } => {
            assert_eq!(instance, 1);
            let names: Vec<String> = refs.iter().map(ToString::to_string).collect();
            assert_eq!(names.len(), 2);
            assert!(names.contains(&"foo.bar".to_string()));
            assert!(names.contains(&"volumes.scratch".to_string()));
        }
        other => panic!("expected UnboundReference, got {other:?}"),
    }
}
