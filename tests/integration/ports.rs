use crate::*;

fn instance_with_portmap(portmap: Value) -> Vec<u8> {
    assignment(
        &json!({"instance": 0, "task": {}, "announce": {"portmap": portmap}}),
        0,
    )
}

#[test]
fn test_scheduler_overrides_alias() -> Result<()> {
    let raw = instance_with_portmap(json!({"http": "aliased_to_https", "https": 443}));
    let (_, binding) = launch(&raw, &allocation(&[("http", 8080)]))?;
    assert_eq!(binding.ports, allocation(&[("http", 8080), ("https", 443)]));
    Ok(())
}

#[test]
fn test_unresolvable_alias_dropped() -> Result<()> {
    let raw = instance_with_portmap(json!({"http": "nope"}));
    let (_, binding) = launch(&raw, &BTreeMap::new())?;
    assert!(binding.ports.is_empty());
    assert_eq!(binding.unmapped.len(), 1);
    assert_eq!(binding.unmapped[0].name, "http");
    assert_eq!(binding.unmapped[0].target, "nope");
    Ok(())
}

/// Unallocated aliases are dropped but never block the launch.
#[test]
fn test_partial_allocation_still_launches() -> Result<()> {
    let raw = assignment(&hello_world_job(), 0);
    let (_, binding) = launch(&raw, &allocation(&[("http", 9000)]))?;

    assert_eq!(binding.ports, allocation(&[("admin", 9000), ("http", 9000)]));
    let dropped: Vec<(&str, &str)> = binding
        .unmapped
        .iter()
        .map(|u| (u.name.as_str(), u.target.as_str()))
        .collect();
    assert_eq!(dropped, vec![("aurora", "health")]);
    Ok(())
}

#[test]
fn test_nothing_declared_nothing_bound() -> Result<()> {
    let raw = assignment(&json!({"instance": 0, "task": {}}), 0);
    let (_, binding) = launch(&raw, &BTreeMap::new())?;
    assert_eq!(binding, PortBinding::default());
    Ok(())
}
