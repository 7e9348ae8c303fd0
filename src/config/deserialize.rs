// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Validates workload names, registries and memory sizes at load time.

use serde::Deserialize;

use crate::types::{Registry, WorkloadName};

pub fn deserialize_workload_name<'de, D>(deserializer: D) -> Result<WorkloadName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    WorkloadName::new(&s).map_err(serde::de::Error::custom)
}

pub fn deserialize_registry<'de, D>(deserializer: D) -> Result<Registry, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Registry::new(&s).map_err(serde::de::Error::custom)
}

pub fn deserialize_memory<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MemoryEntry {
        Bytes(u64),
        Text(String),
    }

    match MemoryEntry::deserialize(deserializer)? {
        MemoryEntry::Bytes(n) => Ok(n),
        MemoryEntry::Text(s) => parse_memory_string(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid memory size: {}", s))),
    }
}

/// Parse a memory string like "512m" or "1g" into bytes.
pub fn parse_memory_string(spec: &str) -> Option<u64> {
    let spec = spec.trim().to_lowercase();
    let spec = spec.strip_suffix('b').unwrap_or(&spec);
    let (num_str, multiplier) = if let Some(n) = spec.strip_suffix('g') {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = spec.strip_suffix('m') {
        (n, 1024 * 1024)
    } else if let Some(n) = spec.strip_suffix('k') {
        (n, 1024)
    } else {
        (spec, 1)
    };

    num_str
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .filter(|n| *n > 0)
}
