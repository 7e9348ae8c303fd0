// ABOUTME: Container image reference composition.
// ABOUTME: Every image hoku touches is registry/workload:tag.

use std::fmt;

use super::{Registry, WorkloadName};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    registry: String,
    name: String,
    tag: String,
}

impl ImageRef {
    /// Compose `registry/workload:tag`. No side effects.
    pub fn new(registry: &Registry, workload: &WorkloadName, tag: &str) -> Self {
        Self {
            registry: registry.to_string(),
            name: workload.to_string(),
            tag: tag.to_string(),
        }
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.name, self.tag)
    }
}
