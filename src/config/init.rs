// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates a commented hoku.yml template.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{Registry, WorkloadName};

use super::{CONFIG_FILENAME, Config};

pub fn init_config(
    dir: &Path,
    workload: Option<&str>,
    registry: Option<&str>,
    force: bool,
) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template();

    if let Some(w) = workload {
        config.workload = WorkloadName::new(w).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.source.path = Path::new("/srv").join(w);
    }

    if let Some(r) = registry {
        config.registry = Registry::new(r).map_err(|e| Error::InvalidConfig(e.to_string()))?;
    }

    std::fs::write(&config_path, generate_template_yaml(&config))?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    format!(
        r#"workload: {workload}
namespace: {namespace}
registry: {registry}
source:
  path: {path}
  branch: {branch}
build:
  context: .
  resources:
    cpu_shares: {cpu_shares}
    memory: 2g
timeouts:
  health: 5m
# Uncomment to accept push notifications with `hoku serve`
# gateway:
#   bind: 0.0.0.0:9000
#   path: /hooks/push
#   secret:
#     env: HOKU_WEBHOOK_SECRET
"#,
        workload = config.workload,
        namespace = config.namespace,
        registry = config.registry,
        path = config.source.path.display(),
        branch = config.source.branch,
        cpu_shares = config.build.resources.cpu_shares,
    )
}
