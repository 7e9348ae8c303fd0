// ABOUTME: Bounds for every pipeline stage and external command.
// ABOUTME: Health defaults to five minutes; expiry follows the stage's failure path.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Timeouts {
    /// Default bound for a single short external command.
    #[serde(default = "default_command", with = "humantime_serde")]
    pub command: Duration,

    #[serde(default = "default_sync", with = "humantime_serde")]
    pub sync: Duration,

    #[serde(default = "default_build", with = "humantime_serde")]
    pub build: Duration,

    #[serde(default = "default_publish", with = "humantime_serde")]
    pub publish: Duration,

    #[serde(default = "default_apply", with = "humantime_serde")]
    pub apply: Duration,

    /// How long to wait for the rollout to become available.
    #[serde(default = "default_health", with = "humantime_serde")]
    pub health: Duration,

    #[serde(default = "default_rollback", with = "humantime_serde")]
    pub rollback: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            command: default_command(),
            sync: default_sync(),
            build: default_build(),
            publish: default_publish(),
            apply: default_apply(),
            health: default_health(),
            rollback: default_rollback(),
        }
    }
}

fn default_command() -> Duration {
    Duration::from_secs(120)
}

fn default_sync() -> Duration {
    Duration::from_secs(300)
}

fn default_build() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_publish() -> Duration {
    Duration::from_secs(600)
}

fn default_apply() -> Duration {
    Duration::from_secs(60)
}

fn default_health() -> Duration {
    Duration::from_secs(300)
}

fn default_rollback() -> Duration {
    Duration::from_secs(300)
}
