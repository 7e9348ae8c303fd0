// ABOUTME: Trigger gateway configuration.
// ABOUTME: Listen address, webhook path and the shared secret used for signature checks.

use serde::Deserialize;

use super::EnvValue;

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_path")]
    pub path: String,

    pub secret: EnvValue,
}

fn default_bind() -> String {
    "0.0.0.0:9000".to_string()
}

fn default_path() -> String {
    "/hooks/push".to_string()
}
