//! AutomotiveDevConfig CRD
//!
//! Operator-wide configuration for the automotive development environment.
//! Reconciling it also bootstraps the OAuth proxy secrets of the web UI and
//! build API in the resource's namespace.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default size of the persistent volume claim for build workspaces
pub const DEFAULT_PVC_SIZE: &str = "8Gi";

/// Default number of hours build artifacts are served before cleanup
pub const DEFAULT_SERVE_EXPIRY_HOURS: i32 = 24;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "automotive.sdv.cloud.redhat.com",
    version = "v1",
    kind = "AutomotiveDevConfig",
    namespaced,
    status = "AutomotiveDevConfigStatus",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AutomotiveDevConfigSpec {
    /// Global configuration for build operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_config: Option<BuildConfig>,
}

/// Configuration options for build operations
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// Use memory-backed volumes for build operations
    #[serde(default)]
    pub use_memory_volumes: bool,

    /// Size limit for memory-backed volumes (required if `useMemoryVolumes` is true), e.g. "2Gi"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_volume_size: Option<String>,

    /// Size of the persistent volume claims created for build workspaces (default "8Gi")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pvc_size: Option<String>,

    /// Runtime class to use for the build pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_class_name: Option<String>,

    /// How long to serve build artifacts before automatic cleanup (default 24)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serve_expiry_hours: Option<i32>,
}

impl BuildConfig {
    /// PVC size, falling back to [`DEFAULT_PVC_SIZE`]
    pub fn pvc_size(&self) -> &str {
        self.pvc_size
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_PVC_SIZE)
    }

    /// Artifact serve expiry, falling back to [`DEFAULT_SERVE_EXPIRY_HOURS`]
    pub fn serve_expiry_hours(&self) -> i32 {
        self.serve_expiry_hours.unwrap_or(DEFAULT_SERVE_EXPIRY_HOURS)
    }

    /// Check field combinations the schema cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.use_memory_volumes
            && self.memory_volume_size.as_deref().is_none_or(str::is_empty)
        {
            return Err("buildConfig.memoryVolumeSize is required when useMemoryVolumes is true".to_string());
        }
        if let Some(hours) = self.serve_expiry_hours {
            if hours <= 0 {
                return Err(format!("buildConfig.serveExpiryHours must be positive, got {}", hours));
            }
        }
        Ok(())
    }
}

impl AutomotiveDevConfigSpec {
    /// Validate the spec; a missing build config is valid.
    pub fn validate(&self) -> Result<(), String> {
        match &self.build_config {
            Some(build_config) => build_config.validate(),
            None => Ok(()),
        }
    }
}

/// Phase of an AutomotiveDevConfig environment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum DevConfigPhase {
    /// Not yet reconciled
    #[default]
    Pending,

    /// Environment is ready
    Ready,

    /// Reconciliation failed (see message)
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutomotiveDevConfigStatus {
    /// Current phase (Ready, Pending, Failed)
    #[serde(default)]
    pub phase: DevConfigPhase,

    /// More detail about the current phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// When the status was last updated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<chrono::DateTime<chrono::Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.pvc_size(), "8Gi");
        assert_eq!(config.serve_expiry_hours(), 24);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_memory_volumes_require_size() {
        let mut config = BuildConfig {
            use_memory_volumes: true,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("memoryVolumeSize"));

        config.memory_volume_size = Some("2Gi".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serve_expiry_must_be_positive() {
        let config = BuildConfig {
            serve_expiry_hours: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_spec_deserializes_camel_case() {
        let spec: AutomotiveDevConfigSpec = serde_json::from_value(serde_json::json!({
            "buildConfig": {
                "useMemoryVolumes": true,
                "memoryVolumeSize": "2Gi",
                "runtimeClassName": "kata"
            }
        }))
        .unwrap();

        let build_config = spec.build_config.unwrap();
        assert!(build_config.use_memory_volumes);
        assert_eq!(build_config.memory_volume_size.as_deref(), Some("2Gi"));
        assert_eq!(build_config.runtime_class_name.as_deref(), Some("kata"));
        assert_eq!(build_config.pvc_size(), "8Gi");
    }

    #[test]
    fn test_status_serializes_phase() {
        let status = AutomotiveDevConfigStatus {
            phase: DevConfigPhase::Ready,
            message: None,
            last_updated: None,
        };
        assert_eq!(serde_json::to_value(&status).unwrap(), serde_json::json!({"phase": "Ready"}));
    }
}
