//! CSI driver and controller sections of the chart values

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Image repository the controller driver is pulled from
pub const DRIVER_IMAGE_REGISTRY: &str = "docker.io/democraticcsi/democratic-csi";

/// How the kubelet applies fsGroup ownership to mounted volumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum FsGroupPolicy {
    File,
    ReadWriteOnceWithFSType,
}

impl std::fmt::Display for FsGroupPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FsGroupPolicy::File => write!(f, "File"),
            FsGroupPolicy::ReadWriteOnceWithFSType => write!(f, "ReadWriteOnceWithFSType"),
        }
    }
}

/// `csiDriver` values: the CSIDriver object registered with the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CsiDriverValues {
    /// Reverse-DNS driver name, unique per instance
    pub name: String,
    pub storage_capacity: bool,
    pub attach_required: bool,
    pub fs_group_policy: FsGroupPolicy,
}

/// A sidecar or container that is either deployed or not
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Toggle {
    pub enabled: bool,
}

impl Toggle {
    pub const ON: Toggle = Toggle { enabled: true };
    pub const OFF: Toggle = Toggle { enabled: false };

    pub fn when(enabled: bool) -> Self {
        Toggle { enabled }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImageValues {
    pub registry: String,
    /// Omitted so the chart falls back to its own default tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ControllerDriverValues {
    pub enabled: bool,
    pub image: ImageValues,
}

/// `controller` values: the driver container plus its CSI sidecars
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ControllerValues {
    pub driver: ControllerDriverValues,
    pub external_attacher: Toggle,
    pub external_provisioner: Toggle,
    pub external_resizer: Toggle,
    pub external_snapshotter: Toggle,
}

/// Flattened view of what the controller is able to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerCapabilities {
    pub attach_required: bool,
    pub fs_group_policy: FsGroupPolicy,
    pub expansion_enabled: bool,
    pub snapshot_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_group_policy_wire_names() {
        assert_eq!(
            serde_json::to_string(&FsGroupPolicy::ReadWriteOnceWithFSType).unwrap(),
            "\"ReadWriteOnceWithFSType\""
        );
        assert_eq!(format!("{}", FsGroupPolicy::File), "File");
    }

    #[test]
    fn test_image_tag_omitted_when_unset() {
        let image = ImageValues {
            registry: DRIVER_IMAGE_REGISTRY.into(),
            tag: None,
        };
        let json = serde_json::to_value(&image).unwrap();
        assert!(json.get("tag").is_none());
        assert_eq!(json["registry"], DRIVER_IMAGE_REGISTRY);
    }
}
