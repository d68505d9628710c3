//! Storage class entry of the chart values
//!
//! The chart renders one StorageClass per entry in `storageClasses`. Key
//! names here follow the chart, not Kubernetes: `defaultClass` rather than
//! the `is-default-class` annotation, and a `secrets` map the chart expands
//! into `csi.storage.k8s.io/*-secret-name` parameters.

use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// NFS client options used for every network-share mount
pub const NFS_MOUNT_OPTIONS: [&str; 5] = [
    "noatime",
    "nfsvers=4.2",
    "hard",
    "rsize=131072",
    "wsize=131072",
];

/// Annotation Kubernetes reads to pick the default class
pub const DEFAULT_CLASS_ANNOTATION: &str = "storageclass.kubernetes.io/is-default-class";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ReclaimPolicy {
    Retain,
    Delete,
}

impl std::fmt::Display for ReclaimPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReclaimPolicy::Retain => write!(f, "Retain"),
            ReclaimPolicy::Delete => write!(f, "Delete"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum VolumeBindingMode {
    Immediate,
    WaitForFirstConsumer,
}

impl std::fmt::Display for VolumeBindingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolumeBindingMode::Immediate => write!(f, "Immediate"),
            VolumeBindingMode::WaitForFirstConsumer => write!(f, "WaitForFirstConsumer"),
        }
    }
}

/// Filesystem the node formats or mounts the volume with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FsType {
    Ext4,
    Nfs,
}

impl std::fmt::Display for FsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FsType::Ext4 => write!(f, "ext4"),
            FsType::Nfs => write!(f, "nfs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageClassParameters {
    pub fs_type: FsType,
}

/// Placeholder secret; the chart fills in name and namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SecretRef {}

/// The five secret slots the chart expects on every storage class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct SecretRefs {
    pub provisioner_secret: SecretRef,
    pub controller_publish_secret: SecretRef,
    pub node_stage_secret: SecretRef,
    pub node_publish_secret: SecretRef,
    pub controller_expand_secret: SecretRef,
}

impl SecretRefs {
    /// Slot names as they appear in the values document
    pub const SLOTS: [&'static str; 5] = [
        "provisioner-secret",
        "controller-publish-secret",
        "node-stage-secret",
        "node-publish-secret",
        "controller-expand-secret",
    ];
}

/// One `storageClasses[]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageClassSpec {
    pub name: String,
    pub default_class: bool,
    pub reclaim_policy: ReclaimPolicy,
    pub volume_binding_mode: VolumeBindingMode,
    pub allow_volume_expansion: bool,
    pub parameters: StorageClassParameters,
    pub mount_options: Vec<String>,
    pub secrets: SecretRefs,
}

impl StorageClassSpec {
    pub fn is_default(&self) -> bool {
        self.default_class
    }

    pub fn fs_type(&self) -> FsType {
        self.parameters.fs_type
    }

    /// Preview the StorageClass for `provisioner`: name, default annotation,
    /// policies, `fsType` and mount options.
    ///
    /// The secret-reference parameters are left to the chart, which derives
    /// them from `secrets`.
    pub fn to_storage_class(&self, provisioner: &str) -> StorageClass {
        let mut annotations = BTreeMap::new();
        annotations.insert(
            DEFAULT_CLASS_ANNOTATION.to_string(),
            self.default_class.to_string(),
        );

        let mut parameters = BTreeMap::new();
        parameters.insert("fsType".to_string(), self.parameters.fs_type.to_string());

        StorageClass {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                annotations: Some(annotations),
                ..Default::default()
            },
            provisioner: provisioner.to_string(),
            reclaim_policy: Some(self.reclaim_policy.to_string()),
            volume_binding_mode: Some(self.volume_binding_mode.to_string()),
            allow_volume_expansion: Some(self.allow_volume_expansion),
            parameters: Some(parameters),
            mount_options: if self.mount_options.is_empty() {
                None
            } else {
                Some(self.mount_options.clone())
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nfs_class() -> StorageClassSpec {
        StorageClassSpec {
            name: "truenas-nfs".into(),
            default_class: true,
            reclaim_policy: ReclaimPolicy::Retain,
            volume_binding_mode: VolumeBindingMode::Immediate,
            allow_volume_expansion: true,
            parameters: StorageClassParameters { fs_type: FsType::Nfs },
            mount_options: NFS_MOUNT_OPTIONS.iter().map(|s| s.to_string()).collect(),
            secrets: SecretRefs::default(),
        }
    }

    #[test]
    fn test_secret_slots_serialize_as_empty_objects() {
        let json = serde_json::to_value(SecretRefs::default()).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj.len(), 5);
        for slot in SecretRefs::SLOTS {
            assert_eq!(obj[slot], serde_json::json!({}));
        }
    }

    #[test]
    fn test_chart_key_names() {
        let json = serde_json::to_value(nfs_class()).unwrap();
        assert_eq!(json["defaultClass"], true);
        assert_eq!(json["reclaimPolicy"], "Retain");
        assert_eq!(json["volumeBindingMode"], "Immediate");
        assert_eq!(json["allowVolumeExpansion"], true);
        assert_eq!(json["parameters"]["fsType"], "nfs");
        assert_eq!(json["mountOptions"][1], "nfsvers=4.2");
    }

    #[test]
    fn test_policy_display_matches_wire_names() {
        for policy in [ReclaimPolicy::Retain, ReclaimPolicy::Delete] {
            let wire = serde_json::to_value(policy).unwrap();
            assert_eq!(wire, policy.to_string());
        }
        for mode in [VolumeBindingMode::Immediate, VolumeBindingMode::WaitForFirstConsumer] {
            let wire = serde_json::to_value(mode).unwrap();
            assert_eq!(wire, mode.to_string());
        }
    }

    #[test]
    fn test_to_storage_class() {
        let sc = nfs_class().to_storage_class("org.democratic-csi.truenas-nfs");

        assert_eq!(sc.metadata.name.as_deref(), Some("truenas-nfs"));
        assert_eq!(sc.provisioner, "org.democratic-csi.truenas-nfs");
        assert_eq!(sc.reclaim_policy.as_deref(), Some("Retain"));
        assert_eq!(sc.volume_binding_mode.as_deref(), Some("Immediate"));
        assert_eq!(sc.mount_options.as_ref().map(Vec::len), Some(5));
        assert_eq!(
            sc.metadata.annotations.unwrap()[DEFAULT_CLASS_ANNOTATION],
            "true"
        );
    }

    #[test]
    fn test_to_storage_class_omits_empty_mount_options() {
        let mut class = nfs_class();
        class.mount_options.clear();
        class.parameters.fs_type = FsType::Ext4;

        let sc = class.to_storage_class("org.democratic-csi.block");
        assert!(sc.mount_options.is_none());
        assert_eq!(sc.parameters.unwrap()["fsType"], "ext4");
    }
}
