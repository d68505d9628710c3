//! Chart values documents
//!
//! Types in this module serialize to the democratic-csi chart's values
//! schema. Key names and nesting are the integration contract with the
//! chart; renaming any of them is a breaking change.
//!
//! - [`csi_driver`]: `csiDriver` and `controller` sections
//! - [`storage_class`]: `storageClasses[]` entries
//! - [`driver_config`]: `driver.config` for NFS and iSCSI

pub mod csi_driver;
pub mod driver_config;
pub mod storage_class;

pub use csi_driver::*;
pub use driver_config::*;
pub use storage_class::*;

use crate::domain::TransportMode;
use crate::error::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Complete values document for one provisioner instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionerDeployment {
    pub csi_driver: CsiDriverValues,
    pub controller: ControllerValues,
    /// Always exactly one class per instance
    pub storage_classes: [StorageClassSpec; 1],
    pub driver: DriverValues,
}

impl ProvisionerDeployment {
    /// Globally unique CSI driver name
    pub fn driver_identity(&self) -> &str {
        &self.csi_driver.name
    }

    pub fn transport_mode(&self) -> TransportMode {
        self.driver.config.transport_mode()
    }

    pub fn controller_capabilities(&self) -> ControllerCapabilities {
        ControllerCapabilities {
            attach_required: self.csi_driver.attach_required,
            fs_group_policy: self.csi_driver.fs_group_policy,
            expansion_enabled: self.controller.external_resizer.enabled,
            snapshot_enabled: self.controller.external_snapshotter.enabled,
        }
    }

    pub fn storage_class(&self) -> &StorageClassSpec {
        &self.storage_classes[0]
    }

    pub fn backend_config(&self) -> &BackendConfig {
        &self.driver.config
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
