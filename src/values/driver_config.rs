//! Driver config section of the chart values
//!
//! `driver.config` is handed verbatim to the democratic-csi process. The
//! `driver` key selects which of the two shapes the process expects, so the
//! two transport modes are modelled as variants of one tagged enum.

use crate::domain::TransportMode;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// Connections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpConnection {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub api_key: String,
    /// Appliance API sits on the management network without TLS
    pub allow_insecure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SshConnection {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

// =============================================================================
// ZFS
// =============================================================================

/// Absolute paths of the commands run on the appliance over SSH
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ZfsCliPaths {
    pub zfs: String,
    pub zpool: String,
    pub sudo: String,
    pub chroot: String,
}

impl Default for ZfsCliPaths {
    fn default() -> Self {
        Self {
            zfs: "/usr/sbin/zfs".to_string(),
            zpool: "/usr/sbin/zpool".to_string(),
            sudo: "/usr/bin/sudo".to_string(),
            chroot: "/usr/sbin/chroot".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ZfsCli {
    pub paths: ZfsCliPaths,
}

/// Dataset settings for NFS shares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatasetZfsConfig {
    pub cli: ZfsCli,
    pub dataset_parent_name: String,
    pub detached_snapshots_dataset_parent_name: String,
    pub dataset_enable_quotas: bool,
    pub dataset_enable_reservation: bool,
    pub dataset_permissions_mode: String,
    pub dataset_permissions_user: u32,
    pub dataset_permissions_group: u32,
}

/// Zvol settings for iSCSI extents. Empty strings inherit from the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ZvolZfsConfig {
    pub cli: ZfsCli,
    pub dataset_parent_name: String,
    pub detached_snapshots_dataset_parent_name: String,
    pub zvol_compression: String,
    pub zvol_dedup: String,
    pub zvol_enable_reservation: bool,
    pub zvol_blocksize: String,
}

// =============================================================================
// NFS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NfsShareConfig {
    pub share_host: String,
    pub share_alldirs: bool,
    pub share_allowed_hosts: Vec<String>,
    pub share_allowed_networks: Vec<String>,
    pub share_maproot_user: String,
    pub share_maproot_group: String,
    pub share_mapall_user: String,
    pub share_mapall_group: String,
}

// =============================================================================
// iSCSI
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetGroup {
    pub target_group_portal_group: u32,
    pub target_group_initiator_group: u32,
    pub target_group_auth_type: String,
    pub target_group_auth_group: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IscsiConfig {
    pub target_portal: String,
    pub target_portals: Vec<String>,
    pub interface: String,
    pub name_prefix: String,
    pub name_suffix: String,
    pub target_groups: Vec<TargetGroup>,
    pub extent_insecure_tpc: bool,
    pub extent_xen_compat: bool,
    pub extent_disable_physical_blocksize: bool,
    pub extent_blocksize: u32,
    pub extent_rpm: String,
    pub extent_avail_threshold: u32,
}

// =============================================================================
// Backend Config
// =============================================================================

/// `driver.config` for the NFS driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkShareConfig {
    #[serde(rename = "instance_id")]
    pub instance_id: String,
    pub http_connection: HttpConnection,
    pub ssh_connection: SshConnection,
    pub zfs: DatasetZfsConfig,
    pub nfs: NfsShareConfig,
}

/// `driver.config` for the iSCSI driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlockDeviceConfig {
    #[serde(rename = "instance_id")]
    pub instance_id: String,
    pub http_connection: HttpConnection,
    pub ssh_connection: SshConnection,
    pub zfs: ZvolZfsConfig,
    pub iscsi: IscsiConfig,
}

/// Mode-specific driver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "driver")]
pub enum BackendConfig {
    #[serde(rename = "freenas-nfs")]
    NetworkShare(NetworkShareConfig),
    #[serde(rename = "freenas-iscsi")]
    BlockDevice(BlockDeviceConfig),
}

impl BackendConfig {
    pub fn transport_mode(&self) -> TransportMode {
        match self {
            BackendConfig::NetworkShare(_) => TransportMode::NetworkShare,
            BackendConfig::BlockDevice(_) => TransportMode::BlockDevice,
        }
    }

    /// Driver name the democratic-csi process dispatches on
    pub fn driver_name(&self) -> &'static str {
        match self {
            BackendConfig::NetworkShare(_) => "freenas-nfs",
            BackendConfig::BlockDevice(_) => "freenas-iscsi",
        }
    }

    pub fn dataset_parent_name(&self) -> &str {
        match self {
            BackendConfig::NetworkShare(c) => &c.zfs.dataset_parent_name,
            BackendConfig::BlockDevice(c) => &c.zfs.dataset_parent_name,
        }
    }

    pub fn detached_snapshots_dataset_parent_name(&self) -> &str {
        match self {
            BackendConfig::NetworkShare(c) => &c.zfs.detached_snapshots_dataset_parent_name,
            BackendConfig::BlockDevice(c) => &c.zfs.detached_snapshots_dataset_parent_name,
        }
    }

    pub fn http_connection(&self) -> &HttpConnection {
        match self {
            BackendConfig::NetworkShare(c) => &c.http_connection,
            BackendConfig::BlockDevice(c) => &c.http_connection,
        }
    }

    pub fn ssh_connection(&self) -> &SshConnection {
        match self {
            BackendConfig::NetworkShare(c) => &c.ssh_connection,
            BackendConfig::BlockDevice(c) => &c.ssh_connection,
        }
    }

    pub fn cli_paths(&self) -> &ZfsCliPaths {
        match self {
            BackendConfig::NetworkShare(c) => &c.zfs.cli.paths,
            BackendConfig::BlockDevice(c) => &c.zfs.cli.paths,
        }
    }

    pub fn as_network_share(&self) -> Option<&NetworkShareConfig> {
        match self {
            BackendConfig::NetworkShare(c) => Some(c),
            BackendConfig::BlockDevice(_) => None,
        }
    }

    pub fn as_block_device(&self) -> Option<&BlockDeviceConfig> {
        match self {
            BackendConfig::BlockDevice(c) => Some(c),
            BackendConfig::NetworkShare(_) => None,
        }
    }
}

/// `driver` values wrapper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DriverValues {
    pub config: BackendConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_path_defaults() {
        let paths = ZfsCliPaths::default();
        assert_eq!(paths.zfs, "/usr/sbin/zfs");
        assert_eq!(paths.zpool, "/usr/sbin/zpool");
        assert_eq!(paths.sudo, "/usr/bin/sudo");
        assert_eq!(paths.chroot, "/usr/sbin/chroot");
    }

    #[test]
    fn test_target_group_keys() {
        let group = TargetGroup {
            target_group_portal_group: 1,
            target_group_initiator_group: 1,
            target_group_auth_type: "None".into(),
            target_group_auth_group: String::new(),
        };
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["targetGroupPortalGroup"], 1);
        assert_eq!(json["targetGroupInitiatorGroup"], 1);
        assert_eq!(json["targetGroupAuthType"], "None");
        assert_eq!(json["targetGroupAuthGroup"], "");
    }
}
