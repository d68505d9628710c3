//! Translator - BackendDescriptor to chart values
//!
//! Pure and deterministic: the same descriptor always produces the same
//! document. Every mode-dependent choice is made by matching on
//! [`TransportMode`], so adding a mode is a compile error until it is
//! handled here.

use crate::domain::{BackendDescriptor, RemoteEndpoint, TransportMode};
use crate::error::Result;
use crate::values::*;
use tracing::debug;

// =============================================================================
// Constants
// =============================================================================

/// Prefix of every CSI driver name
pub const DRIVER_NAME_PREFIX: &str = "org.democratic-csi";

const HTTP_PORT: u16 = 80;
const SSH_PORT: u16 = 22;
const ISCSI_PORT: u16 = 3260;

const ISCSI_NAME_PREFIX: &str = "k8s-";
const EXTENT_BLOCKSIZE: u32 = 512;
const EXTENT_RPM: &str = "SSD";
const ZVOL_BLOCKSIZE: &str = "16K";

const DATASET_PERMISSIONS_MODE: &str = "0777";
const MAPROOT_USER: &str = "root";
const MAPROOT_GROUP: &str = "wheel";

// =============================================================================
// Translation
// =============================================================================

/// Build the chart values for one descriptor.
///
/// Fails with a configuration error naming the first empty field; no partial
/// document is ever returned.
pub fn translate(descriptor: &BackendDescriptor) -> Result<ProvisionerDeployment> {
    descriptor.validate()?;

    let mode = descriptor.transport_mode;
    let driver_identity = format!("{}.{}", DRIVER_NAME_PREFIX, descriptor.name);

    debug!(
        "Translating {} ({}, pool {}) as {}",
        descriptor.name, mode, descriptor.pool, driver_identity
    );

    Ok(ProvisionerDeployment {
        csi_driver: CsiDriverValues {
            name: driver_identity,
            storage_capacity: true,
            attach_required: mode.is_block(),
            fs_group_policy: fs_group_policy(mode),
        },
        controller: controller_values(descriptor),
        storage_classes: [storage_class(descriptor)],
        driver: DriverValues {
            config: backend_config(descriptor),
        },
    })
}

/// Translate every descriptor, stopping at the first invalid one
pub fn translate_all(descriptors: &[BackendDescriptor]) -> Result<Vec<ProvisionerDeployment>> {
    descriptors.iter().map(translate).collect()
}

fn fs_group_policy(mode: TransportMode) -> FsGroupPolicy {
    match mode {
        TransportMode::BlockDevice => FsGroupPolicy::File,
        TransportMode::NetworkShare => FsGroupPolicy::ReadWriteOnceWithFSType,
    }
}

fn controller_values(descriptor: &BackendDescriptor) -> ControllerValues {
    ControllerValues {
        driver: ControllerDriverValues {
            enabled: true,
            image: ImageValues {
                registry: DRIVER_IMAGE_REGISTRY.to_string(),
                tag: descriptor.overrides.image_tag.clone(),
            },
        },
        external_attacher: Toggle::when(descriptor.transport_mode.is_block()),
        external_provisioner: Toggle::ON,
        external_resizer: Toggle::ON,
        external_snapshotter: Toggle::ON,
    }
}

fn storage_class(descriptor: &BackendDescriptor) -> StorageClassSpec {
    let (fs_type, mount_options) = match descriptor.transport_mode {
        TransportMode::BlockDevice => (FsType::Ext4, Vec::new()),
        TransportMode::NetworkShare => (
            FsType::Nfs,
            NFS_MOUNT_OPTIONS.iter().map(|opt| opt.to_string()).collect(),
        ),
    };

    StorageClassSpec {
        name: descriptor.name.clone(),
        default_class: descriptor.is_default_class,
        reclaim_policy: ReclaimPolicy::Retain,
        volume_binding_mode: VolumeBindingMode::Immediate,
        allow_volume_expansion: true,
        parameters: StorageClassParameters { fs_type },
        mount_options,
        secrets: SecretRefs::default(),
    }
}

// =============================================================================
// Backend Config
// =============================================================================

fn http_connection(endpoint: &RemoteEndpoint) -> HttpConnection {
    HttpConnection {
        protocol: "http".to_string(),
        host: endpoint.host.clone(),
        port: HTTP_PORT,
        api_key: endpoint.api_key.clone(),
        allow_insecure: true,
    }
}

fn ssh_connection(endpoint: &RemoteEndpoint) -> SshConnection {
    SshConnection {
        host: endpoint.host.clone(),
        port: SSH_PORT,
        username: endpoint.username.clone(),
        password: endpoint.password.clone(),
    }
}

fn backend_config(descriptor: &BackendDescriptor) -> BackendConfig {
    let endpoint = &descriptor.remote_endpoint;

    match descriptor.transport_mode {
        TransportMode::NetworkShare => BackendConfig::NetworkShare(NetworkShareConfig {
            instance_id: String::new(),
            http_connection: http_connection(endpoint),
            ssh_connection: ssh_connection(endpoint),
            zfs: DatasetZfsConfig {
                cli: ZfsCli::default(),
                dataset_parent_name: descriptor.dataset_parent(),
                detached_snapshots_dataset_parent_name: descriptor.snapshot_parent(),
                dataset_enable_quotas: true,
                dataset_enable_reservation: false,
                dataset_permissions_mode: DATASET_PERMISSIONS_MODE.to_string(),
                dataset_permissions_user: 0,
                dataset_permissions_group: 0,
            },
            nfs: NfsShareConfig {
                share_host: endpoint.host.clone(),
                share_alldirs: false,
                share_allowed_hosts: Vec::new(),
                share_allowed_networks: Vec::new(),
                share_maproot_user: MAPROOT_USER.to_string(),
                share_maproot_group: MAPROOT_GROUP.to_string(),
                share_mapall_user: String::new(),
                share_mapall_group: String::new(),
            },
        }),
        TransportMode::BlockDevice => BackendConfig::BlockDevice(BlockDeviceConfig {
            instance_id: String::new(),
            http_connection: http_connection(endpoint),
            ssh_connection: ssh_connection(endpoint),
            zfs: ZvolZfsConfig {
                cli: ZfsCli::default(),
                dataset_parent_name: descriptor.dataset_parent(),
                detached_snapshots_dataset_parent_name: descriptor.snapshot_parent(),
                zvol_compression: String::new(),
                zvol_dedup: String::new(),
                zvol_enable_reservation: false,
                zvol_blocksize: ZVOL_BLOCKSIZE.to_string(),
            },
            iscsi: IscsiConfig {
                target_portal: format!("{}:{}", endpoint.host, ISCSI_PORT),
                target_portals: Vec::new(),
                interface: String::new(),
                name_prefix: ISCSI_NAME_PREFIX.to_string(),
                name_suffix: String::new(),
                target_groups: vec![TargetGroup {
                    target_group_portal_group: 1,
                    target_group_initiator_group: 1,
                    target_group_auth_type: "None".to_string(),
                    target_group_auth_group: String::new(),
                }],
                extent_insecure_tpc: true,
                extent_xen_compat: false,
                extent_disable_physical_blocksize: true,
                extent_blocksize: EXTENT_BLOCKSIZE,
                extent_rpm: EXTENT_RPM.to_string(),
                extent_avail_threshold: 0,
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChartOverrides;
    use crate::error::Error;
    use assert_matches::assert_matches;

    fn endpoint() -> RemoteEndpoint {
        RemoteEndpoint::new("192.168.1.20", "csi", "s3cret", "1-apikey")
    }

    fn descriptor(name: &str, pool: &str, mode: TransportMode, default: bool) -> BackendDescriptor {
        BackendDescriptor {
            namespace: "democratic-csi".into(),
            name: name.into(),
            pool: pool.into(),
            transport_mode: mode,
            remote_endpoint: endpoint(),
            is_default_class: default,
            overrides: ChartOverrides::default(),
        }
    }

    #[test]
    fn test_network_share_scenario() {
        let d = descriptor(
            "truenas-hdd-mirror-nfs",
            "hdd-mirror-pool",
            TransportMode::NetworkShare,
            true,
        );
        let out = translate(&d).unwrap();

        assert_eq!(out.driver_identity(), "org.democratic-csi.truenas-hdd-mirror-nfs");
        assert_eq!(out.storage_class().fs_type(), FsType::Nfs);
        assert!(out.storage_class().is_default());
        assert_eq!(out.storage_class().name, "truenas-hdd-mirror-nfs");
        assert_eq!(
            out.storage_class().mount_options,
            vec!["noatime", "nfsvers=4.2", "hard", "rsize=131072", "wsize=131072"]
        );

        let caps = out.controller_capabilities();
        assert!(!caps.attach_required);
        assert_eq!(caps.fs_group_policy, FsGroupPolicy::ReadWriteOnceWithFSType);
        assert!(caps.expansion_enabled);
        assert!(caps.snapshot_enabled);
        assert!(!out.controller.external_attacher.enabled);

        let config = out.backend_config();
        assert_eq!(config.dataset_parent_name(), "hdd-mirror-pool/k8s/nfs/vols");
        assert_eq!(
            config.detached_snapshots_dataset_parent_name(),
            "hdd-mirror-pool/k8s/nfs/snaps"
        );

        let nfs = config.as_network_share().unwrap();
        assert!(config.as_block_device().is_none());
        assert!(nfs.zfs.dataset_enable_quotas);
        assert!(!nfs.zfs.dataset_enable_reservation);
        assert_eq!(nfs.zfs.dataset_permissions_mode, "0777");
        assert_eq!(nfs.nfs.share_host, "192.168.1.20");
        assert_eq!(nfs.nfs.share_maproot_user, "root");
        assert_eq!(nfs.nfs.share_maproot_group, "wheel");
        assert!(nfs.nfs.share_allowed_hosts.is_empty());
        assert!(nfs.nfs.share_allowed_networks.is_empty());
    }

    #[test]
    fn test_block_device_scenario() {
        let d = descriptor(
            "truenas-hdd-mirror-iscsi",
            "hdd-mirror-pool",
            TransportMode::BlockDevice,
            false,
        );
        let out = translate(&d).unwrap();

        assert_eq!(out.storage_class().fs_type(), FsType::Ext4);
        assert!(out.storage_class().mount_options.is_empty());
        assert!(!out.storage_class().is_default());

        let caps = out.controller_capabilities();
        assert!(caps.attach_required);
        assert_eq!(caps.fs_group_policy, FsGroupPolicy::File);
        assert!(out.controller.external_attacher.enabled);

        let config = out.backend_config();
        assert_eq!(config.driver_name(), "freenas-iscsi");
        assert_eq!(config.dataset_parent_name(), "hdd-mirror-pool/k8s/iscsi/vols");
        assert!(config.as_network_share().is_none());

        let block = config.as_block_device().unwrap();
        assert_eq!(block.iscsi.target_portal, "192.168.1.20:3260");
        assert_eq!(block.iscsi.name_prefix, "k8s-");
        assert_eq!(block.iscsi.extent_blocksize, 512);
        assert_eq!(block.iscsi.extent_rpm, "SSD");
        assert!(block.iscsi.extent_disable_physical_blocksize);
        assert_eq!(block.iscsi.target_groups.len(), 1);
        assert_eq!(block.iscsi.target_groups[0].target_group_auth_type, "None");
        assert_eq!(block.zfs.zvol_blocksize, "16K");
        assert!(block.zfs.zvol_compression.is_empty());
        assert!(block.zfs.zvol_dedup.is_empty());
        assert!(!block.zfs.zvol_enable_reservation);
    }

    #[test]
    fn test_shared_connection_block() {
        for mode in [TransportMode::BlockDevice, TransportMode::NetworkShare] {
            let out = translate(&descriptor("x", "tank", mode, false)).unwrap();
            let config = out.backend_config();

            let http = config.http_connection();
            assert_eq!(http.protocol, "http");
            assert_eq!(http.port, 80);
            assert_eq!(http.api_key, "1-apikey");
            assert!(http.allow_insecure);

            let ssh = config.ssh_connection();
            assert_eq!(ssh.port, 22);
            assert_eq!(ssh.username, "csi");
            assert_eq!(ssh.password, "s3cret");

            assert_eq!(config.cli_paths(), &ZfsCliPaths::default());
        }
    }

    #[test]
    fn test_secret_slots_for_every_mode() {
        for mode in [TransportMode::BlockDevice, TransportMode::NetworkShare] {
            let out = translate(&descriptor("x", "tank", mode, false)).unwrap();
            let json = serde_json::to_value(out.storage_class()).unwrap();
            let secrets = json["secrets"].as_object().unwrap();

            let mut keys: Vec<&str> = secrets.keys().map(String::as_str).collect();
            let mut expected = SecretRefs::SLOTS.to_vec();
            keys.sort_unstable();
            expected.sort_unstable();
            assert_eq!(keys, expected);
        }
    }

    #[test]
    fn test_dataset_paths_follow_pool_and_mode() {
        for pool in ["tank", "ssd-pool", "hdd-stripe-pool"] {
            for mode in [TransportMode::BlockDevice, TransportMode::NetworkShare] {
                let out = translate(&descriptor("x", pool, mode, false)).unwrap();
                let config = out.backend_config();
                assert_eq!(
                    config.dataset_parent_name(),
                    format!("{}/k8s/{}/vols", pool, mode.token())
                );
                assert_eq!(
                    config.detached_snapshots_dataset_parent_name(),
                    format!("{}/k8s/{}/snaps", pool, mode.token())
                );
            }
        }
    }

    #[test]
    fn test_translation_is_deterministic() {
        let d = descriptor("truenas-ssd-nfs", "ssd", TransportMode::NetworkShare, true);
        let first = translate(&d).unwrap().to_yaml().unwrap();
        let second = translate(&d).unwrap().to_yaml().unwrap();
        assert_eq!(first, second);

        let first = translate(&d).unwrap().to_json().unwrap();
        let second = translate(&d).unwrap().to_json().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_host_is_rejected() {
        let mut d = descriptor("x", "tank", TransportMode::NetworkShare, false);
        d.remote_endpoint.host = String::new();

        let err = translate(&d).unwrap_err();
        assert_matches!(&err, Error::Configuration { field, .. } if field == "remoteEndpoint.host");
        assert!(err.to_string().contains("remoteEndpoint.host"));
    }

    #[test]
    fn test_empty_name_and_pool_are_rejected() {
        let d = descriptor("", "tank", TransportMode::BlockDevice, false);
        assert_eq!(translate(&d).unwrap_err().field(), Some("name"));

        let d = descriptor("x", "", TransportMode::BlockDevice, false);
        assert_eq!(translate(&d).unwrap_err().field(), Some("pool"));
    }

    #[test]
    fn test_image_tag_override_passes_through() {
        let mut d = descriptor("x", "tank", TransportMode::BlockDevice, false);
        assert!(translate(&d).unwrap().controller.driver.image.tag.is_none());

        d.overrides.image_tag = Some("v1.9.3".into());
        let out = translate(&d).unwrap();
        assert_eq!(out.controller.driver.image.tag.as_deref(), Some("v1.9.3"));
        assert_eq!(out.controller.driver.image.registry, DRIVER_IMAGE_REGISTRY);
    }

    #[test]
    fn test_values_document_shape() {
        let out = translate(&descriptor("x", "tank", TransportMode::NetworkShare, false)).unwrap();
        let json = serde_json::to_value(&out).unwrap();

        assert_eq!(json["csiDriver"]["name"], "org.democratic-csi.x");
        assert_eq!(json["csiDriver"]["storageCapacity"], true);
        assert_eq!(json["controller"]["externalAttacher"]["enabled"], false);
        assert_eq!(json["storageClasses"].as_array().map(Vec::len), Some(1));
        assert_eq!(json["driver"]["config"]["driver"], "freenas-nfs");
        assert_eq!(json["driver"]["config"]["instance_id"], "");
        assert_eq!(
            json["driver"]["config"]["zfs"]["datasetParentName"],
            "tank/k8s/nfs/vols"
        );
        assert!(json["driver"]["config"].get("iscsi").is_none());

        let back: ProvisionerDeployment = serde_json::from_value(json).unwrap();
        assert_eq!(back, out);
    }

    #[test]
    fn test_translate_all_fails_fast() {
        let good = descriptor("a", "tank", TransportMode::NetworkShare, false);
        let bad = descriptor("b", "", TransportMode::BlockDevice, false);

        assert_eq!(translate_all(&[good.clone()]).unwrap().len(), 1);
        assert_eq!(translate_all(&[good, bad]).unwrap_err().field(), Some("pool"));
    }
}
