//! ZFS Provisioner Config
//!
//! Builds democratic-csi chart values for a fleet of storage classes backed
//! by one TrueNAS appliance, over either NFS or iSCSI.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐     ┌──────────────────────┐
//! │   FleetBuilder   │────▶│    Translator    │────▶│       Deployer       │
//! │ instances + NAS  │     │ descriptor ──▶   │     │ namespace, then      │
//! │ ──▶ descriptors  │     │ chart values     │     │ releases (any order) │
//! └──────────────────┘     └──────────────────┘     └──────────┬───────────┘
//!                                                              │
//!                              ┌───────────────────────────────┼──────────────┐
//!                              │                               │              │
//!                      ┌───────┴───────┐  ┌────────────────────┴─┐  ┌─────────┴──────┐
//!                      │ InMemory      │  │ ManifestWriter       │  │ Kube namespace │
//!                      │ Cluster       │  │ (values on disk)     │  │ provisioner    │
//!                      └───────────────┘  └──────────────────────┘  └────────────────┘
//! ```
//!
//! Fleet building and translation are pure and synchronous. Only the
//! deployment adapters perform I/O.
//!
//! # Modules
//!
//! - [`domain`]: Backend descriptors and collaborator ports
//! - [`values`]: Chart values document types
//! - [`translator`]: Descriptor to values translation
//! - [`fleet`]: Fleet aggregation and fleet-wide constraints
//! - [`deploy`]: Deployment driver and adapters
//! - [`error`]: Error types and handling

pub mod deploy;
pub mod domain;
pub mod error;
pub mod fleet;
pub mod translator;
pub mod values;

// Re-export commonly used types
pub use domain::{
    BackendDescriptor, ChartInstaller, ChartOverrides, ChartRelease, NamespaceProvisioner,
    RemoteEndpoint, TransportMode,
};

pub use values::{
    BackendConfig, BlockDeviceConfig, ControllerCapabilities, FsGroupPolicy, FsType,
    NetworkShareConfig, ProvisionerDeployment, StorageClassSpec,
};

pub use translator::{translate, translate_all};

pub use fleet::{build_fleet, DefaultClassPolicy, FleetBuilder, FleetInstance, FleetSpec};

pub use deploy::{
    DeploymentSummary, Deployer, InMemoryCluster, KubeNamespaceProvisioner, ManifestWriter,
    OutputFormat,
};

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
