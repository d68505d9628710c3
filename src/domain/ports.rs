//! Domain Ports - the deployment collaborator boundary
//!
//! Translation stops at a values document. Materializing it in a cluster is
//! done by whatever implements these traits: a real cluster client, a
//! manifest writer, or an in-memory recorder in tests.

use crate::domain::BackendDescriptor;
use crate::error::Result;
use crate::values::ProvisionerDeployment;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Chart that renders the provisioner
pub const CHART_NAME: &str = "democratic-csi";

/// Helm repository hosting [`CHART_NAME`]
pub const CHART_REPO: &str = "https://democratic-csi.github.io/charts";

// =============================================================================
// Chart Release
// =============================================================================

/// One chart install: where, which version, and with what values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRelease {
    /// Release name; matches the storage class name
    pub name: String,
    pub namespace: String,
    pub chart: String,
    pub repo: String,
    /// `None` lets the installer pick the latest chart
    pub version: Option<String>,
    pub values: ProvisionerDeployment,
}

impl ChartRelease {
    pub fn new(descriptor: &BackendDescriptor, values: ProvisionerDeployment) -> Self {
        Self {
            name: descriptor.name.clone(),
            namespace: descriptor.namespace.clone(),
            chart: CHART_NAME.to_string(),
            repo: CHART_REPO.to_string(),
            version: descriptor.overrides.chart_version.clone(),
            values,
        }
    }
}

// =============================================================================
// Collaborator Traits
// =============================================================================

/// Creates the namespace every release is installed into
#[async_trait]
pub trait NamespaceProvisioner: Send + Sync {
    /// Create the namespace if it does not exist yet
    async fn ensure_namespace(&self, name: &str) -> Result<()>;
}

/// Installs or upgrades a chart release
#[async_trait]
pub trait ChartInstaller: Send + Sync {
    async fn install(&self, release: &ChartRelease) -> Result<()>;

    /// Installer name for logs
    fn installer_name(&self) -> &str;
}
