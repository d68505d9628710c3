//! Deployment
//!
//! Hands translated documents to the collaborators behind
//! [`NamespaceProvisioner`] and [`ChartInstaller`]. The namespace is created
//! first; releases have no ordering between each other and are installed
//! concurrently.

pub mod cluster;
pub mod manifest;
pub mod memory;

pub use cluster::*;
pub use manifest::*;
pub use memory::*;

use crate::domain::{BackendDescriptor, ChartInstaller, ChartRelease, NamespaceProvisioner};
use crate::error::{Error, Result};
use crate::translator;
use futures::future::try_join_all;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Label value marking objects this crate manages
pub const MANAGED_BY: &str = "zfs-provisioner-config";

/// Namespace object with the managed-by label set
pub fn namespace_manifest(name: &str) -> Namespace {
    let mut labels = BTreeMap::new();
    labels.insert(
        "app.kubernetes.io/managed-by".to_string(),
        MANAGED_BY.to_string(),
    );

    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        ..Default::default()
    }
}

// =============================================================================
// Deployment Summary
// =============================================================================

/// What a deployment produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSummary {
    pub namespace: String,
    pub releases: Vec<String>,
    pub storage_classes: Vec<String>,
    pub default_classes: Vec<String>,
}

// =============================================================================
// Deployer
// =============================================================================

/// Drives a fleet of releases through the collaborators
pub struct Deployer {
    namespaces: Arc<dyn NamespaceProvisioner>,
    installer: Arc<dyn ChartInstaller>,
}

impl Deployer {
    pub fn new(
        namespaces: Arc<dyn NamespaceProvisioner>,
        installer: Arc<dyn ChartInstaller>,
    ) -> Self {
        Self {
            namespaces,
            installer,
        }
    }

    /// Translate every descriptor into a release.
    ///
    /// Nothing is returned unless all descriptors translate.
    pub fn plan(descriptors: &[BackendDescriptor]) -> Result<Vec<ChartRelease>> {
        let documents = translator::translate_all(descriptors)?;

        Ok(descriptors
            .iter()
            .zip(documents)
            .map(|(descriptor, values)| ChartRelease::new(descriptor, values))
            .collect())
    }

    /// Ensure `namespace`, then install all releases into it
    pub async fn deploy(
        &self,
        namespace: &str,
        releases: &[ChartRelease],
    ) -> Result<DeploymentSummary> {
        if let Some(stray) = releases.iter().find(|r| r.namespace != namespace) {
            return Err(Error::configuration(
                "namespace",
                format!(
                    "release {} targets namespace {}, expected {}",
                    stray.name, stray.namespace, namespace
                ),
            ));
        }

        self.namespaces.ensure_namespace(namespace).await?;
        info!("Namespace {} ready", namespace);

        try_join_all(releases.iter().map(|release| self.install(release))).await?;

        let summary = DeploymentSummary {
            namespace: namespace.to_string(),
            releases: releases.iter().map(|r| r.name.clone()).collect(),
            storage_classes: releases
                .iter()
                .map(|r| r.values.storage_class().name.clone())
                .collect(),
            default_classes: releases
                .iter()
                .filter(|r| r.values.storage_class().is_default())
                .map(|r| r.values.storage_class().name.clone())
                .collect(),
        };

        info!(
            "Deployed {} releases via {}",
            summary.releases.len(),
            self.installer.installer_name()
        );

        Ok(summary)
    }

    async fn install(&self, release: &ChartRelease) -> Result<()> {
        info!(
            "Installing release {} ({} {})",
            release.name,
            release.chart,
            release.version.as_deref().unwrap_or("latest")
        );
        self.installer.install(release).await
    }
}
