//! In-memory cluster
//!
//! Records namespaces and releases instead of applying them. Installing into
//! a namespace that was never ensured fails, like it would on a cluster.

use crate::domain::{ChartInstaller, ChartRelease, NamespaceProvisioner};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
pub struct InMemoryCluster {
    namespaces: RwLock<BTreeSet<String>>,
    /// Keyed by `namespace/name`
    releases: RwLock<BTreeMap<String, ChartRelease>>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn has_namespace(&self, name: &str) -> bool {
        self.namespaces.read().await.contains(name)
    }

    /// Installed releases ordered by namespace and name
    pub async fn releases(&self) -> Vec<ChartRelease> {
        self.releases.read().await.values().cloned().collect()
    }

    pub async fn release(&self, namespace: &str, name: &str) -> Option<ChartRelease> {
        self.releases
            .read()
            .await
            .get(&format!("{}/{}", namespace, name))
            .cloned()
    }
}

#[async_trait]
impl NamespaceProvisioner for InMemoryCluster {
    async fn ensure_namespace(&self, name: &str) -> Result<()> {
        if self.namespaces.write().await.insert(name.to_string()) {
            debug!("Created namespace {}", name);
        }
        Ok(())
    }
}

#[async_trait]
impl ChartInstaller for InMemoryCluster {
    async fn install(&self, release: &ChartRelease) -> Result<()> {
        if !self.has_namespace(&release.namespace).await {
            return Err(Error::Install {
                release: release.name.clone(),
                reason: format!("namespace {} does not exist", release.namespace),
            });
        }

        let key = format!("{}/{}", release.namespace, release.name);
        self.releases.write().await.insert(key, release.clone());
        Ok(())
    }

    fn installer_name(&self) -> &str {
        "in-memory"
    }
}
