//! Kubernetes namespace provisioner
//!
//! Server-side applies the namespace so repeated runs converge instead of
//! failing on conflicts.

use crate::domain::NamespaceProvisioner;
use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use tracing::info;

use super::{namespace_manifest, MANAGED_BY};

pub struct KubeNamespaceProvisioner {
    client: Client,
}

impl KubeNamespaceProvisioner {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect with the in-cluster or kubeconfig credentials
    pub async fn try_default() -> Result<Self> {
        Ok(Self::new(Client::try_default().await?))
    }
}

#[async_trait]
impl NamespaceProvisioner for KubeNamespaceProvisioner {
    async fn ensure_namespace(&self, name: &str) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let params = PatchParams::apply(MANAGED_BY).force();

        api.patch(name, &params, &Patch::Apply(&namespace_manifest(name)))
            .await?;

        info!("Applied namespace {}", name);
        Ok(())
    }
}
