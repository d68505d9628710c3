//! Manifest writer
//!
//! Writes what would be applied to a directory instead of a cluster:
//! `namespace.<ext>`, and per release a values file plus a preview of the
//! StorageClass the chart renders.

use crate::domain::{ChartInstaller, ChartRelease, NamespaceProvisioner};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::namespace_manifest;

/// Serialization format for written documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Yaml => "yaml",
            OutputFormat::Json => "json",
        }
    }

    pub fn render<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
            OutputFormat::Json => {
                let mut out = serde_json::to_string_pretty(value)?;
                out.push('\n');
                Ok(out)
            }
        }
    }
}

pub struct ManifestWriter {
    root: PathBuf,
    format: OutputFormat,
}

impl ManifestWriter {
    /// Create the output directory if needed
    pub async fn new(root: impl AsRef<Path>, format: OutputFormat) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root, format })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn values_path(&self, release: &str) -> PathBuf {
        self.root
            .join(format!("{}.values.{}", release, self.format.extension()))
    }

    pub fn storage_class_path(&self, release: &str) -> PathBuf {
        self.root
            .join(format!("{}.storageclass.{}", release, self.format.extension()))
    }

    pub fn namespace_path(&self) -> PathBuf {
        self.root.join(format!("namespace.{}", self.format.extension()))
    }

    async fn write<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let body = self.format.render(value)?;
        fs::write(path, body).await?;
        debug!("Wrote {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl NamespaceProvisioner for ManifestWriter {
    async fn ensure_namespace(&self, name: &str) -> Result<()> {
        self.write(&self.namespace_path(), &namespace_manifest(name))
            .await
    }
}

#[async_trait]
impl ChartInstaller for ManifestWriter {
    async fn install(&self, release: &ChartRelease) -> Result<()> {
        self.write(&self.values_path(&release.name), &release.values)
            .await?;

        let storage_class = release
            .values
            .storage_class()
            .to_storage_class(release.values.driver_identity());
        self.write(&self.storage_class_path(&release.name), &storage_class)
            .await
    }

    fn installer_name(&self) -> &str {
        "manifest-writer"
    }
}
