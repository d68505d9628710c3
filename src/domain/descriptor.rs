//! Backend Descriptor - the input side of translation
//!
//! A descriptor names one provisioner instance: which pool on the appliance it
//! carves volumes out of, how volumes reach the nodes, and the shared
//! appliance credentials.

use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// =============================================================================
// Transport Mode
// =============================================================================

/// How provisioned volumes are exposed to cluster nodes.
///
/// Deserialization goes through [`FromStr`], so every accepted spelling is
/// listed in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "String")]
pub enum TransportMode {
    /// iSCSI attached zvols
    #[serde(rename = "iscsi")]
    BlockDevice,
    /// NFS exported datasets
    #[serde(rename = "nfs")]
    NetworkShare,
}

impl TransportMode {
    /// Driver-type token used in dataset paths and driver names
    pub fn token(&self) -> &'static str {
        match self {
            TransportMode::BlockDevice => "iscsi",
            TransportMode::NetworkShare => "nfs",
        }
    }

    /// Check if volumes must be attached before they can be staged
    pub fn is_block(&self) -> bool {
        matches!(self, TransportMode::BlockDevice)
    }
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl FromStr for TransportMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "iscsi" | "block" | "blockdevice" => Ok(TransportMode::BlockDevice),
            "nfs" | "share" | "networkshare" => Ok(TransportMode::NetworkShare),
            other => Err(Error::configuration(
                "transportMode",
                format!("unknown transport mode '{}', expected iscsi or nfs", other),
            )),
        }
    }
}

impl TryFrom<String> for TransportMode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Reject empty values and values padded with whitespace
fn check_field(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::configuration(field, "must not be empty"));
    }
    if value.trim() != value {
        return Err(Error::configuration(
            field,
            "must not have leading or trailing whitespace",
        ));
    }
    Ok(())
}

// =============================================================================
// Remote Endpoint
// =============================================================================

/// Connection details for the storage appliance, shared across a fleet
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEndpoint {
    pub host: String,
    pub username: String,
    pub password: String,
    pub api_key: String,
}

impl RemoteEndpoint {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            api_key: api_key.into(),
        }
    }

    /// Reject any empty connection field, naming the first offender.
    /// Host and username must also be free of surrounding whitespace;
    /// secrets are passed through as given.
    pub fn validate(&self) -> Result<()> {
        check_field("remoteEndpoint.host", &self.host)?;
        check_field("remoteEndpoint.username", &self.username)?;

        let secrets = [
            ("remoteEndpoint.password", &self.password),
            ("remoteEndpoint.apiKey", &self.api_key),
        ];
        for (field, value) in secrets {
            if value.trim().is_empty() {
                return Err(Error::configuration(field, "must not be empty"));
            }
        }

        Ok(())
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for RemoteEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteEndpoint")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Chart Overrides
// =============================================================================

/// Optional version pins, passed through to the chart untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChartOverrides {
    /// Chart version; `None` installs the latest published chart
    #[serde(default)]
    pub chart_version: Option<String>,
    /// Driver image tag; `None` keeps the chart's default
    #[serde(default)]
    pub image_tag: Option<String>,
}

// =============================================================================
// Backend Descriptor
// =============================================================================

/// One provisioner instance to translate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendDescriptor {
    /// Namespace the chart is installed into
    pub namespace: String,
    /// Instance name; also the storage class name
    pub name: String,
    /// Root pool on the appliance
    pub pool: String,
    pub transport_mode: TransportMode,
    pub remote_endpoint: RemoteEndpoint,
    #[serde(default)]
    pub is_default_class: bool,
    #[serde(default)]
    pub overrides: ChartOverrides,
}

impl BackendDescriptor {
    /// Check every field translation depends on
    pub fn validate(&self) -> Result<()> {
        check_field("name", &self.name)?;
        check_field("pool", &self.pool)?;
        check_field("namespace", &self.namespace)?;
        self.remote_endpoint.validate()
    }

    /// Dataset that holds provisioned volumes
    pub fn dataset_parent(&self) -> String {
        format!("{}/k8s/{}/vols", self.pool, self.transport_mode.token())
    }

    /// Dataset that holds detached snapshots
    pub fn snapshot_parent(&self) -> String {
        format!("{}/k8s/{}/snaps", self.pool, self.transport_mode.token())
    }
}
