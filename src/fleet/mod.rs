//! Fleet Builder
//!
//! Expands a list of named instances that share one appliance into backend
//! descriptors. Fleet-wide rules are checked here, because a single
//! descriptor cannot see its siblings.

use crate::domain::{BackendDescriptor, ChartOverrides, RemoteEndpoint, TransportMode};
use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Namespace used when neither the fleet file nor the caller names one
pub const DEFAULT_NAMESPACE: &str = "democratic-csi";

// =============================================================================
// Fleet Input
// =============================================================================

/// One storage class to provision on the shared appliance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FleetInstance {
    pub name: String,
    pub pool: String,
    #[serde(alias = "driverType")]
    pub transport_mode: TransportMode,
    #[serde(default, alias = "defaultClass")]
    pub is_default: bool,
}

impl FleetInstance {
    pub fn new(
        name: impl Into<String>,
        pool: impl Into<String>,
        transport_mode: TransportMode,
        is_default: bool,
    ) -> Self {
        Self {
            name: name.into(),
            pool: pool.into(),
            transport_mode,
            is_default,
        }
    }
}

/// Fleet file contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FleetSpec {
    /// Overrides the namespace given on the command line
    #[serde(default)]
    pub namespace: Option<String>,
    pub instances: Vec<FleetInstance>,
}

/// Fleet file as written, before transport modes are parsed
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFleetInstance {
    name: String,
    pool: String,
    #[serde(alias = "driverType")]
    transport_mode: String,
    #[serde(default, alias = "defaultClass")]
    is_default: bool,
}

#[derive(Debug, Deserialize)]
struct RawFleetSpec {
    #[serde(default)]
    namespace: Option<String>,
    instances: Vec<RawFleetInstance>,
}

impl FleetSpec {
    /// Parse a fleet file.
    ///
    /// Malformed YAML is a YAML error; an unknown transport mode is a
    /// configuration error on `transportMode`.
    pub fn from_yaml(input: &str) -> Result<Self> {
        let raw: RawFleetSpec = serde_yaml::from_str(input)?;

        let instances = raw
            .instances
            .into_iter()
            .map(|instance| {
                let transport_mode = instance
                    .transport_mode
                    .parse::<TransportMode>()
                    .map_err(|err| match err {
                        Error::Configuration { field, reason } => Error::Configuration {
                            field,
                            reason: format!("instance {}: {}", instance.name, reason),
                        },
                        other => other,
                    })?;
                Ok(FleetInstance {
                    name: instance.name,
                    pool: instance.pool,
                    transport_mode,
                    is_default: instance.is_default,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FleetSpec {
            namespace: raw.namespace,
            instances,
        })
    }

    /// JSON schema of the fleet file
    pub fn json_schema() -> Result<String> {
        let schema = schemars::schema_for!(FleetSpec);
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}

/// The homelab fleet: two NFS classes and one iSCSI class
pub fn default_instances() -> Vec<FleetInstance> {
    vec![
        FleetInstance::new(
            "truenas-hdd-stripe-nfs",
            "hdd-stripe-pool",
            TransportMode::NetworkShare,
            false,
        ),
        FleetInstance::new(
            "truenas-hdd-mirror-nfs",
            "hdd-mirror-pool",
            TransportMode::NetworkShare,
            true,
        ),
        FleetInstance::new(
            "truenas-hdd-mirror-iscsi",
            "hdd-mirror-pool",
            TransportMode::BlockDevice,
            false,
        ),
    ]
}

// =============================================================================
// Default Class Policy
// =============================================================================

/// What to do when more than one instance asks to be the default class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DefaultClassPolicy {
    /// Reject the fleet
    #[default]
    Enforce,
    /// Log a warning and keep every flag as given
    Permissive,
}

// =============================================================================
// Fleet Builder
// =============================================================================

/// Builds descriptors for a fleet sharing one namespace and appliance
#[derive(Debug, Clone)]
pub struct FleetBuilder {
    namespace: String,
    endpoint: RemoteEndpoint,
    overrides: ChartOverrides,
    policy: DefaultClassPolicy,
}

impl FleetBuilder {
    pub fn new(namespace: impl Into<String>, endpoint: RemoteEndpoint) -> Self {
        Self {
            namespace: namespace.into(),
            endpoint,
            overrides: ChartOverrides::default(),
            policy: DefaultClassPolicy::default(),
        }
    }

    /// Chart version pins applied to every instance
    pub fn overrides(mut self, overrides: ChartOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn default_class_policy(mut self, policy: DefaultClassPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Produce one descriptor per instance, in input order
    pub fn build(&self, instances: &[FleetInstance]) -> Result<Vec<BackendDescriptor>> {
        if instances.is_empty() {
            return Err(Error::FleetConstraint("fleet has no instances".into()));
        }

        self.check_unique_names(instances)?;
        self.check_default_class(instances)?;

        let descriptors = instances
            .iter()
            .map(|instance| {
                let descriptor = BackendDescriptor {
                    namespace: self.namespace.clone(),
                    name: instance.name.clone(),
                    pool: instance.pool.clone(),
                    transport_mode: instance.transport_mode,
                    remote_endpoint: self.endpoint.clone(),
                    is_default_class: instance.is_default,
                    overrides: self.overrides.clone(),
                };
                descriptor.validate()?;
                Ok(descriptor)
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Built fleet of {} backends in namespace {}",
            descriptors.len(),
            self.namespace
        );

        Ok(descriptors)
    }

    fn check_unique_names(&self, instances: &[FleetInstance]) -> Result<()> {
        let mut seen = BTreeSet::new();
        for instance in instances {
            if !seen.insert(instance.name.as_str()) {
                return Err(Error::FleetConstraint(format!(
                    "duplicate instance name '{}'",
                    instance.name
                )));
            }
        }
        Ok(())
    }

    fn check_default_class(&self, instances: &[FleetInstance]) -> Result<()> {
        let defaults: Vec<&str> = instances
            .iter()
            .filter(|i| i.is_default)
            .map(|i| i.name.as_str())
            .collect();

        if defaults.len() <= 1 {
            return Ok(());
        }

        match self.policy {
            DefaultClassPolicy::Enforce => Err(Error::FleetConstraint(format!(
                "at most one default storage class allowed, got {}: {}",
                defaults.len(),
                defaults.join(", ")
            ))),
            DefaultClassPolicy::Permissive => {
                warn!(
                    "Multiple default storage classes requested: {}",
                    defaults.join(", ")
                );
                Ok(())
            }
        }
    }
}

/// Build a fleet with the default class constraint enforced
pub fn build_fleet(
    namespace: &str,
    endpoint: &RemoteEndpoint,
    instances: &[FleetInstance],
) -> Result<Vec<BackendDescriptor>> {
    FleetBuilder::new(namespace, endpoint.clone()).build(instances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn endpoint() -> RemoteEndpoint {
        RemoteEndpoint::new("truenas.lan", "csi", "password", "api-key")
    }

    #[test]
    fn test_build_default_fleet() {
        let fleet = build_fleet(DEFAULT_NAMESPACE, &endpoint(), &default_instances()).unwrap();

        assert_eq!(fleet.len(), 3);
        let names: Vec<&str> = fleet.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "truenas-hdd-stripe-nfs",
                "truenas-hdd-mirror-nfs",
                "truenas-hdd-mirror-iscsi"
            ]
        );

        for d in &fleet {
            assert_eq!(d.namespace, DEFAULT_NAMESPACE);
            assert_eq!(d.remote_endpoint, endpoint());
        }
        assert_eq!(fleet.iter().filter(|d| d.is_default_class).count(), 1);
        assert_eq!(fleet[2].transport_mode, TransportMode::BlockDevice);
    }

    #[test]
    fn test_two_defaults_rejected() {
        let instances = vec![
            FleetInstance::new("a", "pool-a", TransportMode::NetworkShare, true),
            FleetInstance::new("b", "pool-b", TransportMode::NetworkShare, false),
            FleetInstance::new("c", "pool-b", TransportMode::BlockDevice, true),
        ];

        let err = build_fleet(DEFAULT_NAMESPACE, &endpoint(), &instances).unwrap_err();
        assert_matches!(&err, Error::FleetConstraint(msg) if msg.contains("a, c"));
    }

    #[test]
    fn test_two_defaults_permitted_when_permissive() {
        let instances = vec![
            FleetInstance::new("a", "pool-a", TransportMode::NetworkShare, true),
            FleetInstance::new("b", "pool-b", TransportMode::BlockDevice, true),
        ];

        let fleet = FleetBuilder::new(DEFAULT_NAMESPACE, endpoint())
            .default_class_policy(DefaultClassPolicy::Permissive)
            .build(&instances)
            .unwrap();

        assert_eq!(fleet.iter().filter(|d| d.is_default_class).count(), 2);
    }

    #[test]
    fn test_no_default_is_fine() {
        let instances = vec![FleetInstance::new("a", "p", TransportMode::BlockDevice, false)];
        let fleet = build_fleet("storage", &endpoint(), &instances).unwrap();
        assert!(!fleet[0].is_default_class);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let instances = vec![
            FleetInstance::new("dup", "p1", TransportMode::NetworkShare, false),
            FleetInstance::new("dup", "p2", TransportMode::BlockDevice, false),
        ];
        assert_matches!(
            build_fleet(DEFAULT_NAMESPACE, &endpoint(), &instances),
            Err(Error::FleetConstraint(_))
        );
    }

    #[test]
    fn test_empty_fleet_rejected() {
        assert_matches!(
            build_fleet(DEFAULT_NAMESPACE, &endpoint(), &[]),
            Err(Error::FleetConstraint(_))
        );
    }

    #[test]
    fn test_empty_credentials_rejected() {
        let mut ep = endpoint();
        ep.password.clear();
        let err = build_fleet(DEFAULT_NAMESPACE, &ep, &default_instances()).unwrap_err();
        assert_eq!(err.field(), Some("remoteEndpoint.password"));
    }

    #[test]
    fn test_overrides_shared_across_fleet() {
        let overrides = ChartOverrides {
            chart_version: Some("0.14.6".into()),
            image_tag: Some("next".into()),
        };
        let fleet = FleetBuilder::new(DEFAULT_NAMESPACE, endpoint())
            .overrides(overrides.clone())
            .build(&default_instances())
            .unwrap();

        assert!(fleet.iter().all(|d| d.overrides == overrides));
    }

    #[test]
    fn test_fleet_spec_from_yaml() {
        let yaml = r#"
namespace: storage
instances:
  - name: truenas-ssd-nfs
    pool: ssd
    transportMode: nfs
    isDefault: true
  - name: truenas-ssd-iscsi
    pool: ssd
    driverType: iscsi
"#;
        let spec = FleetSpec::from_yaml(yaml).unwrap();
        assert_eq!(spec.namespace.as_deref(), Some("storage"));
        assert_eq!(spec.instances.len(), 2);
        assert_eq!(spec.instances[0].transport_mode, TransportMode::NetworkShare);
        assert!(spec.instances[0].is_default);
        assert_eq!(spec.instances[1].transport_mode, TransportMode::BlockDevice);
        assert!(!spec.instances[1].is_default);
    }

    #[test]
    fn test_fleet_spec_rejects_unknown_mode() {
        let yaml = "instances:\n  - name: x\n    pool: p\n    transportMode: smb\n";
        let err = FleetSpec::from_yaml(yaml).unwrap_err();

        assert_eq!(err.field(), Some("transportMode"));
        assert!(err.to_string().contains("instance x"));
        assert!(err.to_string().contains("smb"));
    }

    #[test]
    fn test_fleet_spec_accepts_parse_aliases() {
        let yaml = "instances:\n  - name: a\n    pool: p\n    transportMode: block\n  - name: b\n    pool: p\n    driverType: networkShare\n";
        let spec = FleetSpec::from_yaml(yaml).unwrap();

        assert_eq!(spec.instances[0].transport_mode, TransportMode::BlockDevice);
        assert_eq!(spec.instances[1].transport_mode, TransportMode::NetworkShare);
    }

    #[test]
    fn test_fleet_spec_malformed_yaml_is_yaml_error() {
        assert_matches!(FleetSpec::from_yaml("instances: ["), Err(Error::Yaml(_)));
    }

    #[test]
    fn test_json_schema_lists_instances() {
        let schema = FleetSpec::json_schema().unwrap();
        assert!(schema.contains("instances"));
        assert!(schema.contains("transportMode"));
    }
}
