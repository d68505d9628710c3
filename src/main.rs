//! ZFS Provisioner Config
//!
//! Renders democratic-csi chart releases for a fleet of TrueNAS-backed
//! storage classes. Appliance credentials and version pins come from flags
//! or the environment; the fleet comes from a YAML file or the built-in
//! default.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use zfs_provisioner_config::fleet::{default_instances, DEFAULT_NAMESPACE};
use zfs_provisioner_config::{
    ChartOverrides, ChartRelease, DefaultClassPolicy, Deployer, FleetBuilder, FleetSpec,
    KubeNamespaceProvisioner, ManifestWriter, NamespaceProvisioner, OutputFormat,
    RemoteEndpoint, Result,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Generate democratic-csi releases for TrueNAS NFS and iSCSI storage classes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Fleet file (YAML); the built-in fleet is used when omitted
    #[arg(long, env = "FLEET_FILE")]
    fleet: Option<PathBuf>,

    /// Namespace the releases are installed into
    #[arg(long, env = "CSI_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// TrueNAS host
    #[arg(long, env = "TRUENAS_HOST", default_value = "")]
    host: String,

    /// TrueNAS SSH username
    #[arg(long, env = "TRUENAS_USERNAME", default_value = "")]
    username: String,

    /// TrueNAS SSH password
    #[arg(long, env = "TRUENAS_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// TrueNAS API key
    #[arg(long, env = "TRUENAS_API_KEY", default_value = "", hide_env_values = true)]
    api_key: String,

    /// Chart version to pin
    #[arg(long, env = "DEMOCRATIC_CSI_VERSION")]
    chart_version: Option<String>,

    /// Driver image tag to pin
    #[arg(long, env = "DEMOCRATIC_CSI_IMAGE_TAG")]
    image_tag: Option<String>,

    /// Write manifests here instead of printing them
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    format: OutputFormat,

    /// Print the fleet file JSON schema and exit
    #[arg(long)]
    print_schema: bool,

    /// Allow more than one default storage class
    #[arg(long, env = "ALLOW_MULTIPLE_DEFAULTS")]
    allow_multiple_defaults: bool,

    /// Apply the namespace to the current cluster
    #[arg(long)]
    apply_namespace: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    if args.print_schema {
        println!("{}", FleetSpec::json_schema()?);
        return Ok(());
    }

    let spec = load_fleet(&args).await?;
    let namespace = spec.namespace.clone().unwrap_or_else(|| args.namespace.clone());

    info!("Rendering democratic-csi releases");
    info!("  Version: {}", zfs_provisioner_config::VERSION);
    info!("  Namespace: {}", namespace);
    info!("  Appliance: {}", args.host);
    info!("  Instances: {}", spec.instances.len());

    let endpoint = RemoteEndpoint::new(
        args.host.clone(),
        args.username.clone(),
        args.password.clone(),
        args.api_key.clone(),
    );

    let policy = if args.allow_multiple_defaults {
        DefaultClassPolicy::Permissive
    } else {
        DefaultClassPolicy::Enforce
    };

    let descriptors = FleetBuilder::new(namespace.clone(), endpoint)
        .overrides(ChartOverrides {
            chart_version: args.chart_version.clone(),
            image_tag: args.image_tag.clone(),
        })
        .default_class_policy(policy)
        .build(&spec.instances)?;

    let releases = Deployer::plan(&descriptors)?;

    let cluster: Option<Arc<dyn NamespaceProvisioner>> = if args.apply_namespace {
        Some(Arc::new(KubeNamespaceProvisioner::try_default().await?))
    } else {
        None
    };

    match &args.output_dir {
        Some(dir) => {
            let writer = Arc::new(ManifestWriter::new(dir, args.format).await?);
            let namespaces = cluster
                .unwrap_or_else(|| writer.clone() as Arc<dyn NamespaceProvisioner>);

            let summary = Deployer::new(namespaces, writer.clone())
                .deploy(&namespace, &releases)
                .await?;

            info!(
                "Wrote {} releases to {} (storage classes: {})",
                summary.releases.len(),
                writer.root().display(),
                summary.storage_classes.join(", ")
            );
        }
        None => {
            if let Some(cluster) = cluster {
                cluster.ensure_namespace(&namespace).await?;
            }
            print_releases(&releases, args.format)?;
        }
    }

    Ok(())
}

async fn load_fleet(args: &Args) -> Result<FleetSpec> {
    match &args.fleet {
        Some(path) => {
            info!("Loading fleet from {}", path.display());
            let raw = tokio::fs::read_to_string(path).await?;
            FleetSpec::from_yaml(&raw)
        }
        None => Ok(FleetSpec {
            namespace: None,
            instances: default_instances(),
        }),
    }
}

fn print_releases(releases: &[ChartRelease], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Yaml => {
            for release in releases {
                print!("---\n{}", format.render(release)?);
            }
        }
        OutputFormat::Json => print!("{}", format.render(&releases)?),
    }
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "kube=info", "tower=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    // stdout carries the rendered documents
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
