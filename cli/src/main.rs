//! nfs-server-proxy: hook entry point for the NFS server proxy.
//!
//! Two subcommands:
//! - `nfs-server-proxy dispatch`: handle the hook named by `JUJU_DISPATCH_PATH`
//! - `nfs-server-proxy check`: validate an endpoint without a runtime

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use nfs_server_proxy::{
    EndpointRelay, HookEvent, HookTools, HostKind, ProxyConfig, RelationId, run_hook, validate,
};
use tracing_subscriber::EnvFilter;

const CONFIG_FILE: &str = "nfs-server-proxy.toml";

/// Relay an externally managed NFS export to nfs-share integrations.
#[derive(Parser)]
#[command(
    name = "nfs-server-proxy",
    version,
    about = "Relay an externally managed NFS export to nfs-share integrations"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle the current hook (run from the charm's dispatch script)
    Dispatch {
        /// Hook to handle, as a dispatch path or bare hook name
        #[arg(long, env = "JUJU_DISPATCH_PATH")]
        hook: String,
        /// Relation the hook concerns, for relation hooks
        #[arg(long, env = "JUJU_RELATION_ID")]
        relation_id: Option<String>,
        /// Unit running the hook (`application/number`)
        #[arg(long, env = "JUJU_UNIT_NAME")]
        unit: String,
        /// Path to nfs-server-proxy.toml [default: $CHARM_DIR, ./ or ~/.config/nfs-server-proxy]
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Validate a host:path endpoint and print its parts
    Check {
        /// Endpoint to validate, e.g. 10.0.0.5:/data
        endpoint: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // The runtime captures stderr into its log; RUST_LOG controls verbosity
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Dispatch {
            hook,
            relation_id,
            unit,
            config,
        } => {
            let config = load_config(resolve_config(config)).await?;
            run_dispatch(config, &hook, relation_id, &unit).await?;
        }
        Commands::Check { endpoint } => run_check(&endpoint)?,
    }

    Ok(())
}

/// Handle one hook against the runtime's hook tools.
async fn run_dispatch(
    config: ProxyConfig,
    hook: &str,
    relation_id: Option<String>,
    unit: &str,
) -> Result<()> {
    let tools = HookTools::from_config(&config.hook_tools, unit)?;
    let relay = EndpointRelay::new(config.integration.clone());

    let relation_id = relation_id
        .filter(|id| !id.is_empty())
        .map(|id| id.parse::<RelationId>())
        .transpose()?;
    let event = HookEvent::from_dispatch_path(hook).with_relation_id(relation_id);

    tracing::debug!(
        hook = %event,
        unit = %unit,
        integration = %relay.integration(),
        "dispatching hook"
    );

    match run_hook(&tools, &relay, &event)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to handle hook '{}': {}", event, e))?
    {
        Some(report) => tracing::info!(hook = %event, status = %report, "hook handled"),
        None => tracing::debug!(hook = %event, "hook ignored"),
    }

    Ok(())
}

/// Validate an endpoint and print host, path and host kind.
fn run_check(endpoint: &str) -> Result<()> {
    // Same leniency as the charm option: surrounding whitespace is dropped.
    let endpoint = endpoint.trim();
    let endpoint = validate(endpoint)
        .map_err(|e| anyhow::anyhow!("Invalid endpoint '{}': {}", endpoint, e))?;

    let kind = match endpoint.kind() {
        HostKind::Ipv4(_) => "ipv4",
        HostKind::Ipv6(_) => "ipv6",
        HostKind::Dns => "dns",
    };
    println!("host: {}", endpoint.host());
    println!("kind: {}", kind);
    println!("path: {}", endpoint.path());
    Ok(())
}

/// Resolve the settings file: explicit flag → $CHARM_DIR → ./ → ~/.config/nfs-server-proxy.
///
/// `None` means no file was found and defaults apply.
fn resolve_config(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }

    if let Some(charm_dir) = std::env::var_os("CHARM_DIR") {
        let bundled = Path::new(&charm_dir).join(CONFIG_FILE);
        if bundled.exists() {
            return Some(bundled);
        }
    }

    let local = Path::new(CONFIG_FILE);
    if local.exists() {
        return Some(local.to_path_buf());
    }

    dirs::config_dir()
        .map(|dir| dir.join("nfs-server-proxy").join(CONFIG_FILE))
        .filter(|path| path.exists())
}

/// Load settings from `path`, or fall back to defaults.
async fn load_config(path: Option<PathBuf>) -> Result<ProxyConfig> {
    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading proxy settings");
            Ok(ProxyConfig::load(&path).await?)
        }
        None => Ok(ProxyConfig::default()),
    }
}
