use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use eyre::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Config;
use tracing::{debug, info};

/// Resolve the Kubernetes client configuration.
///
/// An explicit kubeconfig wins, then `KUBECONFIG`, then `$HOME/.kube/config` if it exists.
/// `master` overrides the server URL of the kubeconfig. Without any kubeconfig, `master` alone is
/// used as the server, and the in-cluster configuration only when `master` is empty too.
pub async fn resolve_client_config(
    kubeconfig: Option<&Path>,
    master: Option<&str>,
) -> Result<Config> {
    let found = find_kubeconfig(kubeconfig, env::var_os("KUBECONFIG"), env::var_os("HOME"));
    load_client_config(found, master).await
}

async fn load_client_config(kubeconfig: Option<PathBuf>, master: Option<&str>) -> Result<Config> {
    let master = master.filter(|master| !master.is_empty());

    let Some(path) = kubeconfig else {
        return match master {
            Some(master) => {
                info!(%master, "Using master url without kubeconfig");
                Ok(Config::new(parse_master(master)?))
            }
            None => {
                info!("Using in-cluster config");
                Config::incluster().context("failed to load in-cluster config")
            }
        };
    };

    info!(path = %path.display(), "Using kubeconfig");
    let kubeconfig = Kubeconfig::read_from(&path)
        .with_context(|| format!("failed to read kubeconfig '{}'", path.display()))?;
    let mut config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .context("failed to load kubeconfig")?;

    if let Some(master) = master {
        config.cluster_url = parse_master(master)?;
    }

    Ok(config)
}

fn parse_master<U>(master: &str) -> Result<U>
where
    U: FromStr,
    U::Err: std::error::Error + Send + Sync + 'static,
{
    master
        .parse()
        .with_context(|| format!("invalid master url '{master}'"))
}

fn find_kubeconfig(
    explicit: Option<&Path>,
    kubeconfig_env: Option<OsString>,
    home: Option<OsString>,
) -> Option<PathBuf> {
    if let Some(path) = explicit.filter(|path| !path.as_os_str().is_empty()) {
        return Some(path.to_path_buf());
    }

    if let Some(path) = kubeconfig_env.filter(|path| !path.is_empty()) {
        return Some(PathBuf::from(path));
    }

    let home = home?;
    let path = Path::new(&home).join(".kube").join("config");
    if path.exists() {
        Some(path)
    } else {
        debug!(path = %path.display(), "kubeconfig not found");
        None
    }
}
