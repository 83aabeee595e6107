use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use color_eyre::config::Frame;
use eyre::Result;
use kube::Client;
use tokio::select;
use tracing::{debug, error, info, Level};
use tracing_error::ErrorLayer;
use tracing_subscriber::filter::FromEnvError;
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{filter::Directive, EnvFilter};

use aws_global_accelerator_controller::{
    resolve_client_config, Config, ControllerConfig, DownwardAPI, KubeControllerFactory,
    KubeLeaseStore, LeaderElectionConfig, LeaderElector, Manager, Shutdown,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let config = Config::parse();

    init_tracing_subscriber()?;
    install_color_eyre()?;

    print_build_info();

    let shutdown = Shutdown::new();
    let exit_code = match try_main(config, &shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(?err, "Controller manager failed");
            shutdown.trigger_shutdown();
            ExitCode::FAILURE
        }
    };

    select! {
        _ = shutdown.wait_shutdown_complete() => {},
        _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => {
            info!("Waiting for graceful shutdown");
            shutdown.wait_shutdown_complete().await;
        }
    }

    info!("Bye!");
    Ok(exit_code)
}

async fn try_main(config: Config, shutdown: &Shutdown) -> Result<()> {
    let controller_config = Arc::new(ControllerConfig::assemble(&config.controller)?);
    let downward_api = DownwardAPI::from_env();
    let election_config = LeaderElectionConfig::new(&config.leader_election, &downward_api)?;

    let client_config =
        resolve_client_config(config.kubeconfig.as_deref(), config.master.as_deref()).await?;
    let client = Client::try_from(client_config.clone())?;

    let store = KubeLeaseStore::new(
        client,
        &election_config.namespace,
        &election_config.lease_name,
    );
    let elector = LeaderElector::new(store, election_config)?;
    let manager = Manager::new(KubeControllerFactory, controller_config);

    info!("Starting");
    elector
        .run(shutdown, client_config, |client_config, stop| {
            manager.run(client_config, stop)
        })
        .await?;
    shutdown.trigger_shutdown();

    Ok(())
}

fn selfish_frame_filter(frames: &mut Vec<&Frame>) {
    frames.retain(|frame| {
        matches!(frame.name.as_ref(),
            Some(name) if name == "aws_global_accelerator_controller"
            || name.starts_with("aws_global_accelerator_controller::"))
    });
}

fn init_tracing_subscriber() -> Result<()> {
    tracing_subscriber::registry()
        .with({
            let layer = Layer::default();
            let filter = env_filter()?;
            layer.with_filter(filter)
        })
        .with({
            let layer = ErrorLayer::default();
            let filter = env_filter()?;
            layer.with_filter(filter)
        })
        .try_init()?;

    return Ok(());

    fn env_filter() -> Result<EnvFilter, FromEnvError> {
        EnvFilter::builder()
            .with_default_directive(Directive::from(Level::INFO))
            .from_env()
    }
}

fn install_color_eyre() -> Result<()> {
    color_eyre::config::HookBuilder::new()
        .capture_span_trace_by_default(true)
        .add_frame_filter(Box::new(selfish_frame_filter))
        .install()?;
    Ok(())
}

fn print_build_info() {
    info!("tag: {}", env!("VERGEN_GIT_DESCRIBE"));
    debug!("branch: {}", env!("VERGEN_GIT_BRANCH"));
    debug!("commit: {}", env!("VERGEN_GIT_SHA"));
    debug!("commit date: {}", env!("VERGEN_GIT_COMMIT_DATE"));

    debug!("rustc: {}", env!("VERGEN_RUSTC_SEMVER"));
    debug!("build date: {}", env!("VERGEN_BUILD_TIMESTAMP"));
}
