//! Follows a node's event stream and reports processed deploys, classifying failures with the
//! configured error table.
use std::path::PathBuf;

use clap::Parser;
use futures::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use veles_casper_cep18_client::{
    ClientConfig, DeployFailure,
    sse::{self, event::SseEvent},
};

#[derive(Debug, Parser)]
#[command(name = "event_listener")]
#[command(about = "Report processed deploys and classify CEP-18 failures", long_about = None)]
struct Cli {
    /// Client configuration in TOML; must set `sse_endpoint`.
    config: PathBuf,
    /// File persisting the last event id, to resume after a restart.
    #[arg(long = "resume-path")]
    resume_path: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::load(&cli.config)?;
    let table = config.error_table();
    info!(network = config.network_name(), table = table.version(), "config loaded");

    let mut stream = Box::pin(sse::listener(config.listener_config(cli.resume_path)?).await?);

    while let Some(event) = stream.next().await {
        let deploy = match event {
            Ok(SseEvent::DeployProcessed(deploy)) => deploy,
            Ok(_) => continue,
            Err(err) => {
                eprintln!("listener error: {err}");
                break;
            }
        };

        match deploy.execution_result.check(table) {
            Ok(()) => println!("{} ok", deploy.deploy_hash),
            Err(DeployFailure::Contract(condition)) => {
                println!("{} failed: {condition}", deploy.deploy_hash)
            }
            Err(failure) => {
                warn!(deploy_hash = %deploy.deploy_hash, "{failure}");
            }
        }
    }

    Ok(())
}
