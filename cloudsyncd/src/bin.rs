use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser};
use cloudsyncd::{
    logging,
    storage::{disk::Disk, fs::LocalDir},
    Service, TokioClock,
};

#[cfg(unix)]
mod posix;

#[derive(Parser)]
#[command(name = "cloudsyncd")]
#[command(author, version, about, long_about=None)]
struct Cli {
    /// Path to the JSON config file
    config: Utf8PathBuf,

    /// Run a single sync cycle and exit
    #[arg(long)]
    once: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build();
    let runtime = match runtime {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Can't start the async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async move { exit_program(run(cli).await) })
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match cloudsync::Config::load_from_file(&cli.config).await {
        Ok(config) => config,
        Err(err) => {
            // no logger before the config is loaded
            eprintln!("{err}");
            return Err(err.into());
        }
    };

    logging::init(&config.log_path, cli.verbose)?;
    log::info!("Loaded config file: {}", cli.config);

    let local = LocalDir::new(&config.local_path)?;

    let client = reqwest::Client::builder().build()?;
    let remote = Disk::new(client, &config.api_url(), &config.token, &config.cloud_path)?;

    let service = Service::new(local, remote, config.period())?;

    if cli.once {
        let report = service.cycle().await?;
        log::info!("Single cycle done: {report}");
        return Ok(());
    }

    tokio::select! {
        _ = service.run(&TokioClock) => {
            unreachable!("the sync loop never ends");
        }
        _ = shutdown_signal() => {
            log::info!("Stopping sync of {}", service.local().root());
        }
    }
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    posix::shutdown_signal().await
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::warn!("received Ctrl-C"),
        Err(err) => {
            log::error!("Can't listen to Ctrl-C: {err}");
            futures::future::pending::<()>().await
        }
    }
}

fn exit_program(res: anyhow::Result<()>) -> ExitCode {
    match res {
        Ok(..) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("cloudsyncd failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}
