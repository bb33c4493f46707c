#![deny(warnings)]
#![warn(unused_extern_crates)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::trivially_copy_pass_by_ref)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dirsrvd_core::config::ServerConfig;
use dirsrvd_core::create_server_core;
use sketching::tracing_forest::traits::*;
use sketching::tracing_forest::util::*;
use sketching::tracing_forest::{self};

#[derive(Debug, Subcommand)]
enum DirsrvdOpt {
    /// Start the directory server and run until interrupted.
    Server,
    /// Parse the configuration and build the interceptor chain, then exit.
    ConfigTest,
}

#[derive(Debug, Parser)]
#[clap(about = "Directory Server Daemon")]
struct DirsrvdParser {
    #[clap(subcommand)]
    commands: DirsrvdOpt,
    /// Path to the server's configuration file.
    #[clap(short, long = "config", env = "DIRSRVD_CONFIG")]
    config_path: PathBuf,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let opt = DirsrvdParser::parse();

    // Nothing is logging yet, so config errors go straight to stderr.
    let sconfig = match ServerConfig::new(&opt.config_path) {
        Ok(c) => c,
        Err(_) => return ExitCode::FAILURE,
    };

    let log_filter = sconfig.log_filter();

    tracing_forest::worker_task()
        .set_global(true)
        .set_tag(sketching::event_tagger)
        .map_sender(|sender| sender.or_stderr())
        .build_on(|subscriber| subscriber.with(log_filter))
        .on(async {
            match opt.commands {
                DirsrvdOpt::ConfigTest => match sconfig.to_service_config() {
                    Ok(config) => {
                        info!(?config, "configuration is valid");
                        ExitCode::SUCCESS
                    }
                    Err(err) => {
                        error!(?err, "configuration is invalid");
                        ExitCode::FAILURE
                    }
                },
                DirsrvdOpt::Server => {
                    let mut core = match create_server_core(sconfig).await {
                        Ok(core) => core,
                        Err(err) => {
                            error!(?err, "Failed to start server core!");
                            return ExitCode::FAILURE;
                        }
                    };

                    if let Err(err) = tokio::signal::ctrl_c().await {
                        error!(?err, "Unable to listen for the shutdown signal");
                    }
                    info!("Signal received, shutting down");

                    match core.shutdown().await {
                        Ok(()) => ExitCode::SUCCESS,
                        Err(err) => {
                            error!(?err, "Failed to shutdown cleanly");
                            ExitCode::FAILURE
                        }
                    }
                }
            }
        })
        .await
}
