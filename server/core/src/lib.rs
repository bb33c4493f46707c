//! The server "core". This takes a configuration, brings the directory service up over its
//! partitions and runs the background tasks the service needs, until it's asked to stop.
//!
//! Generally, this is the entry point a server binary or an embedding application starts
//! the directory from.

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

#[macro_use]
extern crate tracing;

pub mod config;
mod interval;

use std::fmt;

use dirsrvd_lib::partition::MemoryPartition;
use dirsrvd_lib::prelude::*;
use tokio::sync::broadcast;

use crate::config::ServerConfig;
use crate::interval::SyncActor;

#[derive(Clone, Debug)]
pub enum CoreAction {
    Shutdown,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum TaskName {
    SyncActor,
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskName::SyncActor => "Sync Actor",
        })
    }
}

pub struct CoreHandle {
    clean_shutdown: bool,
    tx: broadcast::Sender<CoreAction>,
    service: Arc<DirectoryService>,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl CoreHandle {
    pub fn service(&self) -> &Arc<DirectoryService> {
        &self.service
    }

    /// Stop the background tasks, then flush and stop the service.
    pub async fn shutdown(&mut self) -> Result<(), OperationError> {
        if self.tx.send(CoreAction::Shutdown).is_err() {
            admin_warn!("No receivers acked shutdown request. Treating as unclean.");
        }

        // Wait on the handles.
        while let Some(handle) = self.handles.pop() {
            match tokio::time::timeout(DEFAULT_SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => admin_error!(?err, "A task failed to join"),
                Err(_) => admin_error!("A task did not stop in time"),
            }
        }

        self.service.shutdown()?;
        self.clean_shutdown = true;
        Ok(())
    }
}

impl Drop for CoreHandle {
    fn drop(&mut self) {
        if !self.clean_shutdown {
            eprintln!("⚠️  UNCLEAN SHUTDOWN OCCURRED ⚠️ ");
        }
    }
}

/// Start a directory service over in-memory partitions for the configured suffixes.
pub async fn create_server_core(config: ServerConfig) -> Result<CoreHandle, OperationError> {
    let (broadcast_tx, _) = broadcast::channel(4);

    admin_info!("Starting directory server with configuration: {}", config);

    let service_config = config.to_service_config()?;
    let partition = Arc::new(MemoryPartition::new(service_config.partition_suffixes()?));
    let service = DirectoryService::new(service_config, partition)?;
    service.startup()?;

    let sync_handle = SyncActor::start(
        service.clone(),
        config.sync_interval(),
        broadcast_tx.subscribe(),
    );

    admin_info!("ready to rock! 🪨");

    Ok(CoreHandle {
        clean_shutdown: false,
        tx: broadcast_tx,
        service,
        handles: vec![sync_handle],
    })
}
