//! Scheduled tasks run inside the server as background operations.

use std::time::Duration;

use dirsrvd_lib::prelude::*;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};

use crate::CoreAction;

/// Flushes the partitions on a fixed interval until shutdown.
pub(crate) struct SyncActor;

impl SyncActor {
    pub fn start(
        service: Arc<DirectoryService>,
        period: Duration,
        mut rx: broadcast::Receiver<CoreAction>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut inter = interval(period);
            inter.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes straight away.
            inter.tick().await;

            loop {
                tokio::select! {
                    Ok(action) = rx.recv() => {
                        match action {
                            CoreAction::Shutdown => break,
                        }
                    }
                    _ = inter.tick() => {
                        if let Err(err) = service.sync() {
                            admin_error!(?err, "periodic sync failed");
                        }
                    }
                }
            }

            info!("Stopped {}", crate::TaskName::SyncActor);
        })
    }
}
