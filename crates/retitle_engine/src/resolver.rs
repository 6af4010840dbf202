use std::io;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use retitle_core::VideoId;
use retitle_logging::{retitle_debug, retitle_warn};
use tokio::sync::Semaphore;

use crate::{LookupError, TitleLookup};

#[derive(Debug, Clone, Default)]
pub struct ResolverSettings {
    /// Cap on concurrent lookups. `None` starts every lookup immediately.
    pub max_in_flight: Option<usize>,
}

/// Outcome of one lookup, delivered back to the session thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionEvent {
    pub identifier: VideoId,
    pub watch_url: String,
    pub result: Result<String, LookupError>,
}

enum ResolverCommand {
    Resolve { identifier: VideoId, watch_url: String },
}

/// Runs lookups on a background tokio runtime.
///
/// Each submitted identifier gets exactly one lookup task; there is no retry
/// and no cancellation. Results are read back with [`ResolverHandle::try_recv`]
/// or [`ResolverHandle::recv_timeout`] so the job store is only ever touched
/// from the caller's thread.
pub struct ResolverHandle {
    cmd_tx: mpsc::Sender<ResolverCommand>,
    event_rx: mpsc::Receiver<ResolutionEvent>,
}

impl ResolverHandle {
    pub fn new(lookup: Arc<dyn TitleLookup>, settings: ResolverSettings) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;
        let limiter = settings
            .max_in_flight
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));

        thread::Builder::new()
            .name("retitle-resolver".to_string())
            .spawn(move || {
                while let Ok(command) = cmd_rx.recv() {
                    let lookup = lookup.clone();
                    let limiter = limiter.clone();
                    let event_tx = event_tx.clone();
                    runtime.spawn(async move {
                        handle_command(lookup.as_ref(), limiter, command, event_tx).await;
                    });
                }
            })?;

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn submit(&self, identifier: VideoId, watch_url: impl Into<String>) {
        let watch_url = watch_url.into();
        retitle_debug!("Resolve title id={} url={}", identifier, watch_url);
        if self
            .cmd_tx
            .send(ResolverCommand::Resolve {
                identifier,
                watch_url,
            })
            .is_err()
        {
            retitle_warn!("Resolver thread is gone; lookup dropped");
        }
    }

    pub fn try_recv(&self) -> Option<ResolutionEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<ResolutionEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn handle_command(
    lookup: &dyn TitleLookup,
    limiter: Option<Arc<Semaphore>>,
    command: ResolverCommand,
    event_tx: mpsc::Sender<ResolutionEvent>,
) {
    match command {
        ResolverCommand::Resolve {
            identifier,
            watch_url,
        } => {
            let _permit = match limiter {
                Some(limiter) => limiter.acquire_owned().await.ok(),
                None => None,
            };
            let result = lookup.lookup(&watch_url).await;
            let _ = event_tx.send(ResolutionEvent {
                identifier,
                watch_url,
                result,
            });
        }
    }
}
