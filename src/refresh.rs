use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::{IZoneClient, Inner, lock};

impl IZoneClient {
    /// Start polling in the background. Must be called from within a Tokio
    /// runtime.
    pub fn begin_background_refresh(&self) {
        self.refresh();
    }

    /// Drop any pending tick and start a new session that polls right away,
    /// then every `refresh_interval` after each poll settles.
    pub fn refresh(&self) {
        let cancel = CancellationToken::new();
        if let Some(previous) = lock(&self.inner.session).replace(cancel.clone()) {
            previous.cancel();
        }
        tokio::spawn(refresh_task(
            Arc::downgrade(&self.inner),
            self.inner.refresh_interval,
            cancel,
        ));
    }

    /// Cancel the pending tick. A poll already in flight still completes.
    pub fn end_background_refresh(&self) {
        if let Some(cancel) = lock(&self.inner.session).take() {
            cancel.cancel();
        }
    }

    pub fn is_refreshing(&self) -> bool {
        lock(&self.inner.session).is_some()
    }
}

async fn refresh_task(inner: Weak<Inner>, interval: Duration, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let Some(inner) = inner.upgrade() else { break };
        let client = IZoneClient { inner };

        // Failures leave the cache alone and keep the schedule going.
        if let Err(e) = client.poll().await {
            warn!(error = %e, "unable to refresh system");
        }
        drop(client);

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }
    debug!("background refresh stopped");
}
