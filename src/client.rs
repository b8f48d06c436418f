use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::try_join_all;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::{ClientConfig, DEFAULT_REFRESH_MS};
use crate::diff::diff_systems;
use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol::{
    SYSTEM_SETTINGS, ZONE_PAGES, ZONES_PER_PAGE, command_body, page_for_zone, pages_for,
    parse_system, parse_zone_page,
};
use crate::types::*;
use crate::{Error, Result};

type EventCallback = Box<dyn Fn(&Event) + Send + Sync>;
type SnapshotCallback = Box<dyn Fn(&System) + Send + Sync>;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct IZoneClientBuilder {
    ip: String,
    refresh_interval: Duration,
    request_timeout: Option<Duration>,
    event_callbacks: Vec<EventCallback>,
    snapshot_callbacks: Vec<SnapshotCallback>,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl IZoneClientBuilder {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            refresh_interval: Duration::from_millis(DEFAULT_REFRESH_MS),
            request_timeout: None,
            event_callbacks: Vec::new(),
            snapshot_callbacks: Vec::new(),
            log_mode: None,
            log_path: None,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let mut builder = Self::new(config.ip.clone()).refresh_interval(config.refresh_interval());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.request_timeout(timeout);
        }
        if let Some(log) = &config.message_log {
            builder = builder.message_log(log.mode, log.path.clone());
        }
        builder
    }

    /// Delay between the end of one background poll and the start of the next.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn on_event(mut self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.event_callbacks.push(Box::new(f));
        self
    }

    /// Called with every snapshot accepted by a poll.
    pub fn on_snapshot(mut self, f: impl Fn(&System) + Send + Sync + 'static) -> Self {
        self.snapshot_callbacks.push(Box::new(f));
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<IZoneClient> {
        let mut http = reqwest::Client::builder();
        if let Some(timeout) = self.request_timeout {
            http = http.timeout(timeout);
        }
        let http = http.build()?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(Mutex::new(MessageLogger::new(mode, &path)?)),
            _ => None,
        };

        let base_url = if self.ip.starts_with("http://") || self.ip.starts_with("https://") {
            self.ip.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", self.ip)
        };

        Ok(IZoneClient {
            inner: Arc::new(Inner {
                http,
                base_url,
                refresh_interval: self.refresh_interval,
                system: Mutex::new(None),
                poll_lock: tokio::sync::Mutex::new(()),
                session: Mutex::new(None),
                event_callbacks: self.event_callbacks,
                snapshot_callbacks: self.snapshot_callbacks,
                logger,
            }),
        })
    }
}

/// Handle to one iZone controller. Clones share the same cache and
/// background refresh session.
#[derive(Clone)]
pub struct IZoneClient {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    http: reqwest::Client,
    base_url: String,
    pub(crate) refresh_interval: Duration,
    system: Mutex<Option<System>>,
    /// Held for a whole fetch+apply cycle so polls never overlap.
    poll_lock: tokio::sync::Mutex<()>,
    pub(crate) session: Mutex<Option<CancellationToken>>,
    event_callbacks: Vec<EventCallback>,
    snapshot_callbacks: Vec<SnapshotCallback>,
    logger: Option<Mutex<MessageLogger>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let session = self.session.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(cancel) = session.take() {
            cancel.cancel();
        }
    }
}

impl IZoneClient {
    pub fn builder(ip: impl Into<String>) -> IZoneClientBuilder {
        IZoneClientBuilder::new(ip)
    }

    pub fn refresh_interval(&self) -> Duration {
        self.inner.refresh_interval
    }

    /// Last snapshot accepted by a poll. May be older than the result of a
    /// command that just completed.
    pub fn system(&self) -> Option<System> {
        lock(&self.inner.system).clone()
    }

    pub(crate) fn cached_zone_count(&self) -> Option<usize> {
        lock(&self.inner.system).as_ref().map(System::zone_count)
    }

    /// Fetch and cache a fresh snapshot, notifying subscribers.
    pub async fn poll(&self) -> Result<System> {
        let _guard = self.inner.poll_lock.lock().await;
        let system = self.get_system().await?;
        self.apply_refreshed_snapshot(system.clone());
        debug!(zones = system.zones.len(), "system refreshed");
        Ok(system)
    }

    /// The only writer of the snapshot cache.
    fn apply_refreshed_snapshot(&self, system: System) {
        let events = {
            let mut cached = lock(&self.inner.system);
            let events = diff_systems(cached.as_ref(), &system);
            *cached = Some(system.clone());
            events
        };

        for event in &events {
            for cb in &self.inner.event_callbacks {
                cb(event);
            }
        }
        for cb in &self.inner.snapshot_callbacks {
            cb(&system);
        }

        if !events.is_empty() {
            debug!(count = events.len(), "snapshot changes");
        }
    }

    // -- Read path --

    /// Full snapshot: system settings plus every zone it reports.
    pub async fn get_system(&self) -> Result<System> {
        let body = self.read(SYSTEM_SETTINGS).await?;
        let mut system = parse_system(&body)?;
        system.zones = self.get_zones(system.number_of_zones as usize).await?;
        Ok(system)
    }

    /// The first `maximum` zones, in index order. Only the pages that cover
    /// them are requested, all at once.
    pub async fn get_zones(&self, maximum: usize) -> Result<Vec<Zone>> {
        let pages = pages_for(maximum);
        let bodies = try_join_all(ZONE_PAGES[..pages].iter().map(|page| self.read(page))).await?;

        let mut zones = Vec::with_capacity(pages * ZONES_PER_PAGE);
        for body in &bodies {
            zones.extend(parse_zone_page(body)?);
        }
        zones.truncate(maximum.min(MAX_ZONES));
        Ok(zones)
    }

    pub async fn get_zone(&self, index: u8) -> Result<Zone> {
        if index as usize >= MAX_ZONES {
            return Err(Error::InvalidZone(index));
        }
        let body = self.read(ZONE_PAGES[page_for_zone(index)]).await?;
        parse_zone_page(&body)?
            .into_iter()
            .nth(index as usize % ZONES_PER_PAGE)
            .ok_or(Error::InvalidZone(index))
    }

    async fn read(&self, endpoint: &str) -> Result<String> {
        let url = format!("{}/{}", self.inner.base_url, endpoint);
        let resp = self.inner.http.get(&url).send().await?;
        let status = resp.status().as_u16();

        if let Err(e) = resp.error_for_status_ref() {
            debug!(endpoint, status, "read failed");
            self.log_read(endpoint, status, &Value::Null);
            return Err(e.into());
        }

        let body = resp.text().await?;
        trace!(endpoint, body = %body, "read");
        if self.inner.logger.is_some() {
            let body_json = serde_json::from_str(&body).unwrap_or(Value::Null);
            self.log_read(endpoint, status, &body_json);
        }
        Ok(body)
    }

    fn log_read(&self, endpoint: &str, status: u16, body: &Value) {
        if let Some(logger) = &self.inner.logger {
            lock(logger).log_read(endpoint, status, body);
        }
    }

    // -- Write path --

    /// POST `{command: payload}` to `/<command>`. A 2xx only means the device
    /// received it, not that it was applied.
    pub(crate) async fn send_command(
        &self,
        command: &'static str,
        zone: Option<u8>,
        payload: Value,
    ) -> Result<()> {
        let body = command_body(command, payload);
        debug!(command, zone = ?zone, body = %body, "sending command");

        if let Some(logger) = &self.inner.logger {
            lock(logger).log_command(command, zone, &body);
        }

        let url = format!("{}/{}", self.inner.base_url, command);
        self.inner
            .http
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
