// ── Device facade ──
//
// Owns the snapshot for one clock. Request results, stream events, and
// supervisor failures all funnel through here; each one ends with exactly
// one round of subscriber notifications (heartbeats excepted).

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::futures::Notified;
use tokio::sync::{Notify, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use espclock_api::client::STATUS_METHOD;
use espclock_api::{DeviceClient, Error as ApiError};

use crate::command::LightRequest;
use crate::config::DeviceConfig;
use crate::error::CoreError;
use crate::model::DeviceSnapshot;
use crate::supervisor::{Supervisor, SupervisorHandle};

/// Event name the device sends when it hit an internal error.
pub const ERROR_EVENT: &str = "error";

/// Heartbeat event name.
pub const PONG_EVENT: &str = "pong";

/// Change callback. Called with no arguments after every state change.
pub type Subscriber = Arc<dyn Fn() + Send + Sync>;

// ── Device ───────────────────────────────────────────────────────────

/// Client facade for one ESPWSClock.
///
/// Cheaply cloneable via `Arc<DeviceInner>`. Never surfaces errors to
/// callers: failures leave the snapshot absent and are kept in
/// [`last_error`](Self::last_error).
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

struct DeviceInner {
    config: DeviceConfig,
    api: DeviceClient,
    snapshot: watch::Sender<Option<DeviceSnapshot>>,
    subscribers: Mutex<Vec<Subscriber>>,
    last_error: Mutex<Option<CoreError>>,
    /// Wakes the supervisor so it drops its stream and reconnects now.
    reconnect: Notify,
}

impl Device {
    /// Create a facade from configuration. Does not touch the network.
    pub fn new(config: DeviceConfig) -> Result<Self, CoreError> {
        let api = DeviceClient::new(&config.host, &config.transport())?;
        Ok(Self::with_client(config, api))
    }

    /// Create a facade around an existing API client.
    pub fn with_client(config: DeviceConfig, api: DeviceClient) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            inner: Arc::new(DeviceInner {
                config,
                api,
                snapshot,
                subscribers: Mutex::new(Vec::new()),
                last_error: Mutex::new(None),
                reconnect: Notify::new(),
            }),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.inner.config
    }

    // ── State access ─────────────────────────────────────────────────

    /// Current snapshot, or `None` while the device is unavailable.
    pub fn snapshot(&self) -> Option<DeviceSnapshot> {
        self.inner.snapshot.borrow().clone()
    }

    pub fn is_available(&self) -> bool {
        self.inner.snapshot.borrow().is_some()
    }

    /// Async view of the snapshot; marked changed on every notification.
    pub fn watch(&self) -> watch::Receiver<Option<DeviceSnapshot>> {
        self.inner.snapshot.subscribe()
    }

    /// Register a change callback. There is no removal.
    pub fn subscribe(&self, callback: impl Fn() + Send + Sync + 'static) {
        lock(&self.inner.subscribers).push(Arc::new(callback));
    }

    /// Why the device last became unavailable. Cleared by a successful decode.
    pub fn last_error(&self) -> Option<CoreError> {
        lock(&self.inner.last_error).clone()
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Fetch the full state (`GET /api/status`).
    pub async fn fetch(&self) {
        let result = self.inner.api.status().await;
        self.absorb(STATUS_METHOD, result);
    }

    /// Send a partial update to `method` and merge the device's answer.
    pub async fn update(&self, method: &str, payload: &Value) {
        let result = self.inner.api.call(method, Some(payload)).await;
        self.absorb(method, result);
    }

    /// Shorthand for [`update`](Self::update) with a light command.
    pub async fn set_light(&self, request: &LightRequest) {
        self.update(request.method(), &request.to_payload()).await;
    }

    // ── Event intake ─────────────────────────────────────────────────

    /// Apply one event from the device's stream.
    pub fn on_event(&self, name: &str, payload: Option<&Value>) {
        match name {
            PONG_EVENT => trace!("heartbeat"),
            ERROR_EVENT => {
                warn!("device reported an error");
                self.mark_unavailable(CoreError::DeviceReported);
                self.notify();
            }
            _ => {
                self.decode(name, payload.unwrap_or(&Value::Null));
                self.notify();
            }
        }
    }

    /// Record a failure from outside the request path (the event
    /// supervisor) and notify.
    pub fn report_error(&self, error: CoreError) {
        self.mark_unavailable(error);
        self.notify();
    }

    // ── Supervision ──────────────────────────────────────────────────

    /// Start the event supervisor for this device.
    ///
    /// The supervisor runs on a child of `cancel`; cancelling either stops it.
    pub fn spawn_supervisor(&self, cancel: &CancellationToken) -> SupervisorHandle {
        Supervisor::new(
            self.inner.api.clone(),
            self.clone(),
            self.inner.config.reconnect_delay,
        )
        .spawn(cancel.child_token())
    }

    /// Ask a running supervisor to drop its stream and reconnect without
    /// waiting out the cooldown.
    pub fn request_reconnect(&self) {
        self.inner.reconnect.notify_one();
    }

    pub(crate) fn reconnect_requested(&self) -> Notified<'_> {
        self.inner.reconnect.notified()
    }

    // ── Internals ────────────────────────────────────────────────────

    fn absorb(&self, method: &str, result: Result<Value, ApiError>) {
        match result {
            Ok(value) => self.decode(method, &value),
            Err(e) => {
                warn!(method, error = %e, kind = e.kind(), "device request failed");
                // The event stream is probably dead too.
                self.request_reconnect();
                self.mark_unavailable(e.into());
            }
        }
        self.notify();
    }

    /// Decode into the snapshot, creating it if absent. On failure the
    /// snapshot is discarded.
    fn decode(&self, method: &str, value: &Value) {
        let mut failure = None;
        self.inner.snapshot.send_modify(|slot| {
            let mut next = slot.take().unwrap_or_default();
            match next.apply_section(method, value) {
                Ok(()) => *slot = Some(next),
                Err(e) => failure = Some(e),
            }
        });

        let mut last_error = lock(&self.inner.last_error);
        match failure {
            None => {
                debug!(method, "device state updated");
                *last_error = None;
            }
            Some(e) => {
                warn!(method, path = e.path(), error = %e, "device sent invalid state");
                *last_error = Some(e.into());
            }
        }
    }

    fn mark_unavailable(&self, error: CoreError) {
        self.inner.snapshot.send_replace(None);
        *lock(&self.inner.last_error) = Some(error);
    }

    fn notify(&self) {
        // Callbacks may call back into the facade; never hold the lock.
        let subscribers = lock(&self.inner.subscribers).clone();
        for subscriber in subscribers {
            subscriber();
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("host", &self.inner.config.host)
            .field("available", &self.is_available())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::model::Rgb;

    fn offline_device() -> Device {
        Device::new(DeviceConfig::new("127.0.0.1:9")).unwrap()
    }

    fn counter(device: &Device) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        device.subscribe(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    #[test]
    fn starts_unavailable() {
        let device = offline_device();
        assert!(!device.is_available());
        assert!(device.snapshot().is_none());
        assert!(device.last_error().is_none());
    }

    #[test]
    fn section_event_creates_snapshot_and_notifies_once() {
        let device = offline_device();
        let count = counter(&device);

        device.on_event(
            "light",
            Some(&json!({ "light": { "state": true, "color": [1, 2, 3] } })),
        );

        let snapshot = device.snapshot().unwrap();
        assert!(snapshot.light.on);
        assert_eq!(snapshot.light.color, Rgb::new(1, 2, 3));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bare_section_event_merges_into_that_section() {
        let device = offline_device();
        device.on_event("light", Some(&json!({ "light": { "brightness": 90 } })));

        device.on_event("light", Some(&json!({ "state": true })));

        let snapshot = device.snapshot().unwrap();
        assert!(snapshot.light.on);
        assert_eq!(snapshot.light.brightness, 90);
    }

    #[test]
    fn pong_never_notifies() {
        let device = offline_device();
        let count = counter(&device);

        device.on_event(PONG_EVENT, None);
        device.on_event(PONG_EVENT, Some(&json!({})));

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!device.is_available());
    }

    #[test]
    fn error_event_discards_valid_snapshot() {
        let device = offline_device();
        device.on_event("info", Some(&json!({ "name": "Kitchen" })));
        assert!(device.is_available());

        let count = counter(&device);
        device.on_event(ERROR_EVENT, Some(&json!({})));

        assert!(!device.is_available());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(device.last_error(), Some(CoreError::DeviceReported));
    }

    #[test]
    fn schema_error_discards_snapshot() {
        let device = offline_device();
        device.on_event("light", Some(&json!({ "brightness": 10 })));
        let count = counter(&device);

        device.on_event("light", Some(&json!({ "brightness": "max" })));

        assert!(device.snapshot().is_none());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(matches!(device.last_error(), Some(CoreError::Schema(_))));
    }

    #[test]
    fn event_without_payload_is_a_schema_error() {
        let device = offline_device();
        device.on_event("light", None);
        assert!(matches!(device.last_error(), Some(CoreError::Schema(_))));
    }

    #[test]
    fn successful_decode_clears_last_error() {
        let device = offline_device();
        device.report_error(CoreError::Timeout { timeout_secs: 30 });
        assert!(device.last_error().is_some());

        device.on_event("system", Some(&json!({ "tz": "UTC0" })));
        assert!(device.last_error().is_none());
        assert_eq!(device.snapshot().unwrap().system.timezone, "UTC0");
    }

    #[test]
    fn subscriber_may_read_state() {
        let device = offline_device();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (d, s) = (device.clone(), Arc::clone(&seen));
        device.subscribe(move || s.lock().unwrap().push(d.is_available()));

        device.on_event("info", Some(&json!({ "version": "2.0" })));
        device.on_event(ERROR_EVENT, None);

        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    }

    #[tokio::test]
    async fn watch_receiver_sees_changes() {
        let device = offline_device();
        let mut rx = device.watch();

        device.on_event("info", Some(&json!({ "name": "Hall" })));

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().info.name, "Hall");
    }
}
