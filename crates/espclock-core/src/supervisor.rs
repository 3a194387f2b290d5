// ── Event stream supervisor ──
//
// Keeps `/api/events` open for the lifetime of the device facade. An idle
// stream is reopened at once; any other failure is reported to the facade
// and followed by a cooldown. Cancellation is observed at every await.

use std::future::Future;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;
use strum::Display;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use espclock_api::{DeviceClient, Error as ApiError, Event, EventStream};

use crate::device::{Device, PONG_EVENT};

// ── EventSource ──────────────────────────────────────────────────────

/// Something that can open the device's event stream.
pub trait EventSource: Send + Sync + 'static {
    fn open(&self) -> impl Future<Output = Result<EventStream, ApiError>> + Send;
}

impl EventSource for DeviceClient {
    fn open(&self) -> impl Future<Output = Result<EventStream, ApiError>> + Send {
        self.events()
    }
}

// ── SupervisorState ──────────────────────────────────────────────────

/// Lifecycle of the supervisor, observable through [`SupervisorHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SupervisorState {
    Connecting,
    Streaming,
    CoolingDown,
    Terminated,
}

/// How one stream attempt ended.
enum StreamEnd {
    /// No data within the read timeout. Benign.
    Idle,
    /// The device closed the response.
    Ended,
    Failed(ApiError),
}

impl From<ApiError> for StreamEnd {
    fn from(err: ApiError) -> Self {
        if err.is_idle_timeout() {
            Self::Idle
        } else {
            Self::Failed(err)
        }
    }
}

// ── Supervisor ───────────────────────────────────────────────────────

pub struct Supervisor<S> {
    source: S,
    device: Device,
    cooldown: Duration,
    state: watch::Sender<SupervisorState>,
}

impl<S: EventSource> Supervisor<S> {
    pub fn new(source: S, device: Device, cooldown: Duration) -> Self {
        let (state, _) = watch::channel(SupervisorState::Connecting);
        Self {
            source,
            device,
            cooldown,
            state,
        }
    }

    pub fn state(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    /// Run on a new tokio task.
    pub fn spawn(self, cancel: CancellationToken) -> SupervisorHandle {
        let state = self.state();
        let join = tokio::spawn(self.run(cancel.clone()));
        SupervisorHandle {
            cancel,
            join,
            state,
        }
    }

    /// Supervise until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            host = %self.device.config().host,
            cooldown_secs = self.cooldown.as_secs(),
            "event supervisor started"
        );

        loop {
            self.set_state(SupervisorState::Connecting);

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = self.device.reconnect_requested() => {
                    debug!("reconnect requested, reopening event stream");
                    continue;
                }
                outcome = self.stream_once() => outcome,
            };

            match outcome {
                StreamEnd::Idle => {
                    debug!("event stream idle, reopening");
                    continue;
                }
                StreamEnd::Ended => info!("event stream closed by device"),
                StreamEnd::Failed(e) => {
                    warn!(error = %e, kind = e.kind(), "event stream failed");
                    self.device.report_error(e.into());
                }
            }

            self.set_state(SupervisorState::CoolingDown);
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = self.device.reconnect_requested() => {
                    debug!("reconnect requested, skipping cooldown");
                }
                () = tokio::time::sleep(self.cooldown) => {}
            }
        }

        self.set_state(SupervisorState::Terminated);
        info!("event supervisor stopped");
    }

    async fn stream_once(&self) -> StreamEnd {
        let mut events = match self.source.open().await {
            Ok(events) => events,
            Err(e) => return e.into(),
        };

        self.set_state(SupervisorState::Streaming);
        debug!("event stream open");

        while let Some(item) = events.next().await {
            if let Err(e) = item.and_then(|event| self.dispatch(&event)) {
                return e.into();
            }
        }
        StreamEnd::Ended
    }

    /// Hand one event to the facade. Payloads other than heartbeats must be
    /// valid JSON.
    fn dispatch(&self, event: &Event) -> Result<(), ApiError> {
        if event.event == PONG_EVENT {
            trace!(id = ?event.id, "pong");
            self.device.on_event(PONG_EVENT, None);
            return Ok(());
        }

        let payload: Value =
            serde_json::from_str(&event.data).map_err(|e| ApiError::Deserialization {
                message: e.to_string(),
                body: event.data.clone(),
            })?;

        debug!(event = %event.event, id = ?event.id, "device event");
        self.device.on_event(&event.event, Some(&payload));
        Ok(())
    }

    fn set_state(&self, state: SupervisorState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            trace!(from = %current, to = %state, "supervisor state");
            *current = state;
            true
        });
    }
}

// ── SupervisorHandle ─────────────────────────────────────────────────

/// Handle to a spawned supervisor. Dropping it leaves the task running
/// until its token is cancelled.
#[derive(Debug)]
pub struct SupervisorHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
    state: watch::Receiver<SupervisorState>,
}

impl SupervisorHandle {
    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<SupervisorState> {
        self.state.clone()
    }

    /// Signal the task to stop without waiting for it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel and wait for the task to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            warn!(error = %e, "event supervisor task did not exit cleanly");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};

    use futures_util::{Stream, stream};
    use tokio::time::{Instant, sleep};

    use super::*;
    use crate::config::DeviceConfig;
    use crate::error::CoreError;

    const COOLDOWN: Duration = Duration::from_secs(30);

    /// What the fake does on each `open()`. Once the script runs out,
    /// `open()` never completes.
    enum Step {
        Fail(ApiError),
        Stream(Vec<Result<Event, ApiError>>),
        /// Yield the items, then stay open without data. The flag is set
        /// when the stream is dropped.
        Hang(Vec<Result<Event, ApiError>>, Arc<AtomicBool>),
    }

    /// Sets its flag when dropped.
    struct Tracked {
        inner: EventStream,
        dropped: Arc<AtomicBool>,
    }

    impl Stream for Tracked {
        type Item = Result<Event, ApiError>;

        fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            self.inner.poll_next_unpin(cx)
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    struct FakeSource {
        steps: Mutex<VecDeque<Step>>,
        opens: Mutex<Vec<Instant>>,
    }

    impl FakeSource {
        fn scripted(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into_iter().collect()),
                opens: Mutex::default(),
            })
        }

        fn opens(&self) -> Vec<Instant> {
            self.opens.lock().unwrap().clone()
        }
    }

    impl EventSource for Arc<FakeSource> {
        fn open(&self) -> impl Future<Output = Result<EventStream, ApiError>> + Send {
            self.opens.lock().unwrap().push(Instant::now());
            let step = self.steps.lock().unwrap().pop_front();
            async move {
                match step {
                    None => std::future::pending::<Result<EventStream, ApiError>>().await,
                    Some(Step::Fail(e)) => Err(e),
                    Some(Step::Stream(items)) => {
                        let events: EventStream = Box::pin(stream::iter(items));
                        Ok(events)
                    }
                    Some(Step::Hang(items, dropped)) => {
                        let inner: EventStream =
                            Box::pin(stream::iter(items).chain(stream::pending()));
                        let events: EventStream = Box::pin(Tracked { inner, dropped });
                        Ok(events)
                    }
                }
            }
        }
    }

    fn event(name: &str, data: &str) -> Result<Event, ApiError> {
        Ok(Event {
            id: None,
            event: name.into(),
            data: data.into(),
        })
    }

    fn connect_failure() -> ApiError {
        ApiError::Timeout {
            url: "http://127.0.0.1:9/api/events".into(),
            timeout_secs: 5,
        }
    }

    fn device_with_counter() -> (Device, Arc<AtomicUsize>) {
        let device = Device::new(DeviceConfig::new("127.0.0.1:9")).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        device.subscribe(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (device, count)
    }

    fn start(source: &Arc<FakeSource>, device: &Device) -> SupervisorHandle {
        Supervisor::new(Arc::clone(source), device.clone(), COOLDOWN)
            .spawn(CancellationToken::new())
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout_reopens_without_reporting() {
        let source = FakeSource::scripted([Step::Stream(vec![Err(ApiError::IdleTimeout {
            timeout_secs: 30,
        })])]);
        let (device, count) = device_with_counter();
        let handle = start(&source, &device);

        sleep(Duration::from_secs(1)).await;

        let opens = source.opens();
        assert_eq!(opens.len(), 2);
        assert!(opens[1] - opens[0] < Duration::from_secs(1));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(device.last_error().is_none());
        assert_eq!(handle.state(), SupervisorState::Connecting);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn connection_error_reports_once_then_cools_down() {
        let source = FakeSource::scripted([Step::Fail(connect_failure())]);
        let (device, count) = device_with_counter();
        let handle = start(&source, &device);

        sleep(Duration::from_secs(29)).await;
        assert_eq!(source.opens().len(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state(), SupervisorState::CoolingDown);
        assert!(matches!(device.last_error(), Some(CoreError::Timeout { .. })));

        sleep(Duration::from_secs(2)).await;
        let opens = source.opens();
        assert_eq!(opens.len(), 2);
        assert!(opens[1] - opens[0] >= COOLDOWN);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_cooldown() {
        let source = FakeSource::scripted([Step::Fail(connect_failure())]);
        let (device, count) = device_with_counter();
        let handle = start(&source, &device);
        let state = handle.state_changes();

        sleep(Duration::from_secs(5)).await;
        assert_eq!(*state.borrow(), SupervisorState::CoolingDown);

        let before = Instant::now();
        handle.shutdown().await;

        assert!(before.elapsed() < Duration::from_secs(1));
        assert_eq!(*state.borrow(), SupervisorState::Terminated);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(source.opens().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_pending_open() {
        let source = FakeSource::scripted(Vec::new());
        let (device, count) = device_with_counter();
        let handle = start(&source, &device);

        sleep(Duration::from_secs(1)).await;
        assert_eq!(handle.state(), SupervisorState::Connecting);

        handle.shutdown().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_open_stream() {
        let dropped = Arc::new(AtomicBool::new(false));
        let source = FakeSource::scripted([Step::Hang(
            vec![event("info", r#"{"info": {"name": "Hall"}}"#)],
            Arc::clone(&dropped),
        )]);
        let (device, count) = device_with_counter();
        let handle = start(&source, &device);
        let state = handle.state_changes();

        sleep(Duration::from_secs(60)).await;
        assert_eq!(*state.borrow(), SupervisorState::Streaming);
        assert_eq!(device.snapshot().unwrap().info.name, "Hall");
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!dropped.load(Ordering::SeqCst));

        let before = Instant::now();
        handle.shutdown().await;

        assert!(before.elapsed() < Duration::from_secs(1));
        assert_eq!(*state.borrow(), SupervisorState::Terminated);
        assert!(dropped.load(Ordering::SeqCst));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(source.opens().len(), 1);
        assert!(device.is_available());
    }

    #[tokio::test(start_paused = true)]
    async fn events_reach_the_facade_in_order() {
        let source = FakeSource::scripted([Step::Stream(vec![
            event("light", r#"{"light": {"state": true, "brightness": 10}}"#),
            event(PONG_EVENT, ""),
            event("light", r#"{"brightness": 20}"#),
        ])]);
        let (device, count) = device_with_counter();
        let handle = start(&source, &device);

        sleep(Duration::from_secs(1)).await;

        let snapshot = device.snapshot().unwrap();
        assert!(snapshot.light.on);
        assert_eq!(snapshot.light.brightness, 20);
        // Two state events; the heartbeat is silent and the clean end is
        // not an error.
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(handle.state(), SupervisorState::CoolingDown);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_json_payload_is_reported() {
        let source = FakeSource::scripted([Step::Stream(vec![
            event("info", r#"{"name": "Kitchen"}"#),
            event("light", "not json"),
            event("light", r#"{"state": true}"#),
        ])]);
        let (device, count) = device_with_counter();
        let handle = start(&source, &device);

        sleep(Duration::from_secs(1)).await;

        assert!(!device.is_available());
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(matches!(device.last_error(), Some(CoreError::Protocol { .. })));
        assert_eq!(handle.state(), SupervisorState::CoolingDown);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_request_skips_cooldown() {
        let source = FakeSource::scripted([Step::Fail(connect_failure())]);
        let (device, _count) = device_with_counter();
        let handle = start(&source, &device);

        sleep(Duration::from_secs(1)).await;
        assert_eq!(source.opens().len(), 1);

        device.request_reconnect();
        sleep(Duration::from_secs(1)).await;

        let opens = source.opens();
        assert_eq!(opens.len(), 2);
        assert!(opens[1] - opens[0] < COOLDOWN);

        handle.shutdown().await;
    }
}
