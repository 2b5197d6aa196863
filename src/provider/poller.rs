//! Background polling of a topology source
//!
//! Fetches run on short-lived worker threads and report back over a channel.
//! [`TopologyFeed::tick`] is called from the UI loop; it drains results and
//! starts the next fetch when one is due, so all state changes happen on the
//! caller's thread.

use super::{ProviderError, TopologySource};
use crate::topology::TopologySnapshot;
use chrono::{DateTime, Local};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often the feed refetches on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PollInterval {
    #[serde(rename = "off")]
    Off,
    #[serde(rename = "10s")]
    TenSeconds,
    #[default]
    #[serde(rename = "30s")]
    ThirtySeconds,
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
}

impl PollInterval {
    pub const ALL: [PollInterval; 5] = [
        PollInterval::Off,
        PollInterval::TenSeconds,
        PollInterval::ThirtySeconds,
        PollInterval::OneMinute,
        PollInterval::FiveMinutes,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PollInterval::Off => "off",
            PollInterval::TenSeconds => "10s",
            PollInterval::ThirtySeconds => "30s",
            PollInterval::OneMinute => "1m",
            PollInterval::FiveMinutes => "5m",
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        match self {
            PollInterval::Off => None,
            PollInterval::TenSeconds => Some(Duration::from_secs(10)),
            PollInterval::ThirtySeconds => Some(Duration::from_secs(30)),
            PollInterval::OneMinute => Some(Duration::from_secs(60)),
            PollInterval::FiveMinutes => Some(Duration::from_secs(300)),
        }
    }

    /// Parse a label, falling back to the default
    pub fn from_str(s: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|p| p.label() == s.trim())
            .unwrap_or_default()
    }
}

/// Result of one completed fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FeedUpdate {
    Loaded(TopologySnapshot),
    Failed(ProviderError),
}

struct FetchResult {
    generation: u64,
    result: Result<TopologySnapshot, ProviderError>,
}

pub struct TopologyFeed {
    source: Arc<dyn TopologySource>,
    namespace: Option<String>,
    interval: PollInterval,

    tx: Sender<FetchResult>,
    rx: Receiver<FetchResult>,

    /// Bumped on namespace change; results from older generations are dropped
    generation: u64,
    in_flight: Option<u64>,
    refresh_queued: bool,
    last_completed: Option<Instant>,
    closed: Arc<AtomicBool>,

    last_success: Option<DateTime<Local>>,
    last_error: Option<ProviderError>,
}

impl TopologyFeed {
    pub fn new(source: Arc<dyn TopologySource>, namespace: Option<String>, interval: PollInterval) -> Self {
        let (tx, rx) = mpsc::channel();
        info!(
            "Topology feed started: {} (namespace: {}, poll: {})",
            source.describe(),
            namespace.as_deref().unwrap_or("all"),
            interval.label()
        );
        Self {
            source,
            namespace: namespace.filter(|ns| !ns.is_empty()),
            interval,
            tx,
            rx,
            generation: 0,
            in_flight: None,
            refresh_queued: false,
            last_completed: None,
            closed: Arc::new(AtomicBool::new(false)),
            last_success: None,
            last_error: None,
        }
    }

    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn interval(&self) -> PollInterval {
        self.interval
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// True until the first fetch for the current namespace completes
    pub fn is_initial_load(&self) -> bool {
        self.last_completed.is_none()
    }

    pub fn last_success(&self) -> Option<DateTime<Local>> {
        self.last_success
    }

    pub fn last_error(&self) -> Option<&ProviderError> {
        self.last_error.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Drain finished fetches and start the next one when due.
    ///
    /// Returns at most one update for the current generation.
    pub fn tick(&mut self, now: Instant) -> Option<FeedUpdate> {
        if self.is_closed() {
            return None;
        }

        let mut update = None;
        while let Ok(fetch) = self.rx.try_recv() {
            if let Some(u) = self.accept(fetch, now) {
                update = Some(u);
            }
        }

        if self.in_flight.is_none() && (self.refresh_queued || self.is_due(now)) {
            self.start_fetch();
        }

        update
    }

    /// Fetch as soon as possible, after any fetch already in flight
    pub fn refresh_now(&mut self) {
        if self.is_closed() {
            return;
        }
        if self.in_flight.is_some() {
            self.refresh_queued = true;
        } else {
            self.start_fetch();
        }
    }

    pub fn set_interval(&mut self, interval: PollInterval) {
        if self.interval != interval {
            info!("Poll interval: {} -> {}", self.interval.label(), interval.label());
            self.interval = interval;
        }
    }

    /// Switch scope; in-flight results for the old scope are discarded
    pub fn set_namespace(&mut self, namespace: Option<String>) {
        let namespace = namespace.filter(|ns| !ns.is_empty());
        if self.namespace == namespace {
            return;
        }
        info!("Namespace changed to {}", namespace.as_deref().unwrap_or("all"));
        self.namespace = namespace;
        self.generation += 1;
        self.in_flight = None;
        self.last_completed = None;
        self.refresh_now();
    }

    /// Block until the current generation produces a result.
    ///
    /// Starts a fetch if none is running. Used by the CLI.
    pub fn wait_for_update(&mut self, timeout: Duration) -> Option<FeedUpdate> {
        if self.is_closed() {
            return None;
        }
        if self.in_flight.is_none() {
            self.start_fetch();
        }

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(fetch) => {
                    if let Some(update) = self.accept(fetch, Instant::now()) {
                        return Some(update);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Stop accepting results; late fetches are dropped
    pub fn shutdown(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Topology feed stopped");
        }
        self.in_flight = None;
        self.refresh_queued = false;
    }

    fn is_due(&self, now: Instant) -> bool {
        match (self.last_completed, self.interval.duration()) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(last), Some(every)) => now.saturating_duration_since(last) >= every,
        }
    }

    fn accept(&mut self, fetch: FetchResult, now: Instant) -> Option<FeedUpdate> {
        if fetch.generation != self.generation {
            debug!(
                "Discarding result from generation {} (current {})",
                fetch.generation, self.generation
            );
            return None;
        }
        if self.in_flight == Some(fetch.generation) {
            self.in_flight = None;
        }
        self.last_completed = Some(now);

        match fetch.result {
            Ok(snapshot) => {
                info!(
                    "Topology refreshed: {} nodes, {} edges",
                    snapshot.nodes.len(),
                    snapshot.edges.len()
                );
                self.last_success = Some(Local::now());
                self.last_error = None;
                Some(FeedUpdate::Loaded(snapshot))
            }
            Err(e) => {
                warn!("Topology fetch failed: {}", e);
                self.last_error = Some(e.clone());
                Some(FeedUpdate::Failed(e))
            }
        }
    }

    fn start_fetch(&mut self) {
        let generation = self.generation;
        self.in_flight = Some(generation);
        self.refresh_queued = false;

        let source = Arc::clone(&self.source);
        let namespace = self.namespace.clone();
        let closed = Arc::clone(&self.closed);
        let tx = self.tx.clone();

        std::thread::spawn(move || {
            let result = source.fetch(namespace.as_deref());
            if closed.load(Ordering::SeqCst) {
                return;
            }
            let _ = tx.send(FetchResult { generation, result });
        });
    }
}

impl Drop for TopologyFeed {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{GraphNode, NodeKind};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Returns one connector named after the requested namespace
    struct CountingSource {
        calls: AtomicUsize,
    }

    impl TopologySource for CountingSource {
        fn fetch(&self, namespace: Option<&str>) -> Result<TopologySnapshot, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let name = namespace.unwrap_or("all");
            Ok(TopologySnapshot::new(
                vec![GraphNode::new("c1", NodeKind::Connector, name)],
                vec![],
            ))
        }

        fn describe(&self) -> String {
            "counting".into()
        }
    }

    /// Blocks each fetch until the test releases it
    struct GatedSource {
        gate: Mutex<Receiver<()>>,
    }

    impl TopologySource for GatedSource {
        fn fetch(&self, namespace: Option<&str>) -> Result<TopologySnapshot, ProviderError> {
            let gate = self.gate.lock().map_err(|e| ProviderError::Io(e.to_string()))?;
            let _ = gate.recv();
            drop(gate);
            Ok(TopologySnapshot::new(
                vec![GraphNode::new("c1", NodeKind::Connector, namespace.unwrap_or("all"))],
                vec![],
            ))
        }

        fn describe(&self) -> String {
            "gated".into()
        }
    }

    /// Reports on `done` each time the wrapped fetch returns
    struct NotifyingSource {
        inner: GatedSource,
        done: Mutex<Sender<()>>,
    }

    impl TopologySource for NotifyingSource {
        fn fetch(&self, namespace: Option<&str>) -> Result<TopologySnapshot, ProviderError> {
            let result = self.inner.fetch(namespace);
            if let Ok(done) = self.done.lock() {
                let _ = done.send(());
            }
            result
        }

        fn describe(&self) -> String {
            "notifying".into()
        }
    }

    struct FailingSource;

    impl TopologySource for FailingSource {
        fn fetch(&self, _namespace: Option<&str>) -> Result<TopologySnapshot, ProviderError> {
            Err(ProviderError::Status {
                status: 500,
                message: "boom".into(),
            })
        }

        fn describe(&self) -> String {
            "failing".into()
        }
    }

    fn counting() -> Arc<CountingSource> {
        Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_poll_interval_labels() {
        assert_eq!(PollInterval::default(), PollInterval::ThirtySeconds);
        assert_eq!(PollInterval::from_str("1m"), PollInterval::OneMinute);
        assert_eq!(PollInterval::from_str("weekly"), PollInterval::ThirtySeconds);
        assert_eq!(PollInterval::Off.duration(), None);
        assert_eq!(PollInterval::FiveMinutes.duration(), Some(Duration::from_secs(300)));
        let json = serde_json::to_string(&PollInterval::TenSeconds).unwrap();
        assert_eq!(json, "\"10s\"");
    }

    #[test]
    fn test_first_update_is_loaded() {
        let source = counting();
        let mut feed = TopologyFeed::new(source.clone(), Some("ops".into()), PollInterval::Off);
        assert!(feed.is_initial_load());

        match feed.wait_for_update(Duration::from_secs(5)) {
            Some(FeedUpdate::Loaded(snapshot)) => assert_eq!(snapshot.nodes[0].display_name, "ops"),
            other => panic!("unexpected update: {:?}", other),
        }
        assert!(!feed.is_loading());
        assert!(feed.last_success().is_some());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_interval_controls_refetch() {
        let source = counting();
        let mut feed = TopologyFeed::new(source.clone(), None, PollInterval::Off);
        feed.wait_for_update(Duration::from_secs(5));

        let later = Instant::now() + Duration::from_secs(3600);
        assert!(feed.tick(later).is_none());
        assert!(!feed.is_loading());

        feed.set_interval(PollInterval::TenSeconds);
        feed.tick(later);
        assert!(feed.is_loading());
    }

    #[test]
    fn test_namespace_change_discards_stale_result() {
        let (release, gate) = mpsc::channel();
        let source = Arc::new(GatedSource { gate: Mutex::new(gate) });
        let mut feed = TopologyFeed::new(source, Some("a".into()), PollInterval::Off);

        feed.refresh_now();
        feed.set_namespace(Some("b".into()));
        release.send(()).unwrap();
        release.send(()).unwrap();

        match feed.wait_for_update(Duration::from_secs(5)) {
            Some(FeedUpdate::Loaded(snapshot)) => assert_eq!(snapshot.nodes[0].display_name, "b"),
            other => panic!("unexpected update: {:?}", other),
        }
    }

    #[test]
    fn test_failure_is_reported() {
        let mut feed = TopologyFeed::new(Arc::new(FailingSource), None, PollInterval::ThirtySeconds);
        match feed.wait_for_update(Duration::from_secs(5)) {
            Some(FeedUpdate::Failed(ProviderError::Status { status, .. })) => assert_eq!(status, 500),
            other => panic!("unexpected update: {:?}", other),
        }
        assert!(feed.last_error().is_some());
    }

    #[test]
    fn test_shutdown_drops_results() {
        let source = counting();
        let mut feed = TopologyFeed::new(source, None, PollInterval::TenSeconds);
        feed.shutdown();
        assert!(feed.is_closed());
        assert!(feed.tick(Instant::now()).is_none());
        assert!(feed.wait_for_update(Duration::from_millis(50)).is_none());
        assert!(!feed.is_loading());
    }

    #[test]
    fn test_shutdown_discards_in_flight_fetch() {
        let (release, gate) = mpsc::channel();
        let (done_tx, done) = mpsc::channel();
        let source = Arc::new(NotifyingSource {
            inner: GatedSource { gate: Mutex::new(gate) },
            done: Mutex::new(done_tx),
        });
        let mut feed = TopologyFeed::new(source, None, PollInterval::TenSeconds);

        feed.refresh_now();
        assert!(feed.is_loading());
        feed.shutdown();
        release.send(()).unwrap();
        done.recv_timeout(Duration::from_secs(5)).unwrap();

        assert!(feed.tick(Instant::now() + Duration::from_secs(60)).is_none());
        assert!(feed.wait_for_update(Duration::from_millis(50)).is_none());
        assert!(feed.rx.try_recv().is_err());
        assert!(feed.last_success().is_none());
        assert!(!feed.is_loading());
    }
}
