//! Fetch orchestration
//!
//! `QuakeFetcher` is the entry point for loading quakes. Each call:
//!
//! 1. looks up today's entry in the [`DailyCache`] and hands it back at once,
//! 2. spawns a network fetch that waits on the [`ConcurrencyGate`], queries the
//!    feed, and on success overwrites today's cache entry.
//!
//! The two results travel on separate channels of the returned [`FetchHandle`],
//! so a caller can show cached data immediately and then replace it with the
//! network result (or an error) when it arrives.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::cache::{day_key, DailyCache};
use crate::data::feed::DEFAULT_TIMEOUT_SECS;
use crate::data::{
    FeedClient, FetchError, Quake, QuakeFeed, QueryWindow, DEFAULT_DAYS_BACK, USGS_QUERY_URL,
};
use crate::gate::{ConcurrencyGate, DEFAULT_MAX_CONCURRENT};

/// Settings for building a `QuakeFetcher` against the HTTP feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Feed query endpoint
    pub feed_url: String,
    /// Lookback used by `fetch_quakes_default`
    pub days_back: u32,
    /// Gate capacity
    pub max_concurrent: usize,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            feed_url: USGS_QUERY_URL.to_string(),
            days_back: DEFAULT_DAYS_BACK,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// One result delivered for a fetch
#[derive(Debug)]
pub enum Delivery {
    /// Today's cached result, available before the network call finishes
    Cached(Vec<Quake>),
    /// Terminal result of the network call
    Fresh(Result<Vec<Quake>, FetchError>),
}

/// Results of a single `fetch_quakes` call
///
/// `cached` is filled in synchronously when today already has an entry.
/// `fresh` always resolves exactly once with the network outcome, so a caller
/// may observe a cached success followed by a fresh success or failure.
#[derive(Debug)]
pub struct FetchHandle {
    cached: Option<Vec<Quake>>,
    fresh: oneshot::Receiver<Result<Vec<Quake>, FetchError>>,
}

impl FetchHandle {
    /// Today's cached quakes, if there were any when the fetch started
    pub fn cached(&self) -> Option<&[Quake]> {
        self.cached.as_deref()
    }

    /// Waits for the network result
    pub async fn fresh(self) -> Result<Vec<Quake>, FetchError> {
        self.fresh.await.unwrap_or_else(|_| Err(FetchError::Aborted))
    }

    /// All deliveries in order: the cached result (if any), then the fresh one
    pub fn into_stream(self) -> BoxStream<'static, Delivery> {
        let FetchHandle { cached, fresh } = self;

        let cached = stream::iter(cached.map(Delivery::Cached));
        let fresh = stream::once(async move {
            Delivery::Fresh(fresh.await.unwrap_or_else(|_| Err(FetchError::Aborted)))
        });

        cached.chain(fresh).boxed()
    }
}

/// Fetches quakes through the gate and keeps today's result cached
///
/// Cloning is cheap and clones share the same cache, gate and feed.
#[derive(Clone)]
pub struct QuakeFetcher {
    feed: Arc<dyn QuakeFeed>,
    cache: Arc<DailyCache>,
    gate: Arc<ConcurrencyGate>,
    default_days_back: u32,
    clock: fn() -> DateTime<Local>,
}

impl std::fmt::Debug for QuakeFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuakeFetcher")
            .field("cache", &self.cache)
            .field("gate", &self.gate)
            .field("default_days_back", &self.default_days_back)
            .finish_non_exhaustive()
    }
}

impl QuakeFetcher {
    /// Creates a fetcher for the HTTP feed described by `config`
    ///
    /// # Panics
    ///
    /// Panics if `config.max_concurrent` is 0.
    pub fn new(config: &FetchConfig) -> Self {
        let feed = FeedClient::with_base_url(config.feed_url.clone()).with_timeout(config.timeout);
        Self::with_feed(Arc::new(feed), config.max_concurrent)
            .with_default_days_back(config.days_back)
    }

    /// Creates a fetcher around any feed implementation
    pub fn with_feed(feed: Arc<dyn QuakeFeed>, max_concurrent: usize) -> Self {
        Self {
            feed,
            cache: Arc::new(DailyCache::new()),
            gate: Arc::new(ConcurrencyGate::new(max_concurrent)),
            default_days_back: DEFAULT_DAYS_BACK,
            clock: Local::now,
        }
    }

    /// Sets the lookback used by `fetch_quakes_default`
    pub fn with_default_days_back(mut self, days: u32) -> Self {
        self.default_days_back = days;
        self
    }

    /// Replaces the time source (used for the day key and the query window)
    pub fn with_clock(mut self, clock: fn() -> DateTime<Local>) -> Self {
        self.clock = clock;
        self
    }

    /// The shared day cache
    pub fn cache(&self) -> &DailyCache {
        &self.cache
    }

    /// The shared request gate
    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Lookback used by `fetch_quakes_default`
    pub fn default_days_back(&self) -> u32 {
        self.default_days_back
    }

    /// Fetches with the configured default lookback
    pub fn fetch_quakes_default(&self) -> FetchHandle {
        self.fetch_quakes(self.default_days_back)
    }

    /// Starts a fetch of the last `days_back` days
    ///
    /// Must be called from within a Tokio runtime. The network fetch runs on a
    /// spawned task and continues even if the handle is dropped.
    pub fn fetch_quakes(&self, days_back: u32) -> FetchHandle {
        let now = (self.clock)();
        let key = day_key(now);

        let cached = self.cache.get(&key);
        if let Some(ref quakes) = cached {
            debug!(day = %key, count = quakes.len(), "serving cached quakes");
        }

        let (tx, rx) = oneshot::channel();
        let feed = Arc::clone(&self.feed);
        let cache = Arc::clone(&self.cache);
        let gate = Arc::clone(&self.gate);

        tokio::spawn(async move {
            let result = fetch_fresh(
                feed.as_ref(),
                &cache,
                &gate,
                key,
                days_back,
                now.with_timezone(&Utc),
            )
            .await;
            // Receiver may be gone; the cache has already been updated.
            let _ = tx.send(result);
        });

        FetchHandle { cached, fresh: rx }
    }
}

/// Network path of a fetch: window, gate, feed, cache
async fn fetch_fresh(
    feed: &dyn QuakeFeed,
    cache: &DailyCache,
    gate: &ConcurrencyGate,
    key: String,
    days_back: u32,
    now: DateTime<Utc>,
) -> Result<Vec<Quake>, FetchError> {
    let window = QueryWindow::days_back(days_back, now).inspect_err(|e| {
        warn!(error = %e, days_back, "could not build query window");
    })?;

    debug!(
        in_flight = gate.in_flight(),
        capacity = gate.capacity(),
        "waiting for feed gate"
    );
    let permit = gate.acquire().await;
    debug!(start = %window.start, end = %window.end, "feed request in flight");

    let result = feed.fetch(&window).await;
    drop(permit);

    match result {
        Ok(quakes) => {
            info!(day = %key, count = quakes.len(), "fetched quakes");
            cache.put(key, quakes.clone());
            Ok(quakes)
        }
        Err(e) => {
            warn!(error = %e, "quake fetch failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::decode_feed;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    const ONE_QUAKE: &str = r#"{"features":[{"properties":{"mag":4.5,"place":"10km N of Test","time":1690000000000,"url":"http://example.com/1"},"geometry":{"coordinates":[-122.4,37.7]}}]}"#;

    /// Feed that decodes a fixed body and counts calls
    struct StaticFeed {
        body: &'static str,
        calls: AtomicUsize,
    }

    impl StaticFeed {
        fn new(body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                body,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl QuakeFeed for StaticFeed {
        async fn fetch(&self, _window: &QueryWindow) -> Result<Vec<Quake>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            decode_feed(self.body.as_bytes())
        }
    }

    /// Feed that holds every call until the test opens the valve
    struct ValveFeed {
        valve: Semaphore,
        started: AtomicUsize,
        running: AtomicUsize,
        max_running: AtomicUsize,
    }

    impl ValveFeed {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                valve: Semaphore::new(0),
                started: AtomicUsize::new(0),
                running: AtomicUsize::new(0),
                max_running: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl QuakeFeed for ValveFeed {
        async fn fetch(&self, _window: &QueryWindow) -> Result<Vec<Quake>, FetchError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(running, Ordering::SeqCst);

            self.valve.acquire().await.unwrap().forget();

            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn day_one() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap()
    }

    fn day_two() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 16, 10, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_sample_payload() {
        let fetcher = QuakeFetcher::with_feed(StaticFeed::new(ONE_QUAKE), 5);

        let quakes = fetcher.fetch_quakes(30).fresh().await.expect("fetch should succeed");

        assert_eq!(quakes.len(), 1);
        assert!((quakes[0].magnitude - 4.5).abs() < f64::EPSILON);
        assert!((quakes[0].location.latitude - 37.7).abs() < f64::EPSILON);
        assert!((quakes[0].location.longitude - (-122.4)).abs() < f64::EPSILON);
        assert_eq!(quakes[0].detail_url.as_deref(), Some("http://example.com/1"));
    }

    #[tokio::test]
    async fn test_first_fetch_has_no_cached_value() {
        let fetcher = QuakeFetcher::with_feed(StaticFeed::new(ONE_QUAKE), 5).with_clock(day_one);

        let handle = fetcher.fetch_quakes(30);
        assert!(handle.cached().is_none());
        handle.fresh().await.unwrap();

        assert_eq!(fetcher.cache().get("15.03.2024").map(|q| q.len()), Some(1));
    }

    #[tokio::test]
    async fn test_second_fetch_same_day_delivers_cache_immediately() {
        let feed = StaticFeed::new(ONE_QUAKE);
        let fetcher = QuakeFetcher::with_feed(feed.clone(), 5).with_clock(day_one);

        fetcher.fetch_quakes(30).fresh().await.unwrap();

        let handle = fetcher.fetch_quakes(30);
        let cached = handle.cached().expect("same-day fetch should hit the cache");
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].title(), "10km N of Test");

        // The network path still runs.
        let fresh = handle.fresh().await.unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_hit_precedes_slow_network() {
        let feed = ValveFeed::new();
        let fetcher = QuakeFetcher::with_feed(feed.clone(), 5).with_clock(day_one);
        fetcher.cache().put("15.03.2024", vec![]);

        let handle = fetcher.fetch_quakes(30);
        assert_eq!(handle.cached(), Some(&[][..]));

        let mut deliveries = handle.into_stream();
        assert!(matches!(deliveries.next().await, Some(Delivery::Cached(_))));

        feed.valve.add_permits(1);
        assert!(matches!(deliveries.next().await, Some(Delivery::Fresh(Ok(_)))));
        assert!(deliveries.next().await.is_none());
    }

    #[tokio::test]
    async fn test_new_day_does_not_see_previous_day() {
        let fetcher = QuakeFetcher::with_feed(StaticFeed::new(ONE_QUAKE), 5).with_clock(day_one);
        fetcher.fetch_quakes(30).fresh().await.unwrap();

        let tomorrow = fetcher.clone().with_clock(day_two);
        let handle = tomorrow.fetch_quakes(30);
        assert!(handle.cached().is_none());
        handle.fresh().await.unwrap();

        assert_eq!(fetcher.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_decode_failure_releases_gate_and_leaves_cache() {
        let feed = StaticFeed::new(r#"{"type":"FeatureCollection"}"#);
        let fetcher = QuakeFetcher::with_feed(feed, 5).with_clock(day_one);

        let result = fetcher.fetch_quakes(30).fresh().await;

        assert!(matches!(result, Err(FetchError::Decode(_))));
        assert_eq!(fetcher.gate().available_permits(), 5);
        assert_eq!(fetcher.gate().in_flight(), 0);
        assert!(fetcher.cache().is_empty());
    }

    #[tokio::test]
    async fn test_failure_keeps_existing_cache_entry() {
        let fetcher = QuakeFetcher::with_feed(StaticFeed::new(""), 5).with_clock(day_one);
        let previous = decode_feed(ONE_QUAKE.as_bytes()).unwrap();
        fetcher.cache().put("15.03.2024", previous.clone());

        let mut deliveries = fetcher.fetch_quakes(30).into_stream();

        match deliveries.next().await {
            Some(Delivery::Cached(quakes)) => assert_eq!(quakes, previous),
            other => panic!("Expected cached delivery, got {:?}", other),
        }
        match deliveries.next().await {
            Some(Delivery::Fresh(Err(FetchError::NoDataReturned))) => {}
            other => panic!("Expected NoDataReturned, got {:?}", other),
        }
        assert_eq!(fetcher.cache().get("15.03.2024"), Some(previous));
        assert_eq!(fetcher.gate().in_flight(), 0);
        assert_eq!(fetcher.gate().available_permits(), 5);
    }

    #[tokio::test]
    async fn test_zero_days_fails_without_touching_gate() {
        let feed = StaticFeed::new(ONE_QUAKE);
        let fetcher = QuakeFetcher::with_feed(feed.clone(), 5);

        let result = fetcher.fetch_quakes(0).fresh().await;

        assert!(matches!(result, Err(FetchError::DateMath(_))));
        assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
        assert_eq!(fetcher.gate().peak_in_flight(), 0);
    }

    #[tokio::test]
    async fn test_gate_bounds_simultaneous_fetches() {
        let feed = ValveFeed::new();
        let capacity = 5;
        let fetcher = QuakeFetcher::with_feed(feed.clone(), capacity);

        let handles: Vec<_> = (0..capacity + 1).map(|_| fetcher.fetch_quakes(1)).collect();

        // Let every spawned task reach either the feed or the gate.
        for _ in 0..50 {
            if feed.started.load(Ordering::SeqCst) == capacity {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(feed.started.load(Ordering::SeqCst), capacity);
        assert_eq!(fetcher.gate().in_flight(), capacity);
        assert_eq!(fetcher.gate().available_permits(), 0);

        feed.valve.add_permits(capacity + 1);
        let results = futures::future::join_all(handles.into_iter().map(FetchHandle::fresh)).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(feed.started.load(Ordering::SeqCst), capacity + 1);
        assert!(feed.max_running.load(Ordering::SeqCst) <= capacity);
        assert_eq!(fetcher.gate().peak_in_flight(), capacity);
        assert_eq!(fetcher.gate().in_flight(), 0);
        assert_eq!(fetcher.gate().available_permits(), capacity);
    }

    #[tokio::test]
    async fn test_dropped_handle_still_updates_cache() {
        let fetcher = QuakeFetcher::with_feed(StaticFeed::new(ONE_QUAKE), 5).with_clock(day_one);

        drop(fetcher.fetch_quakes(30));

        for _ in 0..50 {
            if !fetcher.cache().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(fetcher.cache().get("15.03.2024").is_some());
        assert_eq!(fetcher.gate().in_flight(), 0);
    }

    #[tokio::test]
    async fn test_default_days_back_is_configurable() {
        let fetcher = QuakeFetcher::with_feed(StaticFeed::new(ONE_QUAKE), 5).with_default_days_back(5);
        assert_eq!(fetcher.default_days_back(), 5);
        assert!(fetcher.fetch_quakes_default().fresh().await.is_ok());
    }

    #[test]
    fn test_fetch_config_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.feed_url, USGS_QUERY_URL);
        assert_eq!(config.days_back, 30);
        assert_eq!(config.max_concurrent, 5);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_new_builds_http_fetcher_from_config() {
        let config = FetchConfig {
            days_back: 7,
            max_concurrent: 2,
            ..Default::default()
        };
        let fetcher = QuakeFetcher::new(&config);

        assert_eq!(fetcher.default_days_back(), 7);
        assert_eq!(fetcher.gate().capacity(), 2);
        assert!(fetcher.cache().is_empty());
    }
}
