//! Delayed invocation that later calls supersede.
//!
//! Each [`Debouncer::call`] cancels whatever is still pending and schedules
//! its own argument after the quiet period. Only the last call in a burst
//! runs. A call that arrives while an earlier action is still running
//! cancels that action too, so stale work never publishes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::geocode::LocationResolver;
use crate::model::GeocodeCandidate;

/// Quiet period before a location search is sent.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(700);

type Action<A> = Arc<dyn Fn(A) -> BoxFuture<'static, ()> + Send + Sync>;

pub struct Debouncer<A> {
    delay: Duration,
    action: Action<A>,
    pending: Mutex<Option<CancellationToken>>,
}

impl<A: Send + 'static> Debouncer<A> {
    pub fn new<F, Fut>(delay: Duration, action: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            delay,
            action: Arc::new(move |arg| action(arg).boxed()),
            pending: Mutex::new(None),
        }
    }

    /// Schedules `arg`, replacing any pending invocation.
    ///
    /// Must be called from within a tokio runtime.
    pub fn call(&self, arg: A) {
        let token = CancellationToken::new();
        if let Some(previous) = self.pending.lock().replace(token.clone()) {
            previous.cancel();
        }

        let action = Arc::clone(&self.action);
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = action(arg) => {}
            }
        });
    }

    /// Drops the pending invocation, if any.
    pub fn cancel(&self) {
        if let Some(token) = self.pending.lock().take() {
            token.cancel();
        }
    }
}

impl<A> Drop for Debouncer<A> {
    fn drop(&mut self) {
        if let Some(token) = self.pending.get_mut().take() {
            token.cancel();
        }
    }
}

impl<A> std::fmt::Debug for Debouncer<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.pending.lock().is_some())
            .finish()
    }
}

/// Latest answer published by [`DebouncedSearch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub query: String,
    pub candidates: Vec<GeocodeCandidate>,
}

/// Search-as-you-type: feed it every keystroke, read results from the channel.
#[derive(Debug)]
pub struct DebouncedSearch {
    debouncer: Debouncer<String>,
    results: watch::Receiver<SearchResults>,
}

impl DebouncedSearch {
    pub fn new(resolver: LocationResolver, delay: Duration) -> Self {
        let (tx, rx) = watch::channel(SearchResults::default());
        let tx = Arc::new(tx);

        let debouncer = Debouncer::new(delay, move |query: String| {
            let resolver = resolver.clone();
            let tx = Arc::clone(&tx);
            async move {
                let candidates = resolver.search(&query).await;
                tracing::debug!(%query, found = candidates.len(), "search results");
                tx.send_replace(SearchResults { query, candidates });
            }
        });

        Self { debouncer, results: rx }
    }

    pub fn input(&self, text: impl Into<String>) {
        self.debouncer.call(text.into());
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchResults> {
        self.results.clone()
    }

    pub fn latest(&self) -> SearchResults {
        self.results.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::tests::{RecordingGeocoder, feature};
    use tokio::time::sleep;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, Debouncer<u32>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let debouncer = Debouncer::new(Duration::from_millis(700), move |n: u32| {
            let sink = Arc::clone(&sink);
            async move { sink.lock().push(n) }
        });
        (seen, debouncer)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_last_call() {
        let (seen, debouncer) = recorder();

        debouncer.call(1);
        sleep(Duration::from_millis(200)).await;
        debouncer.call(2);
        sleep(Duration::from_millis(200)).await;
        debouncer.call(3);

        sleep(Duration::from_millis(699)).await;
        assert!(seen.lock().is_empty());

        sleep(Duration::from_secs(2)).await;
        assert_eq!(*seen.lock(), vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn calls_further_apart_than_the_window_all_run() {
        let (seen, debouncer) = recorder();

        debouncer.call(1);
        sleep(Duration::from_millis(800)).await;
        debouncer.call(2);
        sleep(Duration::from_millis(800)).await;

        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_discard_pending_call() {
        let (seen, debouncer) = recorder();

        debouncer.call(1);
        debouncer.cancel();
        sleep(Duration::from_secs(1)).await;
        assert!(seen.lock().is_empty());

        debouncer.call(2);
        drop(debouncer);
        sleep(Duration::from_secs(1)).await;
        assert!(seen.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn search_burst_issues_one_lookup_with_last_text() {
        let geocoder = Arc::new(RecordingGeocoder {
            features: vec![feature("London", 51.5, -0.12)],
            ..Default::default()
        });
        let search = DebouncedSearch::new(LocationResolver::new(geocoder.clone()), SEARCH_DEBOUNCE);
        let mut results = search.subscribe();

        search.input("Lond");
        sleep(Duration::from_millis(200)).await;
        search.input("Londo");
        sleep(Duration::from_millis(200)).await;
        search.input("London");

        results.changed().await.unwrap();
        assert_eq!(*geocoder.queries.lock(), vec!["London".to_string()]);

        let latest = search.latest();
        assert_eq!(latest.query, "London");
        assert_eq!(latest.candidates[0].label, "London, State, Country");

        sleep(Duration::from_secs(5)).await;
        assert_eq!(geocoder.queries.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn short_search_publishes_empty_without_lookup() {
        let geocoder = Arc::new(RecordingGeocoder {
            features: vec![feature("Nice", 43.7, 7.26)],
            ..Default::default()
        });
        let search = DebouncedSearch::new(LocationResolver::new(geocoder.clone()), SEARCH_DEBOUNCE);
        let mut results = search.subscribe();

        search.input("NY");
        results.changed().await.unwrap();

        assert!(search.latest().candidates.is_empty());
        assert!(geocoder.queries.lock().is_empty());
    }
}
