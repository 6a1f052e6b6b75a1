use std::sync::Arc;
use std::time::Duration;

use inquire::{CustomUserError, autocompletion::Replacement};
use tokio::runtime::Handle;
use weatherdash_core::debounce::SearchResults;
use weatherdash_core::geocode::MIN_QUERY_CHARS;
use weatherdash_core::{DebouncedSearch, GeocodeCandidate};

/// Time allowed for the lookup itself once the quiet period has passed.
const LOOKUP_GRACE: Duration = Duration::from_secs(3);

/// Prompt autocompletion fed by the debounced location search.
///
/// Each new input goes to the search, then the prompt waits for the results
/// published for that exact text, so suggestions appear once typing pauses.
/// Input too short to be searched returns at once.
#[derive(Clone)]
pub struct LiveSearch {
    search: Arc<DebouncedSearch>,
    runtime: Handle,
    wait_limit: Duration,
    last_input: String,
}

impl LiveSearch {
    /// Must be created inside the tokio runtime; suggestions are then
    /// requested from a thread allowed to block on it.
    pub fn new(search: Arc<DebouncedSearch>, delay: Duration) -> Self {
        Self {
            search,
            runtime: Handle::current(),
            wait_limit: delay + LOOKUP_GRACE,
            last_input: String::new(),
        }
    }

    /// Candidate whose label is exactly `label`, among the latest results.
    pub fn candidate(&self, label: &str) -> Option<GeocodeCandidate> {
        self.search.latest().candidates.into_iter().find(|c| c.label == label)
    }

    /// Results published for `input`, or the latest ones if none arrive in time.
    fn settled(&self, input: &str) -> SearchResults {
        let mut results = self.search.subscribe();
        let wait = async {
            loop {
                if results.borrow_and_update().query == input {
                    return;
                }
                if results.changed().await.is_err() {
                    return;
                }
            }
        };

        let limit = self.wait_limit;
        if self.runtime.block_on(async { tokio::time::timeout(limit, wait).await }).is_err() {
            tracing::debug!(query = input, "no suggestions in time");
        }
        self.search.latest()
    }
}

impl inquire::Autocomplete for LiveSearch {
    fn get_suggestions(&mut self, input: &str) -> Result<Vec<String>, CustomUserError> {
        if input != self.last_input {
            self.last_input = input.to_string();
            let _runtime = self.runtime.enter();
            self.search.input(input);
        }

        if input.chars().count() < MIN_QUERY_CHARS {
            return Ok(Vec::new());
        }

        Ok(self.settled(input).candidates.into_iter().map(|c| c.label).collect())
    }

    fn get_completion(
        &mut self,
        _input: &str,
        highlighted_suggestion: Option<String>,
    ) -> Result<Replacement, CustomUserError> {
        Ok(highlighted_suggestion)
    }
}
