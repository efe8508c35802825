use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug, Clone, Copy)]
struct FailureEntry {
    count: u32,
    last_failure: Instant,
}

/// Per-provider count of consecutive recent failures.
///
/// A success clears the provider's count, and failures stop counting once
/// `cooldown` has passed since the most recent one, so a transient outage
/// cannot disable AI for the lifetime of the process.
#[derive(Debug)]
pub struct FailureCounter {
    threshold: u32,
    cooldown: Duration,
    entries: DashMap<String, FailureEntry>,
}

impl FailureCounter {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            entries: DashMap::new(),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Records a failure and returns the provider's current count.
    pub fn record_failure(&self, provider: &str) -> u32 {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(provider.to_string())
            .or_insert(FailureEntry {
                count: 0,
                last_failure: now,
            });
        if now.duration_since(entry.last_failure) >= self.cooldown {
            entry.count = 0;
        }
        entry.count = entry.count.saturating_add(1);
        entry.last_failure = now;
        entry.count
    }

    pub fn record_success(&self, provider: &str) {
        self.entries.remove(provider);
    }

    pub fn count(&self, provider: &str) -> u32 {
        self.entries
            .get(provider)
            .filter(|e| e.last_failure.elapsed() < self.cooldown)
            .map(|e| e.count)
            .unwrap_or(0)
    }

    /// True while the provider has crossed the threshold within the cooldown.
    /// An open provider is skipped until the cooldown expires.
    pub fn is_open(&self, provider: &str) -> bool {
        self.count(provider) >= self.threshold
    }

    /// True when every listed provider is open. An empty list counts as open.
    pub fn all_open<'a>(&self, providers: impl IntoIterator<Item = &'a str>) -> bool {
        providers.into_iter().all(|p| self.is_open(p))
    }
}
