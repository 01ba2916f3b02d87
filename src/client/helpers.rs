use std::collections::HashSet;
use std::hash::Hash;
use std::time::{Duration, Instant};

use crate::config::{ClientConfig, RetryConfig};

/// Keep only the last entry for every key, ordered by that last occurrence
pub(crate) fn dedupe_last_wins<K, V>(entries: Vec<(K, V)>) -> Vec<(K, V)>
where
    K: Eq + Hash + Clone,
{
    let mut seen = HashSet::with_capacity(entries.len());
    let mut kept: Vec<(K, V)> = entries
        .into_iter()
        .rev()
        .filter(|(key, _)| seen.insert(key.clone()))
        .collect();
    kept.reverse();
    kept
}

/// Distinct keys in first-seen order
pub(crate) fn distinct<K>(keys: &[K]) -> Vec<K>
where
    K: Eq + Hash + Clone,
{
    let mut seen = HashSet::with_capacity(keys.len());
    keys.iter()
        .filter(|key| seen.insert(*key))
        .cloned()
        .collect()
}

/// Retry allowance of one batch call: attempt count and optional deadline
#[derive(Debug)]
pub(crate) struct RetryBudget {
    started: Instant,
    deadline: Option<Duration>,
    retry: RetryConfig,
    attempts: usize,
}

impl RetryBudget {
    pub(crate) fn new(config: &ClientConfig) -> Self {
        Self {
            started: Instant::now(),
            deadline: config.deadline,
            retry: config.retry.clone(),
            attempts: 0,
        }
    }

    /// Delay before the next retry, or `None` once attempts or time run out
    pub(crate) fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.retry.max_retries {
            return None;
        }

        let delay = self.retry.delay(self.attempts);
        if let Some(deadline) = self.deadline {
            if self.started.elapsed() + delay > deadline {
                return None;
            }
        }

        self.attempts += 1;
        Some(delay)
    }

    pub(crate) fn retries(&self) -> usize {
        self.attempts
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_last_wins() {
        let entries = vec![("a", 1), ("b", 2), ("a", 3), ("c", 4)];
        assert_eq!(dedupe_last_wins(entries), vec![("b", 2), ("a", 3), ("c", 4)]);
    }

    #[test]
    fn test_distinct_keeps_first_order() {
        assert_eq!(distinct(&["b", "a", "b", "c", "a"]), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_budget_counts_attempts() {
        let config = ClientConfig::default().with_retry(RetryConfig {
            max_retries: 2,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(15),
        });
        let mut budget = RetryBudget::new(&config);

        assert_eq!(budget.next_delay(), Some(Duration::from_millis(10)));
        assert_eq!(budget.next_delay(), Some(Duration::from_millis(15)));
        assert_eq!(budget.next_delay(), None);
        assert_eq!(budget.retries(), 2);
    }

    #[test]
    fn test_budget_respects_deadline() {
        let config = ClientConfig::default()
            .with_retry(RetryConfig {
                max_retries: 10,
                initial_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(1),
            })
            .with_deadline(Duration::from_millis(500));
        let mut budget = RetryBudget::new(&config);

        assert_eq!(budget.next_delay(), None);
        assert_eq!(budget.retries(), 0);
    }
}
