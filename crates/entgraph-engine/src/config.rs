//! Configuration for Entgraph databases.

use std::time::Duration;

/// Runtime configuration.
///
/// Built with the `with_*` methods starting from [`Config::default`]:
///
/// ```
/// use entgraph_engine::Config;
///
/// let config = Config::default()
///     .with_deletion_batch_size(64)
///     .with_max_traversal_depth(32);
/// assert_eq!(config.deletion_batch_size, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of documents a scheduled hard-deletion pass removes
    /// or rewrites in one transaction before re-enqueueing itself.
    pub deletion_batch_size: usize,
    /// Page size used by `paginate` when the request names none.
    pub default_page_size: usize,
    /// Depth limit for deletion cascades. `None` means unbounded.
    pub max_traversal_depth: Option<usize>,
    /// How many times a background scheduler retries a failed pass.
    pub task_max_retries: u32,
    /// Base delay between retries; doubled on every attempt.
    pub task_retry_backoff: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deletion_batch_size: 256,
            default_page_size: 100,
            max_traversal_depth: None,
            task_max_retries: 3,
            task_retry_backoff: Duration::from_millis(50),
        }
    }
}

impl Config {
    /// Sets the scheduled-deletion batch size. Zero is treated as one.
    #[must_use]
    pub fn with_deletion_batch_size(mut self, size: usize) -> Self {
        self.deletion_batch_size = size.max(1);
        self
    }

    /// Sets the default page size.
    #[must_use]
    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    /// Limits how deep deletion cascades may go.
    #[must_use]
    pub fn with_max_traversal_depth(mut self, depth: usize) -> Self {
        self.max_traversal_depth = Some(depth);
        self
    }

    /// Sets the retry limit for background passes.
    #[must_use]
    pub fn with_task_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.task_max_retries = retries;
        self.task_retry_backoff = backoff;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.deletion_batch_size, 256);
        assert_eq!(config.default_page_size, 100);
        assert!(config.max_traversal_depth.is_none());
    }

    #[test]
    fn test_builder() {
        let config = Config::default()
            .with_deletion_batch_size(0)
            .with_default_page_size(10)
            .with_task_retries(5, Duration::from_millis(1));
        assert_eq!(config.deletion_batch_size, 1);
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.task_max_retries, 5);
    }
}
