/// Worker count used when `available_parallelism` cannot be determined.
pub const DEFAULT_CONCURRENCY_FALLBACK: usize = 4;
/// Default log filter for the demo binary when `BUILDCHAIN_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Number of workers to use when the configuration does not say.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(DEFAULT_CONCURRENCY_FALLBACK)
}
