// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for discovery attempts.
#[derive(Debug, Default)]
pub struct DiscoveryMetrics {
	attempts: AtomicU64,
	cache_hits: AtomicU64,
	stale_fallbacks: AtomicU64,
	failures: AtomicU64,
}
impl DiscoveryMetrics {
	/// Returns the total number of discovery attempts.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of attempts satisfied from the fresh cache.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Returns the number of transport failures absorbed by a cached entry.
	pub fn stale_fallbacks(&self) -> u64 {
		self.stale_fallbacks.load(Ordering::Relaxed)
	}

	/// Returns the number of attempts that surfaced an error.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_stale_fallback(&self) {
		self.stale_fallbacks.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
