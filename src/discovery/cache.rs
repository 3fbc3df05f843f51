//! Thread-safe TTL cache for resolved provider configurations.

// self
use crate::{_prelude::*, carrier::MccMnc, discovery::config::OpenIdConfiguration};

/// Concurrent carrier-keyed configuration cache.
///
/// The cache is the only object shared across in-flight attempts; reads and
/// writes from concurrent discoveries must never corrupt entries, so the map
/// sits behind a [`RwLock`]. Expired entries are retained deliberately: the
/// discovery engine reuses them as a fallback when the network is unreachable.
#[derive(Debug, Default)]
pub struct ConfigurationCache(RwLock<HashMap<MccMnc, OpenIdConfiguration>>);
impl ConfigurationCache {
	/// Returns the cached configuration if present and not expired at `now`.
	pub fn fresh(&self, key: &MccMnc, now: OffsetDateTime) -> Option<OpenIdConfiguration> {
		self.0.read().get(key).filter(|config| !config.is_expired_at(now)).cloned()
	}

	/// Returns the cached configuration regardless of expiry.
	pub fn stale(&self, key: &MccMnc) -> Option<OpenIdConfiguration> {
		self.0.read().get(key).cloned()
	}

	/// Inserts or replaces the configuration for a carrier.
	pub fn put(&self, key: MccMnc, config: OpenIdConfiguration) {
		self.0.write().insert(key, config);
	}

	/// Removes the configuration for a carrier, returning it when present.
	pub fn remove(&self, key: &MccMnc) -> Option<OpenIdConfiguration> {
		self.0.write().remove(key)
	}

	/// Returns true when an entry (fresh or expired) exists for the carrier.
	pub fn contains(&self, key: &MccMnc) -> bool {
		self.0.read().contains_key(key)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::discovery::config::Branding;

	fn key() -> MccMnc {
		MccMnc::new("310260").expect("Cache test identifier should be valid.")
	}

	fn config(received_at: OffsetDateTime) -> OpenIdConfiguration {
		OpenIdConfiguration {
			issuer: Url::parse("https://idp.carrier.example").expect("Issuer should parse."),
			authorization_endpoint: Url::parse("https://idp.carrier.example/authorize")
				.expect("Endpoint should parse."),
			mcc_mnc: Some(key()),
			branding: Branding { carrier_text: "Carrier".into(), carrier_logo: None },
			allowed_agent_signatures: Vec::new(),
			received_at,
		}
	}

	#[test]
	fn fresh_returns_entries_within_ttl_only() {
		let cache = ConfigurationCache::default();
		let now = OffsetDateTime::now_utc();

		cache.put(key(), config(now));

		assert!(cache.fresh(&key(), now).is_some());
		assert!(cache.fresh(&key(), now + Duration::minutes(16)).is_none());
		assert!(cache.stale(&key()).is_some(), "Expired entries must remain for fallback.");
	}

	#[test]
	fn remove_and_contains_track_entries() {
		let cache = ConfigurationCache::default();
		let now = OffsetDateTime::now_utc();

		assert!(!cache.contains(&key()));

		cache.put(key(), config(now));

		assert!(cache.contains(&key()));
		assert!(cache.remove(&key()).is_some());
		assert!(!cache.contains(&key()));
	}

	#[test]
	fn concurrent_puts_do_not_corrupt_entries() {
		let cache = Arc::new(ConfigurationCache::default());
		let now = OffsetDateTime::now_utc();
		let handles: Vec<_> = (0..8)
			.map(|_| {
				let cache = cache.clone();

				std::thread::spawn(move || {
					for _ in 0..100 {
						cache.put(key(), config(now));
						let _ = cache.fresh(&key(), now);
					}
				})
			})
			.collect();

		for handle in handles {
			handle.join().expect("Cache writer thread should not panic.");
		}

		assert!(cache.fresh(&key(), now).is_some());
	}
}
