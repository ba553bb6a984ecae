//! Weather resolution engine.
//!
//! For a location and day: return the cached condition if there is one;
//! otherwise fetch an observation for the location's proxy coordinates, map
//! it, keep it only if the location allows it, and fall back to the
//! location's default on any failure. The result is written back to the
//! cache. Resolution never fails.
//!
//! The cache read, fetch and cache write for one key run under a per-key
//! async lock, so concurrent callers trigger at most one fetch per location
//! per day.

use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::DailyConditionCache;
use crate::catalog::{Catalog, Location};
use crate::day::DayKey;
use crate::mapper::map_observation;
use crate::provider::ObservationFetcher;
use crate::random::RandomSource;
use crate::reroll::reroll;
use crate::types::Condition;

/// Why a location ended up on its default condition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum FallbackReason {
    FetchFailed { error: String },
    OutsideAllowedSet { candidate: Condition },
}

/// Where a resolved condition came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionSource {
    /// Today's cache entry
    Cached,
    /// Mapped from a real-world observation
    Observed,
    /// Drawn from the allowed set (no observation provider)
    Drawn,
    /// Re-rolled earlier in the session; overrides the day's resolution
    Rerolled,
    Fallback(FallbackReason),
}

impl ResolutionSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::Observed => "observed",
            Self::Drawn => "drawn",
            Self::Rerolled => "re-rolled",
            Self::Fallback(FallbackReason::FetchFailed { .. }) => "fallback (fetch failed)",
            Self::Fallback(FallbackReason::OutsideAllowedSet { .. }) => {
                "fallback (not allowed here)"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub location: String,
    pub day: DayKey,
    pub condition: Condition,
    pub source: ResolutionSource,
}

/// Outcome of resolving a whole catalog, in catalog order
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    pub day: DayKey,
    pub resolutions: Vec<Resolution>,
}

impl ResolutionReport {
    pub fn fallback_count(&self) -> usize {
        self.resolutions
            .iter()
            .filter(|r| r.source.is_fallback())
            .count()
    }

    pub fn get(&self, location: &str) -> Option<&Resolution> {
        self.resolutions.iter().find(|r| r.location == location)
    }

    pub fn conditions(&self) -> HashMap<String, Condition> {
        self.resolutions
            .iter()
            .map(|r| (r.location.clone(), r.condition))
            .collect()
    }
}

/// Async mutexes keyed by cache key. Entries nobody holds are pruned on
/// each acquire.
#[derive(Default)]
struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    fn lock_for(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        locks.retain(|k, lock| k == key || Arc::strong_count(lock) > 1);
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

pub struct WeatherEngine {
    cache: DailyConditionCache,
    fetcher: Option<Arc<dyn ObservationFetcher>>,
    rng: Mutex<Box<dyn RandomSource>>,
    locks: KeyedLocks,
}

impl WeatherEngine {
    /// Engine that resolves from real-world observations
    pub fn new(
        cache: DailyConditionCache,
        fetcher: Arc<dyn ObservationFetcher>,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        Self {
            cache,
            fetcher: Some(fetcher),
            rng: Mutex::new(rng),
            locks: KeyedLocks::default(),
        }
    }

    /// Engine without an observation provider: uncached locations draw
    /// uniformly from their allowed set.
    pub fn offline(cache: DailyConditionCache, rng: Box<dyn RandomSource>) -> Self {
        Self {
            cache,
            fetcher: None,
            rng: Mutex::new(rng),
            locks: KeyedLocks::default(),
        }
    }

    pub fn is_offline(&self) -> bool {
        self.fetcher.is_none()
    }

    pub fn cache(&self) -> &DailyConditionCache {
        &self.cache
    }

    pub async fn resolve(&self, location: &Location, day: &DayKey) -> Condition {
        self.resolve_detailed(location, day).await.condition
    }

    pub async fn resolve_detailed(&self, location: &Location, day: &DayKey) -> Resolution {
        let key = DailyConditionCache::key(day, &location.name);
        let lock = self.locks.lock_for(&key);
        let _guard = lock.lock().await;

        if let Some(condition) = self.cache.get(day, &location.name) {
            tracing::debug!("Cache hit for {} on {}: {}", location.name, day, condition);
            return Resolution {
                location: location.name.clone(),
                day: *day,
                condition,
                source: ResolutionSource::Cached,
            };
        }

        let (condition, source) = self.determine(location).await;
        self.cache.set(day, &location.name, condition);

        tracing::info!(
            "Resolved {} for {}: {} ({})",
            location.name,
            day,
            condition,
            source.label()
        );

        Resolution {
            location: location.name.clone(),
            day: *day,
            condition,
            source,
        }
    }

    async fn determine(&self, location: &Location) -> (Condition, ResolutionSource) {
        let Some(fetcher) = &self.fetcher else {
            let condition = reroll(location, self.rng.lock().as_mut());
            return (condition, ResolutionSource::Drawn);
        };

        let observation = match fetcher.fetch(location.proxy).await {
            Ok(observation) => observation,
            Err(e) => {
                tracing::warn!(
                    "Observation fetch failed for {}, using default {}: {}",
                    location.name,
                    location.default_condition,
                    e
                );
                return (
                    location.default_condition,
                    ResolutionSource::Fallback(FallbackReason::FetchFailed {
                        error: e.to_string(),
                    }),
                );
            }
        };

        let candidate = map_observation(&observation, self.rng.lock().as_mut());
        if location.allows(candidate) {
            (candidate, ResolutionSource::Observed)
        } else {
            tracing::debug!(
                "{} does not allow {}, using default {}",
                location.name,
                candidate,
                location.default_condition
            );
            (
                location.default_condition,
                ResolutionSource::Fallback(FallbackReason::OutsideAllowedSet { candidate }),
            )
        }
    }

    /// Resolve every location concurrently. One location's failure never
    /// affects another's.
    pub async fn resolve_catalog(&self, catalog: &Catalog, day: &DayKey) -> ResolutionReport {
        let resolutions =
            join_all(catalog.iter().map(|location| self.resolve_detailed(location, day))).await;

        let report = ResolutionReport {
            day: *day,
            resolutions,
        };

        if report.fallback_count() > 0 {
            tracing::warn!(
                "{} of {} locations fell back to their default on {}",
                report.fallback_count(),
                catalog.len(),
                day
            );
        }

        report
    }

    /// Resolve by name. Unknown names resolve to clear.
    pub async fn resolve_by_name(&self, catalog: &Catalog, name: &str, day: &DayKey) -> Condition {
        match catalog.get(name) {
            Some(location) => self.resolve(location, day).await,
            None => {
                tracing::warn!("Unknown location {}, showing clear weather", name);
                Condition::Clear
            }
        }
    }

    /// Uniform draw from the location's allowed set. Does not touch the cache.
    pub fn reroll(&self, location: &Location) -> Condition {
        reroll(location, self.rng.lock().as_mut())
    }

    /// Overwrite a day's cache entry, e.g. to keep a re-roll across restarts
    pub fn persist(&self, day: &DayKey, location: &Location, condition: Condition) {
        self.cache.set(day, &location.name, condition);
    }
}

impl std::fmt::Debug for WeatherEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherEngine")
            .field("offline", &self.is_offline())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::catalog::LocationCategory;
    use crate::random::{SeededRandom, SequenceRandom};
    use crate::types::{Coordinates, FetchError, Observation};
    use async_trait::async_trait;
    use hoenn_core::NetworkError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fetcher returning a fixed observation (or failure), counting calls
    struct StubFetcher {
        observation: Option<Observation>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl StubFetcher {
        fn returning(class: &str, humidity: f64, wind_speed: f64, temperature_c: f64) -> Arc<Self> {
            Arc::new(Self {
                observation: Some(Observation {
                    condition_class: class.to_string(),
                    humidity,
                    wind_speed,
                    temperature_c,
                }),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                observation: None,
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            })
        }

        fn slow(class: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                observation: Some(Observation {
                    condition_class: class.to_string(),
                    humidity: 50.0,
                    wind_speed: 1.0,
                    temperature_c: 15.0,
                }),
                calls: AtomicUsize::new(0),
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ObservationFetcher for StubFetcher {
        async fn fetch(&self, _coords: Coordinates) -> Result<Observation, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.observation
                .clone()
                .ok_or(FetchError::Network(NetworkError::Timeout))
        }
    }

    /// Fails for one named proxy latitude, succeeds otherwise
    struct SelectiveFetcher {
        failing_lat: f64,
    }

    #[async_trait]
    impl ObservationFetcher for SelectiveFetcher {
        async fn fetch(&self, coords: Coordinates) -> Result<Observation, FetchError> {
            if coords.lat == self.failing_lat {
                return Err(FetchError::Parse("garbled".into()));
            }
            Ok(Observation {
                condition_class: "Fog".into(),
                humidity: 50.0,
                wind_speed: 1.0,
                temperature_c: 12.0,
            })
        }
    }

    fn location(name: &str, default: Condition, possible: Vec<Condition>) -> Location {
        Location {
            name: name.to_string(),
            category: LocationCategory::Landmark,
            default_condition: default,
            possible_conditions: possible,
            proxy: Coordinates { lat: 32.0, lon: 131.3 },
            map_position: None,
        }
    }

    fn mt_pyre() -> Location {
        location(
            "mt-pyre",
            Condition::Fog,
            vec![Condition::Fog, Condition::Rain, Condition::Clear],
        )
    }

    fn day(d: u32) -> DayKey {
        DayKey::from_ymd(2026, 10, d).unwrap()
    }

    fn engine(fetcher: Arc<dyn ObservationFetcher>) -> WeatherEngine {
        WeatherEngine::new(
            DailyConditionCache::in_memory(),
            fetcher,
            Box::new(SequenceRandom::new(vec![0.5])),
        )
    }

    #[tokio::test]
    async fn test_observed_condition_in_allowed_set() {
        let fetcher = StubFetcher::returning("Rain", 60.0, 2.0, 18.0);
        let engine = engine(fetcher.clone());

        let resolution = engine.resolve_detailed(&mt_pyre(), &day(17)).await;
        assert_eq!(resolution.condition, Condition::Rain);
        assert_eq!(resolution.source, ResolutionSource::Observed);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_resolve_twice_is_stable_and_fetches_once() {
        let fetcher = StubFetcher::returning("Rain", 60.0, 2.0, 18.0);
        let engine = engine(fetcher.clone());
        let pyre = mt_pyre();

        let first = engine.resolve(&pyre, &day(17)).await;
        let second = engine.resolve_detailed(&pyre, &day(17)).await;

        assert_eq!(first, second.condition);
        assert_eq!(second.source, ResolutionSource::Cached);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_uses_default() {
        let engine = engine(StubFetcher::failing());
        let resolution = engine.resolve_detailed(&mt_pyre(), &day(17)).await;

        assert_eq!(resolution.condition, Condition::Fog);
        assert!(matches!(
            resolution.source,
            ResolutionSource::Fallback(FallbackReason::FetchFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_fallback_is_cached_for_the_day() {
        let fetcher = StubFetcher::failing();
        let engine = engine(fetcher.clone());

        engine.resolve(&mt_pyre(), &day(17)).await;
        let again = engine.resolve_detailed(&mt_pyre(), &day(17)).await;

        assert_eq!(again.condition, Condition::Fog);
        assert_eq!(again.source, ResolutionSource::Cached);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_candidate_outside_allowed_set_uses_default() {
        let fetcher = StubFetcher::returning("Rain", 85.0, 6.0, 20.0);
        let engine = engine(fetcher);
        let meteor_falls = location("meteor-falls", Condition::Clear, vec![Condition::Clear, Condition::Fog]);

        let resolution = engine.resolve_detailed(&meteor_falls, &day(17)).await;
        assert_eq!(resolution.condition, Condition::Clear);
        assert_eq!(
            resolution.source,
            ResolutionSource::Fallback(FallbackReason::OutsideAllowedSet {
                candidate: Condition::HeavyRain
            })
        );
    }

    #[tokio::test]
    async fn test_new_day_resolves_afresh() {
        let fetcher = StubFetcher::returning("Rain", 60.0, 2.0, 18.0);
        let engine = engine(fetcher.clone());
        let pyre = mt_pyre();

        engine.resolve(&pyre, &day(17)).await;
        let next = engine.resolve_detailed(&pyre, &day(17).next().unwrap()).await;

        assert_eq!(next.source, ResolutionSource::Observed);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_existing_cache_entry_skips_fetch() {
        let fetcher = StubFetcher::returning("Rain", 60.0, 2.0, 18.0);
        let cache = DailyConditionCache::in_memory();
        cache.set(&day(17), "mt-pyre", Condition::Clear);
        let engine = WeatherEngine::new(cache, fetcher.clone(), Box::new(SequenceRandom::new(vec![0.5])));

        assert_eq!(engine.resolve(&mt_pyre(), &day(17)).await, Condition::Clear);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_result_is_written_through() {
        let engine = engine(StubFetcher::returning("Fog", 50.0, 1.0, 12.0));
        engine.resolve(&mt_pyre(), &day(17)).await;
        assert_eq!(engine.cache().get(&day(17), "mt-pyre"), Some(Condition::Fog));
    }

    #[tokio::test]
    async fn test_catalog_isolates_failures() {
        let catalog = Catalog::new(vec![
            Location {
                proxy: Coordinates { lat: 10.0, lon: 10.0 },
                ..mt_pyre()
            },
            Location {
                proxy: Coordinates { lat: 20.0, lon: 20.0 },
                ..location("shoal-cave", Condition::Clear, vec![Condition::Clear, Condition::Fog])
            },
        ])
        .unwrap();
        let engine = engine(Arc::new(SelectiveFetcher { failing_lat: 10.0 }));

        let report = engine.resolve_catalog(&catalog, &day(17)).await;

        assert_eq!(report.resolutions.len(), 2);
        assert_eq!(report.resolutions[0].location, "mt-pyre");
        assert!(report.resolutions[0].source.is_fallback());
        assert_eq!(report.get("shoal-cave").unwrap().condition, Condition::Fog);
        assert_eq!(report.get("shoal-cave").unwrap().source, ResolutionSource::Observed);
        assert_eq!(report.fallback_count(), 1);
        assert_eq!(report.conditions().len(), 2);
    }

    #[tokio::test]
    async fn test_builtin_catalog_with_failing_fetcher_is_all_defaults() {
        let catalog = Catalog::builtin().unwrap();
        let engine = engine(StubFetcher::failing());

        let report = engine.resolve_catalog(&catalog, &day(17)).await;
        for location in catalog.iter() {
            assert_eq!(
                report.get(&location.name).unwrap().condition,
                location.default_condition
            );
        }
        assert_eq!(report.fallback_count(), catalog.len());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_fetch_once_per_key() {
        let fetcher = StubFetcher::slow("Fog", Duration::from_millis(50));
        let engine = Arc::new(engine(fetcher.clone()));
        let pyre = mt_pyre();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            let pyre = pyre.clone();
            handles.push(tokio::spawn(async move { engine.resolve(&pyre, &day(17)).await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Condition::Fog);
        }

        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_idle_locks_are_pruned() {
        let engine = engine(StubFetcher::returning("Fog", 50.0, 1.0, 12.0));
        for d in 1..=5 {
            engine.resolve(&mt_pyre(), &day(d)).await;
        }
        assert_eq!(engine.locks.len(), 1);
    }

    #[tokio::test]
    async fn test_offline_engine_draws_from_allowed_set() {
        let engine = WeatherEngine::offline(
            DailyConditionCache::in_memory(),
            Box::new(SequenceRandom::new(vec![0.7])),
        );

        let resolution = engine.resolve_detailed(&mt_pyre(), &day(17)).await;
        assert_eq!(resolution.condition, Condition::Clear);
        assert_eq!(resolution.source, ResolutionSource::Drawn);

        let again = engine.resolve_detailed(&mt_pyre(), &day(17)).await;
        assert_eq!(again.condition, Condition::Clear);
        assert_eq!(again.source, ResolutionSource::Cached);
    }

    #[tokio::test]
    async fn test_resolve_by_unknown_name_is_clear() {
        let catalog = Catalog::new(vec![mt_pyre()]).unwrap();
        let engine = engine(StubFetcher::failing());

        assert_eq!(
            engine.resolve_by_name(&catalog, "mirage-island", &day(17)).await,
            Condition::Clear
        );
        assert_eq!(
            engine.resolve_by_name(&catalog, "mt-pyre", &day(17)).await,
            Condition::Fog
        );
    }

    #[tokio::test]
    async fn test_reroll_ignores_cache() {
        let engine = WeatherEngine::new(
            DailyConditionCache::in_memory(),
            StubFetcher::failing(),
            Box::new(SeededRandom::new(7)),
        );
        let pyre = mt_pyre();
        engine.resolve(&pyre, &day(17)).await;

        for _ in 0..50 {
            assert!(pyre.allows(engine.reroll(&pyre)));
        }
        assert_eq!(engine.cache().get(&day(17), "mt-pyre"), Some(Condition::Fog));

        engine.persist(&day(17), &pyre, Condition::Rain);
        assert_eq!(engine.resolve(&pyre, &day(17)).await, Condition::Rain);
    }
}
