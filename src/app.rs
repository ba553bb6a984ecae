use anyhow::{Context, Result};
use hoenn_core::{AppError, CacheBackend, Config};
use hoenn_weather::{
    Catalog, Condition, DailyConditionCache, KeyValueStore, MemoryStore, OpenWeatherProvider,
    ResolutionReport, RetryConfig, SessionPolicy, SqliteStore, ThreadRandom, WeatherEngine,
    WeatherSession,
};
use std::sync::Arc;

/// Application state and lifecycle
pub struct App {
    config: Arc<Config>,
    session: WeatherSession,
}

impl App {
    /// Build the catalog, cache, engine and session described by `config`
    pub fn new(config: Config) -> Result<Self> {
        config
            .ensure_valid()
            .map_err(AppError::from)
            .context("Configuration validation failed")?;

        let catalog = Catalog::load_or_builtin(config.catalog.path.as_deref())
            .map_err(AppError::from)
            .context("Failed to load location catalog")?;
        tracing::info!("Loaded {} map locations", catalog.len());

        let store: Arc<dyn KeyValueStore> = match config.cache.backend {
            CacheBackend::Sqlite => {
                let path = config.cache_file();
                let store = SqliteStore::open(&path)
                    .map_err(AppError::from)
                    .with_context(|| format!("Failed to open weather cache {}", path.display()))?;
                Arc::new(store)
            }
            CacheBackend::Memory => Arc::new(MemoryStore::new()),
        };
        let cache = DailyConditionCache::new(store);

        let engine = if config.weather.uses_observations() {
            let provider = OpenWeatherProvider::from_config(
                &config.weather,
                RetryConfig::from(config.retry.clone()),
            )?;
            tracing::info!("Using observations from {}", config.weather.base_url);
            WeatherEngine::new(cache, Arc::new(provider), Box::new(ThreadRandom))
        } else {
            if !config.weather.offline {
                tracing::warn!("No weather API key configured, running offline");
            }
            WeatherEngine::offline(cache, Box::new(ThreadRandom))
        };

        let policy = SessionPolicy {
            day_boundary: config.weather.day_boundary,
            persist_rerolls: config.weather.persist_rerolls,
        };
        let session = WeatherSession::new(Arc::new(catalog), Arc::new(engine), policy);

        Ok(Self {
            config: Arc::new(config),
            session,
        })
    }

    /// Resolve today's weather for the whole map
    pub async fn initialize(&self) -> ResolutionReport {
        tracing::info!("Resolving map weather for {}", self.session.today());
        let report = self.session.refresh().await;
        tracing::info!(
            "Application initialized ({} fallbacks)",
            report.fallback_count()
        );
        report
    }

    pub fn reroll(&self, name: &str) -> Result<Condition> {
        Ok(self.session.reroll(name)?)
    }

    pub fn shutdown(&self) {
        tracing::info!("Shutting down with {} live locations", self.session.snapshot().len());
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &WeatherSession {
        &self.session
    }
}
