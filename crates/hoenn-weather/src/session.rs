//! Binds a catalog, an engine and the live state into one map session.

use hoenn_core::DayBoundary;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::catalog::Catalog;
use crate::day::DayKey;
use crate::engine::{ResolutionReport, ResolutionSource, WeatherEngine};
use crate::state::{LiveWeatherState, UpdateCause, WeatherUpdate};
use crate::types::Condition;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Unknown location: {0}")]
    UnknownLocation(String),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionPolicy {
    pub day_boundary: DayBoundary,
    /// Write re-rolls to today's cache entry so they survive a restart
    pub persist_rerolls: bool,
}

/// Re-rolls made during this session. Only the latest day is kept.
#[derive(Debug, Default)]
struct RerollOverrides {
    day: Option<DayKey>,
    conditions: HashMap<String, Condition>,
}

impl RerollOverrides {
    fn record(&mut self, day: DayKey, location: &str, condition: Condition) {
        if self.day != Some(day) {
            self.day = Some(day);
            self.conditions.clear();
        }
        self.conditions.insert(location.to_string(), condition);
    }

    fn get(&self, day: &DayKey, location: &str) -> Option<Condition> {
        if self.day != Some(*day) {
            return None;
        }
        self.conditions.get(location).copied()
    }
}

pub struct WeatherSession {
    catalog: Arc<Catalog>,
    engine: Arc<WeatherEngine>,
    state: LiveWeatherState,
    policy: SessionPolicy,
    rerolls: Mutex<RerollOverrides>,
}

impl WeatherSession {
    pub fn new(catalog: Arc<Catalog>, engine: Arc<WeatherEngine>, policy: SessionPolicy) -> Self {
        Self {
            catalog,
            engine,
            state: LiveWeatherState::new(),
            policy,
            rerolls: Mutex::new(RerollOverrides::default()),
        }
    }

    pub fn today(&self) -> DayKey {
        DayKey::today(self.policy.day_boundary)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn engine(&self) -> &WeatherEngine {
        &self.engine
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Resolve every location for today and publish the results
    pub async fn refresh(&self) -> ResolutionReport {
        self.refresh_for(&self.today()).await
    }

    /// Resolve every location for `day`. Re-rolls made this session for the
    /// same day take precedence over the engine's result.
    pub async fn refresh_for(&self, day: &DayKey) -> ResolutionReport {
        let mut report = self.engine.resolve_catalog(&self.catalog, day).await;
        {
            let rerolls = self.rerolls.lock();
            for resolution in &mut report.resolutions {
                if let Some(condition) = rerolls.get(day, &resolution.location) {
                    resolution.condition = condition;
                    resolution.source = ResolutionSource::Rerolled;
                }
            }
        }
        self.state.apply_report(&report);
        tracing::info!(
            "Map weather refreshed for {}: {} locations",
            day,
            report.resolutions.len()
        );
        report
    }

    /// Re-roll one location. The result holds for the rest of the day in this
    /// session; today's cache entry only changes when the policy persists
    /// re-rolls.
    pub fn reroll(&self, name: &str) -> Result<Condition, SessionError> {
        let location = self
            .catalog
            .get(name)
            .ok_or_else(|| SessionError::UnknownLocation(name.to_string()))?;

        let today = self.today();
        let condition = self.engine.reroll(location);
        self.rerolls.lock().record(today, name, condition);
        self.state.set(name, condition, UpdateCause::Rerolled);

        if self.policy.persist_rerolls {
            self.engine.persist(&today, location, condition);
        }

        tracing::info!("Re-rolled {}: {}", name, condition);
        Ok(condition)
    }

    /// Current live condition; `None` until the location has been resolved
    pub fn condition(&self, name: &str) -> Option<Condition> {
        self.state.get(name)
    }

    pub fn snapshot(&self) -> HashMap<String, Condition> {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WeatherUpdate> {
        self.state.subscribe()
    }

    pub fn state(&self) -> &LiveWeatherState {
        &self.state
    }
}

impl std::fmt::Debug for WeatherSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherSession")
            .field("locations", &self.catalog.len())
            .field("engine", &self.engine)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
