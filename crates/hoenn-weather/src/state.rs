//! Live map weather shared with rendering collaborators.
//!
//! Readers take snapshots; anything that redraws on change subscribes to
//! the broadcast channel. Lagging subscribers lose the oldest updates and
//! should re-read a snapshot.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::broadcast;

use crate::engine::ResolutionReport;
use crate::types::Condition;

const UPDATE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateCause {
    Resolved,
    Rerolled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherUpdate {
    pub location: String,
    pub condition: Condition,
    pub cause: UpdateCause,
}

#[derive(Debug)]
pub struct LiveWeatherState {
    conditions: RwLock<HashMap<String, Condition>>,
    updates: broadcast::Sender<WeatherUpdate>,
}

impl Default for LiveWeatherState {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveWeatherState {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            conditions: RwLock::new(HashMap::new()),
            updates,
        }
    }

    pub fn get(&self, location: &str) -> Option<Condition> {
        self.conditions.read().get(location).copied()
    }

    pub fn snapshot(&self) -> HashMap<String, Condition> {
        self.conditions.read().clone()
    }

    pub fn len(&self) -> usize {
        self.conditions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.read().is_empty()
    }

    pub fn set(&self, location: &str, condition: Condition, cause: UpdateCause) {
        self.conditions
            .write()
            .insert(location.to_string(), condition);
        self.notify(WeatherUpdate {
            location: location.to_string(),
            condition,
            cause,
        });
    }

    /// Apply a full resolution pass, one update per location
    pub fn apply_report(&self, report: &ResolutionReport) {
        {
            let mut conditions = self.conditions.write();
            for resolution in &report.resolutions {
                conditions.insert(resolution.location.clone(), resolution.condition);
            }
        }

        for resolution in &report.resolutions {
            self.notify(WeatherUpdate {
                location: resolution.location.clone(),
                condition: resolution.condition,
                cause: UpdateCause::Resolved,
            });
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WeatherUpdate> {
        self.updates.subscribe()
    }

    fn notify(&self, update: WeatherUpdate) {
        // Err only means nobody is listening
        let _ = self.updates.send(update);
    }
}
