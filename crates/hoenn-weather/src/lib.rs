//! Weather engine for the Hoenn map
//!
//! Decides one weather condition per location per calendar day. Conditions
//! come from real-world observations at each location's proxy coordinates,
//! constrained to what the location allows, and are cached for the rest of
//! the day.

pub mod cache;
pub mod catalog;
pub mod day;
pub mod engine;
pub mod mapper;
pub mod provider;
pub mod random;
pub mod reroll;
pub mod retry;
pub mod session;
pub mod state;
pub mod types;

pub use cache::{DailyConditionCache, KeyValueStore, MemoryStore, SqliteStore};
pub use catalog::{Catalog, Location, LocationCategory};
pub use day::DayKey;
pub use engine::{FallbackReason, Resolution, ResolutionReport, ResolutionSource, WeatherEngine};
pub use mapper::map_observation;
pub use provider::{ObservationFetcher, OpenWeatherProvider};
pub use random::{RandomSource, SeededRandom, SequenceRandom, ThreadRandom};
pub use retry::RetryConfig;
pub use session::{SessionError, SessionPolicy, WeatherSession};
pub use state::{LiveWeatherState, UpdateCause, WeatherUpdate};
pub use types::*;
