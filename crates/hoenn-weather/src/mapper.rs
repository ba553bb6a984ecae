//! Translation of real-world observations into the map's weather vocabulary.
//!
//! Rules are checked top to bottom and the first match wins. The only
//! randomness is a single draw in the fair-weather branch, taken from the
//! caller's [`RandomSource`] and only when that branch is reached.

use crate::random::RandomSource;
use crate::types::{Condition, Observation};

const RAIN_CLASSES: [&str; 2] = ["Rain", "Drizzle"];
const DUST_CLASSES: [&str; 2] = ["Dust", "Sand"];
const FOG_CLASSES: [&str; 3] = ["Fog", "Mist", "Haze"];
const FAIR_CLASSES: [&str; 2] = ["Clear", "Clouds"];

/// Map an observation to a condition. Never fails.
pub fn map_observation(observation: &Observation, rng: &mut dyn RandomSource) -> Condition {
    let (condition, rule) = apply_rules(observation, rng);
    tracing::debug!(
        class = %observation.condition_class,
        humidity = observation.humidity,
        wind_speed = observation.wind_speed,
        temperature_c = observation.temperature_c,
        rule,
        "Mapped observation to {}",
        condition
    );
    condition
}

fn apply_rules(obs: &Observation, rng: &mut dyn RandomSource) -> (Condition, &'static str) {
    let class = obs.condition_class.as_str();
    let is_clear = class == "Clear";

    if class == "Rain" && obs.humidity > 80.0 && obs.wind_speed > 5.0 {
        return (Condition::HeavyRain, "heavy-rain");
    }

    if RAIN_CLASSES.contains(&class) || obs.humidity > 70.0 {
        return (Condition::Rain, "rain");
    }

    if (obs.wind_speed > 8.0 && obs.humidity < 30.0) || DUST_CLASSES.contains(&class) {
        return (Condition::Sandstorm, "sandstorm");
    }

    if is_clear && (obs.temperature_c > 30.0 || obs.humidity < 40.0) {
        return (Condition::HarshSunlight, "harsh-sunlight");
    }

    // The humidity clause here and the humid fog draw below are shadowed by
    // the humidity > 70 rain rule. Keep the order.
    if FOG_CLASSES.contains(&class) || (obs.humidity > 90.0 && obs.wind_speed < 3.0) {
        return (Condition::Fog, "fog");
    }

    if FAIR_CLASSES.contains(&class) {
        let r = rng.next_unit();
        if obs.humidity > 80.0 && r < 0.3 {
            return (Condition::Fog, "fair-weather");
        }
        if obs.temperature_c > 25.0 && r < 0.4 {
            return (Condition::HarshSunlight, "fair-weather");
        }
        if obs.wind_speed > 5.0 && r < 0.2 {
            return (Condition::Sandstorm, "fair-weather");
        }
    }

    (Condition::Clear, "default")
}
