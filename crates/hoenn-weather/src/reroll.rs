use crate::catalog::Location;
use crate::random::RandomSource;
use crate::types::Condition;

/// Draw uniformly from the location's allowed conditions.
pub fn reroll(location: &Location, rng: &mut dyn RandomSource) -> Condition {
    if location.possible_conditions.is_empty() {
        return location.default_condition;
    }
    let index = rng.next_index(location.possible_conditions.len());
    location.possible_conditions[index]
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::catalog::{Catalog, LocationCategory};
    use crate::random::{SeededRandom, SequenceRandom};
    use crate::types::Coordinates;
    use std::collections::HashMap;

    fn fortree() -> Location {
        Location {
            name: "fortree-city".into(),
            category: LocationCategory::MajorCity,
            default_condition: Condition::Rain,
            possible_conditions: vec![Condition::Rain, Condition::Clear, Condition::Fog],
            proxy: Coordinates { lat: 32.9, lon: 131.1 },
            map_position: None,
        }
    }

    #[test]
    fn test_index_from_sample() {
        let loc = fortree();
        let mut rng = SequenceRandom::new(vec![0.0, 0.34, 0.99]);
        assert_eq!(reroll(&loc, &mut rng), Condition::Rain);
        assert_eq!(reroll(&loc, &mut rng), Condition::Clear);
        assert_eq!(reroll(&loc, &mut rng), Condition::Fog);
    }

    #[test]
    fn test_sample_near_one_stays_in_range() {
        let loc = fortree();
        let mut rng = SequenceRandom::new(vec![1.0]);
        assert_eq!(reroll(&loc, &mut rng), Condition::Fog);
    }

    #[test]
    fn test_rerolls_stay_in_allowed_set() {
        let catalog = Catalog::builtin().unwrap();
        let mut rng = SeededRandom::new(42);
        for location in catalog.iter() {
            for _ in 0..20 {
                assert!(location.allows(reroll(location, &mut rng)));
            }
        }
    }

    #[test]
    fn test_distribution_is_roughly_uniform() {
        let loc = fortree();
        let mut rng = SeededRandom::new(2026);
        let mut counts: HashMap<Condition, usize> = HashMap::new();
        for _ in 0..3000 {
            *counts.entry(reroll(&loc, &mut rng)).or_default() += 1;
        }

        assert_eq!(counts.len(), 3);
        for count in counts.values() {
            assert!((800..=1200).contains(count), "skewed count {}", count);
        }
    }
}
