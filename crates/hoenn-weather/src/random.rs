//! Injectable source of uniform samples in `[0, 1)`.
//!
//! The mapper's fair-weather branch and re-rolls draw through this trait so
//! tests can substitute a fixed sequence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait RandomSource: Send {
    /// Next sample, uniform in `[0, 1)`
    fn next_unit(&mut self) -> f64;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn next_index(&mut self, len: usize) -> usize {
        let index = (self.next_unit() * len as f64).floor() as usize;
        index.min(len.saturating_sub(1))
    }
}

/// Thread-local OS-seeded generator
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&mut self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Reproducible generator for simulations and tests
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed list of samples, cycling when exhausted
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    values: Vec<f64>,
    position: usize,
}

impl SequenceRandom {
    /// Values outside `[0, 1)` are clamped into range.
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        let values = values
            .into()
            .into_iter()
            .map(|v| v.clamp(0.0, 1.0 - f64::EPSILON))
            .collect();
        Self {
            values,
            position: 0,
        }
    }

    /// Number of samples drawn so far
    pub fn draws(&self) -> usize {
        self.position
    }
}

impl RandomSource for SequenceRandom {
    fn next_unit(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.position % self.values.len()];
        self.position += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_cycles() {
        let mut rng = SequenceRandom::new(vec![0.1, 0.9]);
        assert_eq!(rng.next_unit(), 0.1);
        assert_eq!(rng.next_unit(), 0.9);
        assert_eq!(rng.next_unit(), 0.1);
        assert_eq!(rng.draws(), 3);
    }

    #[test]
    fn test_sequence_clamps_out_of_range() {
        let mut rng = SequenceRandom::new(vec![1.5, -0.2]);
        assert!(rng.next_unit() < 1.0);
        assert_eq!(rng.next_unit(), 0.0);
    }

    #[test]
    fn test_next_index_floor() {
        let mut rng = SequenceRandom::new(vec![0.0, 0.34, 0.99]);
        assert_eq!(rng.next_index(3), 0);
        assert_eq!(rng.next_index(3), 1);
        assert_eq!(rng.next_index(3), 2);
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = SeededRandom::new(42);
        let mut b = SeededRandom::new(42);
        for _ in 0..10 {
            assert_eq!(a.next_unit(), b.next_unit());
        }
    }

    #[test]
    fn test_thread_random_in_range() {
        let mut rng = ThreadRandom;
        for _ in 0..1000 {
            let v = rng.next_unit();
            assert!((0.0..1.0).contains(&v));
        }
    }
}
