//! Where a jar's balance on a past day comes from.
//!
//! The backend has no historical-balance endpoint, so history is simulated from the current
//! balance. A real source would implement `HistorySource` with lookups.

use crate::model::Jar;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Lower bound of the multiplicative jitter applied by `RandomJitter`.
pub const JITTER_MIN: f64 = 0.8;
/// Upper bound of the multiplicative jitter applied by `RandomJitter`.
pub const JITTER_MAX: f64 = 1.2;

/// Provides a jar's balance on a given day.
pub trait HistorySource {
    fn balance_on(&mut self, jar: &Jar, date: NaiveDate) -> f64;
}

/// Simulated history: each day's value is the current balance times a factor drawn uniformly from
/// `[JITTER_MIN, JITTER_MAX]`. Days are drawn independently of each other.
#[derive(Debug, Clone)]
pub struct RandomJitter<R> {
    rng: R,
}

impl<R: Rng> RandomJitter<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomJitter<StdRng> {
    /// Jitter seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible jitter.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> HistorySource for RandomJitter<R> {
    fn balance_on(&mut self, jar: &Jar, _date: NaiveDate) -> f64 {
        let factor = self.rng.gen_range(JITTER_MIN..=JITTER_MAX);
        jar.current_balance.to_f64() * factor
    }
}

/// Every day has the current balance.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatHistory;

impl HistorySource for FlatHistory {
    fn balance_on(&mut self, jar: &Jar, _date: NaiveDate) -> f64 {
        jar.current_balance.to_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_stays_in_range() {
        let jar = Jar::new(1, "Rent", 1000);
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let mut jitter = RandomJitter::seeded(7);
        for _ in 0..1000 {
            let v = jitter.balance_on(&jar, day);
            assert!((800.0..=1200.0).contains(&v), "{v} out of range");
        }
    }

    #[test]
    fn test_jitter_is_reproducible_with_seed() {
        let jar = Jar::new(1, "Rent", 1000);
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let mut a = RandomJitter::seeded(42);
        let mut b = RandomJitter::seeded(42);
        for _ in 0..10 {
            assert_eq!(a.balance_on(&jar, day), b.balance_on(&jar, day));
        }
    }

    #[test]
    fn test_flat_history() {
        let jar = Jar::new(1, "Rent", -25);
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(FlatHistory.balance_on(&jar, day), -25.0);
    }
}
