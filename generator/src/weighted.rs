//! Weighted categorical selection.
//!
//! A `WeightedTable` is an ordered list of `(label, weight)` pairs. The
//! order is part of the configuration contract: cumulative selection walks
//! the entries exactly as they were given, so the same `r` always maps to
//! the same label.

use rand::Rng;
use thiserror::Error;

/// Reasons a table cannot be built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("table has no entries")]
    Empty,

    #[error("entry {index} has invalid weight {weight} (must be finite and >= 0)")]
    InvalidWeight { index: usize, weight: f64 },

    #[error("total weight is zero")]
    ZeroTotal,

    #[error("total weight overflows (sum of weights is not finite)")]
    TotalOverflow,
}

/// Ordered `(label, weight)` table for proportional random selection.
///
/// Weights need not sum to 1; selection is proportional to `weight / total`.
/// Entries with weight 0 are kept (so the table mirrors its configuration)
/// but are never selected.
#[derive(Debug, Clone)]
pub struct WeightedTable<T> {
    // ---
    entries: Vec<(T, f64)>,
    total: f64,

    /// Index of the last entry with positive weight.
    fallback: usize,
}

impl<T> WeightedTable<T> {
    // ---
    /// Builds a table, rejecting empty tables, negative or non-finite
    /// weights and an all-zero total.
    pub fn new(entries: Vec<(T, f64)>) -> Result<Self, TableError> {
        // ---
        if entries.is_empty() {
            return Err(TableError::Empty);
        }

        let mut total = 0.0;
        let mut fallback = None;
        for (index, (_, weight)) in entries.iter().enumerate() {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(TableError::InvalidWeight {
                    index,
                    weight: *weight,
                });
            }
            if *weight > 0.0 {
                total += weight;
                fallback = Some(index);
            }
        }

        let fallback = fallback.ok_or(TableError::ZeroTotal)?;
        if !total.is_finite() {
            return Err(TableError::TotalOverflow);
        }
        Ok(Self {
            entries,
            total,
            fallback,
        })
    }

    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        // ---
        self.total
    }

    /// Entries in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, f64)> {
        // ---
        self.entries.iter().map(|(label, weight)| (label, *weight))
    }

    /// Returns the first positive-weight entry whose cumulative weight is
    /// `>= r`, or `None` when `r` lies beyond the accumulated total.
    pub fn try_pick(&self, r: f64) -> Option<&T> {
        // ---
        let mut cumulative = 0.0;
        for (label, weight) in &self.entries {
            if *weight <= 0.0 {
                continue;
            }
            cumulative += weight;
            if r <= cumulative {
                return Some(label);
            }
        }
        None
    }

    /// Deterministic selection for a caller-supplied `r` in `[0, total)`.
    ///
    /// Never fails: an `r` past the end (rounding, or a caller passing
    /// `total` itself) resolves to the last positive-weight entry.
    pub fn pick(&self, r: f64) -> &T {
        // ---
        self.try_pick(r)
            .unwrap_or_else(|| &self.entries[self.fallback].0)
    }

    /// Draws `r` uniformly from `[0, total)` and picks.
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
        // ---
        let r = rng.gen_range(0.0..self.total);
        self.pick(r)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn providers() -> WeightedTable<&'static str> {
        // ---
        WeightedTable::new(vec![
            ("gmail", 45.0),
            ("hotmail", 20.0),
            ("rediff", 12.0),
            ("yahoo", 10.0),
            ("outlook", 8.0),
            ("others", 5.0),
        ])
        .expect("valid table")
    }

    #[test]
    fn pick_follows_cumulative_order() {
        // ---
        let table = providers();
        assert_eq!(table.total(), 100.0);
        assert_eq!(*table.pick(0.0), "gmail");
        assert_eq!(*table.pick(44.9), "gmail");
        assert_eq!(*table.pick(45.0), "gmail");
        assert_eq!(*table.pick(45.1), "hotmail");
        assert_eq!(*table.pick(77.5), "yahoo");
        assert_eq!(*table.pick(99.9), "others");
    }

    #[test]
    fn overflow_falls_back_to_last_positive_entry() {
        // ---
        let table = WeightedTable::new(vec![("a", 1.0), ("b", 2.0), ("c", 0.0)]).unwrap();
        assert!(table.try_pick(3.5).is_none());
        assert_eq!(*table.pick(3.5), "b");
        assert_eq!(*table.pick(f64::MAX), "b");
    }

    #[test]
    fn zero_weight_entries_are_never_picked() {
        // ---
        let table = WeightedTable::new(vec![("never", 0.0), ("always", 3.0)]).unwrap();
        assert_eq!(*table.pick(0.0), "always");

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            assert_eq!(*table.select(&mut rng), "always");
        }
    }

    #[test]
    fn empirical_frequency_converges_to_weights() {
        // ---
        let table = providers();
        let mut rng = StdRng::seed_from_u64(42);
        const N: usize = 200_000;

        let mut counts = std::collections::HashMap::new();
        for _ in 0..N {
            *counts.entry(*table.select(&mut rng)).or_insert(0usize) += 1;
        }

        for (label, weight) in table.iter() {
            let expected = weight / table.total();
            let observed = counts.get(label).copied().unwrap_or(0) as f64 / N as f64;
            assert!(
                (observed - expected).abs() < 0.02,
                "{label}: expected ~{expected:.3}, observed {observed:.3}"
            );
        }
    }

    #[test]
    fn malformed_tables_are_rejected() {
        // ---
        assert_eq!(
            WeightedTable::<&str>::new(vec![]).unwrap_err(),
            TableError::Empty
        );
        assert_eq!(
            WeightedTable::new(vec![("a", 0.0), ("b", 0.0)]).unwrap_err(),
            TableError::ZeroTotal
        );
        assert_eq!(
            WeightedTable::new(vec![("a", 1.0), ("b", -0.5)]).unwrap_err(),
            TableError::InvalidWeight {
                index: 1,
                weight: -0.5
            }
        );
        assert!(matches!(
            WeightedTable::new(vec![("a", f64::NAN)]).unwrap_err(),
            TableError::InvalidWeight { index: 0, .. }
        ));
    }

    #[test]
    fn finite_weights_summing_to_infinity_are_rejected() {
        // ---
        assert_eq!(
            WeightedTable::new(vec![("a", f64::MAX), ("b", f64::MAX)]).unwrap_err(),
            TableError::TotalOverflow
        );

        let table = WeightedTable::new(vec![("a", f64::MAX), ("b", 1.0)]).expect("finite total");
        assert!(table.total().is_finite());
    }
}
