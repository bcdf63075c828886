use crate::core::models::elite::EliteRecord;
use crate::core::models::pattern::DonorPattern;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// One published version of the elite memory.
///
/// Snapshots are immutable: selection reads snapshot `N` and produces snapshot
/// `N + 1` with [`EliteSnapshot::succeed`]. Records are kept in ascending
/// order of prediction error, so [`best`](Self::best) is the closest elite.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EliteSnapshot {
    version: u64,
    records: Arc<[EliteRecord]>,
}

impl EliteSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Version 0 built from records loaded from disk.
    pub fn restored(records: Vec<EliteRecord>) -> Self {
        Self {
            version: 0,
            records: sorted(records).into(),
        }
    }

    /// The next version, holding `records` in place of the current ones.
    pub fn succeed(&self, records: Vec<EliteRecord>) -> Self {
        Self {
            version: self.version + 1,
            records: sorted(records).into(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn records(&self) -> &[EliteRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn best(&self) -> Option<&EliteRecord> {
        self.records.first()
    }

    /// Every ligand used by any elite, ordered and de-duplicated.
    pub fn ligands(&self) -> BTreeSet<&str> {
        self.records
            .iter()
            .flat_map(|r| r.ligands.iter().map(String::as_str))
            .collect()
    }
}

fn sorted(mut records: Vec<EliteRecord>) -> Vec<EliteRecord> {
    records.sort_by(|a, b| a.abs_err.total_cmp(&b.abs_err));
    records
}

/// Soft per-pattern weights biasing the assembler toward donor patterns that
/// produced the current best elite.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMemory {
    weights: BTreeMap<DonorPattern, f64>,
}

pub const INITIAL_PATTERN_WEIGHT: f64 = 1.0;

impl PatternMemory {
    pub fn new(patterns: &[DonorPattern]) -> Self {
        Self {
            weights: patterns
                .iter()
                .map(|p| (p.clone(), INITIAL_PATTERN_WEIGHT))
                .collect(),
        }
    }

    /// Rebuilds the weights around `pattern`: it gets the initial weight plus
    /// `boost`, never above `cap`, and every other pattern returns to the
    /// initial weight. A pattern outside the vocabulary leaves all weights at
    /// the initial value. Returns whether any weight changed.
    pub fn focus(&mut self, pattern: &DonorPattern, boost: f64, cap: f64) -> bool {
        let favoured = (INITIAL_PATTERN_WEIGHT + boost).min(cap);
        let mut changed = false;
        for (candidate, weight) in self.weights.iter_mut() {
            let next = if candidate == pattern {
                favoured
            } else {
                INITIAL_PATTERN_WEIGHT
            };
            changed |= next != *weight;
            *weight = next;
        }
        changed
    }

    pub fn weight(&self, pattern: &DonorPattern) -> Option<f64> {
        self.weights.get(pattern).copied()
    }

    /// `(pattern, weight)` in a fixed order.
    pub fn entries(&self) -> impl Iterator<Item = (&DonorPattern, f64)> {
        self.weights.iter().map(|(p, &w)| (p, w))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
