//! Reconciliation of lab value candidates from multiple extraction stages.
//!
//! Candidates for the same test can arrive from table detection, text
//! pattern matching, and optical recognition. The merger keeps exactly one
//! reading per test: the highest-confidence candidate seen so far, with ties
//! going to the earliest arrival. Because stages merge in pipeline order, a
//! later, lower-confidence stage can fill gaps but can never silently
//! overwrite a better earlier finding.

use indexmap::IndexMap;

use crate::types::LabValue;

/// Progressive highest-confidence-wins merger, unique per test name.
///
/// Insertion order is preserved, so the final result lists values in the
/// order their tests were first seen.
#[derive(Debug, Default)]
pub struct ResultMerger {
    values: IndexMap<String, LabValue>,
}

impl ResultMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch of candidates into the current best set.
    ///
    /// A candidate replaces an existing reading only when its confidence is
    /// strictly higher; equal confidence keeps the earlier reading
    /// (first-seen wins; an assumption, the upstream precedence for exact
    /// ties is unspecified).
    pub fn merge(&mut self, candidates: Vec<LabValue>) {
        for candidate in candidates {
            let key = candidate.test_name.to_lowercase();
            match self.values.entry(key) {
                indexmap::map::Entry::Occupied(mut entry) => {
                    if candidate.confidence > entry.get().confidence {
                        entry.insert(candidate);
                    }
                }
                indexmap::map::Entry::Vacant(entry) => {
                    entry.insert(candidate);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Current best readings, in first-seen order.
    pub fn values(&self) -> impl Iterator<Item = &LabValue> {
        self.values.values()
    }

    /// Consume the merger, yielding the final unique-per-test set.
    pub fn into_values(self) -> Vec<LabValue> {
        self.values.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(test: &str, confidence: f64, value: f64) -> LabValue {
        LabValue {
            test_name: test.to_string(),
            value,
            unit: "mg/dL".to_string(),
            reference_range: String::new(),
            confidence,
            is_abnormal: None,
            source: None,
            converted: false,
        }
    }

    #[test]
    fn test_higher_confidence_wins_regardless_of_order() {
        let mut forward = ResultMerger::new();
        forward.merge(vec![candidate("glucose_fasting", 0.9, 110.0)]);
        forward.merge(vec![candidate("glucose_fasting", 0.6, 95.0)]);

        let mut reverse = ResultMerger::new();
        reverse.merge(vec![candidate("glucose_fasting", 0.6, 95.0)]);
        reverse.merge(vec![candidate("glucose_fasting", 0.9, 110.0)]);

        for merger in [forward, reverse] {
            let values = merger.into_values();
            assert_eq!(values.len(), 1);
            assert_eq!(values[0].confidence, 0.9);
            assert_eq!(values[0].value, 110.0);
        }
    }

    #[test]
    fn test_equal_confidence_keeps_earliest() {
        let mut merger = ResultMerger::new();
        merger.merge(vec![candidate("tsh", 0.7, 2.1)]);
        merger.merge(vec![candidate("tsh", 0.7, 3.4)]);

        let values = merger.into_values();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value, 2.1);
    }

    #[test]
    fn test_later_stage_fills_gaps() {
        let mut merger = ResultMerger::new();
        merger.merge(vec![candidate("glucose_fasting", 0.9, 95.0)]);
        merger.merge(vec![candidate("hba1c", 0.5, 5.4), candidate("glucose_fasting", 0.5, 80.0)]);

        let values = merger.into_values();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].test_name, "glucose_fasting");
        assert_eq!(values[0].value, 95.0);
        assert_eq!(values[1].test_name, "hba1c");
    }

    #[test]
    fn test_test_name_match_is_case_insensitive() {
        let mut merger = ResultMerger::new();
        merger.merge(vec![candidate("HbA1c", 0.6, 5.2)]);
        merger.merge(vec![candidate("hba1c", 0.8, 5.4)]);

        let values = merger.into_values();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].confidence, 0.8);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut merger = ResultMerger::new();
        merger.merge(vec![
            candidate("tsh", 0.8, 2.0),
            candidate("alt", 0.8, 30.0),
            candidate("ast", 0.8, 28.0),
        ]);
        merger.merge(vec![candidate("alt", 0.9, 31.0)]);

        let names: Vec<String> = merger.into_values().into_iter().map(|v| v.test_name).collect();
        assert_eq!(names, vec!["tsh", "alt", "ast"]);
    }

    #[test]
    fn test_empty_merger() {
        let merger = ResultMerger::new();
        assert!(merger.is_empty());
        assert_eq!(merger.len(), 0);
        assert!(merger.into_values().is_empty());
    }
}
