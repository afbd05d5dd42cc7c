use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::report::Category;
use super::similarity::{jaccard, lcs_ratio};
use crate::record::{EntityRecord, ListField};

/// Deterministic similarity of one unordered pair of entities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairScore {
    pub first: String,
    pub second: String,
    pub fields: BTreeMap<ListField, f64>,
    pub budget_similarity: f64,
}

impl PairScore {
    #[must_use]
    pub fn compute(a: &EntityRecord, b: &EntityRecord) -> Self {
        let fields = ListField::ALL
            .iter()
            .map(|field| (*field, jaccard(a.items(*field), b.items(*field))))
            .collect();

        Self {
            first: a.name().to_string(),
            second: b.name().to_string(),
            fields,
            budget_similarity: lcs_ratio(a.budget_note(), b.budget_note()),
        }
    }

    #[must_use]
    pub fn field(&self, field: ListField) -> f64 {
        self.fields.get(&field).copied().unwrap_or(0.0)
    }
}

/// Pairwise pre-scores used to sanity-check and backfill semantic findings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LocalScores {
    pairs: Vec<PairScore>,
}

impl LocalScores {
    #[must_use]
    pub fn compute(records: &[EntityRecord]) -> Self {
        let mut pairs = Vec::with_capacity(records.len() * records.len().saturating_sub(1) / 2);

        for (i, a) in records.iter().enumerate() {
            for b in &records[i + 1..] {
                let pair = PairScore::compute(a, b);
                tracing::debug!(
                    first = %pair.first,
                    second = %pair.second,
                    core_duties = pair.field(ListField::CoreDuties),
                    functions = pair.field(ListField::Functions),
                    programs = pair.field(ListField::Programs),
                    activities = pair.field(ListField::Activities),
                    budget = pair.budget_similarity,
                    "Local pre-score"
                );
                pairs.push(pair);
            }
        }

        Self { pairs }
    }

    /// Highest pairwise similarity for `category` among the given entities.
    #[must_use]
    pub fn strongest(&self, category: Category, entities: &BTreeSet<String>) -> f64 {
        self.pairs
            .iter()
            .filter(|p| entities.contains(&p.first) && entities.contains(&p.second))
            .map(|p| p.field(category.field()))
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, duties: &[&str], programs: &[&str]) -> EntityRecord {
        EntityRecord::new(name, vec![format!("{name}.pdf")])
            .with_items(ListField::CoreDuties, duties.iter().copied())
            .with_items(ListField::Programs, programs.iter().copied())
    }

    #[test]
    fn test_pair_field_scores() {
        let a = record("A", &["Perumusan kebijakan A"], &["P1", "P2"]);
        let b = record("B", &["perumusan kebijakan a"], &["P2"]);

        let pair = PairScore::compute(&a, &b);

        assert!((pair.field(ListField::CoreDuties) - 1.0).abs() < f64::EPSILON);
        assert!((pair.field(ListField::Programs) - 0.5).abs() < f64::EPSILON);
        assert!(pair.field(ListField::Functions).abs() < f64::EPSILON);
        assert!(pair.budget_similarity.abs() < f64::EPSILON);
    }

    #[test]
    fn test_strongest_only_considers_involved_entities() {
        let records = vec![
            record("A", &["x"], &[]),
            record("B", &["x"], &[]),
            record("C", &["y"], &[]),
        ];
        let scores = LocalScores::compute(&records);

        let ac: BTreeSet<String> = ["A".to_string(), "C".to_string()].into();
        let ab: BTreeSet<String> = ["A".to_string(), "B".to_string()].into();

        assert!(scores.strongest(Category::CoreDuties, &ac).abs() < f64::EPSILON);
        assert!((scores.strongest(Category::CoreDuties, &ab) - 1.0).abs() < f64::EPSILON);
    }
}
