use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::record::ListField;

/// Mandate categories an overlap finding can be raised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    CoreDuties,
    Functions,
    Programs,
    Activities,
}

impl Category {
    pub const ALL: [Self; 4] = [
        Self::CoreDuties,
        Self::Functions,
        Self::Programs,
        Self::Activities,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.field().as_str()
    }

    #[must_use]
    pub fn field(&self) -> ListField {
        match self {
            Self::CoreDuties => ListField::CoreDuties,
            Self::Functions => ListField::Functions,
            Self::Programs => ListField::Programs,
            Self::Activities => ListField::Activities,
        }
    }

    #[must_use]
    pub fn from_field(field: ListField) -> Option<Self> {
        match field {
            ListField::CoreDuties => Some(Self::CoreDuties),
            ListField::Functions => Some(Self::Functions),
            ListField::Programs => Some(Self::Programs),
            ListField::Activities => Some(Self::Activities),
            ListField::Targets => None,
        }
    }

    #[must_use]
    pub fn parse_label(s: &str) -> Option<Self> {
        ListField::parse_label(s).and_then(Self::from_field)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_label(s).ok_or_else(|| crate::Error::InvalidCategory(s.to_string()))
    }
}

pub const HIGH_THRESHOLD: f64 = 0.7;
pub const MEDIUM_THRESHOLD: f64 = 0.4;
pub const LOW_THRESHOLD: f64 = 0.2;

/// Three-level bucket derived from a similarity score. Ordered low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// `None` means the score is too weak to report.
    #[must_use]
    pub fn from_score(score: f64) -> Option<Self> {
        if score >= HIGH_THRESHOLD {
            Some(Self::High)
        } else if score >= MEDIUM_THRESHOLD {
            Some(Self::Medium)
        } else if score >= LOW_THRESHOLD {
            Some(Self::Low)
        } else {
            None
        }
    }

    /// Smallest score that still lands in this bucket.
    #[must_use]
    pub fn floor(&self) -> f64 {
        match self {
            Self::High => HIGH_THRESHOLD,
            Self::Medium => MEDIUM_THRESHOLD,
            Self::Low => LOW_THRESHOLD,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    #[must_use]
    pub fn parse_label(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" | "tinggi" => Some(Self::High),
            "medium" | "sedang" => Some(Self::Medium),
            "low" | "rendah" => Some(Self::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    #[must_use]
    pub fn parse_label(s: &str) -> Option<Self> {
        Severity::parse_label(s).map(|severity| match severity {
            Severity::High => Self::High,
            Severity::Medium => Self::Medium,
            Severity::Low => Self::Low,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapFinding {
    pub category: Category,
    pub description: String,
    pub involved_entities: BTreeSet<String>,
    pub severity: Severity,
    pub similarity_score: f64,
    pub impact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_waste: Option<String>,
    pub source_documents: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordination_advice: Option<String>,
}

impl OverlapFinding {
    /// Builds a finding whose severity follows from `similarity_score`
    /// (clamped to `[0, 1]`). Returns `None` below the reporting floor.
    #[must_use]
    pub fn new(
        category: Category,
        description: impl Into<String>,
        involved_entities: BTreeSet<String>,
        similarity_score: f64,
    ) -> Option<Self> {
        let score = if similarity_score.is_finite() {
            similarity_score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let severity = Severity::from_score(score)?;

        Some(Self {
            category,
            description: description.into(),
            involved_entities,
            severity,
            similarity_score: score,
            impact: String::new(),
            estimated_waste: None,
            source_documents: BTreeSet::new(),
            coordination_advice: None,
        })
    }

    #[must_use]
    pub fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = impact.into();
        self
    }

    #[must_use]
    pub fn with_estimated_waste(mut self, waste: Option<String>) -> Self {
        self.estimated_waste = waste;
        self
    }

    #[must_use]
    pub fn with_source_documents(mut self, documents: BTreeSet<String>) -> Self {
        self.source_documents = documents;
        self
    }

    #[must_use]
    pub fn with_coordination_advice(mut self, advice: Option<String>) -> Self {
        self.coordination_advice = advice;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub action: String,
    pub lead_entity: String,
    pub supporting_entities: BTreeSet<String>,
    pub timeline: String,
    pub benefit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_basis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordination_mechanism: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    #[must_use]
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    fn bump(&mut self, severity: Severity) {
        match severity {
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlapMetrics {
    pub total_findings: usize,
    pub count_by_severity: SeverityCounts,
    pub estimated_efficiency_pct: f64,
    pub average_similarity: f64,
}

impl OverlapMetrics {
    /// Tallies the final finding list. `efficiency_pct` is clamped to `[0, 100]`.
    #[must_use]
    pub fn from_findings(findings: &[OverlapFinding], efficiency_pct: f64) -> Self {
        let mut counts = SeverityCounts::default();
        for finding in findings {
            counts.bump(finding.severity);
        }

        let average_similarity = if findings.is_empty() {
            0.0
        } else {
            findings.iter().map(|f| f.similarity_score).sum::<f64>() / findings.len() as f64
        };

        let estimated_efficiency_pct = if efficiency_pct.is_finite() {
            efficiency_pct.clamp(0.0, 100.0)
        } else {
            0.0
        };

        Self {
            total_findings: findings.len(),
            count_by_severity: counts,
            estimated_efficiency_pct,
            average_similarity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub executive_summary: String,
    pub findings: Vec<OverlapFinding>,
    pub recommendations: Vec<Recommendation>,
    pub metrics: OverlapMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl OverlapReport {
    #[must_use]
    pub fn new(
        executive_summary: String,
        findings: Vec<OverlapFinding>,
        recommendations: Vec<Recommendation>,
        efficiency_pct: f64,
    ) -> Self {
        let metrics = OverlapMetrics::from_findings(&findings, efficiency_pct);
        Self {
            run_id: Uuid::now_v7(),
            generated_at: Utc::now(),
            model: None,
            executive_summary,
            findings,
            recommendations,
            metrics,
            failure: None,
        }
    }

    /// Empty report for a semantic phase that could not complete.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let mut report = Self::new(
            format!("Overlap analysis could not be completed: {reason}"),
            Vec::new(),
            Vec::new(),
            0.0,
        );
        report.failure = Some(reason);
        report
    }

    #[must_use]
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn test_severity_from_score() {
        assert_eq!(Severity::from_score(0.75), Some(Severity::High));
        assert_eq!(Severity::from_score(0.5), Some(Severity::Medium));
        assert_eq!(Severity::from_score(0.25), Some(Severity::Low));
        assert_eq!(Severity::from_score(0.1), None);
    }

    #[test]
    fn test_severity_boundaries() {
        assert_eq!(Severity::from_score(0.7), Some(Severity::High));
        assert_eq!(Severity::from_score(0.4), Some(Severity::Medium));
        assert_eq!(Severity::from_score(0.2), Some(Severity::Low));
        assert_eq!(Severity::from_score(0.199), None);
        assert!(Severity::High > Severity::Medium && Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_severity_labels() {
        assert_eq!(Severity::parse_label("Tinggi"), Some(Severity::High));
        assert_eq!(Severity::parse_label("sedang"), Some(Severity::Medium));
        assert_eq!(Severity::parse_label(" low "), Some(Severity::Low));
        assert_eq!(Severity::parse_label("critical"), None);
        assert_eq!(Priority::parse_label("rendah"), Some(Priority::Low));
    }

    #[test]
    fn test_finding_below_floor_is_discarded() {
        assert!(OverlapFinding::new(Category::Programs, "x", entities(&["A", "B"]), 0.1).is_none());
    }

    #[test]
    fn test_finding_score_is_clamped() {
        let finding =
            OverlapFinding::new(Category::Functions, "x", entities(&["A", "B"]), 1.7).unwrap();
        assert!((finding.similarity_score - 1.0).abs() < f64::EPSILON);
        assert_eq!(finding.severity, Severity::High);
    }

    #[test]
    fn test_category_excludes_targets() {
        assert_eq!(Category::from_field(ListField::Targets), None);
        assert_eq!(Category::parse_label("tugas_pokok"), Some(Category::CoreDuties));
        assert_eq!(Category::parse_label("targets"), None);
        assert_eq!(Category::Activities.field(), ListField::Activities);
    }

    #[test]
    fn test_metrics_are_tallied_from_findings() {
        let findings = vec![
            OverlapFinding::new(Category::CoreDuties, "a", entities(&["A", "B"]), 0.9).unwrap(),
            OverlapFinding::new(Category::Functions, "b", entities(&["A", "B"]), 0.5).unwrap(),
            OverlapFinding::new(Category::Programs, "c", entities(&["A", "B"]), 0.4).unwrap(),
        ];

        let metrics = OverlapMetrics::from_findings(&findings, 140.0);

        assert_eq!(metrics.total_findings, 3);
        assert_eq!(metrics.count_by_severity.get(Severity::High), 1);
        assert_eq!(metrics.count_by_severity.get(Severity::Medium), 2);
        assert_eq!(metrics.count_by_severity.get(Severity::Low), 0);
        assert!((metrics.estimated_efficiency_pct - 100.0).abs() < f64::EPSILON);
        assert!((metrics.average_similarity - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_failed_report() {
        let report = OverlapReport::failed("request timed out");

        assert!(report.is_failed());
        assert!(report.findings.is_empty());
        assert!(report.recommendations.is_empty());
        assert!(report.executive_summary.contains("request timed out"));
        assert_eq!(report.metrics.total_findings, 0);
    }
}
