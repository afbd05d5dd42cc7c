use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};

use super::local::LocalScores;
use super::report::{
    Category, OverlapFinding, OverlapReport, Priority, Recommendation, Severity, LOW_THRESHOLD,
};
use super::resolve::{NameResolver, DEFAULT_NAME_THRESHOLD};
use crate::error::{Error, Result};
use crate::reasoning::{parse_object, Fields, OverlapRequest, ReasoningService, SchemaResult};
use crate::record::{normalize_item, EntityRecord};

/// Service and local scores further apart than this are logged.
const SCORE_DIVERGENCE: f64 = 0.5;

const EFFICIENCY: [&str; 3] = [
    "estimated_efficiency_pct",
    "estimatedEfficiencyPct",
    "efisiensi_potensial",
];

/// A finding as reported by the service, before validation.
#[derive(Debug, Clone, Default)]
struct ProposedFinding {
    category: String,
    description: String,
    entities: Vec<String>,
    severity: Option<Severity>,
    score: Option<f64>,
    impact: String,
    estimated_waste: Option<String>,
    source_documents: Vec<String>,
    coordination_advice: Option<String>,
}

#[derive(Debug, Default)]
struct ProposedReport {
    executive_summary: String,
    findings: Vec<ProposedFinding>,
    recommendations: Vec<Map<String, Value>>,
    efficiency_pct: Option<f64>,
}

/// Scores above 1 are read as percentages.
fn normalize_score(score: f64) -> f64 {
    if score > 1.0 && score <= 100.0 {
        score / 100.0
    } else {
        score
    }
}

fn decode_finding(fields: Fields<'_>) -> SchemaResult<ProposedFinding> {
    Ok(ProposedFinding {
        category: fields.string(&["category", "kategori"])?.unwrap_or_default(),
        description: fields
            .string(&["description", "deskripsi"])?
            .unwrap_or_default(),
        entities: fields.string_list(&[
            "involved_entities",
            "involvedEntities",
            "instansi_terlibat",
        ])?,
        severity: fields
            .string(&["severity", "tingkat_overlap"])?
            .as_deref()
            .and_then(Severity::parse_label),
        score: fields
            .number(&["similarity_score", "similarityScore", "skor_kemiripan"])?
            .map(normalize_score),
        impact: fields
            .string(&["impact", "dampak_potensial"])?
            .unwrap_or_default(),
        estimated_waste: fields
            .string(&[
                "estimated_waste",
                "estimatedWaste",
                "estimasi_pemborosan_anggaran",
            ])?
            .filter(|s| !s.is_empty()),
        source_documents: fields.string_list(&[
            "source_documents",
            "sourceDocuments",
            "dokumen_sumber",
        ])?,
        coordination_advice: fields
            .string(&[
                "coordination_advice",
                "coordinationAdvice",
                "rekomendasi_koordinasi",
            ])?
            .filter(|s| !s.is_empty()),
    })
}

fn decode_report(text: &str) -> SchemaResult<ProposedReport> {
    let map = parse_object(text)?;
    let fields = Fields::new(&map);

    let mut findings = Vec::new();
    for (index, item) in fields
        .objects(&["findings", "overlaps", "tumpang_tindih"])?
        .into_iter()
        .enumerate()
    {
        match decode_finding(Fields::new(item)) {
            Ok(finding) => findings.push(finding),
            Err(e) => tracing::warn!(index, error = %e, "Skipping malformed finding"),
        }
    }

    let recommendations = fields
        .objects(&["recommendations", "rekomendasi"])?
        .into_iter()
        .cloned()
        .collect();

    let efficiency_pct = match fields.object(&["metrics", "metrik_overlap"])? {
        Some(metrics) => metrics.number(&EFFICIENCY)?,
        None => fields.number(&EFFICIENCY)?,
    };

    Ok(ProposedReport {
        executive_summary: fields
            .string(&["executive_summary", "executiveSummary", "ringkasan_eksekutif"])?
            .unwrap_or_default(),
        findings,
        recommendations,
        efficiency_pct,
    })
}

/// Combines local similarity signals with the reasoning service's semantic
/// overlap judgments into a ranked, deduplicated report.
pub struct OverlapEngine<S> {
    service: S,
    name_threshold: f64,
}

impl<S: ReasoningService> OverlapEngine<S> {
    #[must_use]
    pub fn new(service: S) -> Self {
        Self {
            service,
            name_threshold: DEFAULT_NAME_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_name_threshold(mut self, threshold: f64) -> Self {
        self.name_threshold = threshold;
        self
    }

    /// Requires at least two records. A failed or unusable service response
    /// yields an empty report carrying the failure reason, not an error.
    pub async fn analyze(&self, records: &[EntityRecord]) -> Result<OverlapReport> {
        if records.len() < 2 {
            return Err(Error::InsufficientEntities {
                found: records.len(),
            });
        }

        tracing::info!(entities = records.len(), "Running overlap analysis");

        let local = LocalScores::compute(records);
        let model = self.service.model().map(str::to_string);

        let response = match self
            .service
            .analyze_overlap(&OverlapRequest { records })
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "Overlap analysis request failed");
                return Ok(OverlapReport::failed(e.to_string()).with_model(model));
            }
        };

        let proposed = match decode_report(&response.text) {
            Ok(proposed) => proposed,
            Err(e) => {
                tracing::error!(error = %e, "Overlap analysis response was unusable");
                let reason = Error::SchemaValidation(e).to_string();
                return Ok(OverlapReport::failed(reason).with_model(model));
            }
        };

        let resolver = NameResolver::new(records.iter().map(EntityRecord::name))
            .with_threshold(self.name_threshold);

        let findings = validate_findings(proposed.findings, records, &local, &resolver);
        let recommendations = proposed
            .recommendations
            .iter()
            .filter_map(|map| decode_recommendation(Fields::new(map), &resolver))
            .collect();

        let report = OverlapReport::new(
            proposed.executive_summary,
            findings,
            recommendations,
            proposed.efficiency_pct.unwrap_or(0.0),
        )
        .with_model(model);

        tracing::info!(
            findings = report.metrics.total_findings,
            high = report.metrics.count_by_severity.high,
            medium = report.metrics.count_by_severity.medium,
            low = report.metrics.count_by_severity.low,
            "Overlap analysis complete"
        );

        Ok(report)
    }
}

fn validate_findings(
    proposed: Vec<ProposedFinding>,
    records: &[EntityRecord],
    local: &LocalScores,
    resolver: &NameResolver,
) -> Vec<OverlapFinding> {
    let mut merged: Vec<OverlapFinding> = Vec::new();
    let mut index: HashMap<(Category, BTreeSet<String>, String), usize> = HashMap::new();

    for finding in proposed {
        let Some(category) = Category::parse_label(&finding.category) else {
            tracing::warn!(category = %finding.category, "Dropping finding with unknown category");
            continue;
        };

        let (involved, unknown) = resolver.resolve_all(&finding.entities);
        if !unknown.is_empty() {
            tracing::warn!(
                ?unknown,
                description = %finding.description,
                "Dropping finding that references unknown entities"
            );
            continue;
        }
        if involved.len() < 2 {
            tracing::warn!(
                category = %category,
                description = %finding.description,
                "Dropping finding with fewer than two known entities"
            );
            continue;
        }

        let local_score = local.strongest(category, &involved);
        let score = resolve_score(finding.score, finding.severity, local_score);

        let sources: BTreeSet<String> = if finding.source_documents.is_empty() {
            records
                .iter()
                .filter(|r| involved.contains(r.name()))
                .flat_map(|r| r.source_documents().iter().cloned())
                .collect()
        } else {
            finding.source_documents.into_iter().collect()
        };

        let Some(candidate) =
            OverlapFinding::new(category, finding.description, involved, score)
        else {
            tracing::debug!(category = %category, score, "Dropping finding below reporting floor");
            continue;
        };

        let candidate = candidate
            .with_impact(finding.impact)
            .with_estimated_waste(finding.estimated_waste)
            .with_source_documents(sources)
            .with_coordination_advice(finding.coordination_advice);

        let key = (
            candidate.category,
            candidate.involved_entities.clone(),
            normalize_item(&candidate.description),
        );

        match index.get(&key) {
            Some(&at) => {
                let existing = &mut merged[at];
                let mut documents = std::mem::take(&mut existing.source_documents);
                documents.extend(candidate.source_documents.iter().cloned());
                if candidate.similarity_score > existing.similarity_score {
                    *existing = candidate;
                }
                existing.source_documents = documents;
            }
            None => {
                index.insert(key, merged.len());
                merged.push(candidate);
            }
        }
    }

    merged.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.similarity_score.total_cmp(&a.similarity_score))
    });
    merged
}

/// Service score first, then a reportable local score, then the floor of
/// the service's severity label.
fn resolve_score(service: Option<f64>, label: Option<Severity>, local: f64) -> f64 {
    match service {
        Some(score) => {
            if (score - local).abs() > SCORE_DIVERGENCE {
                tracing::warn!(
                    service_score = score,
                    local_score = local,
                    "Service and local similarity disagree"
                );
            }
            score
        }
        None if local >= LOW_THRESHOLD => local,
        None => label.map_or(local, |severity| severity.floor()),
    }
}

fn try_decode_recommendation(
    fields: Fields<'_>,
    resolver: &NameResolver,
) -> SchemaResult<Recommendation> {
    let priority = fields.string(&["priority", "prioritas"])?;
    let lead = fields
        .string(&["lead_entity", "leadEntity", "instansi_pelaksana"])?
        .unwrap_or_default();
    let supporting = fields.string_list(&[
        "supporting_entities",
        "supportingEntities",
        "instansi_pendukung",
    ])?;

    let canonical = |name: &str| {
        resolver
            .resolve(name)
            .map_or_else(|| name.trim().to_string(), str::to_string)
    };

    Ok(Recommendation {
        priority: priority
            .as_deref()
            .and_then(Priority::parse_label)
            .unwrap_or(Priority::Medium),
        action: fields.string(&["action", "aksi"])?.unwrap_or_default(),
        lead_entity: canonical(&lead),
        supporting_entities: supporting
            .iter()
            .map(|name| canonical(name))
            .filter(|name| !name.is_empty())
            .collect(),
        timeline: fields.string(&["timeline"])?.unwrap_or_default(),
        benefit: fields
            .string(&["benefit", "benefit_estimasi"])?
            .unwrap_or_default(),
        legal_basis: fields
            .string(&["legal_basis", "legalBasis", "dasar_hukum"])?
            .filter(|s| !s.is_empty()),
        coordination_mechanism: fields
            .string(&[
                "coordination_mechanism",
                "coordinationMechanism",
                "mekanisme_koordinasi",
            ])?
            .filter(|s| !s.is_empty()),
    })
}

fn decode_recommendation(fields: Fields<'_>, resolver: &NameResolver) -> Option<Recommendation> {
    match try_decode_recommendation(fields, resolver) {
        Ok(rec) if rec.action.is_empty() => {
            tracing::warn!("Skipping recommendation without an action");
            None
        }
        Ok(rec) => Some(rec),
        Err(e) => {
            tracing::warn!(error = %e, "Skipping malformed recommendation");
            None
        }
    }
}
