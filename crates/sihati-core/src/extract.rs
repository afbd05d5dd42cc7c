use crate::error::{Diagnostic, Error, Phase};
use crate::reasoning::{parse_object, ExtractionRequest, Fields, ReasoningService, SchemaResult};
use crate::record::{EntityRecord, ListField};

const CORE_DUTIES: &[&str] = &["core_duties", "coreDuties", "tugas_pokok"];
const FUNCTIONS: &[&str] = &["functions", "fungsi"];
const PROGRAMS: &[&str] = &["programs", "program"];
const ACTIVITIES: &[&str] = &["activities", "kegiatan"];
const TARGETS: &[&str] = &["targets", "target_sasaran", "sasaran"];
const BUDGET: &[&str] = &["budget_note", "budgetNote", "budget", "anggaran"];

fn keys(field: ListField) -> &'static [&'static str] {
    match field {
        ListField::CoreDuties => CORE_DUTIES,
        ListField::Functions => FUNCTIONS,
        ListField::Programs => PROGRAMS,
        ListField::Activities => ACTIVITIES,
        ListField::Targets => TARGETS,
    }
}

/// Validates a structured-extraction response into a record. Missing fields
/// read as empty; fields of the wrong shape fail the whole response.
pub fn decode_record(
    text: &str,
    entity_name: &str,
    source_documents: &[String],
) -> SchemaResult<EntityRecord> {
    let map = parse_object(text)?;
    let fields = Fields::new(&map);

    let mut record = EntityRecord::new(entity_name, source_documents.to_vec());
    for field in ListField::ALL {
        record = record.with_items(field, fields.string_list(keys(field))?);
    }

    // budget notes sometimes come back as a list of line items
    let budget = match fields.string(BUDGET) {
        Ok(note) => note.unwrap_or_default(),
        Err(_) => fields.string_list(BUDGET)?.join("; "),
    };

    Ok(record.with_budget_note(budget))
}

/// Record for one entity plus the non-fatal problem that degraded it, if any.
#[derive(Debug, Clone)]
pub struct EntityExtraction {
    pub record: EntityRecord,
    pub diagnostic: Option<Diagnostic>,
}

/// Turns an entity's budgeted excerpt into an [`EntityRecord`] through the
/// reasoning service. Failures yield a flagged empty record, never an error.
pub struct EntityExtractionCoordinator<S> {
    service: S,
}

impl<S: ReasoningService> EntityExtractionCoordinator<S> {
    #[must_use]
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub async fn extract_entity(
        &self,
        excerpt: &str,
        entity_name: &str,
        source_documents: &[String],
    ) -> EntityExtraction {
        let request = ExtractionRequest {
            entity_name,
            source_documents,
            excerpt,
        };

        let result = match self.service.extract(&request).await {
            Ok(response) => decode_record(&response.text, entity_name, source_documents)
                .map_err(Error::SchemaValidation),
            Err(e) => Err(Error::ReasoningService(e)),
        };

        match result {
            Ok(record) => {
                tracing::info!(
                    entity = %entity_name,
                    items = record.item_count(),
                    "Extracted entity record"
                );
                EntityExtraction {
                    record,
                    diagnostic: None,
                }
            }
            Err(e) => {
                tracing::warn!(entity = %entity_name, error = %e, "Structured extraction failed, using empty record");
                EntityExtraction {
                    record: EntityRecord::degraded(entity_name, source_documents.to_vec()),
                    diagnostic: Some(
                        Diagnostic::from_error(Phase::StructuredExtraction, &e)
                            .with_entity(entity_name),
                    ),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::reasoning::{OverlapRequest, RawResponse, SchemaError, ServiceError, ServiceResult};
    use async_trait::async_trait;

    struct Replies(Result<&'static str, ()>);

    #[async_trait]
    impl ReasoningService for Replies {
        async fn extract(&self, request: &ExtractionRequest<'_>) -> ServiceResult<RawResponse> {
            assert!(!request.excerpt.is_empty());
            match &self.0 {
                Ok(text) => Ok(RawResponse::new(*text)),
                Err(_) => Err(ServiceError::RateLimited),
            }
        }

        async fn analyze_overlap(&self, _request: &OverlapRequest<'_>) -> ServiceResult<RawResponse> {
            unreachable!()
        }
    }

    fn sources() -> Vec<String> {
        vec!["renstra.pdf".to_string(), "sotk.pdf".to_string()]
    }

    #[tokio::test]
    async fn test_fenced_response_is_parsed() {
        let coordinator = EntityExtractionCoordinator::new(Replies(Ok(
            "```json\n{\"core_duties\": [\"Statistik dasar\", \"statistik  dasar\"], \"programs\": [\"Sensus\"], \"budget_note\": \"APBN\"}\n```",
        )));

        let out = coordinator.extract_entity("teks", "BPS", &sources()).await;

        assert!(out.diagnostic.is_none());
        assert_eq!(out.record.items(ListField::CoreDuties), ["Statistik dasar"]);
        assert_eq!(out.record.items(ListField::Programs), ["Sensus"]);
        assert!(out.record.items(ListField::Functions).is_empty());
        assert_eq!(out.record.budget_note(), "APBN");
        assert_eq!(out.record.source_documents(), sources().as_slice());
    }

    #[tokio::test]
    async fn test_non_json_response_degrades() {
        let coordinator = EntityExtractionCoordinator::new(Replies(Ok("Maaf, saya tidak bisa.")));

        let out = coordinator.extract_entity("teks", "BPS", &sources()).await;

        assert!(out.record.is_degraded());
        assert!(!out.record.has_evidence());
        assert_eq!(out.record.source_documents(), sources().as_slice());
        let diagnostic = out.diagnostic.unwrap();
        assert_eq!(diagnostic.kind, ErrorKind::SchemaValidation);
        assert_eq!(diagnostic.phase, Phase::StructuredExtraction);
        assert_eq!(diagnostic.entity.as_deref(), Some("BPS"));
    }

    #[tokio::test]
    async fn test_service_error_degrades() {
        let coordinator = EntityExtractionCoordinator::new(Replies(Err(())));

        let out = coordinator.extract_entity("teks", "BPS", &sources()).await;

        assert!(out.record.is_degraded());
        assert_eq!(out.diagnostic.unwrap().kind, ErrorKind::ReasoningService);
    }

    #[test]
    fn test_decode_indonesian_keys() {
        let record = decode_record(
            r#"{"tugas_pokok": ["Koordinasi"], "fungsi": ["Perumusan"], "kegiatan": ["Rapat"],
                "anggaran": ["Rp 1 T", "Rp 2 T"], "target_sasaran": ["Desa"]}"#,
            "Kemendes",
            &["a.pdf".to_string()],
        )
        .unwrap();

        assert_eq!(record.items(ListField::CoreDuties), ["Koordinasi"]);
        assert_eq!(record.items(ListField::Functions), ["Perumusan"]);
        assert_eq!(record.items(ListField::Activities), ["Rapat"]);
        assert_eq!(record.items(ListField::Targets), ["Desa"]);
        assert_eq!(record.budget_note(), "Rp 1 T; Rp 2 T");
    }

    #[test]
    fn test_decode_rejects_wrong_shapes() {
        let result = decode_record(r#"{"programs": {"a": 1}}"#, "X", &[]);
        assert!(matches!(result, Err(SchemaError::InvalidField { .. })));
    }
}
