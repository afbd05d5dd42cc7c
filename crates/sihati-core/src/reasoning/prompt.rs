use crate::record::{EntityRecord, ListField};

const EXTRACTION_SCHEMA: &str = r#"{
  "core_duties": ["..."],
  "functions": ["..."],
  "programs": ["..."],
  "activities": ["..."],
  "budget_note": "...",
  "targets": ["..."]
}"#;

const OVERLAP_SCHEMA: &str = r#"{
  "executive_summary": "...",
  "findings": [
    {
      "category": "core_duties | functions | programs | activities",
      "description": "...",
      "involved_entities": ["exact entity name", "exact entity name"],
      "severity": "high | medium | low",
      "similarity_score": 0.0,
      "impact": "...",
      "estimated_waste": "...",
      "source_documents": ["..."],
      "coordination_advice": "..."
    }
  ],
  "recommendations": [
    {
      "priority": "high | medium | low",
      "action": "...",
      "lead_entity": "...",
      "supporting_entities": ["..."],
      "timeline": "...",
      "benefit": "...",
      "legal_basis": "...",
      "coordination_mechanism": "..."
    }
  ],
  "metrics": {
    "estimated_efficiency_pct": 0
  }
}"#;

/// Prompt asking for one entity's mandate data as a single JSON object.
#[must_use]
pub fn extraction_prompt(entity_name: &str, source_documents: &[String], excerpt: &str) -> String {
    let documents = source_documents.join(", ");

    format!(
        r#"You are an expert analyst of Indonesian government organizations and mandates.

ENTITY: {entity_name}
DOCUMENTS ANALYZED: {documents}

COMBINED DOCUMENT TEXT:
{excerpt}

Extract the entity's mandate from ALL documents above, keeping each item specific:
1. core_duties: the main duties (tugas pokok)
2. functions: the functions carried out (fungsi)
3. programs: the programs run (program)
4. activities: concrete activities (kegiatan)
5. budget_note: budget allocation in free text, if mentioned (anggaran)
6. targets: target groups or goals (target/sasaran)

Consolidate information that appears in more than one document and list each item only once.
When documents conflict, prefer formal regulatory documents (SOTK, Renstra, Perpres, Permen) and take the most recent and complete version.
Use empty lists (or an empty string for budget_note) when nothing is found. Do not invent information.

Respond ONLY with valid JSON in this format:
{EXTRACTION_SCHEMA}"#
    )
}

fn entity_block(record: &EntityRecord) -> String {
    let lists: String = ListField::ALL
        .iter()
        .map(|field| {
            let items = record.items(*field);
            let value = if items.is_empty() {
                "(none)".to_string()
            } else {
                items.join("; ")
            };
            format!("{}: {value}\n", field.label())
        })
        .collect();

    let budget = match record.budget_note() {
        "" => String::new(),
        note => format!("Budget: {note}\n"),
    };

    format!(
        "\n=== {} ===\nSource documents: {}\n{lists}{budget}",
        record.name(),
        record.source_documents().join(", ")
    )
}

/// Prompt asking for a comparative overlap analysis across all records.
#[must_use]
pub fn overlap_prompt(records: &[EntityRecord]) -> String {
    let entities: String = records.iter().map(entity_block).collect();

    format!(
        r#"You are a senior consultant for Indonesian government institutional efficiency.

ENTITY DATA:
{entities}
Identify overlaps in core duties, functions, programs and activities between the entities above. Every finding must involve at least two of the listed entities, named exactly as above.
Score each finding with a similarity_score between 0 and 1: high >= 0.7, medium >= 0.4, low >= 0.2. Do not report anything below 0.2.
Give actionable coordination recommendations with a lead entity, supporting entities, timeline, expected benefit and, where relevant, the legal basis.

Respond ONLY with valid JSON in this format:
{OVERLAP_SCHEMA}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_prompt_lists_every_entity() {
        let records = vec![
            EntityRecord::new("Kementerian Sosial", vec!["kemensos.pdf".into()])
                .with_items(ListField::Programs, ["Bantuan sosial"]),
            EntityRecord::new("Kementerian Desa", vec!["kemendes.pdf".into()])
                .with_budget_note("APBN 2024"),
        ];

        let prompt = overlap_prompt(&records);

        assert!(prompt.contains("=== Kementerian Sosial ==="));
        assert!(prompt.contains("=== Kementerian Desa ==="));
        assert!(prompt.contains("Programs: Bantuan sosial"));
        assert!(prompt.contains("Functions: (none)"));
        assert!(prompt.contains("Budget: APBN 2024"));
        assert!(prompt.contains("\"executive_summary\""));
    }

    #[test]
    fn test_extraction_prompt_asks_for_json() {
        let prompt = extraction_prompt("BPS", &["a.pdf".into(), "b.pdf".into()], "teks");
        assert!(prompt.contains("DOCUMENTS ANALYZED: a.pdf, b.pdf"));
        assert!(prompt.contains("list each item only once"));
        assert!(prompt.contains("prefer formal regulatory documents (SOTK, Renstra, Perpres, Permen)"));
        assert!(prompt.contains("most recent and complete"));
        assert!(prompt.ends_with('}'));
    }
}
