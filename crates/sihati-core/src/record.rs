use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// List-valued mandate attributes extracted per entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListField {
    CoreDuties,
    Functions,
    Programs,
    Activities,
    Targets,
}

impl ListField {
    pub const ALL: [Self; 5] = [
        Self::CoreDuties,
        Self::Functions,
        Self::Programs,
        Self::Activities,
        Self::Targets,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CoreDuties => "core_duties",
            Self::Functions => "functions",
            Self::Programs => "programs",
            Self::Activities => "activities",
            Self::Targets => "targets",
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::CoreDuties => "Core duties",
            Self::Functions => "Functions",
            Self::Programs => "Programs",
            Self::Activities => "Activities",
            Self::Targets => "Targets",
        }
    }

    /// Accepts snake_case, camelCase, spaced labels and the Indonesian terms.
    #[must_use]
    pub fn parse_label(s: &str) -> Option<Self> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "coreduties" | "coreduty" | "duties" | "tugaspokok" => Some(Self::CoreDuties),
            "functions" | "function" | "fungsi" => Some(Self::Functions),
            "programs" | "program" => Some(Self::Programs),
            "activities" | "activity" | "kegiatan" => Some(Self::Activities),
            "targets" | "target" | "targetsasaran" | "sasaran" => Some(Self::Targets),
            _ => None,
        }
    }
}

impl std::fmt::Display for ListField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ListField {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_label(s).ok_or_else(|| crate::Error::InvalidCategory(s.to_string()))
    }
}

/// Case- and whitespace-insensitive comparison key for a list item.
#[must_use]
pub fn normalize_item(item: &str) -> String {
    item.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trims items, drops empty ones and keeps the first spelling of each
/// normalized duplicate, preserving order.
#[must_use]
pub fn dedup_items<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for item in items {
        let trimmed = item.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(normalize_item(trimmed)) {
            out.push(trimmed.to_string());
        }
    }

    out
}

/// Structured mandate data for one organization.
///
/// List fields never hold two items that normalize to the same key. Records
/// are built once by the extraction coordinator and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EntityRecordData")]
pub struct EntityRecord {
    name: String,
    core_duties: Vec<String>,
    functions: Vec<String>,
    programs: Vec<String>,
    activities: Vec<String>,
    budget_note: String,
    targets: Vec<String>,
    source_documents: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    degraded: bool,
}

impl EntityRecord {
    #[must_use]
    pub fn new(name: impl Into<String>, source_documents: Vec<String>) -> Self {
        Self {
            name: name.into(),
            core_duties: Vec::new(),
            functions: Vec::new(),
            programs: Vec::new(),
            activities: Vec::new(),
            budget_note: String::new(),
            targets: Vec::new(),
            source_documents,
            degraded: false,
        }
    }

    /// Empty placeholder for an entity whose structured extraction failed.
    #[must_use]
    pub fn degraded(name: impl Into<String>, source_documents: Vec<String>) -> Self {
        Self {
            degraded: true,
            ..Self::new(name, source_documents)
        }
    }

    #[must_use]
    pub fn with_items<I, S>(mut self, field: ListField, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        *self.items_mut(field) = dedup_items(items);
        self
    }

    #[must_use]
    pub fn with_budget_note(mut self, note: impl Into<String>) -> Self {
        self.budget_note = note.into().trim().to_string();
        self
    }

    fn items_mut(&mut self, field: ListField) -> &mut Vec<String> {
        match field {
            ListField::CoreDuties => &mut self.core_duties,
            ListField::Functions => &mut self.functions,
            ListField::Programs => &mut self.programs,
            ListField::Activities => &mut self.activities,
            ListField::Targets => &mut self.targets,
        }
    }

    #[must_use]
    pub fn items(&self, field: ListField) -> &[String] {
        match field {
            ListField::CoreDuties => &self.core_duties,
            ListField::Functions => &self.functions,
            ListField::Programs => &self.programs,
            ListField::Activities => &self.activities,
            ListField::Targets => &self.targets,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn budget_note(&self) -> &str {
        &self.budget_note
    }

    #[must_use]
    pub fn source_documents(&self) -> &[String] {
        &self.source_documents
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Whether any list field holds at least one item.
    #[must_use]
    pub fn has_evidence(&self) -> bool {
        ListField::ALL.iter().any(|f| !self.items(*f).is_empty())
    }

    pub fn item_count(&self) -> usize {
        ListField::ALL.iter().map(|f| self.items(*f).len()).sum()
    }
}

#[derive(Deserialize)]
struct EntityRecordData {
    name: String,
    #[serde(default)]
    core_duties: Vec<String>,
    #[serde(default)]
    functions: Vec<String>,
    #[serde(default)]
    programs: Vec<String>,
    #[serde(default)]
    activities: Vec<String>,
    #[serde(default)]
    budget_note: String,
    #[serde(default)]
    targets: Vec<String>,
    #[serde(default)]
    source_documents: Vec<String>,
    #[serde(default)]
    degraded: bool,
}

impl From<EntityRecordData> for EntityRecord {
    fn from(data: EntityRecordData) -> Self {
        let record = Self::new(data.name, data.source_documents)
            .with_items(ListField::CoreDuties, data.core_duties)
            .with_items(ListField::Functions, data.functions)
            .with_items(ListField::Programs, data.programs)
            .with_items(ListField::Activities, data.activities)
            .with_items(ListField::Targets, data.targets)
            .with_budget_note(data.budget_note);

        Self {
            degraded: data.degraded,
            ..record
        }
    }
}
