use std::collections::BTreeSet;

use crate::record::normalize_item;

pub const DEFAULT_NAME_THRESHOLD: f64 = 0.9;

/// Maps entity names reported by the reasoning service back onto the names
/// of the records that were analyzed.
pub struct NameResolver {
    known: Vec<(String, String)>,
    threshold: f64,
}

impl NameResolver {
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let known = names
            .into_iter()
            .map(Into::into)
            .map(|name: String| (normalize_item(&name), name))
            .collect();

        Self {
            known,
            threshold: DEFAULT_NAME_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    fn exact(&self, key: &str) -> Option<&str> {
        self.known
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, canonical)| canonical.as_str())
    }

    /// The single known name within the edit-distance threshold. Two or more
    /// candidates make the name ambiguous.
    fn fuzzy(&self, key: &str) -> Option<&str> {
        let mut candidates = self
            .known
            .iter()
            .filter(|(k, _)| strsim::normalized_levenshtein(key, k) >= self.threshold);

        match (candidates.next(), candidates.next()) {
            (Some((_, canonical)), None) => Some(canonical.as_str()),
            (Some(_), Some(_)) => {
                tracing::debug!(name = %key, "Ambiguous entity name");
                None
            }
            _ => None,
        }
    }

    /// Canonical name for `name`, if it matches a known entity exactly after
    /// normalization or closely enough to exactly one by edit distance.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&str> {
        let key = normalize_item(name);
        if key.is_empty() {
            return None;
        }

        self.exact(&key).or_else(|| self.fuzzy(&key))
    }

    /// Splits `names` into the resolved canonical set and the unknown names.
    /// A near miss onto an entity the list already names exactly counts as
    /// unknown.
    pub fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> (BTreeSet<String>, Vec<String>) {
        let keys: Vec<String> = names.iter().map(|n| normalize_item(n.as_ref())).collect();
        let exact: BTreeSet<&str> = keys.iter().filter_map(|k| self.exact(k)).collect();

        let mut resolved = BTreeSet::new();
        let mut unknown = Vec::new();

        for (name, key) in names.iter().zip(&keys) {
            let canonical = if key.is_empty() {
                None
            } else {
                self.exact(key).or_else(|| {
                    self.fuzzy(key)
                        .filter(|canonical| !exact.contains(canonical))
                })
            };

            match canonical {
                Some(canonical) => {
                    resolved.insert(canonical.to_string());
                }
                None => unknown.push(name.as_ref().to_string()),
            }
        }

        (resolved, unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> NameResolver {
        NameResolver::new(["Kementerian Keuangan", "Badan Pusat Statistik"])
    }

    #[test]
    fn test_exact_match_ignores_case_and_spacing() {
        assert_eq!(
            resolver().resolve("  kementerian   KEUANGAN "),
            Some("Kementerian Keuangan")
        );
    }

    #[test]
    fn test_fuzzy_match_tolerates_typo() {
        assert_eq!(
            resolver().resolve("Badan Pusat Statistk"),
            Some("Badan Pusat Statistik")
        );
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(resolver().resolve("Kementerian Agama"), None);
        assert_eq!(resolver().resolve("   "), None);
    }

    #[test]
    fn test_resolve_all_collapses_duplicates() {
        let names = vec![
            "Kementerian Keuangan".to_string(),
            "kementerian keuangan".to_string(),
            "Kementerian Sosial".to_string(),
        ];

        let (resolved, unknown) = resolver().resolve_all(&names);

        assert_eq!(resolved.len(), 1);
        assert_eq!(unknown, vec!["Kementerian Sosial"]);
    }

    #[test]
    fn test_name_near_two_entities_is_ambiguous() {
        let resolver =
            NameResolver::new(["Dinas Pendidikan Kota A", "Dinas Pendidikan Kota B"]);

        assert_eq!(resolver.resolve("Dinas Pendidikan Kota C"), None);
        assert_eq!(
            resolver.resolve("Dinas Pendidikan Kota B"),
            Some("Dinas Pendidikan Kota B")
        );
    }

    #[test]
    fn test_near_miss_onto_listed_entity_is_unknown() {
        let names = ["Badan Pusat Statistik", "Badan Pusat Statistk"];

        let (resolved, unknown) = resolver().resolve_all(&names[..]);

        assert_eq!(resolved, BTreeSet::from(["Badan Pusat Statistik".to_string()]));
        assert_eq!(unknown, vec!["Badan Pusat Statistk"]);
    }

    #[test]
    fn test_strict_threshold_disables_fuzzy() {
        let strict = resolver().with_threshold(1.0);
        assert_eq!(strict.resolve("Badan Pusat Statistk"), None);
    }
}
