use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Response is empty")]
    Empty,
    #[error("Response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Expected a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("Field `{field}` has the wrong shape: expected {expected}, got {found}")]
    InvalidField {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

pub type SchemaResult<T> = Result<T, SchemaError>;

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Removes a surrounding Markdown code fence (```json ... ```), if any.
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();

    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };

    let after_open = &trimmed[start + 3..];
    let body_start = after_open.find('\n').map_or(after_open.len(), |i| i + 1);
    let body = &after_open[body_start..];

    match body.rfind("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Parses the response text into a JSON object, tolerating a code fence and
/// prose around the object.
pub fn parse_object(text: &str) -> SchemaResult<Map<String, Value>> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(SchemaError::Empty);
    }

    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(err) => match (body.find('{'), body.rfind('}')) {
            (Some(open), Some(close)) if open < close => {
                serde_json::from_str::<Value>(&body[open..=close]).map_err(|_| err)?
            }
            _ => return Err(err.into()),
        },
    };

    match value {
        Value::Object(map) => Ok(map),
        other => Err(SchemaError::NotAnObject(type_name(&other))),
    }
}

/// Read-only view over a response object that looks fields up by any of
/// several accepted key spellings. Absent and `null` fields read as missing;
/// fields of the wrong type are schema errors.
#[derive(Clone, Copy)]
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    #[must_use]
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }

    fn lookup(&self, keys: &[&'static str]) -> Option<(&'static str, &'a Value)> {
        keys.iter().find_map(|key| {
            self.map
                .get(*key)
                .filter(|value| !value.is_null())
                .map(|value| (*key, value))
        })
    }

    pub fn string(&self, keys: &[&'static str]) -> SchemaResult<Option<String>> {
        match self.lookup(keys) {
            None => Ok(None),
            Some((_, Value::String(s))) => Ok(Some(s.trim().to_string())),
            Some((_, Value::Number(n))) => Ok(Some(n.to_string())),
            Some((field, other)) => Err(SchemaError::InvalidField {
                field: field.to_string(),
                expected: "string",
                found: type_name(other),
            }),
        }
    }

    pub fn string_list(&self, keys: &[&'static str]) -> SchemaResult<Vec<String>> {
        let Some((field, value)) = self.lookup(keys) else {
            return Ok(Vec::new());
        };

        let Value::Array(items) = value else {
            return Err(SchemaError::InvalidField {
                field: field.to_string(),
                expected: "array of strings",
                found: type_name(value),
            });
        };

        items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(SchemaError::InvalidField {
                    field: field.to_string(),
                    expected: "array of strings",
                    found: type_name(other),
                }),
            })
            .collect()
    }

    /// Numbers, or strings holding a number (e.g. "15%" or "10-15%", first
    /// number wins).
    pub fn number(&self, keys: &[&'static str]) -> SchemaResult<Option<f64>> {
        match self.lookup(keys) {
            None => Ok(None),
            Some((_, Value::Number(n))) => Ok(n.as_f64()),
            Some((_, Value::String(s))) => Ok(first_number(s)),
            Some((field, other)) => Err(SchemaError::InvalidField {
                field: field.to_string(),
                expected: "number",
                found: type_name(other),
            }),
        }
    }

    pub fn objects(&self, keys: &[&'static str]) -> SchemaResult<Vec<&'a Map<String, Value>>> {
        let Some((field, value)) = self.lookup(keys) else {
            return Ok(Vec::new());
        };

        let Value::Array(items) = value else {
            return Err(SchemaError::InvalidField {
                field: field.to_string(),
                expected: "array of objects",
                found: type_name(value),
            });
        };

        items
            .iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                other => Err(SchemaError::InvalidField {
                    field: field.to_string(),
                    expected: "array of objects",
                    found: type_name(other),
                }),
            })
            .collect()
    }

    pub fn object(&self, keys: &[&'static str]) -> SchemaResult<Option<Fields<'a>>> {
        match self.lookup(keys) {
            None => Ok(None),
            Some((_, Value::Object(map))) => Ok(Some(Fields::new(map))),
            Some((field, other)) => Err(SchemaError::InvalidField {
                field: field.to_string(),
                expected: "object",
                found: type_name(other),
            }),
        }
    }
}

fn first_number(s: &str) -> Option<f64> {
    static NUMBER: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = NUMBER.get_or_init(|| {
        regex::Regex::new(r"-?\d+(?:[.,]\d+)?").unwrap_or_else(|_| unreachable!())
    });

    re.find(s)
        .and_then(|m| m.as_str().replace(',', ".").parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(strip_code_fence("Here you go:\n```json\n{}\n```\nDone."), "{}");
    }

    #[test]
    fn test_parse_object_with_surrounding_prose() {
        let map = parse_object("Sure! {\"programs\": [\"A\"]} Hope that helps.").unwrap();
        assert!(map.contains_key("programs"));
    }

    #[test]
    fn test_parse_object_rejects_non_json() {
        assert!(matches!(
            parse_object("I could not find any mandate data."),
            Err(SchemaError::InvalidJson(_))
        ));
        assert!(matches!(parse_object("```json\n```"), Err(SchemaError::Empty)));
    }

    #[test]
    fn test_parse_object_rejects_arrays() {
        assert!(matches!(
            parse_object("[1, 2, 3]"),
            Err(SchemaError::NotAnObject("array"))
        ));
    }

    #[test]
    fn test_fields_absent_vs_malformed() {
        let map = parse_object(r#"{"functions": null, "programs": "oops", "targets": ["a", 2]}"#)
            .unwrap();
        let fields = Fields::new(&map);

        assert!(fields.string_list(&["core_duties"]).unwrap().is_empty());
        assert!(fields.string_list(&["functions"]).unwrap().is_empty());
        assert!(matches!(
            fields.string_list(&["programs"]),
            Err(SchemaError::InvalidField { expected: "array of strings", found: "string", .. })
        ));
        assert_eq!(fields.string_list(&["targets"]).unwrap(), vec!["a", "2"]);
    }

    #[test]
    fn test_fields_aliases() {
        let map = parse_object(r#"{"tugas_pokok": ["x"]}"#).unwrap();
        let fields = Fields::new(&map);
        assert_eq!(fields.string_list(&["core_duties", "tugas_pokok"]).unwrap(), vec!["x"]);
    }

    #[test]
    fn test_null_alias_falls_through() {
        let map = parse_object(r#"{"core_duties": null, "tugas_pokok": ["Koordinasi"]}"#).unwrap();
        let fields = Fields::new(&map);
        assert_eq!(
            fields.string_list(&["core_duties", "tugas_pokok"]).unwrap(),
            vec!["Koordinasi"]
        );
    }

    #[test]
    fn test_number_from_text() {
        let map = parse_object(r#"{"a": "10-15%", "b": 12.5, "c": "n/a", "d": "7,5 persen"}"#)
            .unwrap();
        let fields = Fields::new(&map);

        assert_eq!(fields.number(&["a"]).unwrap(), Some(10.0));
        assert_eq!(fields.number(&["b"]).unwrap(), Some(12.5));
        assert_eq!(fields.number(&["c"]).unwrap(), None);
        assert_eq!(fields.number(&["d"]).unwrap(), Some(7.5));
        assert_eq!(fields.number(&["missing"]).unwrap(), None);
    }
}
