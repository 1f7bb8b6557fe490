//! Predicates over observed values and thrown errors

use crate::surface::ValueKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A check applied to a returned/resolved value, or to the JSON view of a
/// thrown error (`{"kind": ..., "message": ...}`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Matches anything
    #[default]
    Any,
    /// Exact equality
    Equals(Value),
    /// Expected value is a subset of the actual value (objects match by key)
    Matches(Value),
    /// Value has the given runtime category
    OfKind(ValueKind),
    /// String value contains the substring
    Contains(String),
    /// Thrown error message contains the substring
    MessageContains(String),
    /// Thrown error kind equals
    ErrorKind(String),
    /// Object has all of the listed keys
    HasFields(Vec<String>),
    /// Array contains an element matching the value (subset match)
    Includes(Value),
    /// Array, string or object has exactly this many elements
    Length(usize),
    /// Value at a dot-separated path satisfies a nested predicate
    Field { path: String, matches: Box<Predicate> },
    /// All nested predicates hold
    AllOf(Vec<Predicate>),
    /// The nested predicate does not hold
    Not(Box<Predicate>),
}

impl Predicate {
    /// Evaluate against a subject, returning a reason on mismatch
    pub fn check(&self, subject: &Value) -> Result<(), String> {
        match self {
            Predicate::Any => Ok(()),
            Predicate::Equals(expected) => {
                if expected == subject {
                    Ok(())
                } else {
                    Err(format!("expected {}, got {}", expected, subject))
                }
            }
            Predicate::Matches(expected) => {
                if values_match(expected, subject) {
                    Ok(())
                } else {
                    Err(format!("expected value matching {}, got {}", expected, subject))
                }
            }
            Predicate::OfKind(kind) => {
                let actual = ValueKind::of(subject);
                if kind.accepts(actual) {
                    Ok(())
                } else {
                    Err(format!("expected {} value, got {}", kind, actual))
                }
            }
            Predicate::Contains(needle) => match subject {
                Value::String(s) if s.contains(needle.as_str()) => Ok(()),
                Value::String(s) => Err(format!("expected text containing '{}', got '{}'", needle, s)),
                other => Err(format!(
                    "expected text containing '{}', got {} value",
                    needle,
                    ValueKind::of(other)
                )),
            },
            Predicate::MessageContains(needle) => match subject.get("message").and_then(Value::as_str) {
                Some(message) if message.contains(needle.as_str()) => Ok(()),
                Some(message) => Err(format!(
                    "expected message containing '{}', got '{}'",
                    needle, message
                )),
                None => Err(format!("expected message containing '{}', got no message", needle)),
            },
            Predicate::ErrorKind(kind) => match subject.get("kind").and_then(Value::as_str) {
                Some(actual) if actual == kind => Ok(()),
                Some(actual) => Err(format!("expected error kind '{}', got '{}'", kind, actual)),
                None => Err(format!("expected error kind '{}', got no kind", kind)),
            },
            Predicate::HasFields(fields) => {
                let Some(obj) = subject.as_object() else {
                    return Err(format!("expected object, got {}", ValueKind::of(subject)));
                };
                let missing: Vec<&str> = fields
                    .iter()
                    .filter(|f| !obj.contains_key(f.as_str()))
                    .map(|f| f.as_str())
                    .collect();
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(format!("missing fields: {}", missing.join(", ")))
                }
            }
            Predicate::Includes(expected) => match subject {
                Value::Array(items) if items.iter().any(|item| values_match(expected, item)) => Ok(()),
                Value::Array(_) => Err(format!("expected array including {}, got {}", expected, subject)),
                other => Err(format!("expected array, got {}", ValueKind::of(other))),
            },
            Predicate::Length(expected) => {
                let actual = match subject {
                    Value::Array(items) => items.len(),
                    Value::String(s) => s.chars().count(),
                    Value::Object(obj) => obj.len(),
                    other => {
                        return Err(format!(
                            "expected length {}, got {} value",
                            expected,
                            ValueKind::of(other)
                        ));
                    }
                };
                if actual == *expected {
                    Ok(())
                } else {
                    Err(format!("expected length {}, got {}", expected, actual))
                }
            }
            Predicate::Field { path, matches } => match json_path(subject, path) {
                Some(value) => matches
                    .check(value)
                    .map_err(|reason| format!("at '{}': {}", path, reason)),
                None => Err(format!("no value at '{}'", path)),
            },
            Predicate::AllOf(predicates) => {
                let reasons: Vec<String> = predicates
                    .iter()
                    .filter_map(|p| p.check(subject).err())
                    .collect();
                if reasons.is_empty() {
                    Ok(())
                } else {
                    Err(reasons.join("; "))
                }
            }
            Predicate::Not(inner) => match inner.check(subject) {
                Ok(()) => Err(format!("expected value not matching {:?}", inner)),
                Err(_) => Ok(()),
            },
        }
    }

    /// The message substring this predicate expects of a thrown error, used
    /// to enrich diagnostics when the outcome kind itself diverged
    pub fn expected_message(&self) -> Option<&str> {
        match self {
            Predicate::MessageContains(needle) => Some(needle.as_str()),
            Predicate::AllOf(predicates) => predicates.iter().find_map(|p| p.expected_message()),
            _ => None,
        }
    }
}

/// Simple JSON path getter (dot notation, numeric segments index arrays)
pub(crate) fn json_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for key in path.split('.').filter(|k| !k.is_empty()) {
        match current {
            Value::Object(obj) => {
                current = obj.get(key)?;
            }
            Value::Array(arr) => {
                let idx: usize = key.parse().ok()?;
                current = arr.get(idx)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Check if expected value matches actual (partial match for objects)
pub(crate) fn values_match(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Object(exp_obj), Value::Object(act_obj)) => exp_obj
            .iter()
            .all(|(k, v)| act_obj.get(k).is_some_and(|av| values_match(v, av))),
        (Value::Array(exp_arr), Value::Array(act_arr)) => {
            exp_arr.len() == act_arr.len()
                && exp_arr
                    .iter()
                    .zip(act_arr.iter())
                    .all(|(e, a)| values_match(e, a))
        }
        _ => expected == actual,
    }
}

#[cfg(test)]
mod predicate_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_contains_reports_actual_message() {
        let thrown = json!({"kind": "InitError", "message": "no providers available"});

        assert!(Predicate::MessageContains("no providers".into()).check(&thrown).is_ok());

        let err = Predicate::MessageContains("could not be initialized".into())
            .check(&thrown)
            .unwrap_err();
        assert!(err.contains("could not be initialized"));
        assert!(err.contains("no providers available"));
    }

    #[test]
    fn test_matches_is_partial_for_objects() {
        let actual = json!({"name": "greet", "description": "Greets", "tags": []});
        assert!(Predicate::Matches(json!({"name": "greet"})).check(&actual).is_ok());
        assert!(Predicate::Matches(json!({"name": "other"})).check(&actual).is_err());
        assert!(Predicate::Equals(json!({"name": "greet"})).check(&actual).is_err());
    }

    #[test]
    fn test_field_and_includes() {
        let actual = json!({"tools": [{"name": "greet"}, {"name": "sum"}]});
        let predicate = Predicate::Field {
            path: "tools".into(),
            matches: Box::new(Predicate::AllOf(vec![
                Predicate::Length(2),
                Predicate::Includes(json!({"name": "sum"})),
            ])),
        };
        assert!(predicate.check(&actual).is_ok());

        let missing = Predicate::Field {
            path: "tools.5.name".into(),
            matches: Box::new(Predicate::Any),
        };
        assert!(missing.check(&actual).unwrap_err().contains("no value"));
    }

    #[test]
    fn test_not_and_of_kind() {
        assert!(Predicate::OfKind(ValueKind::Array).check(&json!([])).is_ok());
        assert!(Predicate::OfKind(ValueKind::Array).check(&json!({})).is_err());
        assert!(Predicate::Not(Box::new(Predicate::Equals(json!(null))))
            .check(&json!(1))
            .is_ok());
    }

    #[test]
    fn test_serde_shape() {
        let predicate: Predicate =
            serde_json::from_value(json!({"message_contains": "could not be initialized"})).unwrap();
        assert_eq!(predicate.expected_message(), Some("could not be initialized"));

        let any: Predicate = serde_json::from_value(json!("any")).unwrap();
        assert_eq!(any, Predicate::Any);
    }
}
