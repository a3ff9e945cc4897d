use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use super::error::InvalidInput;

/// Identifier of a questionnaire item: a positional index or a category-prefixed key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnswerKey {
    Index(u32),
    Named(String),
}

impl AnswerKey {
    /// Canonical decimal keys (`"0"`, `"17"`) are positional, anything else is named.
    ///
    /// `"03"`, `" 3"` and `"+3"` stay named so they never collide with question 3.
    pub fn parse(raw: &str) -> Self {
        let canonical = !raw.is_empty()
            && raw.bytes().all(|byte| byte.is_ascii_digit())
            && (raw == "0" || !raw.starts_with('0'));
        match raw.parse::<u32>() {
            Ok(index) if canonical => AnswerKey::Index(index),
            _ => AnswerKey::Named(raw.to_string()),
        }
    }
}

impl fmt::Display for AnswerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerKey::Index(index) => write!(f, "{index}"),
            AnswerKey::Named(name) => f.write_str(name),
        }
    }
}

/// Questionnaire answers keyed by item. Only finite numeric values are retained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerSet {
    values: BTreeMap<AnswerKey, f64>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer. Non-finite values are dropped rather than stored.
    pub fn insert(&mut self, key: AnswerKey, value: f64) {
        if value.is_finite() {
            self.values.insert(key, value);
        }
    }

    pub fn get(&self, key: &AnswerKey) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AnswerKey, f64)> {
        self.values.iter().map(|(key, value)| (key, *value))
    }

    /// Decode the `respostas` payload sent by the questionnaire front end.
    ///
    /// Objects map keys through [`AnswerKey::parse`]; arrays are positional. Entries whose
    /// value is not numeric (or a numeric string) are skipped. Anything that is not an
    /// object or an array has no keyed semantics and is rejected.
    pub fn from_json(value: &Value) -> Result<Self, InvalidInput> {
        let mut answers = AnswerSet::new();
        match value {
            Value::Object(entries) => {
                for (raw_key, raw_value) in entries {
                    if let Some(number) = numeric_value(raw_value) {
                        answers.insert(AnswerKey::parse(raw_key), number);
                    }
                }
                Ok(answers)
            }
            Value::Array(items) => {
                let positional = items.is_empty()
                    || items
                        .iter()
                        .any(|item| item.is_null() || numeric_value(item).is_some());
                if !positional {
                    return Err(InvalidInput::AnswersNotNumeric);
                }

                for (index, item) in items.iter().enumerate() {
                    let Ok(index) = u32::try_from(index) else {
                        break;
                    };
                    if let Some(number) = numeric_value(item) {
                        answers.insert(AnswerKey::Index(index), number);
                    }
                }
                Ok(answers)
            }
            other => Err(InvalidInput::AnswersNotKeyed {
                found: json_kind(other),
            }),
        }
    }
}

impl FromIterator<(AnswerKey, f64)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (AnswerKey, f64)>>(iter: T) -> Self {
        let mut answers = AnswerSet::new();
        for (key, value) in iter {
            answers.insert(key, value);
        }
        answers
    }
}

/// Interpret a JSON value as a finite number, accepting numeric strings.
pub fn numeric_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
