use serde::{Deserialize, Serialize};

use super::answers::{AnswerKey, AnswerSet};

/// Rule deciding which answers belong to a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySelector {
    /// Inclusive positional range, e.g. questions 0..=9.
    Range { start: u32, end: u32 },
    /// Every named key beginning with the prefix, e.g. `tesouraria1`, `tesouraria2`.
    Prefix(String),
}

impl KeySelector {
    pub fn matches(&self, key: &AnswerKey) -> bool {
        match (self, key) {
            (KeySelector::Range { start, end }, AnswerKey::Index(index)) => {
                (*start..=*end).contains(index)
            }
            (KeySelector::Prefix(prefix), AnswerKey::Named(name)) => name.starts_with(prefix),
            _ => false,
        }
    }

    /// Answers selected by this rule, in key order.
    ///
    /// Ranges wider than the answer set are resolved by scanning the answers instead.
    pub fn select<'a>(&'a self, answers: &'a AnswerSet) -> Box<dyn Iterator<Item = f64> + 'a> {
        match self {
            KeySelector::Range { start, end } if range_width(*start, *end) <= answers.len() => {
                Box::new(
                    (*start..=*end)
                        .filter_map(move |index| answers.get(&AnswerKey::Index(index))),
                )
            }
            KeySelector::Range { .. } | KeySelector::Prefix(_) => Box::new(
                answers
                    .iter()
                    .filter(move |(key, _)| self.matches(key))
                    .map(|(_, value)| value),
            ),
        }
    }
}

fn range_width(start: u32, end: u32) -> usize {
    if end < start {
        0
    } else {
        usize::try_from(u64::from(end - start) + 1).unwrap_or(usize::MAX)
    }
}

/// One thematic grouping of questionnaire items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub label: String,
    pub selector: KeySelector,
}

impl CategoryDefinition {
    pub fn range(label: impl Into<String>, start: u32, end: u32) -> Self {
        Self {
            label: label.into(),
            selector: KeySelector::Range { start, end },
        }
    }

    pub fn prefix(label: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            selector: KeySelector::Prefix(prefix.into()),
        }
    }
}
