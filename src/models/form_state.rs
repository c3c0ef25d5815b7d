use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Longest text answer accepted for a single input, in characters.
pub const MAX_FIELD_CHARS: usize = 500;

/// A single collected answer: free text, or the chosen labels of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Choices(Vec<String>),
}

impl FieldValue {
    /// Blank text and empty selections count as missing.
    pub fn is_filled(&self) -> bool {
        match self {
            FieldValue::Text(s) => !s.trim().is_empty(),
            FieldValue::Choices(c) => !c.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            FieldValue::Choices(_) => None,
        }
    }

    pub fn as_choices(&self) -> &[String] {
        match self {
            FieldValue::Choices(c) => c.as_slice(),
            FieldValue::Text(_) => &[],
        }
    }

    /// Human readable form for summaries.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Text(s) => s.trim().to_string(),
            FieldValue::Choices(c) => c.join(", "),
        }
    }
}

/// Values entered by one visitor across all steps, keyed by synthesized field key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormState(BTreeMap<String, FieldValue>);

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn text(&self, key: &str) -> &str {
        self.0.get(key).and_then(FieldValue::as_text).unwrap_or("")
    }

    pub fn choices(&self, key: &str) -> &[String] {
        self.0.get(key).map(FieldValue::as_choices).unwrap_or(&[])
    }

    pub fn set_text(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), FieldValue::Text(value.to_string()));
    }

    /// Add `option` to the selection if absent, remove it if present.
    /// Selection order follows toggling order, not declaration order.
    pub fn toggle_choice(&mut self, key: &str, option: &str) {
        let entry = self
            .0
            .entry(key.to_string())
            .or_insert_with(|| FieldValue::Choices(Vec::new()));
        if let FieldValue::Text(_) = entry {
            *entry = FieldValue::Choices(Vec::new());
        }
        if let FieldValue::Choices(selected) = entry {
            if let Some(pos) = selected.iter().position(|s| s == option) {
                selected.remove(pos);
            } else {
                selected.push(option.to_string());
            }
        }
    }

    pub fn is_selected(&self, key: &str, option: &str) -> bool {
        self.choices(key).iter().any(|s| s == option)
    }

    pub fn is_filled(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(FieldValue::is_filled)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}
