use crate::models::form_state::FormState;
use crate::models::funnel::{Component, ComponentKind, FunnelDefinition};

/// One line of the read-only summary on the confirmation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub key: String,
    pub label: String,
    pub value: String,
}

/// Fallback label inferred from the field key prefix. Two `text_` fields both read "Name".
pub fn label_from_key(key: &str) -> &'static str {
    if key.starts_with("text_") {
        "Name"
    } else if key.starts_with("email_") {
        "E-Mail"
    } else if key.starts_with("tel_") {
        "Telefon"
    } else {
        "Angabe"
    }
}

/// Explicit label, then semantic role, then question text, then the key prefix.
pub fn field_label(component: &Component) -> String {
    if let Some(label) = component.explicit_label() {
        return label.to_string();
    }
    if let Some(role) = component.semantic_role() {
        return role.label().to_string();
    }
    match &component.kind {
        ComponentKind::MultipleChoice { text, .. } if !text.trim().is_empty() => text.trim().to_string(),
        _ => label_from_key(&component.field_key().unwrap_or_default()).to_string(),
    }
}

/// Summarize collected answers in definition order. Keys no component claims
/// (left over from an older definition) come last.
pub fn summarize(def: &FunnelDefinition, form: &FormState) -> Vec<SummaryRow> {
    let mut rows = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    for (_, component) in def.components() {
        let Some(key) = component.field_key() else { continue };
        if seen.contains(&key) {
            continue;
        }
        if let Some(value) = form.get(&key).filter(|v| v.is_filled()) {
            rows.push(SummaryRow { key: key.clone(), label: field_label(component), value: value.display() });
        }
        seen.push(key);
    }

    for (key, value) in form.iter() {
        if seen.contains(key) || !value.is_filled() {
            continue;
        }
        rows.push(SummaryRow {
            key: key.clone(),
            label: label_from_key(key).to_string(),
            value: value.display(),
        });
    }
    rows
}
