//! Lead payload construction and the submission flow.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use super::confirmation::field_label;
use super::navigation::{FunnelViewer, Transition, ValidationError, ViewerMode};
use crate::api::{ApiError, ContactPayload, FunnelBackend, LeadSubmission};
use crate::models::form_state::{FieldValue, FormState};
use crate::models::funnel::{ComponentKind, FunnelDefinition, SemanticRole};

/// Lowercase ASCII identifier with `_` between words. German umlauts are spelled out
/// (`ü` → `ue`) before the remaining characters are transliterated.
pub fn to_snake_case(input: &str) -> String {
    let mut folded = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            'ä' => folded.push_str("ae"),
            'ö' => folded.push_str("oe"),
            'ü' => folded.push_str("ue"),
            'Ä' => folded.push_str("Ae"),
            'Ö' => folded.push_str("Oe"),
            'Ü' => folded.push_str("Ue"),
            'ß' => folded.push_str("ss"),
            other => folded.push(other),
        }
    }
    slug::slugify(folded).replace('-', "_")
}

/// Split "Max von Muster" into ("Max", "von Muster").
fn split_name(full: &str) -> (String, String) {
    let full = full.trim();
    match full.split_once(char::is_whitespace) {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (full.to_string(), String::new()),
    }
}

#[derive(Default)]
struct ContactFields {
    first_name: Option<String>,
    last_name: Option<String>,
    full_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

/// Role of an input: explicit `semanticRole` first, then the key prefix.
fn role_for(key: &str, explicit: Option<SemanticRole>) -> SemanticRole {
    if let Some(role) = explicit {
        return role;
    }
    if key.starts_with("text_") {
        SemanticRole::FullName
    } else if key.starts_with("email_") {
        SemanticRole::Email
    } else if key.starts_with("tel_") {
        SemanticRole::Phone
    } else {
        SemanticRole::Other
    }
}

/// Build the contact record from collected answers.
///
/// The first value for each contact role wins. Multiple-choice answers and any
/// further labelled inputs land in `additional_data`, keyed by the snake_cased
/// question or label; multi-select answers are comma-joined.
pub fn build_contact(def: &FunnelDefinition, form: &FormState, now: DateTime<Utc>) -> ContactPayload {
    let mut contact = ContactFields::default();
    let mut additional_data = BTreeMap::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (_, component) in def.components() {
        let Some(key) = component.field_key() else { continue };
        if !seen.insert(key.clone()) {
            continue;
        }
        let Some(value) = form.get(&key).filter(|v| v.is_filled()) else { continue };

        match (&component.kind, value) {
            (ComponentKind::MultipleChoice { text, .. }, FieldValue::Choices(selected)) => {
                let question = component.explicit_label().unwrap_or(text.as_str());
                let mut data_key = to_snake_case(question);
                if data_key.is_empty() {
                    data_key = key.clone();
                }
                let answers: Vec<String> = selected.iter().map(|s| to_snake_case(s)).collect();
                additional_data.insert(data_key, answers.join(","));
            }
            (ComponentKind::Input { .. }, FieldValue::Text(text)) => {
                let text = text.trim().to_string();
                let slot = match role_for(&key, component.semantic_role()) {
                    SemanticRole::FirstName => &mut contact.first_name,
                    SemanticRole::LastName => &mut contact.last_name,
                    SemanticRole::FullName => &mut contact.full_name,
                    SemanticRole::Email => &mut contact.email,
                    SemanticRole::Phone => &mut contact.phone,
                    SemanticRole::Other => {
                        additional_data.insert(to_snake_case(&field_label(component)), text);
                        continue;
                    }
                };
                if slot.is_none() {
                    *slot = Some(text);
                } else if let Some(label) = component.explicit_label() {
                    additional_data.insert(to_snake_case(label), text);
                }
            }
            _ => {}
        }
    }

    let (split_first, split_last) = contact.full_name.as_deref().map(split_name).unwrap_or_default();
    ContactPayload {
        first_name: contact.first_name.unwrap_or(split_first),
        last_name: contact.last_name.unwrap_or(split_last),
        email: contact.email.unwrap_or_default(),
        phone: contact.phone.unwrap_or_default(),
        pipeline_id: def.pipeline_id.clone(),
        stage_id: def.stage_id.clone(),
        company_id: def.company_id.clone(),
        additional_data,
        created_at: now,
    }
}

pub fn build_lead(form: &FormState, step_id: &str) -> LeadSubmission {
    LeadSubmission { lead_data: form.clone(), step_id: step_id.to_string() }
}

/// Create the contact, then record the lead against the funnel step.
pub async fn send_lead(
    backend: &dyn FunnelBackend,
    def: &FunnelDefinition,
    form: &FormState,
    step_id: &str,
) -> Result<(), ApiError> {
    let contact = build_contact(def, form, Utc::now());
    backend.create_contact(&contact).await?;
    backend.submit_lead(&def.slug, &build_lead(form, step_id)).await
}

/// Process-wide set of submissions currently in flight, keyed by (visitor, funnel).
#[derive(Clone, Default)]
pub struct SubmissionGuard {
    in_flight: Arc<Mutex<HashSet<(String, String)>>>,
}

/// Held while a submission is running; releases its slot on drop.
pub struct SubmissionTicket {
    in_flight: Arc<Mutex<HashSet<(String, String)>>>,
    key: (String, String),
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for this visitor and funnel, or `None` if a submission is already running.
    pub fn try_begin(&self, visitor_id: &str, slug: &str) -> Option<SubmissionTicket> {
        let key = (visitor_id.to_string(), slug.to_string());
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(key.clone()) {
            return None;
        }
        Some(SubmissionTicket { in_flight: Arc::clone(&self.in_flight), key })
    }

    pub fn is_in_flight(&self, visitor_id: &str, slug: &str) -> bool {
        let set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        set.contains(&(visitor_id.to_string(), slug.to_string()))
    }
}

impl Drop for SubmissionTicket {
    fn drop(&mut self) {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.key);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    Validation(ValidationError),
    InFlight,
    Api(ApiError),
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Validation(e) => write!(f, "{e}"),
            SubmitError::InFlight => write!(f, "Submission already in progress"),
            SubmitError::Api(e) => write!(f, "{e}"),
        }
    }
}

impl SubmitError {
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Validation(e) => e.message.clone(),
            SubmitError::InFlight => "Ihre Anfrage wird bereits gesendet.".to_string(),
            SubmitError::Api(e) => e.user_message(),
        }
    }
}

/// Final submission from the confirmation step.
///
/// Nothing is sent unless the visitor is confirming and has accepted the terms.
/// On success the viewer is reset to the first step; on failure it is left as it was.
pub async fn submit_confirmed(
    backend: &dyn FunnelBackend,
    guard: &SubmissionGuard,
    visitor_id: &str,
    viewer: &mut FunnelViewer,
    def: &FunnelDefinition,
) -> Result<(), SubmitError> {
    let step_id = viewer.ready_for_submission(def).map_err(SubmitError::Validation)?;
    let Some(_ticket) = guard.try_begin(visitor_id, &def.slug) else {
        return Err(SubmitError::InFlight);
    };
    match send_lead(backend, def, &viewer.form, step_id).await {
        Ok(()) => {
            log::info!("Lead submitted for funnel '{}'", def.slug);
            viewer.reset();
            Ok(())
        }
        Err(e) => {
            log::error!("Lead submission for funnel '{}' failed: {e}", def.slug);
            Err(SubmitError::Api(e))
        }
    }
}

/// Simple-mode submission of the current step, followed by the forward move.
/// Passing the last step resets the viewer.
pub async fn submit_step(
    backend: &dyn FunnelBackend,
    guard: &SubmissionGuard,
    visitor_id: &str,
    viewer: &mut FunnelViewer,
    def: &FunnelDefinition,
    step_id: &str,
) -> Result<Transition, SubmitError> {
    let Some(_ticket) = guard.try_begin(visitor_id, &def.slug) else {
        return Err(SubmitError::InFlight);
    };
    if let Err(e) = send_lead(backend, def, &viewer.form, step_id).await {
        log::error!("Step lead for funnel '{}' step '{step_id}' failed: {e}", def.slug);
        return Err(SubmitError::Api(e));
    }
    log::info!("Step lead submitted for funnel '{}' step '{step_id}'", def.slug);
    let transition = viewer.next(def, ViewerMode::Simple).map_err(SubmitError::Validation)?;
    if transition == Transition::Completed {
        viewer.reset();
    }
    Ok(transition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_question() {
        assert_eq!(to_snake_case("Wie viele Mitarbeiter?"), "wie_viele_mitarbeiter");
    }

    #[test]
    fn snake_case_folds_umlauts() {
        assert_eq!(to_snake_case("Büro"), "buero");
        assert_eq!(to_snake_case("Größe des Unternehmens"), "groesse_des_unternehmens");
        assert_eq!(to_snake_case("Ärger & Ölpreis"), "aerger_oelpreis");
    }

    #[test]
    fn snake_case_answers() {
        assert_eq!(to_snake_case("10-50"), "10_50");
        assert_eq!(to_snake_case("  Mehr als 100!  "), "mehr_als_100");
        assert_eq!(to_snake_case("Café"), "cafe");
        assert_eq!(to_snake_case("???"), "");
    }

    #[test]
    fn splits_full_name_once() {
        assert_eq!(split_name(" Max von Muster "), ("Max".to_string(), "von Muster".to_string()));
        assert_eq!(split_name("Cher"), ("Cher".to_string(), String::new()));
    }

    #[test]
    fn guard_releases_on_drop() {
        let guard = SubmissionGuard::new();
        let ticket = guard.try_begin("v1", "demo");
        assert!(ticket.is_some());
        assert!(guard.try_begin("v1", "demo").is_none());
        assert!(guard.try_begin("v2", "demo").is_some());
        drop(ticket);
        assert!(!guard.is_in_flight("v1", "demo"));
        assert!(guard.try_begin("v1", "demo").is_some());
    }
}
