//! Shared test infrastructure: funnel fixtures, a recording backend and a
//! minimal cookie jar for driving the viewer through `actix_web::test`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::test::TestRequest;
use async_trait::async_trait;

use funnelview::api::{ApiError, ContactPayload, FunnelBackend, LeadSubmission, TrackEvent};
use funnelview::engine::{FunnelViewer, NavigationState, ViewerMode};
use funnelview::models::funnel::{ComponentKind, FunnelDefinition};

// ============================================================================
// FIXTURES
// ============================================================================

/// Step 1: one text input and a button. Step 2: one email input and a button.
pub const TWO_STEP_FUNNEL: &str = r#"{
    "id": 11,
    "name": "Demo Funnel",
    "slug": "demo",
    "status": "active",
    "pipelineId": 7,
    "stageId": "42",
    "companyId": 3,
    "design": {
        "steps": [
            {
                "id": "s1",
                "title": "Ihr Name",
                "components": [
                    { "id": "h1", "type": "heading", "level": "h2", "text": "Willkommen" },
                    { "id": "name", "type": "input", "inputType": "text" },
                    { "id": "next1", "type": "button", "text": "Weiter" }
                ]
            },
            {
                "id": "s2",
                "title": "Kontakt",
                "components": [
                    { "id": "mail", "type": "input", "inputType": "email" },
                    { "id": "submit2", "type": "button", "text": "Absenden" }
                ]
            }
        ],
        "settings": { "showProgressBar": true }
    }
}"#;

/// Three steps: a choice-only step, a linked button next to a text input, and contact data.
pub const THREE_STEP_FUNNEL: &str = r#"{
    "id": "f-3",
    "name": "Angebot",
    "slug": "angebot",
    "status": "active",
    "design": {
        "steps": [
            {
                "id": "q",
                "title": "Ihr Unternehmen",
                "components": [
                    {
                        "id": "size",
                        "type": "multiplechoice",
                        "text": "Wie viele Mitarbeiter?",
                        "options": ["1-10", "10-50", "Mehr als 50"]
                    },
                    { "id": "go", "type": "button", "text": "Weiter" }
                ]
            },
            {
                "id": "details",
                "title": "Details",
                "components": [
                    { "id": "city", "type": "input", "inputType": "text", "label": "Stadt", "semanticRole": "other" },
                    { "id": "info", "type": "button", "text": "Mehr erfahren", "link": "https://example.com/info" }
                ]
            },
            {
                "id": "contact",
                "title": "Kontakt",
                "components": [
                    { "id": "who", "type": "input", "inputType": "text" },
                    { "id": "mail", "type": "input", "inputType": "email" },
                    { "id": "phone", "type": "input", "inputType": "tel" },
                    { "id": "send", "type": "button", "text": "Absenden" }
                ]
            }
        ]
    }
}"#;

pub fn two_step_funnel() -> FunnelDefinition {
    FunnelDefinition::from_json(TWO_STEP_FUNNEL).expect("Failed to parse two-step fixture")
}

pub fn three_step_funnel() -> FunnelDefinition {
    FunnelDefinition::from_json(THREE_STEP_FUNNEL).expect("Failed to parse three-step fixture")
}

/// The two-step fixture without its buttons, so each step only has the nav "next" button.
pub fn buttonless_funnel() -> FunnelDefinition {
    let mut def = two_step_funnel();
    for step in &mut def.design.steps {
        step.components.retain(|c| !matches!(c.kind, ComponentKind::Button { .. }));
    }
    def
}

pub fn inactive_funnel() -> FunnelDefinition {
    let mut def = two_step_funnel();
    def.status = funnelview::models::funnel::FunnelStatus::Inactive;
    def
}

/// A viewer that has filled both steps of the two-step fixture and reached confirmation.
pub fn confirming_viewer(def: &FunnelDefinition) -> FunnelViewer {
    let mut viewer = FunnelViewer::new();
    viewer.update_fields(def, [("text_name", "Max Mustermann")]).unwrap();
    viewer.next(def, ViewerMode::Full).expect("step 1 should validate");
    viewer.update_fields(def, [("email_mail", "max@example.de")]).unwrap();
    viewer.next(def, ViewerMode::Full).expect("step 2 should validate");
    assert_eq!(viewer.nav, NavigationState::Confirming);
    viewer
}

// ============================================================================
// RECORDING BACKEND
// ============================================================================

/// In-memory `FunnelBackend` that records every call it receives.
#[derive(Default)]
pub struct MockBackend {
    funnels: Mutex<HashMap<String, Result<FunnelDefinition, ApiError>>>,
    pub tracks: Mutex<Vec<TrackEvent>>,
    pub contacts: Mutex<Vec<ContactPayload>>,
    pub leads: Mutex<Vec<(String, LeadSubmission)>>,
    /// Delay applied inside `create_contact`, to hold a submission in flight.
    pub submit_delay: Mutex<Option<Duration>>,
    /// Error returned by `create_contact` instead of succeeding.
    pub contact_error: Mutex<Option<ApiError>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_funnel(slug: &str, def: FunnelDefinition) -> Self {
        let backend = Self::new();
        backend.add_funnel(slug, def);
        backend
    }

    pub fn add_funnel(&self, slug: &str, def: FunnelDefinition) {
        self.funnels.lock().unwrap().insert(slug.to_string(), Ok(def));
    }

    pub fn fail_fetch(&self, slug: &str, error: ApiError) {
        self.funnels.lock().unwrap().insert(slug.to_string(), Err(error));
    }

    pub fn fail_contacts(&self, error: ApiError) {
        *self.contact_error.lock().unwrap() = Some(error);
    }

    pub fn delay_submissions(&self, delay: Duration) {
        *self.submit_delay.lock().unwrap() = Some(delay);
    }

    pub fn tracked_steps(&self) -> Vec<Option<String>> {
        self.tracks.lock().unwrap().iter().map(|t| t.step_id.clone()).collect()
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.lock().unwrap().len()
    }

    pub fn lead_count(&self) -> usize {
        self.leads.lock().unwrap().len()
    }
}

#[async_trait]
impl FunnelBackend for MockBackend {
    async fn fetch_funnel(&self, slug: &str) -> Result<FunnelDefinition, ApiError> {
        self.funnels
            .lock()
            .unwrap()
            .get(slug)
            .cloned()
            .unwrap_or(Err(ApiError::NotFound))
    }

    async fn track_view(&self, event: &TrackEvent) -> Result<(), ApiError> {
        self.tracks.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn create_contact(&self, contact: &ContactPayload) -> Result<(), ApiError> {
        let delay = *self.submit_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.contact_error.lock().unwrap().clone() {
            return Err(error);
        }
        self.contacts.lock().unwrap().push(contact.clone());
        Ok(())
    }

    async fn submit_lead(&self, slug: &str, lead: &LeadSubmission) -> Result<(), ApiError> {
        self.leads.lock().unwrap().push((slug.to_string(), lead.clone()));
        Ok(())
    }
}

// ============================================================================
// HTTP HELPERS
// ============================================================================

/// Carries cookies from one test response to the next request.
#[derive(Default)]
pub struct CookieJar {
    cookies: HashMap<String, Cookie<'static>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store<B>(&mut self, resp: &ServiceResponse<B>) {
        for cookie in resp.response().cookies() {
            self.cookies.insert(cookie.name().to_string(), cookie.into_owned());
        }
    }

    pub fn apply(&self, mut req: TestRequest) -> TestRequest {
        for cookie in self.cookies.values() {
            req = req.cookie(cookie.clone());
        }
        req
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|c| c.value())
    }
}

/// Extract CSRF token from HTML response
pub fn extract_csrf_token(html: &str) -> Option<String> {
    html.lines()
        .find(|line| line.contains("name=\"csrf_token\""))
        .and_then(|line| {
            line.split("value=\"")
                .nth(1)
                .and_then(|part| part.split('"').next())
                .map(|s| s.to_string())
        })
}

/// URL-encoded form body from key/value pairs.
pub fn form_body(pairs: &[(&str, &str)]) -> String {
    serde_urlencoded::to_string(pairs).expect("Failed to encode form body")
}

/// Give spawned tracking tasks a chance to run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
