//! Submission tests: consent gating, single submission under re-entry,
//! failure handling and the contact payload.

mod common;

use std::time::Duration;

use chrono::{TimeZone, Utc};

use common::*;
use funnelview::api::ApiError;
use funnelview::engine::submission::{SubmissionGuard, SubmitError, build_contact, submit_confirmed, submit_step};
use funnelview::engine::{FunnelViewer, NavigationState, Transition, ViewerMode};

const VISITOR: &str = "visitor-1";

#[actix_rt::test]
async fn test_no_calls_without_consent() {
    let def = two_step_funnel();
    let backend = MockBackend::with_funnel("demo", def.clone());
    let guard = SubmissionGuard::new();
    let mut viewer = confirming_viewer(&def);

    let result = submit_confirmed(&backend, &guard, VISITOR, &mut viewer, &def).await;

    let Err(SubmitError::Validation(e)) = &result else {
        panic!("expected a consent error, got {result:?}");
    };
    assert!(e.message.contains("Datenschutz"));
    assert_eq!(backend.contact_count(), 0);
    assert_eq!(backend.lead_count(), 0);
    assert_eq!(viewer.nav, NavigationState::Confirming);
}

#[actix_rt::test]
async fn test_no_calls_before_confirmation() {
    let def = two_step_funnel();
    let backend = MockBackend::new();
    let guard = SubmissionGuard::new();
    let mut viewer = FunnelViewer::new();
    viewer.set_terms(true);

    let result = submit_confirmed(&backend, &guard, VISITOR, &mut viewer, &def).await;
    assert!(matches!(result, Err(SubmitError::Validation(_))));
    assert_eq!(backend.contact_count(), 0);
}

#[actix_rt::test]
async fn test_consent_submits_once_and_resets() {
    let def = two_step_funnel();
    let backend = MockBackend::with_funnel("demo", def.clone());
    let guard = SubmissionGuard::new();
    let mut viewer = confirming_viewer(&def);
    viewer.set_terms(true);

    submit_confirmed(&backend, &guard, VISITOR, &mut viewer, &def)
        .await
        .expect("submission should succeed");

    assert_eq!(backend.contact_count(), 1);
    assert_eq!(backend.lead_count(), 1);
    let leads = backend.leads.lock().unwrap();
    let (slug, lead) = &leads[0];
    assert_eq!(slug, "demo");
    assert_eq!(lead.step_id, "s2");
    assert_eq!(lead.lead_data.text("text_name"), "Max Mustermann");
    assert_eq!(lead.lead_data.text("email_mail"), "max@example.de");
    drop(leads);

    assert_eq!(viewer, FunnelViewer::default());
    assert!(!guard.is_in_flight(VISITOR, "demo"));
}

#[actix_rt::test]
async fn test_reentered_submit_sends_once() {
    let def = two_step_funnel();
    let backend = MockBackend::with_funnel("demo", def.clone());
    backend.delay_submissions(Duration::from_millis(100));
    let guard = SubmissionGuard::new();

    let mut first = confirming_viewer(&def);
    first.set_terms(true);
    let mut second = first.clone();

    let (a, b) = tokio::join!(
        submit_confirmed(&backend, &guard, VISITOR, &mut first, &def),
        submit_confirmed(&backend, &guard, VISITOR, &mut second, &def),
    );

    assert_eq!(a, Ok(()));
    assert_eq!(b, Err(SubmitError::InFlight));
    assert_eq!(backend.contact_count(), 1);
    assert_eq!(backend.lead_count(), 1);
    // The rejected click keeps its state so a later retry is possible.
    assert!(second.is_confirming());
}

#[actix_rt::test]
async fn test_other_visitors_are_not_blocked() {
    let def = two_step_funnel();
    let backend = MockBackend::with_funnel("demo", def.clone());
    backend.delay_submissions(Duration::from_millis(50));
    let guard = SubmissionGuard::new();

    let mut first = confirming_viewer(&def);
    first.set_terms(true);
    let mut second = first.clone();

    let (a, b) = tokio::join!(
        submit_confirmed(&backend, &guard, "visitor-a", &mut first, &def),
        submit_confirmed(&backend, &guard, "visitor-b", &mut second, &def),
    );
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(backend.lead_count(), 2);
}

#[actix_rt::test]
async fn test_failure_keeps_state_and_releases_guard() {
    let def = two_step_funnel();
    let backend = MockBackend::with_funnel("demo", def.clone());
    backend.fail_contacts(ApiError::Server { status: 422, message: Some("E-Mail ungültig".to_string()) });
    let guard = SubmissionGuard::new();
    let mut viewer = confirming_viewer(&def);
    viewer.set_terms(true);
    let before = viewer.clone();

    let err = submit_confirmed(&backend, &guard, VISITOR, &mut viewer, &def).await.unwrap_err();

    assert_eq!(err.user_message(), "E-Mail ungültig");
    assert_eq!(viewer, before);
    assert_eq!(backend.lead_count(), 0);
    assert!(!guard.is_in_flight(VISITOR, "demo"));
}

#[actix_rt::test]
async fn test_simple_mode_sends_a_lead_per_step() {
    let def = two_step_funnel();
    let backend = MockBackend::with_funnel("demo", def.clone());
    let guard = SubmissionGuard::new();
    let mut viewer = FunnelViewer::new();

    viewer.update_fields(&def, [("text_name", "Max")]).unwrap();
    let t = submit_step(&backend, &guard, VISITOR, &mut viewer, &def, "s1").await.unwrap();
    assert_eq!(t, Transition::Entered { step_index: 1, step_id: "s2".to_string() });

    viewer.update_fields(&def, [("email_mail", "max@example.de")]).unwrap();
    let t = submit_step(&backend, &guard, VISITOR, &mut viewer, &def, "s2").await.unwrap();
    assert_eq!(t, Transition::Completed);
    assert_eq!(viewer, FunnelViewer::default());

    let steps: Vec<String> = backend.leads.lock().unwrap().iter().map(|(_, l)| l.step_id.clone()).collect();
    assert_eq!(steps, vec!["s1".to_string(), "s2".to_string()]);
    assert_eq!(viewer.progress(&def, ViewerMode::Simple), (1, 2));
}

#[test]
fn test_contact_payload_from_answers() {
    let def = three_step_funnel();
    let mut viewer = FunnelViewer::new();
    viewer.toggle_choice(&def, "size", 1);
    viewer.toggle_choice(&def, "size", 2);
    viewer.next(&def, ViewerMode::Full).unwrap();
    viewer.update_fields(&def, [("text_city", "München")]).unwrap();
    viewer.next(&def, ViewerMode::Full).unwrap();
    viewer.update_fields(
        &def,
        [("text_who", "Erika Musterfrau"), ("email_mail", "erika@example.de"), ("tel_phone", "+49 30 1234")],
    ).unwrap();

    let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let contact = build_contact(&def, &viewer.form, now);

    assert_eq!(contact.first_name, "Erika");
    assert_eq!(contact.last_name, "Musterfrau");
    assert_eq!(contact.email, "erika@example.de");
    assert_eq!(contact.phone, "+49 30 1234");
    assert_eq!(contact.created_at, now);
    assert_eq!(
        contact.additional_data.get("wie_viele_mitarbeiter").map(String::as_str),
        Some("10_50,mehr_als_50")
    );
    assert_eq!(contact.additional_data.get("stadt").map(String::as_str), Some("München"));
    assert_eq!(contact.pipeline_id, None);
}

#[test]
fn test_contact_carries_pipeline_routing() {
    let def = two_step_funnel();
    let viewer = confirming_viewer(&def);
    let contact = build_contact(&def, &viewer.form, Utc::now());

    assert_eq!(contact.pipeline_id.as_deref(), Some("7"));
    assert_eq!(contact.stage_id.as_deref(), Some("42"));
    assert_eq!(contact.company_id.as_deref(), Some("3"));

    let json = serde_json::to_value(&contact).unwrap();
    assert_eq!(json["first_name"], "Max");
    assert_eq!(json["last_name"], "Mustermann");
    assert!(json["additional_data"].as_object().unwrap().is_empty());
}
