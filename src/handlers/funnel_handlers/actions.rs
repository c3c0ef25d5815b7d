/// Step form and confirmation form POST handlers.
///
/// Every handler validates CSRF, re-loads the definition, applies one event to the
/// visitor's stored viewer state and redirects back to the viewer (post/redirect/get).

use actix_session::Session;
use actix_web::{HttpResponse, web};

use super::helpers::{Loaded, StepAction, field_values, get_field, load_definition, parse_form_body, see_other};
use crate::engine::submission::{SubmitError, submit_confirmed, submit_step};
use crate::engine::tracking::track_step_view;
use crate::engine::{ButtonOutcome, FunnelViewer, Transition, ViewerMode};
use crate::errors::AppError;
use crate::models::funnel::FunnelDefinition;
use crate::session::csrf;
use crate::session::flash::{ToastKind, set_toast};
use crate::session::store::{fits_in_session, load_viewer, save_viewer};
use crate::session::visitor::VisitorId;
use crate::state::AppState;

const SUCCESS_MESSAGE: &str = "Vielen Dank! Ihre Angaben wurden erfolgreich übermittelt.";
const SAVED_MESSAGE: &str = "Ihre Angaben wurden gespeichert.";
const FINISHED_MESSAGE: &str = "Vielen Dank!";
const TOO_LARGE_MESSAGE: &str = "Ihre Angaben sind zu umfangreich. Bitte kürzen Sie Ihre Eingaben.";

/// POST /funnel/{slug}/step
pub async fn step(
    state: web::Data<AppState>,
    session: Session,
    visitor: VisitorId,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    handle_step(&state, &session, &visitor, &path.into_inner(), &body, ViewerMode::Full).await
}

/// POST /f/{slug}/step
pub async fn step_simple(
    state: web::Data<AppState>,
    session: Session,
    visitor: VisitorId,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    handle_step(&state, &session, &visitor, &path.into_inner(), &body, ViewerMode::Simple).await
}

/// Fire the step-view event for a transition that entered a content step.
fn track_transition(state: &AppState, def: &FunnelDefinition, visitor: &VisitorId, transition: &Transition) {
    if let Transition::Entered { step_id, .. } = transition {
        track_step_view(state.backend.clone(), &def.slug, Some(step_id), visitor.as_str());
    }
}

fn report_rejection(session: &Session, message: &str) {
    set_toast(session, ToastKind::Error, message);
}

fn report_submit_error(session: &Session, error: &SubmitError) {
    let kind = match error {
        SubmitError::InFlight => ToastKind::Info,
        _ => ToastKind::Error,
    };
    set_toast(session, kind, error.user_message());
}

async fn handle_step(
    state: &AppState,
    session: &Session,
    visitor: &VisitorId,
    slug: &str,
    body: &[u8],
    mode: ViewerMode,
) -> Result<HttpResponse, AppError> {
    let body_str = String::from_utf8_lossy(body);
    let params = parse_form_body(&body_str);
    csrf::validate_csrf(session, get_field(&params, "csrf_token"))?;

    let base_path = mode.base_path(slug);
    let Loaded::Ready(def) = load_definition(state.backend.as_ref(), slug).await else {
        // The viewer page renders the not-found / unavailable / error state.
        return Ok(see_other(&base_path));
    };

    let mut viewer = load_viewer(session, mode, slug);
    viewer.clamp(&def, mode);
    if viewer.is_confirming() {
        return Ok(see_other(&base_path));
    }

    let before = viewer.clone();
    if let Err(e) = viewer.update_fields(&def, field_values(&params)) {
        report_rejection(session, &e.message);
        return Ok(see_other(&base_path));
    }
    if !fits_in_session(session, mode, slug, &viewer) {
        log::warn!("Answers for funnel '{slug}' do not fit in the session; keeping the previous state");
        report_rejection(session, TOO_LARGE_MESSAGE);
        return Ok(see_other(&base_path));
    }

    let action = StepAction::parse(get_field(&params, "action"));
    let redirect = apply_step_action(state, session, visitor, &def, &mut viewer, mode, action).await;

    if !fits_in_session(session, mode, slug, &viewer) {
        log::warn!("Viewer state for funnel '{slug}' outgrew the session; keeping the previous state");
        viewer = before;
        report_rejection(session, TOO_LARGE_MESSAGE);
    }
    save_viewer(session, mode, slug, &viewer)?;
    Ok(see_other(redirect.as_deref().unwrap_or(&base_path)))
}

/// Apply one step-form event. Returns an external location when a link button was posted.
async fn apply_step_action(
    state: &AppState,
    session: &Session,
    visitor: &VisitorId,
    def: &FunnelDefinition,
    viewer: &mut FunnelViewer,
    mode: ViewerMode,
    action: StepAction,
) -> Option<String> {
    match action {
        StepAction::Save => {}
        StepAction::Previous => {
            let transition = viewer.previous(def);
            track_transition(state, def, visitor, &transition);
        }
        StepAction::Next => {
            let outcome = viewer.advance(def, mode);
            return apply_outcome(state, session, visitor, def, viewer, outcome).await;
        }
        StepAction::Toggle { component_id, option_index } => {
            if !viewer.toggle_choice(def, &component_id, option_index) {
                log::debug!("Ignoring toggle for unknown option {component_id}:{option_index}");
            }
        }
        StepAction::Button(component_id) => {
            let outcome = viewer.handle_button(def, mode, &component_id);
            if outcome == ButtonOutcome::Ignored {
                log::debug!("Ignoring click on unknown button '{component_id}'");
            }
            return apply_outcome(state, session, visitor, def, viewer, outcome).await;
        }
    }
    None
}

/// Carry out a forward move decided by the state machine.
async fn apply_outcome(
    state: &AppState,
    session: &Session,
    visitor: &VisitorId,
    def: &FunnelDefinition,
    viewer: &mut FunnelViewer,
    outcome: ButtonOutcome,
) -> Option<String> {
    match outcome {
        ButtonOutcome::OpenLink(url) => return Some(url),
        ButtonOutcome::Advanced(Transition::Completed) => {
            // Simple mode, last step without inputs: nothing left to send.
            viewer.reset();
            set_toast(session, ToastKind::Success, FINISHED_MESSAGE);
        }
        ButtonOutcome::Advanced(transition) => track_transition(state, def, visitor, &transition),
        ButtonOutcome::SubmitStep { step_id } => {
            match submit_step(state.backend.as_ref(), &state.guard, visitor.as_str(), viewer, def, &step_id).await {
                Ok(Transition::Completed) => set_toast(session, ToastKind::Success, SUCCESS_MESSAGE),
                Ok(transition) => {
                    set_toast(session, ToastKind::Success, SAVED_MESSAGE);
                    track_transition(state, def, visitor, &transition);
                }
                Err(e) => report_submit_error(session, &e),
            }
        }
        ButtonOutcome::Rejected(e) => report_rejection(session, &e.message),
        ButtonOutcome::Ignored => {}
    }
    None
}

/// POST /funnel/{slug}/confirm
pub async fn confirm(
    state: web::Data<AppState>,
    session: Session,
    visitor: VisitorId,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let slug = path.into_inner();
    let mode = ViewerMode::Full;
    let body_str = String::from_utf8_lossy(&body);
    let params = parse_form_body(&body_str);
    csrf::validate_csrf(&session, get_field(&params, "csrf_token"))?;

    let base_path = mode.base_path(&slug);
    let Loaded::Ready(def) = load_definition(state.backend.as_ref(), &slug).await else {
        return Ok(see_other(&base_path));
    };

    let mut viewer = load_viewer(&session, mode, &slug);
    viewer.clamp(&def, mode);
    if !viewer.is_confirming() {
        return Ok(see_other(&base_path));
    }

    if get_field(&params, "action") == "previous" {
        let transition = viewer.previous(&def);
        track_transition(&state, &def, &visitor, &transition);
        save_viewer(&session, mode, &slug, &viewer)?;
        return Ok(see_other(&base_path));
    }

    let agreed = matches!(get_field(&params, "agreed_to_terms"), "on" | "true" | "1");
    viewer.set_terms(agreed);

    match submit_confirmed(state.backend.as_ref(), &state.guard, visitor.as_str(), &mut viewer, &def).await {
        Ok(()) => set_toast(&session, ToastKind::Success, SUCCESS_MESSAGE),
        Err(e) => report_submit_error(&session, &e),
    }

    save_viewer(&session, mode, &slug, &viewer)?;
    Ok(see_other(&base_path))
}
