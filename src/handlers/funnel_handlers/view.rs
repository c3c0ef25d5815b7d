use actix_session::Session;
use actix_web::{HttpResponse, http::StatusCode, web};

use super::helpers::{Loaded, load_definition};
use crate::api::ApiError;
use crate::engine::confirmation::summarize;
use crate::engine::renderer::{ButtonAction, RenderedComponent, render_step};
use crate::engine::tracking::track_step_view;
use crate::engine::{FunnelViewer, NavigationState, ViewerMode};
use crate::errors::{AppError, render, render_with_status};
use crate::models::funnel::FunnelDefinition;
use crate::session::store::{load_viewer, save_viewer};
use crate::session::visitor::VisitorId;
use crate::state::AppState;
use crate::templates_structs::{FunnelConfirmTemplate, FunnelMessageTemplate, FunnelPage, FunnelStepTemplate};

/// GET /funnel/{slug}
pub async fn show(
    state: web::Data<AppState>,
    session: Session,
    visitor: VisitorId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    render_viewer(&state, &session, &visitor, &path.into_inner(), ViewerMode::Full).await
}

/// GET /f/{slug}
pub async fn show_simple(
    state: web::Data<AppState>,
    session: Session,
    visitor: VisitorId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    render_viewer(&state, &session, &visitor, &path.into_inner(), ViewerMode::Simple).await
}

pub fn not_found_page(base_path: &str) -> Result<HttpResponse, AppError> {
    render_with_status(
        FunnelMessageTemplate {
            title: "Funnel nicht gefunden".to_string(),
            heading: "Funnel nicht gefunden".to_string(),
            message: "Dieser Funnel existiert nicht oder hat noch keine Inhalte.".to_string(),
            retry_url: base_path.to_string(),
        },
        StatusCode::NOT_FOUND,
    )
}

fn unavailable_page(def: &FunnelDefinition) -> Result<HttpResponse, AppError> {
    let title = if def.name.trim().is_empty() { "Funnel".to_string() } else { def.name.clone() };
    render(FunnelMessageTemplate {
        title,
        heading: "Nicht verfügbar".to_string(),
        message: "Dieser Funnel ist derzeit nicht verfügbar.".to_string(),
        retry_url: String::new(),
    })
}

fn failed_page(base_path: &str, error: &ApiError) -> Result<HttpResponse, AppError> {
    let status = match error {
        ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    };
    render_with_status(
        FunnelMessageTemplate {
            title: "Fehler".to_string(),
            heading: "Funnel konnte nicht geladen werden".to_string(),
            message: "Bitte versuchen Sie es in einem Moment erneut.".to_string(),
            retry_url: base_path.to_string(),
        },
        status,
    )
}

/// Loading → not found / unavailable / failed, or the visitor's current step.
pub async fn render_viewer(
    state: &AppState,
    session: &Session,
    visitor: &VisitorId,
    slug: &str,
    mode: ViewerMode,
) -> Result<HttpResponse, AppError> {
    let base_path = mode.base_path(slug);
    let def = match load_definition(state.backend.as_ref(), slug).await {
        Loaded::Ready(def) => def,
        Loaded::NotFound => return not_found_page(&base_path),
        Loaded::Unavailable(def) => return unavailable_page(&def),
        Loaded::Failed(e) => return failed_page(&base_path, &e),
    };

    let mut viewer = load_viewer(session, mode, slug);
    let mut dirty = viewer.clamp(&def, mode);
    if !viewer.start_tracked {
        if let NavigationState::Viewing(0) = viewer.nav {
            let step_id = def.step(0).map(|s| s.id.as_str());
            track_step_view(state.backend.clone(), slug, step_id, visitor.as_str());
        }
        viewer.start_tracked = true;
        dirty = true;
    }
    if dirty {
        save_viewer(session, mode, slug, &viewer)?;
    }

    let title = if def.name.trim().is_empty() { "Funnel".to_string() } else { def.name.clone() };
    let page = FunnelPage::build(session, &title, &base_path);

    if viewer.is_confirming() {
        return render_confirmation(state, visitor, page, &def, &viewer, mode);
    }
    render_step_page(page, &def, &viewer, mode)
}

fn render_step_page(
    page: FunnelPage,
    def: &FunnelDefinition,
    viewer: &FunnelViewer,
    mode: ViewerMode,
) -> Result<HttpResponse, AppError> {
    let Some(step) = viewer.current_step(def) else {
        return Err(AppError::NotFound);
    };
    let components = render_step(&step.components, &viewer.form);
    // The step's own button already moves forward; the nav button is for steps without one.
    let forward_action = components.iter().find_map(|c| match c {
        RenderedComponent::Button(b) if !matches!(b.action, ButtonAction::Link(_)) => Some(b.action_value.clone()),
        _ => None,
    });
    let (current, total) = viewer.progress(def, mode);
    let index = viewer.current_index().unwrap_or(0);

    render(FunnelStepTemplate {
        page,
        step_title: step.title.clone(),
        components,
        settings: def.settings().clone(),
        progress_current: current,
        progress_total: total,
        progress_percent: current * 100 / total.max(1),
        show_previous: index > 0,
        show_next: forward_action.is_none(),
        default_action: forward_action.unwrap_or_else(|| "next".to_string()),
    })
}

fn render_confirmation(
    state: &AppState,
    visitor: &VisitorId,
    page: FunnelPage,
    def: &FunnelDefinition,
    viewer: &FunnelViewer,
    mode: ViewerMode,
) -> Result<HttpResponse, AppError> {
    let settings = def.settings().clone();
    let (_, total) = viewer.progress(def, mode);
    render(FunnelConfirmTemplate {
        submitting: state.guard.is_in_flight(visitor.as_str(), &def.slug),
        page,
        rows: summarize(def, &viewer.form),
        privacy_link: settings.privacy_link().unwrap_or("").to_string(),
        settings,
        agreed_to_terms: viewer.agreed_to_terms,
        progress_total: total,
    })
}
