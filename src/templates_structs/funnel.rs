use askama::Template;

use super::FunnelPage;
use crate::engine::confirmation::SummaryRow;
use crate::engine::renderer::RenderedComponent;
use crate::models::funnel::FunnelSettings;

#[derive(Template)]
#[template(path = "funnel/step.html")]
pub struct FunnelStepTemplate {
    pub page: FunnelPage,
    pub step_title: String,
    pub components: Vec<RenderedComponent>,
    pub settings: FunnelSettings,
    pub progress_current: usize,
    pub progress_total: usize,
    pub progress_percent: usize,
    pub show_previous: bool,
    pub show_next: bool,
    /// Action posted when the visitor submits the form with Enter.
    pub default_action: String,
}

#[derive(Template)]
#[template(path = "funnel/confirm.html")]
pub struct FunnelConfirmTemplate {
    pub page: FunnelPage,
    pub rows: Vec<SummaryRow>,
    pub settings: FunnelSettings,
    pub privacy_link: String,
    pub agreed_to_terms: bool,
    pub submitting: bool,
    pub progress_total: usize,
}

/// Not found, not available and backend failure pages. An empty `retry_url` hides the retry link.
#[derive(Template)]
#[template(path = "funnel/message.html")]
pub struct FunnelMessageTemplate {
    pub title: String,
    pub heading: String,
    pub message: String,
    pub retry_url: String,
}
