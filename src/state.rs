use std::sync::Arc;

use crate::api::FunnelBackend;
use crate::engine::submission::SubmissionGuard;

/// Shared application state handed to every handler via `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn FunnelBackend>,
    pub guard: SubmissionGuard,
}

impl AppState {
    pub fn new(backend: Arc<dyn FunnelBackend>) -> Self {
        Self { backend, guard: SubmissionGuard::new() }
    }
}
