use std::sync::Arc;

use crate::api::{FunnelBackend, TrackEvent};

/// Report a step view without waiting for it. Failures are logged and dropped;
/// events for consecutive steps may reach the collector out of order.
pub fn track_step_view(backend: Arc<dyn FunnelBackend>, slug: &str, step_id: Option<&str>, visitor_id: &str) {
    let event = TrackEvent {
        slug: slug.to_string(),
        step_id: step_id.filter(|s| !s.is_empty()).map(String::from),
        visitor_id: visitor_id.to_string(),
    };
    actix_web::rt::spawn(async move {
        if let Err(e) = backend.track_view(&event).await {
            log::warn!("Tracking step view for funnel '{}' failed: {e}", event.slug);
        }
    });
}
