use actix_session::Session;
use serde::{Deserialize, Serialize};

use crate::engine::{FunnelViewer, ViewerMode};
use crate::errors::AppError;

/// The session holds a single viewer pass; opening another funnel or the other viewer starts fresh.
const VIEWER_KEY: &str = "viewer";

/// Upper bound for the encoded session state. The cookie store rejects states above
/// 4064 bytes after encryption, and the remainder is headroom for the CSRF token and a toast.
pub const SESSION_BUDGET_BYTES: usize = 2400;

#[derive(Serialize, Deserialize)]
struct StoredViewer {
    funnel: String,
    viewer: FunnelViewer,
}

fn owner(mode: ViewerMode, slug: &str) -> String {
    mode.base_path(slug)
}

/// Stored viewer state for this funnel, or a fresh one. Unreadable state is discarded.
pub fn load_viewer(session: &Session, mode: ViewerMode, slug: &str) -> FunnelViewer {
    match session.get::<StoredViewer>(VIEWER_KEY) {
        Ok(Some(stored)) if stored.funnel == owner(mode, slug) => stored.viewer,
        Ok(_) => FunnelViewer::new(),
        Err(e) => {
            log::warn!("Discarding unreadable viewer state for '{slug}': {e}");
            session.remove(VIEWER_KEY);
            FunnelViewer::new()
        }
    }
}

/// Size of the whole session state once `viewer` replaces the stored one.
pub fn encoded_len(session: &Session, mode: ViewerMode, slug: &str, viewer: &FunnelViewer) -> usize {
    let stored = StoredViewer { funnel: owner(mode, slug), viewer: viewer.clone() };
    let Ok(value) = serde_json::to_string(&stored) else { return usize::MAX };
    let mut entries = session.entries().clone();
    entries.insert(VIEWER_KEY.to_string(), value);
    serde_json::to_string(&entries).map_or(usize::MAX, |encoded| encoded.len())
}

pub fn fits_in_session(session: &Session, mode: ViewerMode, slug: &str, viewer: &FunnelViewer) -> bool {
    encoded_len(session, mode, slug, viewer) <= SESSION_BUDGET_BYTES
}

/// Store the viewer. State over the session budget is dropped instead, so the
/// session cookie can still be written and the visitor starts over.
pub fn save_viewer(session: &Session, mode: ViewerMode, slug: &str, viewer: &FunnelViewer) -> Result<(), AppError> {
    if !fits_in_session(session, mode, slug, viewer) {
        log::warn!("Viewer state for '{slug}' exceeds the session budget; discarding it");
        session.remove(VIEWER_KEY);
        return Ok(());
    }
    let stored = StoredViewer { funnel: owner(mode, slug), viewer: viewer.clone() };
    session
        .insert(VIEWER_KEY, stored)
        .map_err(|e| AppError::Session(format!("Failed to store viewer state: {e}")))
}
